mod account;
mod redeem;
mod reward;

pub use redeem::Redemption;
