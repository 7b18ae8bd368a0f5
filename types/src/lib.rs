//! Greenloop domain types.
//!
//! Defines the account/scan/leaderboard/voucher state and constants used by the
//! ledger and clients, together with the storage codec for everything the
//! authoritative store persists.

mod account;
mod codec;
mod constants;
mod leaderboard;
mod scan;
mod state;
mod voucher;

pub use account::*;
pub use codec::{read_string, string_encode_size, write_string};
pub use constants::*;
pub use leaderboard::*;
pub use scan::*;
pub use state::*;
pub use voucher::*;
