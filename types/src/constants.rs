/// Maximum length of a user identifier issued by the identity provider.
pub const MAX_USER_ID_LENGTH: usize = 64;

/// Maximum display name length for accounts.
pub const MAX_NAME_LENGTH: usize = 32;

/// Maximum email length for accounts (RFC 5321 limit).
pub const MAX_EMAIL_LENGTH: usize = 254;

/// Maximum item label length recorded per scan.
pub const MAX_ITEM_NAME_LENGTH: usize = 64;

/// Points credited per confirmed scan.
pub const SCAN_REWARD_POINTS: u64 = 10;

/// Coins credited per confirmed scan.
pub const SCAN_REWARD_COINS: u64 = 5;

/// Number of entries kept on the global leaderboard.
pub const LEADERBOARD_SIZE: usize = 10;

/// Classifier confidence scale: confidences are stored in basis points
/// (10_000 == probability 1.0) so records stay integer-only.
pub const CONFIDENCE_SCALE_BPS: u16 = 10_000;

/// Decode bound on a single account's scan history.
pub const MAX_SCAN_HISTORY: usize = 10_000;

/// Decode bound on the account directory.
pub const MAX_ACCOUNTS: usize = 100_000;
