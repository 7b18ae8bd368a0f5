use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, Read, ReadExt, ReadRangeExt, Write};
use thiserror::Error as ThisError;

use super::{
    read_string, string_encode_size, write_string, MAX_ACCOUNTS, MAX_EMAIL_LENGTH,
    MAX_NAME_LENGTH, MAX_USER_ID_LENGTH, SCAN_REWARD_COINS, SCAN_REWARD_POINTS,
};

/// Stable user identifier issued by the identity provider.
///
/// Opaque to the ledger; also the deterministic tie-break for leaderboard
/// ordering, so it must order consistently across sessions.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl Write for UserId {
    fn write(&self, writer: &mut impl BufMut) {
        write_string(&self.0, writer);
    }
}

impl Read for UserId {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self(read_string(reader, MAX_USER_ID_LENGTH)?))
    }
}

impl EncodeSize for UserId {
    fn encode_size(&self) -> usize {
        string_encode_size(&self.0)
    }
}

#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum AccountInvariantError {
    #[error("display name too long (len={len}, max={max})")]
    NameTooLong { len: usize, max: usize },
    #[error("email too long (len={len}, max={max})")]
    EmailTooLong { len: usize, max: usize },
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct AccountProfile {
    pub display_name: String,
    pub email: String,
}

/// Cumulative per-account counters.
///
/// All three are unsigned: `points` only ever grows, `coins` is a spendable
/// balance that can shrink but never below zero, `scans` counts confirmed
/// scans. Deltas are applied with saturating arithmetic so an over-drawn
/// spend clamps at zero instead of wrapping; callers that must not overdraw
/// (voucher redemption) pre-check the balance inside the same transaction.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct AccountTotals {
    pub points: u64,
    pub coins: u64,
    pub scans: u64,
}

impl AccountTotals {
    pub fn apply(&mut self, delta: &AccountDelta) {
        self.points = self.points.saturating_add_signed(delta.points);
        self.coins = self.coins.saturating_add_signed(delta.coins);
        self.scans = self.scans.saturating_add_signed(delta.scans);
    }
}

/// Signed change to an account's counters, applied as one unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct AccountDelta {
    pub points: i64,
    pub coins: i64,
    pub scans: i64,
}

impl AccountDelta {
    /// The credit applied for one confirmed scan.
    pub fn scan_reward() -> Self {
        Self {
            points: SCAN_REWARD_POINTS as i64,
            coins: SCAN_REWARD_COINS as i64,
            scans: 1,
        }
    }

    /// The debit applied when spending coins on a voucher.
    pub fn spend_coins(cost: u64) -> Self {
        Self {
            points: 0,
            coins: -(cost.min(i64::MAX as u64) as i64),
            scans: 0,
        }
    }
}

/// Per-user ledger record.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Account {
    pub profile: AccountProfile,
    pub totals: AccountTotals,
}

impl Account {
    pub fn new(display_name: String, email: String) -> Self {
        Self {
            profile: AccountProfile {
                display_name,
                email,
            },
            totals: AccountTotals::default(),
        }
    }

    pub fn validate_invariants(&self) -> Result<(), AccountInvariantError> {
        if self.profile.display_name.len() > MAX_NAME_LENGTH {
            return Err(AccountInvariantError::NameTooLong {
                len: self.profile.display_name.len(),
                max: MAX_NAME_LENGTH,
            });
        }
        if self.profile.email.len() > MAX_EMAIL_LENGTH {
            return Err(AccountInvariantError::EmailTooLong {
                len: self.profile.email.len(),
                max: MAX_EMAIL_LENGTH,
            });
        }
        Ok(())
    }
}

impl Write for Account {
    fn write(&self, writer: &mut impl BufMut) {
        write_string(&self.profile.display_name, writer);
        write_string(&self.profile.email, writer);
        self.totals.points.write(writer);
        self.totals.coins.write(writer);
        self.totals.scans.write(writer);
    }
}

impl Read for Account {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let display_name = read_string(reader, MAX_NAME_LENGTH)?;
        let email = read_string(reader, MAX_EMAIL_LENGTH)?;
        let points = u64::read(reader)?;
        let coins = u64::read(reader)?;
        let scans = u64::read(reader)?;

        Ok(Self {
            profile: AccountProfile {
                display_name,
                email,
            },
            totals: AccountTotals {
                points,
                coins,
                scans,
            },
        })
    }
}

impl EncodeSize for Account {
    fn encode_size(&self) -> usize {
        string_encode_size(&self.profile.display_name)
            + string_encode_size(&self.profile.email)
            + self.totals.points.encode_size()
            + self.totals.coins.encode_size()
            + self.totals.scans.encode_size()
    }
}

/// Sorted, deduplicated listing of every known account.
///
/// The enumeration source for leaderboard recomputation. A full scan over
/// this listing is acceptable only while account volume is small; past that
/// the ranking needs a maintained sorted index.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct AccountDirectory {
    pub users: Vec<UserId>,
}

impl AccountDirectory {
    /// Register a user. Returns false if already present.
    pub fn insert(&mut self, user: UserId) -> bool {
        if self.users.iter().any(|u| u == &user) {
            return false;
        }
        self.users.push(user);
        self.users.sort_unstable();
        self.users.dedup();
        true
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl Write for AccountDirectory {
    fn write(&self, writer: &mut impl BufMut) {
        self.users.write(writer);
    }
}

impl Read for AccountDirectory {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            users: Vec::<UserId>::read_range(reader, 0..=MAX_ACCOUNTS)?,
        })
    }
}

impl EncodeSize for AccountDirectory {
    fn encode_size(&self) -> usize {
        self.users.encode_size()
    }
}
