use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, Write};

use super::{Account, AccountDirectory, Leaderboard, ScanLog, ScanRecord, UserId, VoucherId};

/// Keyspace of the authoritative store.
#[derive(Hash, Eq, PartialEq, Ord, PartialOrd, Clone, Debug)]
pub enum Key {
    /// Per-user ledger record (tag 0)
    Account(UserId),
    /// Per-user append-only scan history (tag 1)
    ScanLog(UserId),
    /// Global top-N ranking (tag 2)
    Leaderboard,
    /// Listing of every known account (tag 3)
    Directory,
}

impl Write for Key {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::Account(user) => {
                0u8.write(writer);
                user.write(writer);
            }
            Self::ScanLog(user) => {
                1u8.write(writer);
                user.write(writer);
            }
            Self::Leaderboard => 2u8.write(writer),
            Self::Directory => 3u8.write(writer),
        }
    }
}

impl Read for Key {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let key = match reader.get_u8() {
            0 => Self::Account(UserId::read(reader)?),
            1 => Self::ScanLog(UserId::read(reader)?),
            2 => Self::Leaderboard,
            3 => Self::Directory,
            i => return Err(Error::InvalidEnum(i)),
        };

        Ok(key)
    }
}

impl EncodeSize for Key {
    fn encode_size(&self) -> usize {
        u8::SIZE
            + match self {
                Self::Account(user) => user.encode_size(),
                Self::ScanLog(user) => user.encode_size(),
                Self::Leaderboard => 0,
                Self::Directory => 0,
            }
    }
}

/// Values stored in the authoritative store, one variant per [`Key`] family.
#[derive(Clone, Eq, PartialEq, Debug)]
#[allow(clippy::large_enum_variant)]
pub enum Value {
    /// Per-user ledger record (tag 0)
    Account(Account),
    /// Per-user append-only scan history (tag 1)
    ScanLog(ScanLog),
    /// Global top-N ranking (tag 2)
    Leaderboard(Leaderboard),
    /// Listing of every known account (tag 3)
    Directory(AccountDirectory),
}

impl Write for Value {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::Account(account) => {
                0u8.write(writer);
                account.write(writer);
            }
            Self::ScanLog(log) => {
                1u8.write(writer);
                log.write(writer);
            }
            Self::Leaderboard(leaderboard) => {
                2u8.write(writer);
                leaderboard.write(writer);
            }
            Self::Directory(directory) => {
                3u8.write(writer);
                directory.write(writer);
            }
        }
    }
}

impl Read for Value {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let value = match reader.get_u8() {
            0 => Self::Account(Account::read(reader)?),
            1 => Self::ScanLog(ScanLog::read(reader)?),
            2 => Self::Leaderboard(Leaderboard::read(reader)?),
            3 => Self::Directory(AccountDirectory::read(reader)?),
            i => return Err(Error::InvalidEnum(i)),
        };

        Ok(value)
    }
}

impl EncodeSize for Value {
    fn encode_size(&self) -> usize {
        u8::SIZE
            + match self {
                Self::Account(account) => account.encode_size(),
                Self::ScanLog(log) => log.encode_size(),
                Self::Leaderboard(leaderboard) => leaderboard.encode_size(),
                Self::Directory(directory) => directory.encode_size(),
            }
    }
}

/// Change notification produced by a committed ledger transaction.
///
/// Delivered in-process to subscribers in commit order; not persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(clippy::large_enum_variant)]
pub enum Event {
    AccountCreated {
        user: UserId,
        account: Account,
    },
    AccountChanged {
        user: UserId,
        account: Account,
    },
    ScanRecorded {
        user: UserId,
        record: ScanRecord,
    },
    LeaderboardUpdated {
        leaderboard: Leaderboard,
    },
    VoucherRedeemed {
        user: UserId,
        voucher: VoucherId,
        cost: u64,
        new_coins: u64,
    },
}
