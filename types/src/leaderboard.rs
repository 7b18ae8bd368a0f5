use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, Read, ReadExt, ReadRangeExt, Write};

use super::{
    read_string, string_encode_size, write_string, Account, UserId, LEADERBOARD_SIZE,
    MAX_NAME_LENGTH,
};

/// One ranked leaderboard row: a read-only projection of an account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub user: UserId,
    pub display_name: String,
    pub points: u64,
    pub scans: u64,
    pub rank: u32,
}

impl Write for LeaderboardEntry {
    fn write(&self, writer: &mut impl BufMut) {
        self.user.write(writer);
        write_string(&self.display_name, writer);
        self.points.write(writer);
        self.scans.write(writer);
        self.rank.write(writer);
    }
}

impl Read for LeaderboardEntry {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            user: UserId::read(reader)?,
            display_name: read_string(reader, MAX_NAME_LENGTH)?,
            points: u64::read(reader)?,
            scans: u64::read(reader)?,
            rank: u32::read(reader)?,
        })
    }
}

impl EncodeSize for LeaderboardEntry {
    fn encode_size(&self) -> usize {
        self.user.encode_size()
            + string_encode_size(&self.display_name)
            + self.points.encode_size()
            + self.scans.encode_size()
            + self.rank.encode_size()
    }
}

/// Global top-N ranking by lifetime points.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Leaderboard {
    pub entries: Vec<LeaderboardEntry>,
}

impl Leaderboard {
    /// Recompute the ranking from the full account set.
    ///
    /// Points descending, ties broken by ascending user id so the ordering
    /// is deterministic across sessions; truncated to the top
    /// [`LEADERBOARD_SIZE`], ranks assigned 1-based.
    pub fn rebuild(mut accounts: Vec<(UserId, Account)>) -> Self {
        accounts.sort_by(|a, b| {
            b.1.totals
                .points
                .cmp(&a.1.totals.points)
                .then_with(|| a.0.cmp(&b.0))
        });
        accounts.truncate(LEADERBOARD_SIZE);

        let entries = accounts
            .into_iter()
            .enumerate()
            .map(|(i, (user, account))| LeaderboardEntry {
                user,
                display_name: account.profile.display_name,
                points: account.totals.points,
                scans: account.totals.scans,
                rank: (i + 1) as u32,
            })
            .collect();

        Self { entries }
    }
}

impl Write for Leaderboard {
    fn write(&self, writer: &mut impl BufMut) {
        self.entries.write(writer);
    }
}

impl Read for Leaderboard {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            entries: Vec::<LeaderboardEntry>::read_range(reader, 0..=LEADERBOARD_SIZE)?,
        })
    }
}

impl EncodeSize for Leaderboard {
    fn encode_size(&self) -> usize {
        self.entries.encode_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(name: &str, points: u64) -> Account {
        let mut account = Account::new(name.to_string(), format!("{name}@example.com"));
        account.totals.points = points;
        account
    }

    #[test]
    fn rebuild_sorts_by_points_descending() {
        let leaderboard = Leaderboard::rebuild(vec![
            (UserId::from("uid-a"), account("Alice", 30)),
            (UserId::from("uid-b"), account("Bob", 50)),
            (UserId::from("uid-c"), account("Cara", 40)),
        ]);

        let names: Vec<_> = leaderboard
            .entries
            .iter()
            .map(|e| e.display_name.as_str())
            .collect();
        assert_eq!(names, vec!["Bob", "Cara", "Alice"]);
        assert_eq!(leaderboard.entries[0].rank, 1);
        assert_eq!(leaderboard.entries[2].rank, 3);
    }

    #[test]
    fn equal_points_tie_break_on_user_id() {
        let leaderboard = Leaderboard::rebuild(vec![
            (UserId::from("uid-z"), account("Zed", 10)),
            (UserId::from("uid-a"), account("Ann", 10)),
        ]);

        assert_eq!(leaderboard.entries[0].user, UserId::from("uid-a"));
        assert_eq!(leaderboard.entries[1].user, UserId::from("uid-z"));
    }

    #[test]
    fn rebuild_truncates_to_top_ten() {
        let accounts = (0..15)
            .map(|i| {
                (
                    UserId::new(format!("uid-{i:02}")),
                    account(&format!("User{i}"), i as u64),
                )
            })
            .collect();

        let leaderboard = Leaderboard::rebuild(accounts);
        assert_eq!(leaderboard.entries.len(), LEADERBOARD_SIZE);
        // Lowest scorers fall off the board.
        assert!(leaderboard.entries.iter().all(|e| e.points >= 5));
    }
}
