use anyhow::Result;
use greenloop_types::{Event, Key, Leaderboard, Value};
use std::collections::BTreeMap;

use crate::state::{load_account, load_directory, load_leaderboard, State, Status};

mod handlers;

pub use handlers::Redemption;

/// Atomic read-modify-write overlay over the authoritative store.
///
/// Every mutating ledger operation runs as a handler on a `Txn`: reads see
/// the pending writes, nothing touches the store until [`Txn::commit`]
/// returns the whole batch, and the ledger applies that batch as one unit
/// while holding its store lock. Crediting and spending share this single
/// code path, so the balance invariants are enforced in exactly one place.
pub struct Txn<'a, S: State> {
    state: &'a S,
    pending: BTreeMap<Key, Status>,

    now_ms: u64,
}

impl<'a, S: State> Txn<'a, S> {
    pub fn new(state: &'a S, now_ms: u64) -> Self {
        Self {
            state,
            pending: BTreeMap::new(),
            now_ms,
        }
    }

    fn stage(&mut self, key: Key, value: Value) {
        self.pending.insert(key, Status::Update(value));
    }

    pub fn commit(self) -> Vec<(Key, Status)> {
        self.pending.into_iter().collect()
    }

    /// Recompute the global ranking from every known account.
    ///
    /// Full scan over the directory; emits nothing when the recompute is
    /// identical to the stored ranking.
    pub(crate) async fn refresh_leaderboard(&mut self) -> Result<Option<Event>> {
        let directory = load_directory(self).await?;
        let mut accounts = Vec::with_capacity(directory.len());
        for user in &directory.users {
            if let Some(account) = load_account(self, user).await? {
                accounts.push((user.clone(), account));
            }
        }

        let rebuilt = Leaderboard::rebuild(accounts);
        let previous = load_leaderboard(self).await?;
        if rebuilt == previous {
            return Ok(None);
        }
        self.stage(Key::Leaderboard, Value::Leaderboard(rebuilt.clone()));
        Ok(Some(Event::LeaderboardUpdated {
            leaderboard: rebuilt,
        }))
    }
}

impl<'a, S: State> State for Txn<'a, S> {
    async fn get(&self, key: &Key) -> Result<Option<Value>> {
        Ok(match self.pending.get(key) {
            Some(Status::Update(value)) => Some(value.clone()),
            Some(Status::Delete) => None,
            None => self.state.get(key).await?,
        })
    }

    async fn insert(&mut self, key: Key, value: Value) -> Result<()> {
        self.pending.insert(key, Status::Update(value));
        Ok(())
    }

    async fn delete(&mut self, key: &Key) -> Result<()> {
        self.pending.insert(key.clone(), Status::Delete);
        Ok(())
    }
}
