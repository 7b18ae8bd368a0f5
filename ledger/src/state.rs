use anyhow::{Context as _, Result};
use commonware_codec::Encode;
use commonware_cryptography::{
    sha256::{Digest, Sha256},
    Hasher,
};
use commonware_runtime::{Clock, Metrics, Spawner, Storage};
use commonware_storage::adb::any::variable::Any as AnyAdb;
use commonware_storage::translator::Translator;
use greenloop_types::{Account, AccountDirectory, Key, Leaderboard, ScanLog, UserId, Value};
use std::{collections::HashMap, future::Future};

pub type Adb<E, T> = AnyAdb<E, Digest, Value, Sha256, T>;

/// The authoritative store contract.
///
/// Implementations only need point reads and writes; atomicity across keys
/// is provided by the transaction overlay committing a whole batch through
/// [`State::apply`] while the ledger holds its store lock.
pub trait State {
    fn get(&self, key: &Key) -> impl Future<Output = Result<Option<Value>>>;
    fn insert(&mut self, key: Key, value: Value) -> impl Future<Output = Result<()>>;
    fn delete(&mut self, key: &Key) -> impl Future<Output = Result<()>>;

    fn apply(&mut self, changes: Vec<(Key, Status)>) -> impl Future<Output = Result<()>> {
        async {
            for (key, status) in changes {
                match status {
                    Status::Update(value) => self.insert(key, value).await?,
                    Status::Delete => self.delete(&key).await?,
                }
            }
            Ok(())
        }
    }
}

/// A pending write against the store.
#[derive(Clone, Debug, PartialEq, Eq)]
#[allow(clippy::large_enum_variant)]
pub enum Status {
    Update(Value),
    Delete,
}

impl<E: Spawner + Metrics + Clock + Storage, T: Translator> State for Adb<E, T> {
    async fn get(&self, key: &Key) -> Result<Option<Value>> {
        let key_hash = Sha256::hash(&key.encode());
        AnyAdb::get(self, &key_hash).await.context("adb get")
    }

    async fn insert(&mut self, key: Key, value: Value) -> Result<()> {
        let key_hash = Sha256::hash(&key.encode());
        self.update(key_hash, value).await.context("adb update")?;
        Ok(())
    }

    async fn delete(&mut self, key: &Key) -> Result<()> {
        let key_hash = Sha256::hash(&key.encode());
        AnyAdb::delete(self, key_hash).await.context("adb delete")?;
        Ok(())
    }
}

/// In-memory store: the substitutable fake for tests and the default
/// backend for single-process deployments.
#[derive(Default)]
pub struct Memory {
    state: HashMap<Key, Value>,
}

impl State for Memory {
    async fn get(&self, key: &Key) -> Result<Option<Value>> {
        Ok(self.state.get(key).cloned())
    }

    async fn insert(&mut self, key: Key, value: Value) -> Result<()> {
        self.state.insert(key, value);
        Ok(())
    }

    async fn delete(&mut self, key: &Key) -> Result<()> {
        self.state.remove(key);
        Ok(())
    }
}

pub(crate) async fn load_account<S: State>(state: &S, user: &UserId) -> Result<Option<Account>> {
    Ok(match state.get(&Key::Account(user.clone())).await? {
        Some(Value::Account(account)) => Some(account),
        _ => None,
    })
}

pub(crate) async fn load_scan_log<S: State>(state: &S, user: &UserId) -> Result<ScanLog> {
    Ok(match state.get(&Key::ScanLog(user.clone())).await? {
        Some(Value::ScanLog(log)) => log,
        _ => ScanLog::default(),
    })
}

pub(crate) async fn load_leaderboard<S: State>(state: &S) -> Result<Leaderboard> {
    Ok(match state.get(&Key::Leaderboard).await? {
        Some(Value::Leaderboard(leaderboard)) => leaderboard,
        _ => Leaderboard::default(),
    })
}

pub(crate) async fn load_directory<S: State>(state: &S) -> Result<AccountDirectory> {
    Ok(match state.get(&Key::Directory).await? {
        Some(Value::Directory(directory)) => directory,
        _ => AccountDirectory::default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use greenloop_types::AccountDelta;

    #[tokio::test]
    async fn memory_store_round_trips_values() {
        let mut state = Memory::default();
        let user = UserId::from("uid-1");

        assert!(load_account(&state, &user).await.unwrap().is_none());

        let mut account = Account::new("Alice".into(), "alice@example.com".into());
        account.totals.apply(&AccountDelta::scan_reward());
        state
            .insert(Key::Account(user.clone()), Value::Account(account.clone()))
            .await
            .unwrap();

        assert_eq!(load_account(&state, &user).await.unwrap(), Some(account));

        state.delete(&Key::Account(user.clone())).await.unwrap();
        assert!(load_account(&state, &user).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn apply_commits_updates_and_deletes() {
        let mut state = Memory::default();
        let user = UserId::from("uid-1");
        let account = Account::new("Alice".into(), "alice@example.com".into());

        state
            .apply(vec![
                (
                    Key::Account(user.clone()),
                    Status::Update(Value::Account(account.clone())),
                ),
                (Key::Leaderboard, Status::Update(Value::Leaderboard(Leaderboard::default()))),
            ])
            .await
            .unwrap();
        assert_eq!(load_account(&state, &user).await.unwrap(), Some(account));

        state
            .apply(vec![(Key::Account(user.clone()), Status::Delete)])
            .await
            .unwrap();
        assert!(load_account(&state, &user).await.unwrap().is_none());
    }
}
