use greenloop_types::{
    Account, AccountDelta, Classification, Event, Leaderboard, ScanRecord, UserId, VoucherCatalog,
    VoucherId,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};

use crate::identity::ProfileDefaults;
use crate::state::{load_account, load_leaderboard, load_scan_log, Memory, State};
use crate::txn::{Redemption, Txn};

/// Errors surfaced by ledger operations.
///
/// Ledger-affecting failures are never swallowed: a caller that sees an
/// error must assume the operation did not happen and may retry. Domain
/// rejections leave state untouched.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// No identified user for the requested operation.
    #[error("no authenticated user for ledger operation")]
    MissingUser,

    /// A scan was confirmed without any classification candidate.
    #[error("classification produced no candidates")]
    EmptyClassification,

    /// The target account has not been created yet.
    #[error("account not found: {0}")]
    AccountNotFound(UserId),

    /// The requested voucher is not part of the catalog.
    #[error("unknown voucher: {0}")]
    UnknownVoucher(VoucherId),

    /// Redemption rejected at the atomic decrement instant; no state change.
    #[error("insufficient coins: have {have}, need {need}")]
    InsufficientFunds { have: u64, need: u64 },

    /// The authoritative store failed; the write must not be assumed to
    /// have succeeded.
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Source of server-assigned timestamps (milliseconds since the epoch).
///
/// The ledger clamps per-account timestamps to stay strictly monotonic, so
/// the source only needs to be roughly accurate.
pub trait TimeSource: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// Wall-clock time source.
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Live view handle returned by the subscribe methods.
///
/// The current snapshot is delivered immediately on subscribe, then one
/// message per committed change, in commit order. Dropping the handle
/// unsubscribes; the ledger prunes closed receivers on the next dispatch.
pub struct Subscription<T> {
    rx: mpsc::UnboundedReceiver<T>,
}

impl<T> Subscription<T> {
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Explicitly unsubscribe. Equivalent to dropping the handle.
    pub fn close(&mut self) {
        self.rx.close();
    }
}

struct HistorySubscriber {
    limit: usize,
    tx: mpsc::UnboundedSender<Vec<ScanRecord>>,
}

#[derive(Default)]
struct Subscriptions {
    accounts: HashMap<UserId, Vec<mpsc::UnboundedSender<Account>>>,
    history: HashMap<UserId, Vec<HistorySubscriber>>,
    leaderboard: Vec<mpsc::UnboundedSender<Leaderboard>>,
    events: Vec<mpsc::UnboundedSender<Event>>,
}

impl Subscriptions {
    fn notify_account(&mut self, user: &UserId, account: &Account) {
        if let Some(senders) = self.accounts.get_mut(user) {
            senders.retain(|tx| tx.send(account.clone()).is_ok());
            if senders.is_empty() {
                self.accounts.remove(user);
            }
        }
    }

    fn notify_leaderboard(&mut self, leaderboard: &Leaderboard) {
        self.leaderboard
            .retain(|tx| tx.send(leaderboard.clone()).is_ok());
    }

    fn has_history(&self, user: &UserId) -> bool {
        self.history.get(user).is_some_and(|subs| !subs.is_empty())
    }

    fn notify_history(&mut self, user: &UserId, log: &greenloop_types::ScanLog) {
        if let Some(subs) = self.history.get_mut(user) {
            subs.retain(|sub| sub.tx.send(log.recent(sub.limit)).is_ok());
            if subs.is_empty() {
                self.history.remove(user);
            }
        }
    }

    fn notify_event(&mut self, event: &Event) {
        self.events.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

struct Inner<S> {
    state: S,
    subs: Subscriptions,
}

impl<S: State> Inner<S> {
    /// Fan a committed transaction's events out to subscribers. Runs under
    /// the store lock so delivery order always matches commit order.
    async fn notify(&mut self, events: &[Event]) -> anyhow::Result<()> {
        for event in events {
            self.subs.notify_event(event);
            match event {
                Event::AccountCreated { user, account }
                | Event::AccountChanged { user, account } => {
                    self.subs.notify_account(user, account);
                }
                Event::LeaderboardUpdated { leaderboard } => {
                    self.subs.notify_leaderboard(leaderboard);
                }
                Event::ScanRecorded { user, .. } => {
                    if self.subs.has_history(user) {
                        let log = load_scan_log(&self.state, user).await?;
                        self.subs.notify_history(user, &log);
                    }
                }
                Event::VoucherRedeemed { .. } => {}
            }
        }
        Ok(())
    }
}

/// The account ledger: owns the authoritative store and orders every
/// mutation through an atomic transaction overlay.
///
/// Concurrent sessions (multiple devices, multiple tabs) race on the same
/// account; all counter mutations here are read-modify-write under the
/// store lock, never "read somewhere, write an absolute value back", so
/// concurrent updates cannot be lost. Display reads and subscriptions are
/// eventually consistent with respect to in-flight commits.
pub struct Ledger<S: State> {
    inner: Arc<Mutex<Inner<S>>>,
    catalog: VoucherCatalog,
    clock: Arc<dyn TimeSource>,
}

impl Ledger<Memory> {
    /// In-memory ledger with the default catalog and wall-clock time.
    pub fn in_memory() -> Self {
        Self::new(
            Memory::default(),
            VoucherCatalog::default(),
            Arc::new(SystemTimeSource),
        )
    }
}

impl<S: State> Ledger<S> {
    pub fn new(state: S, catalog: VoucherCatalog, clock: Arc<dyn TimeSource>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state,
                subs: Subscriptions::default(),
            })),
            catalog,
            clock,
        }
    }

    pub fn catalog(&self) -> &VoucherCatalog {
        &self.catalog
    }

    /// Return the user's account, creating it from identity defaults on
    /// first sign-in. Idempotent: repeated calls never overwrite.
    pub async fn get_or_create(
        &self,
        user: &UserId,
        defaults: &ProfileDefaults,
    ) -> Result<Account, LedgerError> {
        let mut inner = self.inner.lock().await;
        let now_ms = self.clock.now_ms();
        let (account, events) = {
            let mut txn = Txn::new(&inner.state, now_ms);
            let (account, events) = txn.handle_get_or_create(user, defaults).await?;
            let changes = txn.commit();
            inner.state.apply(changes).await?;
            (account, events)
        };
        inner.notify(&events).await?;
        Ok(account)
    }

    /// Atomically apply a points/coins/scans delta to one account. All
    /// three fields change together or not at all.
    pub async fn apply_delta(
        &self,
        user: &UserId,
        delta: AccountDelta,
    ) -> Result<Account, LedgerError> {
        let mut inner = self.inner.lock().await;
        let now_ms = self.clock.now_ms();
        let (account, events) = {
            let mut txn = Txn::new(&inner.state, now_ms);
            let (account, events) = txn.handle_apply_delta(user, &delta).await?;
            let changes = txn.commit();
            inner.state.apply(changes).await?;
            (account, events)
        };
        inner.notify(&events).await?;
        Ok(account)
    }

    /// Credit a confirmed scan and append its history record as one unit.
    ///
    /// Rejects before any mutation when the user is missing or the
    /// classification is empty. Credits unconditionally otherwise: there is
    /// no idempotency key, so callers must not resubmit a confirmation that
    /// already returned successfully.
    pub async fn confirm_scan(
        &self,
        user: &UserId,
        classification: &Classification,
    ) -> Result<ScanRecord, LedgerError> {
        let mut inner = self.inner.lock().await;
        let now_ms = self.clock.now_ms();
        let (record, events) = {
            let mut txn = Txn::new(&inner.state, now_ms);
            let (record, events) = txn.handle_confirm_scan(user, classification).await?;
            let changes = txn.commit();
            inner.state.apply(changes).await?;
            (record, events)
        };
        inner.notify(&events).await?;
        Ok(record)
    }

    /// Redeem a catalog voucher, re-checking the balance at the atomic
    /// decrement instant.
    pub async fn redeem(
        &self,
        user: &UserId,
        voucher_id: VoucherId,
    ) -> Result<Redemption, LedgerError> {
        let mut inner = self.inner.lock().await;
        let now_ms = self.clock.now_ms();
        let (redemption, events) = {
            let mut txn = Txn::new(&inner.state, now_ms);
            let (redemption, events) =
                txn.handle_redeem(user, voucher_id, &self.catalog).await?;
            let changes = txn.commit();
            inner.state.apply(changes).await?;
            (redemption, events)
        };
        inner.notify(&events).await?;
        Ok(redemption)
    }

    /// Current account state, if the account exists.
    pub async fn account(&self, user: &UserId) -> Result<Option<Account>, LedgerError> {
        let inner = self.inner.lock().await;
        Ok(load_account(&inner.state, user).await?)
    }

    /// The most recent `limit` scan records, timestamp descending. An
    /// account with no history yields an empty vec, not an error.
    pub async fn recent_scans(
        &self,
        user: &UserId,
        limit: usize,
    ) -> Result<Vec<ScanRecord>, LedgerError> {
        let inner = self.inner.lock().await;
        let log = load_scan_log(&inner.state, user).await?;
        Ok(log.recent(limit))
    }

    /// Current global ranking.
    pub async fn leaderboard(&self) -> Result<Leaderboard, LedgerError> {
        let inner = self.inner.lock().await;
        Ok(load_leaderboard(&inner.state).await?)
    }

    /// Live view of one account. Emits the current state immediately if
    /// the account exists, then every committed change.
    pub async fn subscribe_account(
        &self,
        user: &UserId,
    ) -> Result<Subscription<Account>, LedgerError> {
        let mut inner = self.inner.lock().await;
        let current = load_account(&inner.state, user).await?;
        let (tx, rx) = mpsc::unbounded_channel();
        if let Some(account) = current {
            let _ = tx.send(account);
        }
        inner.subs.accounts.entry(user.clone()).or_default().push(tx);
        Ok(Subscription { rx })
    }

    /// Live view of the global ranking. Emits the current ranking
    /// immediately, then every change (an unchanged recompute emits
    /// nothing).
    pub async fn subscribe_leaderboard(&self) -> Result<Subscription<Leaderboard>, LedgerError> {
        let mut inner = self.inner.lock().await;
        let current = load_leaderboard(&inner.state).await?;
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(current);
        inner.subs.leaderboard.push(tx);
        Ok(Subscription { rx })
    }

    /// Live view of one account's recent history window.
    pub async fn subscribe_history(
        &self,
        user: &UserId,
        limit: usize,
    ) -> Result<Subscription<Vec<ScanRecord>>, LedgerError> {
        let mut inner = self.inner.lock().await;
        let log = load_scan_log(&inner.state, user).await?;
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(log.recent(limit));
        inner
            .subs
            .history
            .entry(user.clone())
            .or_default()
            .push(HistorySubscriber { limit, tx });
        Ok(Subscription { rx })
    }

    /// Raw event tap: every committed event, in commit order. Used by
    /// services that fan changes out to clients.
    pub async fn subscribe_events(&self) -> Subscription<Event> {
        let mut inner = self.inner.lock().await;
        let (tx, rx) = mpsc::unbounded_channel();
        inner.subs.events.push(tx);
        Subscription { rx }
    }
}
