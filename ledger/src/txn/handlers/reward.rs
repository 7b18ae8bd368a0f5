use greenloop_types::{
    AccountDelta, Classification, Event, Key, ScanCategory, ScanRecord, UserId, Value,
    SCAN_REWARD_COINS, SCAN_REWARD_POINTS,
};
use tracing::info;

use crate::ledger::LedgerError;
use crate::state::{load_account, load_scan_log, State};
use crate::txn::Txn;

impl<'a, S: State> Txn<'a, S> {
    /// Credit a confirmed scan: fixed point/coin reward, scan counter
    /// bump, and the history append, all staged in one batch so the
    /// account mutation and its record cannot diverge.
    ///
    /// Each call credits unconditionally; there is no idempotency key, so
    /// a retried confirmation credits twice. Clients must only advance
    /// past the confirm step after this returns.
    pub(crate) async fn handle_confirm_scan(
        &mut self,
        user: &UserId,
        classification: &Classification,
    ) -> Result<(ScanRecord, Vec<Event>), LedgerError> {
        if user.is_empty() {
            return Err(LedgerError::MissingUser);
        }
        let Some(top) = classification.top() else {
            return Err(LedgerError::EmptyClassification);
        };

        let Some(mut account) = load_account(self, user).await? else {
            return Err(LedgerError::AccountNotFound(user.clone()));
        };

        account.totals.apply(&AccountDelta::scan_reward());

        let mut log = load_scan_log(self, user).await?;
        let record = log.append(
            top.label.clone(),
            ScanCategory::Recyclable,
            top.confidence_bps,
            SCAN_REWARD_POINTS,
            self.now_ms,
        );

        self.insert(Key::Account(user.clone()), Value::Account(account.clone()))
            .await?;
        self.insert(Key::ScanLog(user.clone()), Value::ScanLog(log))
            .await?;

        info!(
            user = %user,
            item = %record.item_name,
            confidence_bps = record.confidence_bps,
            points = SCAN_REWARD_POINTS,
            coins = SCAN_REWARD_COINS,
            "scan confirmed"
        );

        let mut events = vec![
            Event::AccountChanged {
                user: user.clone(),
                account,
            },
            Event::ScanRecorded {
                user: user.clone(),
                record: record.clone(),
            },
        ];
        if let Some(event) = self.refresh_leaderboard().await? {
            events.push(event);
        }

        Ok((record, events))
    }
}
