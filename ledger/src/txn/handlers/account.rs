use greenloop_types::{Account, AccountDelta, Event, Key, UserId, Value};
use tracing::debug;

use crate::identity::ProfileDefaults;
use crate::ledger::LedgerError;
use crate::state::{load_account, load_directory, State};
use crate::txn::Txn;

impl<'a, S: State> Txn<'a, S> {
    /// Return the user's account, creating it from identity defaults if
    /// absent. Creation is idempotent: an existing account is never
    /// overwritten by a repeated call.
    pub(crate) async fn handle_get_or_create(
        &mut self,
        user: &UserId,
        defaults: &ProfileDefaults,
    ) -> Result<(Account, Vec<Event>), LedgerError> {
        if user.is_empty() {
            return Err(LedgerError::MissingUser);
        }

        if let Some(account) = load_account(self, user).await? {
            return Ok((account, Vec::new()));
        }

        let account = Account::new(defaults.display_name.clone(), defaults.email.clone());

        self.insert(Key::Account(user.clone()), Value::Account(account.clone()))
            .await?;

        let mut directory = load_directory(self).await?;
        if directory.insert(user.clone()) {
            self.insert(Key::Directory, Value::Directory(directory))
                .await?;
        }

        debug!(user = %user, name = %account.profile.display_name, "account created");

        let mut events = vec![Event::AccountCreated {
            user: user.clone(),
            account: account.clone(),
        }];
        if let Some(event) = self.refresh_leaderboard().await? {
            events.push(event);
        }

        Ok((account, events))
    }

    /// Apply a three-field delta to the user's account as one unit.
    ///
    /// Underflow clamps at zero (saturating arithmetic); callers that must
    /// not overdraw pre-check inside the same transaction rather than
    /// relying on the clamp.
    pub(crate) async fn handle_apply_delta(
        &mut self,
        user: &UserId,
        delta: &AccountDelta,
    ) -> Result<(Account, Vec<Event>), LedgerError> {
        if user.is_empty() {
            return Err(LedgerError::MissingUser);
        }

        let Some(mut account) = load_account(self, user).await? else {
            return Err(LedgerError::AccountNotFound(user.clone()));
        };

        account.totals.apply(delta);
        self.insert(Key::Account(user.clone()), Value::Account(account.clone()))
            .await?;

        let mut events = vec![Event::AccountChanged {
            user: user.clone(),
            account: account.clone(),
        }];
        if let Some(event) = self.refresh_leaderboard().await? {
            events.push(event);
        }

        Ok((account, events))
    }
}
