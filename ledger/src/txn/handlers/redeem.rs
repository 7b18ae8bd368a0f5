use greenloop_types::{AccountDelta, Event, Key, UserId, Value, Voucher, VoucherCatalog, VoucherId};
use tracing::{debug, info};

use crate::ledger::LedgerError;
use crate::state::{load_account, State};
use crate::txn::Txn;

/// Outcome of a successful voucher redemption.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Redemption {
    pub voucher: Voucher,
    pub new_coins: u64,
}

impl<'a, S: State> Txn<'a, S> {
    /// Spend coins against a catalog voucher.
    ///
    /// The balance is re-read here, inside the atomic section, never from a
    /// value cached earlier in a session: two racing redemptions that would
    /// jointly overdraw see exactly one success. Rejection leaves state
    /// untouched.
    pub(crate) async fn handle_redeem(
        &mut self,
        user: &UserId,
        voucher_id: VoucherId,
        catalog: &VoucherCatalog,
    ) -> Result<(Redemption, Vec<Event>), LedgerError> {
        if user.is_empty() {
            return Err(LedgerError::MissingUser);
        }
        let Some(voucher) = catalog.get(voucher_id) else {
            return Err(LedgerError::UnknownVoucher(voucher_id));
        };

        let Some(mut account) = load_account(self, user).await? else {
            return Err(LedgerError::AccountNotFound(user.clone()));
        };

        if account.totals.coins < voucher.cost {
            debug!(
                user = %user,
                voucher = %voucher_id,
                have = account.totals.coins,
                need = voucher.cost,
                "redemption rejected"
            );
            return Err(LedgerError::InsufficientFunds {
                have: account.totals.coins,
                need: voucher.cost,
            });
        }

        account.totals.apply(&AccountDelta::spend_coins(voucher.cost));
        self.insert(Key::Account(user.clone()), Value::Account(account.clone()))
            .await?;

        info!(
            user = %user,
            voucher = %voucher_id,
            cost = voucher.cost,
            new_coins = account.totals.coins,
            "voucher redeemed"
        );

        let mut events = vec![
            Event::AccountChanged {
                user: user.clone(),
                account: account.clone(),
            },
            Event::VoucherRedeemed {
                user: user.clone(),
                voucher: voucher_id,
                cost: voucher.cost,
                new_coins: account.totals.coins,
            },
        ];
        if let Some(event) = self.refresh_leaderboard().await? {
            events.push(event);
        }

        Ok((
            Redemption {
                voucher: voucher.clone(),
                new_coins: account.totals.coins,
            },
            events,
        ))
    }
}
