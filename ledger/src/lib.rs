//! Greenloop account ledger.
//!
//! This crate owns the authoritative per-user state (points, coins, scan
//! count), the append-only scan history, and the derived global leaderboard,
//! and keeps them consistent under concurrent access from multiple
//! devices/sessions of the same user.
//!
//! ## Consistency requirements
//! - Every counter mutation is an atomic read-modify-write through the
//!   transaction overlay ([`Txn`]); absolute-value writes are never exposed,
//!   so concurrent updates cannot be silently lost.
//! - A confirmed scan commits the account credit and its history record as
//!   one batch; neither can land without the other.
//! - Coin balances never go negative: spends pre-check the balance inside
//!   the atomic section, and the delta arithmetic clamps at zero besides.
//! - Confirmation carries no idempotency key: a resubmitted confirmation
//!   credits again. Callers must not retry a call that returned
//!   successfully.
//!
//! Subscriptions deliver snapshots in commit order and are eventually
//! consistent with respect to in-flight commits.

mod classifier;
mod identity;
mod ledger;
mod state;
mod txn;

#[cfg(any(test, feature = "mocks"))]
pub mod mocks;

#[cfg(test)]
mod concurrency_tests;
#[cfg(test)]
mod durability_tests;

pub use classifier::{Classifier, ClassifierError, ImageFrame};
pub use identity::{AuthUser, IdentityError, IdentityProvider, ProfileDefaults};
pub use ledger::{Ledger, LedgerError, Subscription, SystemTimeSource, TimeSource};
pub use state::{Adb, Memory, State, Status};
pub use txn::{Redemption, Txn};
