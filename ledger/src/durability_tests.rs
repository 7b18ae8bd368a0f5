//! The persistent store and the in-memory store must be interchangeable:
//! the same operation sequence yields identical ledger state on both.

#[cfg(test)]
mod tests {
    use crate::ledger::Ledger;
    use crate::mocks::{classification, create_adb, defaults, test_user, ManualTime};
    use crate::state::{Memory, State};
    use commonware_runtime::deterministic::Runner;
    use commonware_runtime::Runner as _;
    use greenloop_types::{VoucherCatalog, VoucherId, SCAN_REWARD_COINS, SCAN_REWARD_POINTS};
    use std::sync::Arc;

    async fn drive<S: State>(ledger: &Ledger<S>) {
        let alice = test_user(1);
        let bob = test_user(2);

        ledger.get_or_create(&alice, &defaults("Alice")).await.unwrap();
        ledger.get_or_create(&bob, &defaults("Bob")).await.unwrap();

        for _ in 0..10 {
            ledger
                .confirm_scan(&alice, &classification("plastic bottle", 0.9))
                .await
                .unwrap();
        }
        ledger
            .confirm_scan(&bob, &classification("aluminum can", 0.8))
            .await
            .unwrap();
        ledger.redeem(&alice, VoucherId(1)).await.unwrap();
    }

    #[test]
    fn adb_store_holds_committed_ledger_state() {
        let executor = Runner::default();
        executor.start(|context| async move {
            let state = create_adb(&context).await;
            let ledger = Ledger::new(
                state,
                VoucherCatalog::default(),
                Arc::new(ManualTime::new(1_000)),
            );
            drive(&ledger).await;

            let alice = ledger.account(&test_user(1)).await.unwrap().unwrap();
            assert_eq!(alice.totals.points, SCAN_REWARD_POINTS * 10);
            assert_eq!(alice.totals.coins, SCAN_REWARD_COINS * 10 - 50);
            assert_eq!(alice.totals.scans, 10);

            let history = ledger.recent_scans(&test_user(1), 100).await.unwrap();
            assert_eq!(history.len(), 10);

            let leaderboard = ledger.leaderboard().await.unwrap();
            assert_eq!(leaderboard.entries.len(), 2);
            assert_eq!(leaderboard.entries[0].display_name, "Alice");
        });
    }

    #[test]
    fn adb_and_memory_stores_agree() {
        let executor = Runner::default();
        executor.start(|context| async move {
            let adb_ledger = Ledger::new(
                create_adb(&context).await,
                VoucherCatalog::default(),
                Arc::new(ManualTime::new(1_000)),
            );
            let memory_ledger = Ledger::new(
                Memory::default(),
                VoucherCatalog::default(),
                Arc::new(ManualTime::new(1_000)),
            );

            drive(&adb_ledger).await;
            drive(&memory_ledger).await;

            for user in [test_user(1), test_user(2)] {
                assert_eq!(
                    adb_ledger.account(&user).await.unwrap(),
                    memory_ledger.account(&user).await.unwrap()
                );
                assert_eq!(
                    adb_ledger.recent_scans(&user, 100).await.unwrap(),
                    memory_ledger.recent_scans(&user, 100).await.unwrap()
                );
            }
            assert_eq!(
                adb_ledger.leaderboard().await.unwrap(),
                memory_ledger.leaderboard().await.unwrap()
            );
        });
    }
}
