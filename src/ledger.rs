//! Lives Ledger.
//!
//! Holds the client's copy of the lives balance. The store owns the counter
//! and its replenishment; the ledger only reads it, refuses a decrement it
//! already knows would fail, and adopts whatever count the store returns.

use tracing::{debug, warn};

use crate::core::LivesBalance;
use crate::error::{LessonGateError, Result};
use crate::store::ProgressStore;

/// Lives Ledger for the signed-in user.
#[derive(Debug)]
pub struct LivesLedger<S: ProgressStore> {
    store: S,
    balance: Option<LivesBalance>,
}

impl<S: ProgressStore> LivesLedger<S> {
    /// Create a ledger with no balance loaded.
    pub fn new(store: S) -> Self {
        Self {
            store,
            balance: None,
        }
    }

    /// Balance currently displayed, if one was loaded.
    pub fn balance(&self) -> Option<LivesBalance> {
        self.balance
    }

    /// Read the balance from the store and adopt it.
    ///
    /// This is the only way a store-side reset becomes visible.
    pub fn get_balance(&mut self) -> Result<LivesBalance> {
        let record = self.store.lives().map_err(|e| match e {
            LessonGateError::AuthRequired => e,
            other => LessonGateError::transient_fetch("lives", other.to_string()),
        })?;
        let balance = LivesBalance::from_store(
            record.current_lives,
            record.max_lives,
            record.last_reset_date,
        )?;
        debug!(balance = %balance, "lives balance loaded");
        self.balance = Some(balance);
        Ok(balance)
    }

    /// Spend one life.
    ///
    /// Fails with `Exhausted` without contacting the store when the held
    /// balance is zero. On success the held balance becomes the store's
    /// remaining count. On failure the held balance is left as it was.
    pub fn use_life(&mut self) -> Result<u32> {
        let held = match self.balance {
            Some(balance) => balance,
            None => self.get_balance()?,
        };
        if held.is_exhausted() {
            return Err(LessonGateError::Exhausted { max: held.max });
        }

        let receipt = match self.store.use_life() {
            Ok(receipt) => receipt,
            Err(LessonGateError::Exhausted { .. }) => {
                debug!(held = %held, "store refused the decrement, balance already spent");
                return Err(LessonGateError::Exhausted { max: held.max });
            }
            Err(e) => {
                warn!(error = %e, "use_life failed, keeping displayed balance");
                return Err(e);
            }
        };

        // The decrement already happened; a bad maximum must not hide it
        let max = match u32::try_from(receipt.max_lives) {
            Ok(max) if max > 0 => max,
            _ => {
                warn!(
                    max = receipt.max_lives,
                    "store returned an invalid lives maximum, keeping the held one"
                );
                held.max
            }
        };
        let balance =
            LivesBalance::from_store(receipt.remaining_lives, i64::from(max), held.last_reset)?;
        self.balance = Some(balance);
        Ok(balance.current)
    }

    /// Whether the start action should be enabled.
    ///
    /// An unknown balance does not block; the store has the final word.
    pub fn can_start(&self) -> bool {
        self.balance.is_none_or(|b| !b.is_exhausted())
    }

    /// Inline message for a disabled start action.
    pub fn blocked_message(&self) -> Option<String> {
        self.balance
            .filter(LivesBalance::is_exhausted)
            .map(|b| LessonGateError::Exhausted { max: b.max }.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TopicCatalog;
    use crate::store::MemoryProgressStore;
    use std::sync::Arc;

    type Ledger = LivesLedger<Arc<MemoryProgressStore>>;

    fn ledger_with(current: i64, max: i64) -> (Ledger, Arc<MemoryProgressStore>) {
        let store = Arc::new(MemoryProgressStore::new(TopicCatalog::new()));
        store.set_lives(current, max);
        (LivesLedger::new(Arc::clone(&store)), store)
    }

    #[test]
    fn test_get_balance() {
        let (mut ledger, _store) = ledger_with(2, 3);
        assert!(ledger.balance().is_none());

        let balance = ledger.get_balance().unwrap();
        assert_eq!(balance.current, 2);
        assert_eq!(balance.max, 3);
        assert_eq!(ledger.balance(), Some(balance));
    }

    #[test]
    fn test_exhausted_balance_fails_without_request() {
        let (mut ledger, store) = ledger_with(0, 3);
        ledger.get_balance().unwrap();
        // A request would now succeed; the ledger must not send it
        store.set_lives(3, 3);

        let err = ledger.use_life().unwrap_err();
        assert!(matches!(err, LessonGateError::Exhausted { max: 3 }));
        assert!(err.is_user_facing());
        assert_eq!(ledger.balance().unwrap().to_string(), "0/3");
        assert_eq!(store.lives_record().current_lives, 3);
    }

    #[test]
    fn test_use_life_adopts_store_count() {
        let (mut ledger, store) = ledger_with(2, 3);
        ledger.get_balance().unwrap();

        assert_eq!(ledger.use_life().unwrap(), 1);
        assert_eq!(ledger.balance().unwrap().to_string(), "1/3");
        assert_eq!(store.lives_record().current_lives, 1);
    }

    #[test]
    fn test_use_life_adopts_concurrent_reset() {
        let (mut ledger, store) = ledger_with(1, 3);
        ledger.get_balance().unwrap();
        store.reset_before_next_use();

        // Store reset to 3 before decrementing: remaining is 2, not 0
        assert_eq!(ledger.use_life().unwrap(), 2);
        assert_eq!(ledger.balance().unwrap().current, 2);
    }

    #[test]
    fn test_use_life_loads_balance_first() {
        let (mut ledger, _store) = ledger_with(3, 3);
        assert_eq!(ledger.use_life().unwrap(), 2);
    }

    #[test]
    fn test_stale_balance_store_refusal() {
        let (mut ledger, store) = ledger_with(1, 3);
        ledger.get_balance().unwrap();
        // Spent elsewhere since the last read
        store.set_lives(0, 3);

        assert!(matches!(
            ledger.use_life(),
            Err(LessonGateError::Exhausted { max: 3 })
        ));
        assert_eq!(ledger.balance().unwrap().current, 1);
    }

    #[test]
    fn test_failed_use_life_keeps_balance() {
        let (mut ledger, store) = ledger_with(2, 3);
        ledger.get_balance().unwrap();
        store.fail_lives(true);

        assert!(ledger.use_life().is_err());
        assert_eq!(ledger.balance().unwrap().current, 2);
    }

    #[test]
    fn test_lives_read_failure_is_transient() {
        let (mut ledger, store) = ledger_with(2, 3);
        store.fail_lives(true);
        let err = ledger.get_balance().unwrap_err();
        assert!(err.is_retryable());
        assert!(ledger.balance().is_none());
    }

    #[test]
    fn test_reset_visible_only_after_refresh() {
        let (mut ledger, store) = ledger_with(0, 3);
        ledger.get_balance().unwrap();
        store.reset_lives();
        assert!(!ledger.can_start());

        ledger.get_balance().unwrap();
        assert!(ledger.can_start());
        assert_eq!(ledger.balance().unwrap().current, 3);
    }

    #[test]
    fn test_can_start_and_message() {
        let (mut ledger, _store) = ledger_with(0, 3);
        assert!(ledger.can_start());
        assert!(ledger.blocked_message().is_none());

        ledger.get_balance().unwrap();
        assert!(!ledger.can_start());
        let message = ledger.blocked_message().unwrap();
        assert!(message.contains("0/3"));
    }

    #[test]
    fn test_use_life_keeps_held_max_when_receipt_max_invalid() {
        let (mut ledger, store) = ledger_with(2, 3);
        ledger.get_balance().unwrap();
        store.set_lives(2, 0);

        assert_eq!(ledger.use_life().unwrap(), 1);
        assert_eq!(ledger.balance().unwrap().to_string(), "1/3");
        assert_eq!(store.lives_record().current_lives, 1);
    }

    #[test]
    fn test_invalid_store_max_rejected() {
        let (mut ledger, _store) = ledger_with(0, 0);
        assert!(ledger.get_balance().is_err());
        assert!(ledger.balance().is_none());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            Use,
            Refresh,
            StoreReset,
        }

        fn arb_op() -> impl Strategy<Value = Op> {
            prop_oneof![
                4 => Just(Op::Use),
                1 => Just(Op::Refresh),
                1 => Just(Op::StoreReset),
            ]
        }

        proptest! {
            // Property: the held balance stays within [0, max] and a refused
            // decrement leaves it untouched
            #[test]
            fn prop_balance_stays_bounded(
                max in 1i64..6,
                start in 0i64..6,
                ops in proptest::collection::vec(arb_op(), 1..30),
            ) {
                let (mut ledger, store) = ledger_with(start.min(max), max);
                ledger.get_balance().unwrap();

                for op in ops {
                    let before = ledger.balance().unwrap();
                    match op {
                        Op::Use => match ledger.use_life() {
                            Ok(remaining) => {
                                let stored = store.lives_record().current_lives;
                                prop_assert_eq!(i64::from(remaining), stored);
                            }
                            Err(_) => prop_assert_eq!(ledger.balance().unwrap(), before),
                        },
                        Op::Refresh => {
                            ledger.get_balance().unwrap();
                        }
                        Op::StoreReset => store.reset_lives(),
                    }
                    let after = ledger.balance().unwrap();
                    prop_assert!(after.current <= after.max);
                    prop_assert_eq!(i64::from(after.max), max);
                }
            }
        }
    }
}
