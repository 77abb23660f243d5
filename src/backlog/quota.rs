use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Declared cost of each remote call, in quota units.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct QuotaCosts {
    pub list: u64,
    pub details: u64,
    pub update: u64,
}

impl Default for QuotaCosts {
    // YouTube Data API v3 unit costs
    fn default() -> Self {
        Self { list: 1, details: 1, update: 50 }
    }
}

/// Run-scoped quota budget shared by every channel worker.
///
/// `reserve` is the single point where `spent` moves; a reservation either
/// fits entirely under the budget or leaves the ledger untouched.
#[derive(Debug)]
pub struct QuotaLedger {
    budget: u64,
    spent: AtomicU64,
    refused: AtomicBool,
}

impl QuotaLedger {
    pub fn new(budget: u64) -> Self {
        Self { budget, spent: AtomicU64::new(0), refused: AtomicBool::new(false) }
    }

    pub fn reserve(&self, cost: u64) -> bool {
        let mut current = self.spent.load(Ordering::Acquire);
        loop {
            let next = match current.checked_add(cost) {
                Some(n) if n <= self.budget => n,
                _ => {
                    self.refused.store(true, Ordering::Release);
                    return false;
                }
            };
            match self.spent.compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    pub fn remaining(&self) -> u64 {
        self.budget.saturating_sub(self.spent())
    }

    pub fn spent(&self) -> u64 {
        self.spent.load(Ordering::Acquire)
    }

    pub fn budget(&self) -> u64 {
        self.budget
    }

    /// True once any reservation was refused, or the remote reported its
    /// own quota exhausted. Later work short-circuits to deferred-quota.
    pub fn is_exhausted(&self) -> bool {
        self.refused.load(Ordering::Acquire)
    }

    pub(crate) fn mark_exhausted(&self) {
        self.refused.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn reserve_is_all_or_nothing() {
        let ledger = QuotaLedger::new(100);
        assert!(ledger.reserve(60));
        assert!(!ledger.reserve(41));
        assert_eq!(ledger.spent(), 60);
        assert_eq!(ledger.remaining(), 40);
        assert!(ledger.is_exhausted());
        assert!(ledger.reserve(40));
        assert_eq!(ledger.remaining(), 0);
        assert!(ledger.reserve(0));
    }

    #[test]
    fn request_above_remaining_is_always_refused() {
        let ledger = QuotaLedger::new(10);
        assert!(!ledger.reserve(11));
        assert_eq!(ledger.spent(), 0);
        assert!(!ledger.reserve(u64::MAX));
        assert_eq!(ledger.spent(), 0);
    }

    #[test]
    fn concurrent_reservations_never_exceed_budget() {
        let budget = 1_000;
        let ledger = Arc::new(QuotaLedger::new(budget));
        let handles: Vec<_> = (0..16)
            .map(|worker| {
                let ledger = Arc::clone(&ledger);
                thread::spawn(move || {
                    let mut accepted = 0u64;
                    for i in 0..200u64 {
                        let cost = 1 + (worker as u64 + i) % 7;
                        if ledger.reserve(cost) {
                            accepted += cost;
                        }
                    }
                    accepted
                })
            })
            .collect();

        let total: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert!(total <= budget);
        assert_eq!(total, ledger.spent());
    }

    #[test]
    fn two_racing_reservations_cannot_both_fit() {
        for _ in 0..200 {
            let ledger = Arc::new(QuotaLedger::new(50));
            let a = { let l = Arc::clone(&ledger); thread::spawn(move || l.reserve(30)) };
            let b = { let l = Arc::clone(&ledger); thread::spawn(move || l.reserve(30)) };
            let (ra, rb) = (a.join().unwrap(), b.join().unwrap());
            assert!(ra ^ rb, "exactly one of two over-budget reservations must win");
            assert_eq!(ledger.spent(), 30);
        }
    }
}
