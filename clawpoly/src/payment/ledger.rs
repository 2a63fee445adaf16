//! Bounded record of accepted payment nonces.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use alloy_primitives::B256;

/// Ledger capacity before eviction kicks in.
pub const DEFAULT_CAPACITY: usize = 10_000;

/// How many of the oldest nonces are dropped when the cap is exceeded.
pub const DEFAULT_EVICTION: usize = 5_000;

#[derive(Debug, Default)]
struct LedgerState {
    seen: HashSet<B256>,
    order: VecDeque<B256>,
}

/// Set of accepted nonces, evicting oldest-first past its capacity.
///
/// Cheap to clone; clones share the same set. An evicted nonce can be
/// accepted again, which bounds memory at the cost of a replay window for
/// very old authorizations whose `validBefore` has not yet passed.
#[derive(Debug, Clone)]
pub struct NonceLedger {
    state: Arc<Mutex<LedgerState>>,
    capacity: usize,
    eviction: usize,
}

impl Default for NonceLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl NonceLedger {
    /// A ledger holding up to 10 000 nonces.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY, DEFAULT_EVICTION)
    }

    /// A ledger with a custom cap and eviction batch.
    #[must_use]
    pub fn with_capacity(capacity: usize, eviction: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(LedgerState::default())),
            capacity,
            eviction: eviction.clamp(1, capacity.max(1)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether `nonce` has been accepted and not yet evicted.
    #[must_use]
    pub fn contains(&self, nonce: &B256) -> bool {
        self.lock().seen.contains(nonce)
    }

    /// Records `nonce`. Returns `false` if it was already present, in which
    /// case nothing changes.
    pub fn accept(&self, nonce: B256) -> bool {
        let mut state = self.lock();
        if !state.seen.insert(nonce) {
            return false;
        }
        state.order.push_back(nonce);
        if state.seen.len() > self.capacity {
            let evict = self.eviction.min(state.order.len());
            let evicted: Vec<B256> = state.order.drain(..evict).collect();
            for old in &evicted {
                state.seen.remove(old);
            }
            #[cfg(feature = "telemetry")]
            tracing::debug!(evicted = evicted.len(), "nonce ledger over capacity, evicted oldest");
        }
        true
    }

    /// Number of nonces held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().seen.len()
    }

    /// Whether the ledger is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nonce(n: u8) -> B256 {
        B256::repeat_byte(n)
    }

    #[test]
    fn test_accept_once() {
        let ledger = NonceLedger::new();
        assert!(ledger.accept(nonce(1)));
        assert!(!ledger.accept(nonce(1)));
        assert!(ledger.contains(&nonce(1)));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_oldest_half_evicted_past_capacity() {
        let ledger = NonceLedger::with_capacity(4, 2);
        for n in 1..=4 {
            assert!(ledger.accept(nonce(n)));
        }
        assert_eq!(ledger.len(), 4);
        assert!(ledger.accept(nonce(5)));
        assert_eq!(ledger.len(), 3);
        assert!(!ledger.contains(&nonce(1)));
        assert!(!ledger.contains(&nonce(2)));
        assert!(ledger.contains(&nonce(3)));
        assert!(ledger.contains(&nonce(5)));
        // evicted nonces become acceptable again
        assert!(ledger.accept(nonce(1)));
    }

    #[test]
    fn test_concurrent_duplicate_accepted_once() {
        let ledger = NonceLedger::new();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ledger = ledger.clone();
                std::thread::spawn(move || ledger.accept(nonce(9)))
            })
            .collect();
        let wins = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|accepted| *accepted)
            .count();
        assert_eq!(wins, 1);
    }
}
