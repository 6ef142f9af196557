//! Unus replay tracker.
//!
//! Each Unus is folded into a `u64` and remembered in an insertion-ordered,
//! bounded set.  Once the set is full the oldest entry is evicted, so replay
//! protection covers the most recent `UNUS_TRACKER_CAPACITY` distinct values
//! seen by this tracker and no more.
//!
//! State lives only in memory.  One tracker belongs to one Issuer validation
//! context; share it with `Arc` when several parsers serve the same Issuer.

use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};

use crate::constants::{UNUS_FOLD_OFFSET, UNUS_TRACKER_CAPACITY};

/// Fold Unus bytes into 64 bits.
///
/// Byte `i` is XORed in after shifting left by `3 * i` bits (shift taken
/// mod 64, so long inputs wrap onto themselves).  A 16-byte Unus reaches
/// bits 45..=52.  The offset only fixes the width of the decimal form.
///
/// This is a weak digest; distinct values can collide, which shows up as a
/// false reuse.  The exact algorithm is kept for cross-implementation
/// agreement.
pub fn fold_unus(unus: &[u8]) -> u64 {
    let folded = unus
        .iter()
        .enumerate()
        .fold(0u64, |acc, (i, &b)| acc ^ u64::from(b).wrapping_shl((i * 3) as u32));
    folded.wrapping_add(UNUS_FOLD_OFFSET)
}

#[derive(Debug, Default)]
struct Seen {
    order: VecDeque<u64>,
    members: HashSet<u64>,
}

/// Bounded FIFO set of recently seen Unus values.
#[derive(Debug)]
pub struct UnusTracker {
    capacity: usize,
    seen: Mutex<Seen>,
}

impl Default for UnusTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl UnusTracker {
    pub fn new() -> Self {
        Self::with_capacity(UNUS_TRACKER_CAPACITY)
    }

    /// A tracker remembering at most `capacity` values (minimum 1).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            seen: Mutex::new(Seen::default()),
        }
    }

    /// Report whether `unus` was seen before; record it if not.
    ///
    /// Check and insert happen under one lock, so two concurrent callers
    /// can never both see the same value as fresh.  A reused value is not
    /// re-inserted and its age is not refreshed.
    pub fn is_reused(&self, unus: &[u8]) -> bool {
        let key = fold_unus(unus);
        let mut seen = self.lock();

        if seen.members.contains(&key) {
            return true;
        }

        seen.order.push_back(key);
        seen.members.insert(key);
        while seen.order.len() > self.capacity {
            if let Some(eldest) = seen.order.pop_front() {
                seen.members.remove(&eldest);
            }
        }
        false
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of values currently remembered.
    pub fn len(&self) -> usize {
        self.lock().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // The set is consistent between statements, so a poisoned lock is
    // still safe to use.
    fn lock(&self) -> MutexGuard<'_, Seen> {
        self.seen.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
