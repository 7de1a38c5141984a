//! The per-sentence lock primitive backing `WRITE_LOCK`/`WRITE_UNLOCK`.
//!
//! Unlike `FLOCK`/`SLOCK`, a sentence lock never blocks a caller: a
//! contended `WRITE_LOCK` fails fast with `FILE_LOCKED` rather than
//! queuing, matching spec.md §4.7. That non-blocking property is also what
//! keeps the `FLOCK → SLOCK → sentence.mutex` hierarchy safe even though a
//! `WRITE` session holds its sentence lock across several request/response
//! round trips: a thread holding `FLOCK`/`SLOCK` for an unrelated commit can
//! never deadlock against it, since acquiring it is a single
//! compare-and-swap that either succeeds immediately or reports contention.

use std::sync::atomic::{AtomicBool, Ordering};

/// A single sentence's write lock.
#[derive(Default)]
pub struct SentenceLock {
    held: AtomicBool,
}

impl SentenceLock {
    /// Attempts to acquire the lock, returning `true` on success.
    #[must_use]
    pub fn try_acquire(&self) -> bool {
        self.held
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Releases the lock. A no-op if it was not held.
    pub fn release(&self) {
        self.held.store(false, Ordering::SeqCst);
    }

    /// Whether the lock is currently held by anyone.
    #[must_use]
    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails_until_released() {
        let lock = SentenceLock::default();
        assert!(lock.try_acquire());
        assert!(!lock.try_acquire());
        lock.release();
        assert!(lock.try_acquire());
    }
}
