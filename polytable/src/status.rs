//! Commit-status reporting for the edit proxy, and the live-counter shape
//! tied to it.
//!
//! An [`Edit`](crate::Edit) dropped without an explicit `commit` commits
//! implicitly, and the only place the outcome can go is a flag. The flag is
//! diagnostic: prefer the boolean returned by `commit`. Choosing the
//! per-thread flag also makes the live counter atomic, for setups where
//! other threads read `len()` while one thread writes.

use core::cell::Cell;
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Live-record counter maintained by tombstoning tables.
pub trait LiveCount: Default {
    fn get(&self) -> usize;
    fn incr(&mut self);
    fn decr(&mut self);
    fn set(&mut self, n: usize);
}

/// Plain counter for single-threaded use.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlainCount(usize);

impl LiveCount for PlainCount {
    #[inline]
    fn get(&self) -> usize {
        self.0
    }

    #[inline]
    fn incr(&mut self) {
        self.0 += 1;
    }

    #[inline]
    fn decr(&mut self) {
        self.0 -= 1;
    }

    #[inline]
    fn set(&mut self, n: usize) {
        self.0 = n;
    }
}

/// Atomic counter, readable from other threads while one thread mutates.
#[derive(Debug, Default)]
pub struct AtomicCount(AtomicUsize);

impl Clone for AtomicCount {
    fn clone(&self) -> Self {
        AtomicCount(AtomicUsize::new(self.0.load(Ordering::Relaxed)))
    }
}

impl LiveCount for AtomicCount {
    #[inline]
    fn get(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }

    #[inline]
    fn incr(&mut self) {
        *self.0.get_mut() += 1;
    }

    #[inline]
    fn decr(&mut self) {
        *self.0.get_mut() -= 1;
    }

    #[inline]
    fn set(&mut self, n: usize) {
        *self.0.get_mut() = n;
    }
}

/// Where implicit edit-proxy commits report their outcome, and which counter
/// the table keeps its live count in.
pub trait StatusFlag {
    type Live: LiveCount;

    fn set(ok: bool);

    /// Outcome of the most recent implicit commit.
    fn get() -> bool;
}

static SHARED_OK: AtomicBool = AtomicBool::new(true);

/// One process-wide flag. The default.
#[derive(Clone, Copy, Debug, Default)]
pub struct SharedStatus;

impl StatusFlag for SharedStatus {
    type Live = PlainCount;

    #[inline]
    fn set(ok: bool) {
        SHARED_OK.store(ok, Ordering::Relaxed);
    }

    #[inline]
    fn get() -> bool {
        SHARED_OK.load(Ordering::Relaxed)
    }
}

thread_local! {
    static THREAD_OK: Cell<bool> = const { Cell::new(true) };
}

/// One flag per thread, plus an atomic live counter.
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadStatus;

impl StatusFlag for ThreadStatus {
    type Live = AtomicCount;

    #[inline]
    fn set(ok: bool) {
        THREAD_OK.with(|flag| flag.set(ok));
    }

    #[inline]
    fn get() -> bool {
        THREAD_OK.with(|flag| flag.get())
    }
}
