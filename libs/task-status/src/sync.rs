// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use core::hint;
use core::sync::atomic::{AtomicBool, Ordering};

/// The raw lock guarding a task's status record chain.
///
/// This is a test-and-test-and-set spin lock with exponential backoff. Critical sections are
/// short (linking or unlinking a record, splicing a child list) except when cancellation or
/// escalation callbacks run, which happens *while the lock is held* so that unregistering a
/// callback record waits for any in-flight invocation of it.
pub struct RawStatusLock {
    lock: AtomicBool,
}

// Safety: `lock` only returns once the flag transitioned from `false` to `true` with `Acquire`
// ordering and `unlock` publishes with `Release`, so at most one guard exists at a time.
unsafe impl lock_api::RawMutex for RawStatusLock {
    type GuardMarker = lock_api::GuardSend;

    const INIT: Self = Self {
        lock: AtomicBool::new(false),
    };

    fn lock(&self) {
        let mut boff = Backoff::new();
        while self
            .lock
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            while self.is_locked() {
                boff.spin();
            }
        }
    }

    fn try_lock(&self) -> bool {
        self.lock
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    unsafe fn unlock(&self) {
        self.lock.store(false, Ordering::Release);
    }

    fn is_locked(&self) -> bool {
        self.lock.load(Ordering::Relaxed)
    }
}

/// An exponential backoff for spin loops, capped at 2^8 spins per round.
#[derive(Debug, Copy, Clone)]
struct Backoff {
    exp: u8,
}

impl Backoff {
    const MAX_EXPONENT: u8 = 8;

    const fn new() -> Self {
        Self { exp: 0 }
    }

    #[inline(always)]
    fn spin(&mut self) {
        let spins = 1_u32 << self.exp;

        for _ in 0..spins {
            // In tests, especially in loom tests, we need to yield the thread back to the runtime
            // so it can make progress. See https://github.com/tokio-rs/loom/issues/162#issuecomment-665128979
            #[cfg(any(test, loom))]
            crate::loom::thread::yield_now();

            hint::spin_loop();
        }

        if self.exp < Self::MAX_EXPONENT {
            self.exp += 1;
        }
    }
}
