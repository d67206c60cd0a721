// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use crate::loom::sync::atomic::{AtomicUsize, Ordering};
use crate::priority::Priority;
use core::fmt;

/// Task state. The task stores its state in an atomic `usize` with various bitfields for the
/// necessary information. The state has the following layout:
///
/// ```text
/// | 63   11 | 10         3 | 2         2 | 1        1 | 0         0 |
/// | unused  | max priority | escalated   | complete   | cancelled   |
/// ```
///
/// `CANCELLED` is only ever set while holding the task's status lock, which lets code that holds
/// the lock treat the bit as stable.
pub(crate) struct State {
    val: AtomicUsize,
}

mycelium_bitfield::bitfield! {
    /// A snapshot of a task's current state.
    #[derive(PartialEq, Eq)]
    pub(crate) struct Snapshot<usize> {
        /// If set, this task has been cancelled.
        pub const CANCELLED: bool;
        /// If set, this task has completed and was retired from its table.
        pub const COMPLETE: bool;
        /// If set, the task's priority was raised above the one it was created with.
        pub const ESCALATED: bool;
        /// The highest priority this task has been escalated to.
        pub const MAX_PRIORITY: Priority;
    }
}

/// Outcome of [`State::escalate`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum EscalateAction {
    /// The max priority was raised from `old`, the status chain must be walked.
    Escalated { old: Priority },
    /// The task already runs at `current` or higher, or has completed. Nothing to do.
    None { current: Priority },
}

impl State {
    pub(super) fn new(priority: Priority, cancelled: bool) -> State {
        let snapshot = Snapshot::new()
            .with(Snapshot::MAX_PRIORITY, priority)
            .with(Snapshot::CANCELLED, cancelled);

        State {
            val: AtomicUsize::new(snapshot.0),
        }
    }

    pub(crate) fn load(&self, ordering: Ordering) -> Snapshot {
        Snapshot(self.val.load(ordering))
    }

    /// Cancel the task.
    ///
    /// Returns `true` if the task was successfully cancelled. The caller must hold the task's
    /// status lock.
    pub(crate) fn cancel(&self) -> bool {
        tracing::trace!("State::cancel");

        self.transition(|s| {
            // you can't cancel a task that has already been cancelled, that doesn't make sense.
            if s.get(Snapshot::CANCELLED) {
                return false;
            }

            s.set(Snapshot::CANCELLED, true);

            true
        })
    }

    /// Raise the task's max priority to `priority`.
    pub(crate) fn escalate(&self, priority: Priority) -> EscalateAction {
        tracing::trace!(%priority, "State::escalate");

        self.transition(|s| {
            let current = s.get(Snapshot::MAX_PRIORITY);
            if s.get(Snapshot::COMPLETE) || current >= priority {
                return EscalateAction::None { current };
            }

            s.set(Snapshot::MAX_PRIORITY, priority)
                .set(Snapshot::ESCALATED, true);

            EscalateAction::Escalated { old: current }
        })
    }

    /// Mark the task as complete.
    ///
    /// Returns `false` if the task was already complete.
    pub(crate) fn complete(&self) -> bool {
        tracing::trace!("State::complete");

        self.transition(|s| {
            if s.get(Snapshot::COMPLETE) {
                return false;
            }

            s.set(Snapshot::COMPLETE, true);
            true
        })
    }

    fn transition<T>(&self, mut transition: impl FnMut(&mut Snapshot) -> T) -> T {
        let mut current = self.load(Ordering::Acquire);
        loop {
            tracing::trace!("State::transition; current:\n{}", current);
            let mut next = current;
            // Run the transition function.
            let res = transition(&mut next);

            if current.0 == next.0 {
                return res;
            }

            tracing::trace!("State::transition; next:\n{}", next);
            match self.val.compare_exchange_weak(
                current.0,
                next.0,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return res,
                Err(actual) => current = Snapshot(actual),
            }
        }
    }
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.load(Ordering::Relaxed), f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_is_one_shot() {
        let state = State::new(Priority::DEFAULT, false);
        assert!(state.cancel());
        assert!(!state.cancel());
        assert!(state.load(Ordering::Acquire).get(Snapshot::CANCELLED));
    }

    #[test]
    fn escalate_only_raises() {
        let state = State::new(Priority::UTILITY, false);

        assert_eq!(
            state.escalate(Priority::USER_INITIATED),
            EscalateAction::Escalated {
                old: Priority::UTILITY
            }
        );
        assert_eq!(
            state.escalate(Priority::USER_INITIATED),
            EscalateAction::None {
                current: Priority::USER_INITIATED
            }
        );
        assert_eq!(
            state.escalate(Priority::BACKGROUND),
            EscalateAction::None {
                current: Priority::USER_INITIATED
            }
        );

        let snapshot = state.load(Ordering::Acquire);
        assert!(snapshot.get(Snapshot::ESCALATED));
        assert_eq!(snapshot.get(Snapshot::MAX_PRIORITY), Priority::USER_INITIATED);
    }

    #[test]
    fn completed_tasks_are_not_escalated() {
        let state = State::new(Priority::UTILITY, false);
        assert!(state.complete());
        assert!(!state.complete());
        assert_eq!(
            state.escalate(Priority::USER_INTERACTIVE),
            EscalateAction::None {
                current: Priority::UTILITY
            }
        );
    }
}
