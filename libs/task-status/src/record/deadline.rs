// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use core::cmp::Ordering;
use core::fmt;

/// A point in time, measured in ticks of whatever clock the runtime drives its timers with.
///
/// Reaching a deadline does not do anything by itself. It is up to the runtime's timer policy to
/// cancel the task once the [`nearest_deadline`][crate::TaskRef::nearest_deadline] has passed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Deadline(u64);

/// A deadline the task has to finish by.
pub struct DeadlineRecord {
    deadline: Deadline,
}

// === impl Deadline ===

impl Deadline {
    pub const fn from_ticks(ticks: u64) -> Self {
        Self(ticks)
    }

    pub const fn as_ticks(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Deadline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ticks", self.0)
    }
}

// === impl DeadlineRecord ===

impl DeadlineRecord {
    pub const fn new(deadline: Deadline) -> Self {
        Self { deadline }
    }

    pub const fn deadline(&self) -> Deadline {
        self.deadline
    }
}

impl fmt::Debug for DeadlineRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeadlineRecord")
            .field("deadline", &self.deadline)
            .finish()
    }
}

impl PartialEq for DeadlineRecord {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline
    }
}

impl Eq for DeadlineRecord {}

impl PartialOrd for DeadlineRecord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DeadlineRecord {
    fn cmp(&self, other: &Self) -> Ordering {
        self.deadline.cmp(&other.deadline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(ticks: u64) -> DeadlineRecord {
        DeadlineRecord::new(Deadline::from_ticks(ticks))
    }

    #[test]
    fn ordering_follows_ticks() {
        assert!(record(1) < record(2));
        assert!(record(u64::MAX) > record(0));
        assert_eq!(record(7), record(7));
        assert_eq!(record(7).cmp(&record(7)), Ordering::Equal);
    }

    proptest::proptest! {
        #[test]
        fn ordering_matches_raw_ordering(a: u64, b: u64) {
            proptest::prop_assert_eq!(record(a).cmp(&record(b)), a.cmp(&b));
            proptest::prop_assert_eq!(record(a) == record(b), a == b);
        }
    }
}
