// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use core::fmt;

/// An opaque ID that uniquely identifies a task relative to all other tasks currently stored in
/// the same [`TaskTable`][crate::TaskTable].
///
/// # Notes
///
/// - Task IDs are the keys of the task arena. When a task is retired its slot may be reused,
///   but the arena tags every key with a generation so a stale ID never resolves to the new
///   occupant.
/// - Task IDs are *not* sequential, and do not indicate the order in which tasks are spawned.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub struct Id(usize);

impl Id {
    pub(crate) const fn from_key(key: usize) -> Self {
        Self(key)
    }

    pub(crate) const fn as_key(self) -> usize {
        self.0
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
