// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use crate::priority::Priority;
use crate::task::TaskRef;

/// An actor tasks can wait to run on.
///
/// Tasks blocked on an actor register a
/// [`TaskDependencyRecord`][crate::record::dependency::TaskDependencyRecord] pointing at it.
/// Escalating such a task calls into the actor, which may currently be busy running a lower
/// priority job and is expected to boost whatever stands between `waiting` and the actor.
pub trait Actor: Send + Sync {
    /// `waiting` has been escalated to `priority` while it is waiting on this actor.
    ///
    /// This is called with `waiting`'s status lock held.
    fn escalate(&self, waiting: &TaskRef, priority: Priority);
}
