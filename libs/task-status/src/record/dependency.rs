// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! What a suspended task is waiting on.
//!
//! A task registers a [`TaskDependencyRecord`] right before it suspends and unregisters it once it
//! resumes. While the record is registered, escalating the waiting task also escalates whatever it
//! is blocked on, so a high priority waiter is never stuck behind low priority work.

use crate::actor::Actor;
use crate::group::GroupId;
use crate::priority::Priority;
use crate::status::Escalate;
use crate::task::TaskRef;
use alloc::sync::{Arc, Weak};
use core::fmt;

/// The address of a suspended continuation.
///
/// This is an opaque token: it is only ever compared and printed, never dereferenced.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContinuationRef(usize);

/// The thing a task is blocked on.
pub enum WaitingOn {
    /// A continuation that is not a task, e.g. one resumed by a callback from foreign code.
    Continuation(ContinuationRef),
    /// Another task's result. The record keeps the task alive while it is registered.
    Task(TaskRef),
    /// The next result of a task group the waiting task owns.
    TaskGroup(GroupId),
    /// Getting to run on an actor.
    Actor(Weak<dyn Actor>),
}

/// Records what the owning task is suspended on.
///
/// A record never changes what it waits on. Should the dependency change, the task unregisters
/// the record and registers a new one.
pub struct TaskDependencyRecord {
    waiting_on: WaitingOn,
}

// === impl ContinuationRef ===

impl ContinuationRef {
    pub const fn from_addr(addr: usize) -> Self {
        Self(addr)
    }

    pub fn from_ptr<T>(ptr: *const T) -> Self {
        Self(ptr.addr())
    }

    pub const fn addr(self) -> usize {
        self.0
    }
}

impl fmt::Debug for ContinuationRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContinuationRef({:#x})", self.0)
    }
}

// === impl TaskDependencyRecord ===

impl TaskDependencyRecord {
    pub fn on_continuation(continuation: ContinuationRef) -> Self {
        Self {
            waiting_on: WaitingOn::Continuation(continuation),
        }
    }

    pub fn on_task(task: TaskRef) -> Self {
        Self {
            waiting_on: WaitingOn::Task(task),
        }
    }

    pub fn on_task_group(group: GroupId) -> Self {
        Self {
            waiting_on: WaitingOn::TaskGroup(group),
        }
    }

    /// Wait on `actor`. The record does not keep the actor alive.
    pub fn on_actor<A: Actor + 'static>(actor: &Arc<A>) -> Self {
        let actor: Weak<A> = Arc::downgrade(actor);
        let actor: Weak<dyn Actor> = actor;
        Self {
            waiting_on: WaitingOn::Actor(actor),
        }
    }

    pub fn waiting_on(&self) -> &WaitingOn {
        &self.waiting_on
    }

    /// Forward an escalation of the `waiting` task to whatever it is blocked on.
    ///
    /// Escalation is best-effort: stale dependencies (a dropped actor, an already finished task)
    /// quietly absorb the call.
    pub fn perform_escalation_action<E>(&self, waiting: &TaskRef, priority: Priority, escalator: &E)
    where
        E: Escalate + ?Sized,
    {
        match &self.waiting_on {
            WaitingOn::Continuation(continuation) => {
                // nothing to escalate, but let priority inversions show up in traces
                tracing::debug!(
                    task.tid = %waiting.id(),
                    ?continuation,
                    %priority,
                    "escalated task is waiting on a continuation"
                );
            }
            WaitingOn::Task(task) => escalator.escalate(task, priority),
            // the owner's group record fans out to the group's children already
            WaitingOn::TaskGroup(_) => {}
            WaitingOn::Actor(actor) => {
                if let Some(actor) = actor.upgrade() {
                    actor.escalate(waiting, priority);
                }
            }
        }
    }
}

impl fmt::Debug for TaskDependencyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskDependencyRecord")
            .field("waiting_on", &self.waiting_on)
            .finish()
    }
}

impl fmt::Debug for WaitingOn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaitingOn::Continuation(continuation) => {
                f.debug_tuple("Continuation").field(continuation).finish()
            }
            WaitingOn::Task(task) => f.debug_tuple("Task").field(&task.id()).finish(),
            WaitingOn::TaskGroup(group) => f.debug_tuple("TaskGroup").field(group).finish(),
            WaitingOn::Actor(actor) => f
                .debug_tuple("Actor")
                .field(&format_args!("{:p}", actor.as_ptr()))
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::TaskTable;
    use crate::task::TaskBuilder;
    use crate::test_util::{CountingEscalator, RecordingActor};

    #[test]
    fn task_dependency_forwards_once() {
        let table = TaskTable::new();
        let waiting = TaskBuilder::new().try_spawn(&table).unwrap();
        let target = TaskBuilder::new().try_spawn(&table).unwrap();
        let escalator = CountingEscalator::default();

        let record = TaskDependencyRecord::on_task(target.clone());
        record.perform_escalation_action(&waiting, Priority::USER_INITIATED, &escalator);
        assert_eq!(escalator.calls(), [(target.id(), Priority::USER_INITIATED)]);

        record.perform_escalation_action(&waiting, Priority::USER_INTERACTIVE, &escalator);
        assert_eq!(escalator.calls().len(), 2);
    }

    #[test]
    fn task_group_dependency_is_noop() {
        let table = TaskTable::new();
        let waiting = TaskBuilder::new().try_spawn(&table).unwrap();
        let group = table.create_group(&waiting);
        let _child = group.spawn(TaskBuilder::new()).unwrap();
        let escalator = CountingEscalator::default();

        let record = TaskDependencyRecord::on_task_group(group.id());
        record.perform_escalation_action(&waiting, Priority::USER_INTERACTIVE, &escalator);
        assert!(escalator.calls().is_empty());
    }

    #[test]
    fn continuation_dependency_is_noop() {
        let table = TaskTable::new();
        let waiting = TaskBuilder::new().try_spawn(&table).unwrap();
        let escalator = CountingEscalator::default();

        let record = TaskDependencyRecord::on_continuation(ContinuationRef::from_addr(0x1000));
        record.perform_escalation_action(&waiting, Priority::USER_INTERACTIVE, &escalator);
        assert!(escalator.calls().is_empty());
    }

    #[test]
    fn actor_dependency_forwards_waiting_task() {
        let table = TaskTable::new();
        let waiting = TaskBuilder::new().try_spawn(&table).unwrap();
        let actor = Arc::new(RecordingActor::default());
        let escalator = CountingEscalator::default();

        let record = TaskDependencyRecord::on_actor(&actor);
        record.perform_escalation_action(&waiting, Priority::USER_INITIATED, &escalator);

        assert_eq!(actor.calls(), [(waiting.id(), Priority::USER_INITIATED)]);
        assert!(escalator.calls().is_empty());
    }

    #[test]
    fn dropped_actor_is_ignored() {
        let table = TaskTable::new();
        let waiting = TaskBuilder::new().try_spawn(&table).unwrap();
        let actor = Arc::new(RecordingActor::default());
        let escalator = CountingEscalator::default();

        let record = TaskDependencyRecord::on_actor(&actor);
        drop(actor);
        record.perform_escalation_action(&waiting, Priority::USER_INITIATED, &escalator);
        assert!(escalator.calls().is_empty());
    }

    #[test]
    fn task_dependency_releases_reference() {
        let table = TaskTable::new();
        let target = TaskBuilder::new().try_spawn(&table).unwrap();
        let before = target.ref_count();

        let record = TaskDependencyRecord::on_task(target.clone());
        assert_eq!(target.ref_count(), before + 1);

        drop(record);
        assert_eq!(target.ref_count(), before);
    }
}
