// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Registering status records, cancellation and priority escalation.

use crate::group::{GroupId, TaskGroup};
use crate::priority::Priority;
use crate::record::group::TaskGroupRecord;
use crate::record::notification::{CancellationNotificationRecord, EscalationNotificationRecord};
use crate::record::{RecordBody, RecordId, StatusRecord};
use crate::table::TaskTable;
use crate::task::TaskRef;
use crate::task::state::EscalateAction;
use alloc::vec::Vec;
use core::fmt;

/// Something that can escalate a task's priority.
///
/// [`TaskDependencyRecord`][crate::record::dependency::TaskDependencyRecord]s forward escalations
/// of the waiting task through this trait. [`TaskTable`] implements it by escalating the task
/// (and, transitively, everything it waits on).
pub trait Escalate {
    fn escalate(&self, task: &TaskRef, priority: Priority);
}

/// The handle to a record registered with a task.
///
/// There is exactly one handle per registered record. Dropping it unregisters the record, so
/// a scope's records are unregistered no matter how the scope is left.
#[must_use = "dropping the handle unregisters the record"]
pub struct StatusRecordHandle {
    task: TaskRef,
    id: Option<RecordId>,
}

// === impl StatusRecordHandle ===

impl StatusRecordHandle {
    fn new(task: TaskRef, id: RecordId) -> Self {
        Self { task, id: Some(id) }
    }

    /// The task the record is registered with.
    pub fn task(&self) -> &TaskRef {
        &self.task
    }

    #[expect(clippy::missing_panics_doc, reason = "internal assertion")]
    pub fn id(&self) -> RecordId {
        self.id.expect("handle owns a registered record")
    }

    fn unregister(&mut self) -> Option<StatusRecord> {
        let id = self.id.take()?;
        let mut chain = self.task.lock_status();
        Some(chain.unlink(id))
    }
}

impl Drop for StatusRecordHandle {
    fn drop(&mut self) {
        // the record may own a `TaskRef` (or a callback capturing one) whose drop wants to lock
        // another task, so it is only dropped after our lock is released.
        let record = self.unregister();
        drop(record);
    }
}

impl fmt::Debug for StatusRecordHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusRecordHandle")
            .field("task", &self.task.id())
            .field("id", &self.id)
            .finish()
    }
}

// === impl TaskTable ===

impl TaskTable {
    /// Register `record` with `task`, making it the innermost record of the task's chain.
    ///
    /// The record stays registered until the returned handle is dropped or passed to
    /// [`Self::remove_status_record`].
    pub fn add_status_record(
        &self,
        task: &TaskRef,
        record: impl Into<StatusRecord>,
    ) -> StatusRecordHandle {
        let record = record.into();
        let kind = record.kind();

        let mut chain = task.lock_status();
        let id = chain.link(record);
        // children tracked by the new record have to catch up with anything that happened to
        // `task` since they were spawned. `CANCELLED` only changes under the lock we hold, so a
        // cancellation either walks the new record or is visible here.
        let children: Vec<TaskRef> = match chain.get(id).map(StatusRecord::body) {
            Some(RecordBody::ChildTask(record)) => record.children(self).collect(),
            Some(RecordBody::TaskGroup(record)) => record.children(self).collect(),
            _ => Vec::new(),
        };
        let (cancelled, priority) = (task.is_cancelled(), task.max_priority());
        drop(chain);

        tracing::trace!(task.tid = %task.id(), record.id = ?id, ?kind, "add_status_record");
        for child in &children {
            self.catch_up(child, cancelled, priority);
        }

        StatusRecordHandle::new(task.clone(), id)
    }

    /// Bring a newly tracked `child` in line with its parent's cancellation and priority.
    pub(crate) fn catch_up(&self, child: &TaskRef, cancelled: bool, priority: Priority) {
        if cancelled {
            self.cancel_task(child);
        }
        if priority > child.max_priority() {
            self.escalate_task_priority(child, priority);
        }
    }

    /// Unregister a record and hand it back.
    ///
    /// Once this returns, the record is no longer reachable by cancellation or escalation. Any
    /// callback of the record that was running concurrently has finished.
    #[expect(clippy::missing_panics_doc, reason = "internal assertion")]
    pub fn remove_status_record(&self, mut handle: StatusRecordHandle) -> StatusRecord {
        tracing::trace!(task.tid = %handle.task.id(), record.id = ?handle.id, "remove_status_record");
        handle
            .unregister()
            .expect("handle owns a registered record")
    }

    /// Register a callback to run when `task` is cancelled.
    ///
    /// If `task` has already been cancelled, the callback runs right away, before this returns.
    pub fn add_cancellation_handler<F>(&self, task: &TaskRef, callback: F) -> StatusRecordHandle
    where
        F: Fn() + Send + Sync + 'static,
    {
        let record = CancellationNotificationRecord::new(callback);

        let mut chain = task.lock_status();
        // `CANCELLED` can't change while we hold the lock, so either the cancellation walk will
        // find this record or it has already happened.
        if task.is_cancelled() {
            record.run();
        }
        let id = chain.link(StatusRecord::from(record));
        drop(chain);

        StatusRecordHandle::new(task.clone(), id)
    }

    /// Register a callback to run whenever `task` is escalated.
    pub fn add_escalation_handler<F>(&self, task: &TaskRef, callback: F) -> StatusRecordHandle
    where
        F: Fn(Priority) + Send + Sync + 'static,
    {
        self.add_status_record(task, EscalationNotificationRecord::new(callback))
    }

    /// Create a new task group owned by `owner`.
    pub fn create_group(&self, owner: &TaskRef) -> TaskGroup<'_> {
        let id = GroupId::next();
        let record = self.add_status_record(owner, TaskGroupRecord::new(id));
        TaskGroup::new(id, record, self)
    }

    /// Cancel `task` along with all of its children.
    ///
    /// Runs every cancellation callback registered with the task, then cancels the members of
    /// every child list in the chain. Returns `false` if the task was already cancelled, in which
    /// case nothing else happens.
    pub fn cancel_task(&self, task: &TaskRef) -> bool {
        if task.is_cancelled() {
            return false;
        }

        let _span = task.span().enter();
        let chain = task.lock_status();
        if !task.state().cancel() {
            return false;
        }

        tracing::debug!(task.tid = %task.id(), "cancelling task");

        for (_, record) in chain.records() {
            match record.body() {
                RecordBody::CancellationNotification(record) => record.run(),
                RecordBody::ChildTask(record) => {
                    for child in record.children(self) {
                        self.cancel_task(&child);
                    }
                }
                RecordBody::TaskGroup(record) => {
                    for child in record.children(self) {
                        self.cancel_task(&child);
                    }
                }
                RecordBody::Deadline(_)
                | RecordBody::EscalationNotification(_)
                | RecordBody::TaskDependency(_) => {}
            }
        }

        true
    }

    /// Raise `task`'s priority to at least `priority`, along with its children and whatever it is
    /// waiting on.
    ///
    /// Returns the task's max priority before the call. If that is already at or above
    /// `priority` (or the task has completed) nothing else happens.
    pub fn escalate_task_priority(&self, task: &TaskRef, priority: Priority) -> Priority {
        let old = match task.state().escalate(priority) {
            EscalateAction::None { current } => return current,
            EscalateAction::Escalated { old } => old,
        };

        let _span = task.span().enter();
        tracing::debug!(task.tid = %task.id(), %old, %priority, "escalating task");

        let chain = task.lock_status();
        for (_, record) in chain.records() {
            match record.body() {
                RecordBody::ChildTask(record) => {
                    for child in record.children(self) {
                        self.escalate_task_priority(&child, priority);
                    }
                }
                RecordBody::TaskGroup(record) => {
                    for child in record.children(self) {
                        self.escalate_task_priority(&child, priority);
                    }
                }
                RecordBody::EscalationNotification(record) => record.run(priority),
                RecordBody::TaskDependency(record) => {
                    record.perform_escalation_action(task, priority, self);
                }
                RecordBody::Deadline(_) | RecordBody::CancellationNotification(_) => {}
            }
        }

        old
    }
}

impl Escalate for TaskTable {
    fn escalate(&self, task: &TaskRef, priority: Priority) {
        self.escalate_task_priority(task, priority);
    }
}
