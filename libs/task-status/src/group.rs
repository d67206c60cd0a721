// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Task groups.
//!
//! A task group is a set of child tasks its owner awaits collectively. The group's membership list
//! lives in a [`TaskGroupRecord`] registered with the owner, so cancelling or escalating the owner
//! reaches every live member of the group.

use crate::error::SpawnError;
use crate::loom::sync::atomic::{AtomicU64, Ordering};
use crate::record::group::TaskGroupRecord;
use crate::status::StatusRecordHandle;
use crate::table::TaskTable;
use crate::task::{Id, TaskBuilder, TaskRef};
use alloc::vec::Vec;
use core::fmt;

/// Identifies a task group.
///
/// Group IDs are handed out from a global counter and are never reused.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct GroupId(u64);

/// A task group owned by a task, created through [`TaskTable::create_group`].
///
/// Dropping the group unregisters its record from the owner. Children that are still attached at
/// that point are no longer reached by cancelling or escalating the owner.
#[must_use = "dropping a task group unregisters it from its owner"]
pub struct TaskGroup<'t> {
    id: GroupId,
    record: StatusRecordHandle,
    table: &'t TaskTable,
}

// === impl GroupId ===

impl GroupId {
    pub(crate) fn next() -> Self {
        #[cfg(loom)]
        crate::loom::lazy_static! {
            static ref NEXT_ID: AtomicU64 = AtomicU64::new(1);
        }
        #[cfg(not(loom))]
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);

        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        Self(id)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

// === impl TaskGroup ===

impl<'t> TaskGroup<'t> {
    pub(crate) fn new(id: GroupId, record: StatusRecordHandle, table: &'t TaskTable) -> Self {
        Self { id, record, table }
    }

    pub fn id(&self) -> GroupId {
        self.id
    }

    /// The task owning this group.
    pub fn owner(&self) -> &TaskRef {
        self.record.task()
    }

    /// Spawn a new member of this group and attach it.
    ///
    /// # Errors
    ///
    /// Returns [`SpawnError::TableFull`] when the table has no free slot left.
    #[track_caller]
    pub fn spawn(&self, builder: TaskBuilder<'_>) -> Result<TaskRef, SpawnError> {
        let task = builder
            .in_group(self.owner(), self.id)
            .try_spawn(self.table)?;
        self.attach_child(&task);
        Ok(task)
    }

    /// Attach `child` to the end of the group.
    ///
    /// If the owner has been cancelled, the child is cancelled too. If the owner has been
    /// escalated above the child's priority, the child is escalated to match.
    ///
    /// # Panics
    ///
    /// Panics if `child` was not spawned into this group, or if it is already attached.
    pub fn attach_child(&self, child: &TaskRef) {
        // `CANCELLED` only changes under the owner's lock, so a cancellation either sees the new
        // child in the list or has already set the bit by the time we read it here.
        let (cancelled, priority) = self.with_record(|record| {
            record.attach_child(self.table, child);
            (self.owner().is_cancelled(), self.owner().max_priority())
        });

        self.table.catch_up(child, cancelled, priority);
    }

    /// Remove `child` from the group, e.g. once its result has been consumed.
    ///
    /// Detaching a task that is not attached to this group does nothing.
    pub fn detach_child(&self, child: &TaskRef) {
        self.with_record(|record| record.detach_child(self.table, child));
    }

    /// A snapshot of the group's members, in attach order.
    pub fn children(&self) -> Vec<TaskRef> {
        self.with_record(|record| record.children(self.table).collect())
    }

    pub fn first_child(&self) -> Option<Id> {
        self.with_record(|record| record.first_child())
    }

    pub fn last_child(&self) -> Option<Id> {
        self.with_record(|record| record.last_child())
    }

    pub fn is_empty(&self) -> bool {
        self.with_record(|record| record.is_empty())
    }

    fn with_record<R>(&self, f: impl FnOnce(&mut TaskGroupRecord) -> R) -> R {
        let mut chain = self.owner().lock_status();
        let record = chain
            .get_mut(self.record.id())
            .and_then(|record| record.as_task_group_mut())
            .expect("group record stays registered while the group is alive");
        f(record)
    }
}

impl fmt::Debug for TaskGroup<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskGroup")
            .field("id", &self.id)
            .field("owner", &self.owner().id())
            .field("record", &self.record)
            .finish_non_exhaustive()
    }
}
