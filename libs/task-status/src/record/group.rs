// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use crate::group::GroupId;
use crate::record::{Children, unlink_child};
use crate::table::TaskTable;
use crate::task::{Id, TaskRef};
use core::fmt;

/// The live children of a task group, registered with the task that owns the group.
///
/// Children are kept in attach order. Appending is O(1) through the `last_child` link, detaching
/// walks the list from the front. Both must happen under the owning task's status lock once the
/// record is registered, which is what [`TaskGroup`][crate::TaskGroup] takes care of.
pub struct TaskGroupRecord {
    group: GroupId,
    first_child: Option<Id>,
    last_child: Option<Id>,
}

impl TaskGroupRecord {
    pub(crate) fn new(group: GroupId) -> Self {
        Self {
            group,
            first_child: None,
            last_child: None,
        }
    }

    /// A record for `child`'s group that starts out with `child` as its only member.
    ///
    /// # Panics
    ///
    /// Panics if `child` was not spawned into a group, or if it is already linked into a child
    /// list.
    pub fn with_child(child: &TaskRef) -> Self {
        let group = child.group().expect("task is not a group child");
        assert!(
            !child.is_linked(),
            "child is already linked into a child list"
        );

        child.set_next_sibling(None);
        Self {
            group,
            first_child: Some(child.id()),
            last_child: Some(child.id()),
        }
    }

    pub fn group(&self) -> GroupId {
        self.group
    }

    pub fn first_child(&self) -> Option<Id> {
        self.first_child
    }

    pub fn last_child(&self) -> Option<Id> {
        self.last_child
    }

    pub fn is_empty(&self) -> bool {
        self.first_child.is_none()
    }

    /// Walks the group's children in attach order.
    pub fn children<'t>(&self, table: &'t TaskTable) -> Children<'t> {
        Children::new(table, self.first_child)
    }

    /// Append `child` to the end of the list.
    ///
    /// A child that has already completed is not attached, as it may be gone from the table.
    ///
    /// # Panics
    ///
    /// Panics if `child` was not spawned into this group, or if it is already attached.
    pub fn attach_child(&mut self, table: &TaskTable, child: &TaskRef) {
        assert_eq!(
            child.group(),
            Some(self.group),
            "task is not a child of this group"
        );
        assert!(
            !child.is_linked(),
            "child is already linked into a child list"
        );

        tracing::trace!(group = %self.group, task.tid = %child.id(), "TaskGroupRecord::attach_child");
        if child.is_complete() {
            return;
        }

        let id = child.id();
        child.set_next_sibling(None);
        match self.last_child {
            None => self.first_child = Some(id),
            Some(last) => table
                .get(last)
                .expect("attached children stay in the table until they are detached")
                .set_next_sibling(Some(id)),
        }
        self.last_child = Some(id);
    }

    /// Remove `child` from the list, repairing the links around it.
    ///
    /// Detaching a task that is not attached to this group leaves the list untouched.
    pub fn detach_child(&mut self, table: &TaskTable, child: &TaskRef) {
        self.unlink(table, child);
    }

    /// Like [`Self::detach_child`], but reports whether `child` was attached.
    pub(crate) fn unlink(&mut self, table: &TaskTable, child: &TaskRef) -> bool {
        tracing::trace!(group = %self.group, task.tid = %child.id(), "TaskGroupRecord::detach_child");

        let Some(prev) = unlink_child(table, &mut self.first_child, child) else {
            return false;
        };
        if self.last_child == Some(child.id()) {
            self.last_child = prev;
        }
        true
    }
}

impl fmt::Debug for TaskGroupRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskGroupRecord")
            .field("group", &self.group)
            .field("first_child", &self.first_child)
            .field("last_child", &self.last_child)
            .finish()
    }
}
