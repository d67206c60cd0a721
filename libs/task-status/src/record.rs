// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Status records.
//!
//! A [`StatusRecord`] is a header (the [`RecordFlags`], holding the record's kind, and the link
//! to its enclosing record) plus a [`RecordBody`] carrying the kind-specific payload. Records are
//! built by the scope that needs them, registered with
//! [`TaskTable::add_status_record`][crate::TaskTable::add_status_record] and unregistered again
//! when that scope exits.

pub mod child;
pub mod deadline;
pub mod dependency;
pub mod group;
pub mod notification;

use crate::table::TaskTable;
use crate::task::{Id, TaskRef};
use core::fmt;
use core::iter::FusedIterator;

use child::ChildTaskRecord;
use deadline::DeadlineRecord;
use dependency::TaskDependencyRecord;
use group::TaskGroupRecord;
use notification::{CancellationNotificationRecord, EscalationNotificationRecord};

mycelium_bitfield::enum_from_bits! {
    /// The kind of a status record.
    #[derive(Debug, Eq, PartialEq)]
    pub enum StatusRecordKind<u8> {
        /// A [`DeadlineRecord`].
        Deadline = 0,
        /// A [`ChildTaskRecord`].
        ChildTask = 1,
        /// A [`CancellationNotificationRecord`].
        CancellationNotification = 2,
        /// An [`EscalationNotificationRecord`].
        EscalationNotification = 3,
        /// A [`TaskGroupRecord`].
        TaskGroup = 4,
        /// A [`TaskDependencyRecord`].
        TaskDependency = 5,
    }
}

mycelium_bitfield::bitfield! {
    /// The fixed-width header shared by every status record.
    #[derive(PartialEq, Eq)]
    pub struct RecordFlags<u32> {
        /// The record's kind. Stable for the record's whole life.
        pub const KIND: StatusRecordKind;
        /// If set, the record is currently linked into a task's status chain.
        pub const PUBLISHED: bool;
    }
}

/// Identifies a record within the [`StatusChain`][crate::StatusChain] it is linked into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RecordId(pub(crate) wasmtime_slab::Id);

/// A node in a task's status chain.
pub struct StatusRecord {
    flags: RecordFlags,
    parent: Option<RecordId>,
    body: RecordBody,
}

/// The kind-specific payload of a [`StatusRecord`].
pub enum RecordBody {
    Deadline(DeadlineRecord),
    ChildTask(ChildTaskRecord),
    CancellationNotification(CancellationNotificationRecord),
    EscalationNotification(EscalationNotificationRecord),
    TaskGroup(TaskGroupRecord),
    TaskDependency(TaskDependencyRecord),
}

/// A lazy walk over an invasive child list, following each child's sibling link.
///
/// The walk recomputes everything from the list head, so calling `children()` again restarts
/// it. Walking a list that is concurrently modified requires holding the list owner's status
/// lock for the duration of the walk.
pub struct Children<'t> {
    table: &'t TaskTable,
    next: Option<Id>,
}

// === impl StatusRecord ===

impl StatusRecord {
    fn new(body: RecordBody) -> Self {
        Self {
            flags: RecordFlags::new().with(RecordFlags::KIND, body.kind()),
            parent: None,
            body,
        }
    }

    /// The record's kind, as stored in its header.
    pub fn kind(&self) -> StatusRecordKind {
        self.flags.get(RecordFlags::KIND)
    }

    pub fn flags(&self) -> RecordFlags {
        self.flags
    }

    /// The record enclosing this one, i.e. the one registered right before it.
    pub fn parent(&self) -> Option<RecordId> {
        self.parent
    }

    pub fn is_published(&self) -> bool {
        self.flags.get(RecordFlags::PUBLISHED)
    }

    pub fn body(&self) -> &RecordBody {
        &self.body
    }

    pub fn into_body(self) -> RecordBody {
        self.body
    }

    pub(crate) fn body_mut(&mut self) -> &mut RecordBody {
        &mut self.body
    }

    /// Change the parent of this unregistered record.
    ///
    /// This is also the place that would derive cached summary data (such as the earliest
    /// deadline) from the new parent, should the chain ever cache any.
    ///
    /// # Panics
    ///
    /// Panics if the record is linked into a chain.
    pub fn reset_parent(&mut self, parent: Option<RecordId>) {
        assert!(
            !self.is_published(),
            "cannot reset the parent of a published status record"
        );
        self.parent = parent;
    }

    /// Relink this record past one or more records that are being removed from the chain.
    ///
    /// Unlike [`Self::reset_parent`] this is a purely structural change.
    pub(crate) fn splice_parent(&mut self, parent: Option<RecordId>) {
        debug_assert!(self.is_published());
        self.parent = parent;
    }

    pub(crate) fn publish(&mut self) {
        self.flags.set(RecordFlags::PUBLISHED, true);
    }

    pub(crate) fn unpublish(&mut self) {
        self.flags.set(RecordFlags::PUBLISHED, false);
    }

    pub fn as_deadline(&self) -> Option<&DeadlineRecord> {
        match &self.body {
            RecordBody::Deadline(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_child_task(&self) -> Option<&ChildTaskRecord> {
        match &self.body {
            RecordBody::ChildTask(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_task_group(&self) -> Option<&TaskGroupRecord> {
        match &self.body {
            RecordBody::TaskGroup(record) => Some(record),
            _ => None,
        }
    }

    pub(crate) fn as_task_group_mut(&mut self) -> Option<&mut TaskGroupRecord> {
        match &mut self.body {
            RecordBody::TaskGroup(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_dependency(&self) -> Option<&TaskDependencyRecord> {
        match &self.body {
            RecordBody::TaskDependency(record) => Some(record),
            _ => None,
        }
    }
}

impl fmt::Debug for StatusRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusRecord")
            .field("flags", &self.flags)
            .field("parent", &self.parent)
            .field("body", &self.body)
            .finish()
    }
}

// === impl RecordBody ===

impl RecordBody {
    pub fn kind(&self) -> StatusRecordKind {
        match self {
            RecordBody::Deadline(_) => StatusRecordKind::Deadline,
            RecordBody::ChildTask(_) => StatusRecordKind::ChildTask,
            RecordBody::CancellationNotification(_) => StatusRecordKind::CancellationNotification,
            RecordBody::EscalationNotification(_) => StatusRecordKind::EscalationNotification,
            RecordBody::TaskGroup(_) => StatusRecordKind::TaskGroup,
            RecordBody::TaskDependency(_) => StatusRecordKind::TaskDependency,
        }
    }
}

impl fmt::Debug for RecordBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordBody::Deadline(record) => fmt::Debug::fmt(record, f),
            RecordBody::ChildTask(record) => fmt::Debug::fmt(record, f),
            RecordBody::CancellationNotification(record) => fmt::Debug::fmt(record, f),
            RecordBody::EscalationNotification(record) => fmt::Debug::fmt(record, f),
            RecordBody::TaskGroup(record) => fmt::Debug::fmt(record, f),
            RecordBody::TaskDependency(record) => fmt::Debug::fmt(record, f),
        }
    }
}

macro_rules! impl_from_record {
    ($($variant:ident($record:ty)),+ $(,)?) => {
        $(
            impl From<$record> for RecordBody {
                fn from(record: $record) -> Self {
                    RecordBody::$variant(record)
                }
            }

            impl From<$record> for StatusRecord {
                fn from(record: $record) -> Self {
                    StatusRecord::new(RecordBody::$variant(record))
                }
            }
        )+
    };
}

impl_from_record! {
    Deadline(DeadlineRecord),
    ChildTask(ChildTaskRecord),
    CancellationNotification(CancellationNotificationRecord),
    EscalationNotification(EscalationNotificationRecord),
    TaskGroup(TaskGroupRecord),
    TaskDependency(TaskDependencyRecord),
}

// === impl Children ===

impl<'t> Children<'t> {
    pub(crate) fn new(table: &'t TaskTable, first: Option<Id>) -> Self {
        Self { table, next: first }
    }
}

impl Iterator for Children<'_> {
    type Item = TaskRef;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        // retiring a task unlinks it from its parent's lists first, so this only fails for lists
        // that were never registered with the parent.
        let Some(task) = self.table.get(id) else {
            self.next = None;
            return None;
        };
        self.next = task.next_sibling();
        Some(task)
    }
}

impl FusedIterator for Children<'_> {}

/// Removes `child` from the invasive list starting at `first`.
///
/// Returns `None` if `child` is not a member of the list, otherwise its former predecessor
/// (`Some(None)` if it was the head). The detached child's own link is cleared.
pub(crate) fn unlink_child(
    table: &TaskTable,
    first: &mut Option<Id>,
    child: &TaskRef,
) -> Option<Option<Id>> {
    let id = child.id();
    let head = (*first)?;

    if head == id {
        *first = child.next_sibling();
        child.clear_next_sibling();
        return Some(None);
    }

    let mut prev = table.get(head)?;
    loop {
        // reaching the end means the child isn't in this list
        let next = prev.next_sibling()?;

        if next == id {
            prev.set_next_sibling(child.next_sibling());
            child.clear_next_sibling();
            return Some(Some(prev.id()));
        }

        prev = table.get(next)?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::deadline::Deadline;

    #[test]
    fn kind_is_derived_from_body() {
        let record = StatusRecord::from(DeadlineRecord::new(Deadline::from_ticks(1)));
        assert_eq!(record.kind(), StatusRecordKind::Deadline);
        assert!(!record.is_published());
        assert!(record.as_deadline().is_some());
        assert!(record.as_child_task().is_none());

        let record = StatusRecord::from(CancellationNotificationRecord::new(|| {}));
        assert_eq!(record.kind(), StatusRecordKind::CancellationNotification);
        assert_eq!(record.kind(), record.body().kind());
    }

    #[test]
    fn kind_survives_flag_updates() {
        let mut record = StatusRecord::from(EscalationNotificationRecord::new(|_| {}));
        record.publish();
        assert_eq!(record.kind(), StatusRecordKind::EscalationNotification);
        assert!(record.is_published());
        record.unpublish();
        assert_eq!(record.kind(), StatusRecordKind::EscalationNotification);
    }

    #[test]
    #[should_panic(expected = "cannot reset the parent of a published status record")]
    fn reset_parent_requires_unpublished() {
        let mut record = StatusRecord::from(DeadlineRecord::new(Deadline::from_ticks(1)));
        record.publish();
        record.reset_parent(None);
    }
}
