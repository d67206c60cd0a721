// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

mod builder;
mod id;
pub(crate) mod state;

use crate::chain::{StatusChain, StatusGuard, StatusLock};
use crate::group::GroupId;
use crate::loom::sync::atomic::{AtomicUsize, Ordering};
use crate::priority::Priority;
use crate::record::deadline::Deadline;
use crate::task::state::{Snapshot, State};
use alloc::string::String;
use alloc::sync::{Arc, Weak};
use core::fmt;

pub use builder::TaskBuilder;
pub use id::Id;

/// Encodings of [`ChildFragment::next_sibling`] that are not task ids.
///
/// The task arena reserves the highest key bit, so no valid [`Id`] ever has one of these values.
/// `UNLINKED` means the task is not a member of any child list, `LAST` that it is the last one.
const UNLINKED: usize = usize::MAX;
const LAST: usize = usize::MAX - 1;

/// A reference-counted handle to a task.
///
/// Tasks are owned by the [`TaskTable`][crate::TaskTable] they were spawned into; every other
/// holder (the spawning scope, a task dependency record, ...) keeps a `TaskRef`. The task is
/// deallocated once the last `TaskRef` is dropped.
pub struct TaskRef(Arc<Task>);

pub(crate) struct Task {
    /// The task's ID.
    id: Id,
    name: Option<String>,
    /// The task's state.
    ///
    /// This field is accessed with atomic instructions, so it's always safe to access it.
    state: State,
    /// The chain of status records, behind the task's status lock.
    status: StatusLock,
    child: ChildFragment,
    /// The tracing span associated with this task, for debugging purposes.
    span: tracing::Span,
}

/// Bookkeeping for tasks that are children of another task.
struct ChildFragment {
    /// The spawning task. Weak, as parents commonly hold strong references to their children
    /// while they wait on them.
    parent: Option<(Id, Weak<Task>)>,
    /// The group this task belongs to, if it was spawned into one.
    ///
    /// Group children are tracked *only* by their group's record, never by an independent
    /// child record.
    group: Option<GroupId>,
    /// The next task in whichever child list this task is linked into.
    ///
    /// This field is logically owned by the parent: it must only be written while holding the
    /// *parent's* status lock (or before the list head is published), which is also what
    /// provides the ordering for the relaxed accesses below.
    next_sibling: AtomicUsize,
}

// === impl TaskRef ===

impl TaskRef {
    pub(crate) fn new(task: Task) -> Self {
        Self(Arc::new(task))
    }

    /// Returns the task's unique[^1] identifier.
    ///
    /// [^1]: Unique to all tasks *currently stored* in the same table. See [`Id`] for details.
    pub fn id(&self) -> Id {
        self.0.id
    }

    pub fn name(&self) -> Option<&str> {
        self.0.name.as_deref()
    }

    /// Returns `true` once the task has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.snapshot().get(Snapshot::CANCELLED)
    }

    /// Returns `true` once the task has been retired from its table.
    pub fn is_complete(&self) -> bool {
        self.snapshot().get(Snapshot::COMPLETE)
    }

    /// Returns `true` if the task was ever escalated above the priority it was created with.
    pub fn is_escalated(&self) -> bool {
        self.snapshot().get(Snapshot::ESCALATED)
    }

    /// The highest priority this task has been escalated to (or created with).
    pub fn max_priority(&self) -> Priority {
        self.snapshot().get(Snapshot::MAX_PRIORITY)
    }

    /// The task that spawned this one, if it was spawned as a child.
    pub fn parent(&self) -> Option<Id> {
        self.0.child.parent.as_ref().map(|(id, _)| *id)
    }

    /// The spawning task, if it is still alive.
    pub(crate) fn parent_task(&self) -> Option<TaskRef> {
        let (_, parent) = self.0.child.parent.as_ref()?;
        parent.upgrade().map(TaskRef)
    }

    /// The group this task was spawned into, if any.
    pub fn group(&self) -> Option<GroupId> {
        self.0.child.group
    }

    pub fn is_group_child(&self) -> bool {
        self.0.child.group.is_some()
    }

    /// The number of live `TaskRef`s pointing at this task, including the one held by its table.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }

    /// Acquires the task's status lock.
    ///
    /// The returned guard is the only way to reach the task's status records. Holding it blocks
    /// cancellation and escalation walks of this task, as well as registering or unregistering
    /// records. Do not hold it while cancelling or escalating this same task.
    pub fn lock_status(&self) -> StatusGuard<'_> {
        self.0.status.lock()
    }

    /// The earliest deadline registered in the task's status chain.
    pub fn nearest_deadline(&self) -> Option<Deadline> {
        self.lock_status().nearest_deadline()
    }

    pub fn span(&self) -> &tracing::Span {
        &self.0.span
    }

    pub(crate) fn state(&self) -> &State {
        &self.0.state
    }

    /// The next task in the child list this task is linked into.
    ///
    /// The caller must hold the status lock of the task owning that list.
    pub(crate) fn next_sibling(&self) -> Option<Id> {
        match self.0.child.next_sibling.load(Ordering::Relaxed) {
            UNLINKED | LAST => None,
            key => Some(Id::from_key(key)),
        }
    }

    /// Returns `true` while the task is a member of a child list.
    pub(crate) fn is_linked(&self) -> bool {
        self.0.child.next_sibling.load(Ordering::Relaxed) != UNLINKED
    }

    /// Links this task into a child list, in front of `next`.
    ///
    /// The caller must hold the status lock of the task owning that list, or own the list
    /// exclusively because it is not published yet.
    pub(crate) fn set_next_sibling(&self, next: Option<Id>) {
        let raw = next.map_or(LAST, Id::as_key);
        self.0.child.next_sibling.store(raw, Ordering::Relaxed);
    }

    /// Marks this task as no longer being a member of any child list.
    ///
    /// Same locking rules as [`Self::set_next_sibling`].
    pub(crate) fn clear_next_sibling(&self) {
        self.0.child.next_sibling.store(UNLINKED, Ordering::Relaxed);
    }

    pub(crate) fn ptr_eq(&self, other: &TaskRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    fn snapshot(&self) -> Snapshot {
        self.0.state.load(Ordering::Acquire)
    }
}

impl fmt::Debug for TaskRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRef")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("state", self.state())
            .finish_non_exhaustive()
    }
}

impl fmt::Pointer for TaskRef {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Pointer::fmt(&self.0, f)
    }
}

impl Clone for TaskRef {
    #[inline]
    #[track_caller]
    fn clone(&self) -> Self {
        let loc = core::panic::Location::caller();
        tracing::trace!(
            task.tid = %self.id(),
            loc.file = loc.file(),
            loc.line = loc.line(),
            loc.col = loc.column(),
            "TaskRef::clone",
        );
        Self(Arc::clone(&self.0))
    }
}

impl PartialEq for TaskRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for TaskRef {}

// === impl Task ===

impl Task {
    pub(crate) fn new(
        id: Id,
        name: Option<String>,
        state: State,
        chain: StatusChain,
        parent: Option<&TaskRef>,
        group: Option<GroupId>,
        span: tracing::Span,
    ) -> Self {
        Self {
            id,
            name,
            state,
            status: StatusLock::new(chain),
            child: ChildFragment {
                parent: parent.map(|parent| (parent.id(), Arc::downgrade(&parent.0))),
                group,
                next_sibling: AtomicUsize::new(UNLINKED),
            },
            span,
        }
    }
}

impl Drop for Task {
    fn drop(&mut self) {
        tracing::trace!(task.tid = %self.id, "Task::drop");
    }
}
