// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use crate::error::SpawnError;
use crate::task::{Id, Task, TaskRef};
use core::fmt;

/// Layout of the [`TaskTable`]'s arena keys.
///
/// The highest key bit is reserved, which keeps `usize::MAX` free to stand for "no task" in the
/// packed sibling links of child lists.
pub struct TableConfig;

impl sharded_slab::Config for TableConfig {
    const RESERVED_BITS: usize = 1;
}

static_assertions::const_assert!(<TableConfig as sharded_slab::Config>::RESERVED_BITS >= 1);

/// The arena all tasks live in.
///
/// Child lists refer to tasks by their [`Id`], which is resolved through the table. A task stays
/// in the table until it is [retired](Self::retire); [`TaskRef`]s handed out by the table keep the
/// task itself alive past that point.
pub struct TaskTable {
    tasks: sharded_slab::Slab<TaskRef, TableConfig>,
}

impl TaskTable {
    pub fn new() -> Self {
        Self {
            tasks: sharded_slab::Slab::new_with_config::<TableConfig>(),
        }
    }

    /// Resolve `id` to the task it names, if that task is still in the table.
    pub fn get(&self, id: Id) -> Option<TaskRef> {
        self.tasks.get(id.as_key()).map(|entry| TaskRef::clone(&entry))
    }

    pub fn contains(&self, id: Id) -> bool {
        self.tasks.contains(id.as_key())
    }

    /// Mark `task` as complete and remove it from the table.
    ///
    /// Completed tasks are no longer escalated. If the task is still a member of one of its
    /// parent's registered child lists (independent or group), it is unlinked from that list under
    /// the parent's status lock first, so the parent's remaining children stay reachable. This
    /// must therefore not be called while holding the parent's status lock. Children tracked by a
    /// [`ChildTaskRecord`][crate::record::child::ChildTaskRecord] must not be retired before that
    /// record has been registered with the parent.
    ///
    /// Returns `false` if the task had already been retired.
    pub fn retire(&self, task: &TaskRef) -> bool {
        if !task.state().complete() {
            return false;
        }

        tracing::trace!(task.tid = %task.id(), "TaskTable::retire");

        // list membership only changes under the parent's lock, so check it there. Attaching a
        // completed task is refused under the same lock.
        if let Some(parent) = task.parent_task() {
            let mut chain = parent.lock_status();
            if task.is_linked() {
                let unlinked = chain.unlink_child(self, task);
                tracing::trace!(task.tid = %task.id(), parent.tid = %parent.id(), unlinked, "unlinked retired child");
            }
        }

        self.tasks.remove(task.id().as_key())
    }

    pub(crate) fn insert_with(
        &self,
        task: impl FnOnce(Id) -> Task,
    ) -> Result<TaskRef, SpawnError> {
        let entry = self.tasks.vacant_entry().ok_or(SpawnError::TableFull)?;
        let task = TaskRef::new(task(Id::from_key(entry.key())));
        entry.insert(task.clone());
        Ok(task)
    }
}

impl Default for TaskTable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TaskTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskTable")
            .field("tasks", &self.tasks)
            .finish()
    }
}
