// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use crate::record::{Children, unlink_child};
use crate::table::TaskTable;
use crate::task::{Id, TaskRef};
use core::fmt;

/// Tracks independent (non-grouped) child tasks of the task it is registered with.
///
/// The record only stores the first child; the rest of the list is threaded through each child's
/// sibling link. The list is fixed once the record is built, except that children retired from
/// the [`TaskTable`] are unlinked from it. A child stays a member of the list for as long as it is
/// in the table, even if the record is unregistered earlier, so it can't be tracked twice.
pub struct ChildTaskRecord {
    first_child: Option<Id>,
}

impl ChildTaskRecord {
    /// Track a single independent child.
    ///
    /// # Panics
    ///
    /// Panics if `child` was spawned into a task group, group children are tracked by their
    /// group's record.
    pub fn new(child: &TaskRef) -> Self {
        Self::with_children(core::slice::from_ref(child))
    }

    /// Track several independent children, in order.
    ///
    /// # Panics
    ///
    /// Panics if any child was spawned into a task group or is already linked into a child list
    /// (including appearing twice in `children`).
    pub fn with_children(children: &[TaskRef]) -> Self {
        // nobody can walk the list before the record is published, so the links are set up
        // without holding any lock.
        for child in children {
            assert!(
                !child.is_group_child(),
                "group children must be tracked by their group"
            );
            assert!(
                !child.is_linked(),
                "child is already linked into a child list"
            );
            child.set_next_sibling(None);
        }
        for pair in children.windows(2) {
            pair[0].set_next_sibling(Some(pair[1].id()));
        }

        Self {
            first_child: children.first().map(TaskRef::id),
        }
    }

    pub fn first_child(&self) -> Option<Id> {
        self.first_child
    }

    /// Walks the tracked children in order.
    ///
    /// The caller should hold the status lock of the task this record is registered with.
    pub fn children<'t>(&self, table: &'t TaskTable) -> Children<'t> {
        Children::new(table, self.first_child)
    }

    /// Removes a retired `child` from the list. Returns `false` if it wasn't tracked here.
    pub(crate) fn unlink(&mut self, table: &TaskTable, child: &TaskRef) -> bool {
        unlink_child(table, &mut self.first_child, child).is_some()
    }
}

impl fmt::Debug for ChildTaskRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChildTaskRecord")
            .field("first_child", &self.first_child)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskBuilder;

    #[test]
    fn tracks_children_in_order() {
        let table = TaskTable::new();
        let parent = TaskBuilder::new().try_spawn(&table).unwrap();
        let children: Vec<_> = (0..3)
            .map(|_| {
                TaskBuilder::new()
                    .child_of(&parent)
                    .try_spawn(&table)
                    .unwrap()
            })
            .collect();

        let record = ChildTaskRecord::with_children(&children);
        assert_eq!(record.first_child(), Some(children[0].id()));
        assert_eq!(record.children(&table).collect::<Vec<_>>(), children);

        // walks restart from the head every time
        assert_eq!(record.children(&table).count(), 3);
        assert_eq!(record.children(&table).count(), 3);
    }

    #[test]
    fn empty() {
        let table = TaskTable::new();
        let record = ChildTaskRecord::with_children(&[]);
        assert_eq!(record.first_child(), None);
        assert_eq!(record.children(&table).next(), None);
    }

    #[test]
    #[should_panic(expected = "group children must be tracked by their group")]
    fn rejects_group_children() {
        let table = TaskTable::new();
        let parent = TaskBuilder::new().try_spawn(&table).unwrap();
        let group = table.create_group(&parent);
        let child = TaskBuilder::new().group(&group).try_spawn(&table).unwrap();

        let _ = ChildTaskRecord::new(&child);
    }

    #[test]
    #[should_panic(expected = "child is already linked into a child list")]
    fn rejects_last_child_of_another_list() {
        let table = TaskTable::new();
        let parent = TaskBuilder::new().try_spawn(&table).unwrap();
        let spawn = || {
            TaskBuilder::new()
                .child_of(&parent)
                .try_spawn(&table)
                .unwrap()
        };
        let (a, b, c) = (spawn(), spawn(), spawn());

        let _first = ChildTaskRecord::with_children(&[a, b.clone()]);
        let _second = ChildTaskRecord::with_children(&[b, c]);
    }

    #[test]
    #[should_panic(expected = "child is already linked into a child list")]
    fn rejects_duplicates() {
        let table = TaskTable::new();
        let a = TaskBuilder::new().try_spawn(&table).unwrap();

        let _ = ChildTaskRecord::with_children(&[a.clone(), a]);
    }

    #[test]
    fn unlink_repairs_list() {
        let table = TaskTable::new();
        let parent = TaskBuilder::new().try_spawn(&table).unwrap();
        let children: Vec<_> = (0..3)
            .map(|_| {
                TaskBuilder::new()
                    .child_of(&parent)
                    .try_spawn(&table)
                    .unwrap()
            })
            .collect();
        let mut record = ChildTaskRecord::with_children(&children);

        assert!(record.unlink(&table, &children[1]));
        assert_eq!(
            record.children(&table).collect::<Vec<_>>(),
            [children[0].clone(), children[2].clone()]
        );
        assert!(!children[1].is_linked());
        assert!(!record.unlink(&table, &children[1]));

        assert!(record.unlink(&table, &children[0]));
        assert_eq!(record.first_child(), Some(children[2].id()));
    }

    #[test]
    #[should_panic(expected = "child is already linked into a child list")]
    fn rejects_linked_children() {
        let table = TaskTable::new();
        let a = TaskBuilder::new().try_spawn(&table).unwrap();
        let b = TaskBuilder::new().try_spawn(&table).unwrap();

        let _first = ChildTaskRecord::with_children(&[a.clone(), b]);
        let _second = ChildTaskRecord::new(&a);
    }
}
