// Copyright 2025. Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use crate::chain::StatusChain;
use crate::error::SpawnError;
use crate::group::{GroupId, TaskGroup};
use crate::priority::Priority;
use crate::record::StatusRecord;
use crate::record::deadline::{Deadline, DeadlineRecord};
use crate::table::TaskTable;
use crate::task::state::State;
use crate::task::{Task, TaskRef};
use alloc::string::ToString;
use core::panic::Location;

/// Configures and spawns tasks into a [`TaskTable`].
///
/// Child tasks inherit their parent's cancellation and (if higher than the requested priority)
/// its max priority at the moment they are spawned.
#[derive(Debug)]
pub struct TaskBuilder<'a> {
    location: Option<Location<'a>>,
    name: Option<&'a str>,
    priority: Priority,
    parent: Option<&'a TaskRef>,
    group: Option<GroupId>,
    deadline: Option<Deadline>,
}

impl<'a> TaskBuilder<'a> {
    pub fn new() -> Self {
        Self {
            location: None,
            name: None,
            priority: Priority::DEFAULT,
            parent: None,
            group: None,
            deadline: None,
        }
    }

    /// Override the name of tasks spawned by this builder.
    ///
    /// By default, tasks are unnamed.
    pub fn name(mut self, name: &'a str) -> Self {
        self.name = Some(name);
        self
    }

    /// Override the base priority of tasks spawned by this builder.
    ///
    /// By default, tasks run at [`Priority::DEFAULT`].
    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Spawn the task as an independent child of `parent`.
    ///
    /// This only records the relationship; the parent still has to track the child through a
    /// [`ChildTaskRecord`][crate::record::child::ChildTaskRecord].
    pub fn child_of(mut self, parent: &'a TaskRef) -> Self {
        self.parent = Some(parent);
        self.group = None;
        self
    }

    /// Spawn the task as a member of `group`, its parent becomes the group's owner.
    ///
    /// The task still has to be attached with [`TaskGroup::attach_child`], or spawned through
    /// [`TaskGroup::spawn`] which does both.
    pub fn group(self, group: &'a TaskGroup<'_>) -> Self {
        self.in_group(group.owner(), group.id())
    }

    pub(crate) fn in_group(mut self, owner: &'a TaskRef, group: GroupId) -> Self {
        self.parent = Some(owner);
        self.group = Some(group);
        self
    }

    /// Give tasks spawned by this builder an initial deadline.
    ///
    /// The deadline record is linked before the task is published, so it is the outermost
    /// record of the task's chain and stays registered for the task's whole life.
    pub fn deadline(mut self, deadline: Deadline) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Override the source code location that will be associated with tasks spawned by this builder.
    ///
    /// By default, tasks will inherit the source code location of where they have been first spawned.
    pub fn location(mut self, location: Location<'a>) -> Self {
        self.location = Some(location);
        self
    }

    /// Attempt to spawn a task into `table`.
    ///
    /// # Errors
    ///
    /// Returns [`SpawnError::TableFull`] when the table has no free slot left.
    #[track_caller]
    pub fn try_spawn(&self, table: &TaskTable) -> Result<TaskRef, SpawnError> {
        let loc = self.location.as_ref().unwrap_or(Location::caller());

        let (priority, cancelled) = match self.parent {
            Some(parent) => (
                self.priority.max(parent.max_priority()),
                parent.is_cancelled(),
            ),
            None => (self.priority, false),
        };

        // the task isn't reachable by anyone else yet, so initial records go in without taking
        // the status lock.
        let mut chain = StatusChain::new();
        if let Some(deadline) = self.deadline {
            chain.link(StatusRecord::from(DeadlineRecord::new(deadline)));
        }

        let task = table.insert_with(|id| {
            let span = tracing::trace_span!(
                "task",
                task.tid = %id,
                task.name = ?self.name,
                task.parent = ?self.parent.map(TaskRef::id),
                loc.file = loc.file(),
                loc.line = loc.line(),
                loc.col = loc.column(),
            );

            Task::new(
                id,
                self.name.map(ToString::to_string),
                State::new(priority, cancelled),
                chain,
                self.parent,
                self.group,
                span,
            )
        })?;

        tracing::trace!(task.tid = %task.id(), %priority, cancelled, "spawned task");

        Ok(task)
    }
}

impl Default for TaskBuilder<'_> {
    fn default() -> Self {
        Self::new()
    }
}
