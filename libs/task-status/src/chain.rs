// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use crate::record::deadline::Deadline;
use crate::record::{RecordBody, RecordId, StatusRecord};
use crate::sync::RawStatusLock;
use crate::table::TaskTable;
use crate::task::TaskRef;
use alloc::vec::Vec;
use core::fmt;
use core::iter::FusedIterator;

pub(crate) type StatusLock = lock_api::Mutex<RawStatusLock, StatusChain>;

/// Proof that the owning task's status lock is held.
///
/// Every read of a published record and every structural change of the chain goes through this
/// guard, so holding one is what makes it safe for a foreign thread to walk the chain while the
/// owning task keeps registering and unregistering records.
pub type StatusGuard<'a> = lock_api::MutexGuard<'a, RawStatusLock, StatusChain>;

/// The chain of status records registered with a task.
///
/// The chain is a stack: new records are pushed at the head and link to the previous head as
/// their parent, so walking from the head visits the innermost scope's record first. Record
/// storage is a slab local to the chain; the scope that registered a record holds the only
/// [`StatusRecordHandle`][crate::StatusRecordHandle] for it and decides when it is unlinked.
pub struct StatusChain {
    records: wasmtime_slab::Slab<StatusRecord>,
    head: Option<RecordId>,
}

/// Iterator over the records of a [`StatusChain`], innermost first.
pub struct Records<'a> {
    chain: &'a StatusChain,
    next: Option<RecordId>,
}

// === impl StatusChain ===

impl StatusChain {
    pub(crate) fn new() -> Self {
        Self {
            records: wasmtime_slab::Slab::new(),
            head: None,
        }
    }

    /// The innermost record, or `None` if nothing is registered.
    pub fn head(&self) -> Option<RecordId> {
        self.head
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn get(&self, id: RecordId) -> Option<&StatusRecord> {
        self.records.get(id.0)
    }

    pub(crate) fn get_mut(&mut self, id: RecordId) -> Option<&mut StatusRecord> {
        self.records.get_mut(id.0)
    }

    /// Walks the chain from the innermost record outwards.
    pub fn records(&self) -> Records<'_> {
        Records {
            chain: self,
            next: self.head,
        }
    }

    /// The earliest deadline of all registered deadline records.
    pub fn nearest_deadline(&self) -> Option<Deadline> {
        self.records()
            .filter_map(|(_, record)| match record.body() {
                RecordBody::Deadline(deadline) => Some(deadline.deadline()),
                _ => None,
            })
            .min()
    }

    /// Pushes `record` as the new head of the chain.
    pub(crate) fn link(&mut self, mut record: StatusRecord) -> RecordId {
        record.reset_parent(self.head);
        record.publish();

        let id = RecordId(self.records.alloc(record));
        tracing::trace!(record.id = ?id, parent = ?self.head, "StatusChain::link");
        self.head = Some(id);
        id
    }

    /// Removes `child` from whichever child list of this chain tracks it.
    ///
    /// Returns `false` if no registered record tracks `child`.
    pub(crate) fn unlink_child(&mut self, table: &TaskTable, child: &TaskRef) -> bool {
        let ids: Vec<_> = self.records().map(|(id, _)| id).collect();

        ids.into_iter().any(|id| {
            let Some(record) = self.records.get_mut(id.0) else {
                return false;
            };
            match record.body_mut() {
                RecordBody::ChildTask(record) if !child.is_group_child() => {
                    record.unlink(table, child)
                }
                RecordBody::TaskGroup(record) if child.group() == Some(record.group()) => {
                    record.unlink(table, child)
                }
                _ => false,
            }
        })
    }

    /// Removes the record `id` from the chain, repairing the link of whichever record pointed at
    /// it, and hands the record back.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not linked into this chain.
    pub(crate) fn unlink(&mut self, id: RecordId) -> StatusRecord {
        let parent = self
            .get(id)
            .map(StatusRecord::parent)
            .expect("record is not linked into this chain");

        if self.head == Some(id) {
            self.head = parent;
        } else {
            let mut cursor = self.head;
            loop {
                let current = cursor.expect("record is allocated but unreachable from the head");
                let record = self
                    .records
                    .get_mut(current.0)
                    .expect("chain links point at allocated records");

                if record.parent() == Some(id) {
                    record.splice_parent(parent);
                    break;
                }
                cursor = record.parent();
            }
        }

        tracing::trace!(record.id = ?id, ?parent, "StatusChain::unlink");
        let mut record = self.records.dealloc(id.0);
        record.unpublish();
        record
    }
}

impl fmt::Debug for StatusChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusChain")
            .field("head", &self.head)
            .field("len", &self.records.len())
            .field("records", &self.records().map(|(_, r)| r).collect::<Vec<_>>())
            .finish()
    }
}

// === impl Records ===

impl<'a> Iterator for Records<'a> {
    type Item = (RecordId, &'a StatusRecord);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        let record = self.chain.get(id)?;
        self.next = record.parent();
        Some((id, record))
    }
}

impl FusedIterator for Records<'_> {}
