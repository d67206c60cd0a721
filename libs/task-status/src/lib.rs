// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Status records for structured-concurrency tasks.
//!
//! Every task carries a chain of *status records* describing facts other threads may need to act
//! upon: the task's deadline, its independent child tasks, the task groups it owns, the callbacks
//! that must run when it is cancelled or escalated, and what the task is currently blocked on.
//!
//! The chain is protected by the task's status lock. The owning task pushes records when it enters
//! a scope that needs them and pops them again on the way out, while foreign threads that cancel
//! or escalate the task walk the chain under the same lock, run the registered callbacks and fan
//! out to the task's children and dependencies.
//!
//! ```text
//!   task ──► [dependency] ──► [cancellation] ──► [task group] ──► [deadline] ──► ∅
//!   head        innermost                                           outermost
//! ```
//!
//! Tasks themselves live in a [`TaskTable`], an arena keyed by [`task::Id`]. Child lists are
//! threaded through the children's arena entries rather than through the records, so the records
//! only ever store the ids of the first (and for groups, the last) child.

extern crate alloc;

pub mod actor;
mod chain;
mod error;
pub mod group;
mod loom;
pub mod priority;
pub mod record;
mod status;
mod sync;
mod table;
pub mod task;
#[cfg(test)]
mod test_util;

pub use actor::Actor;
pub use chain::{StatusChain, StatusGuard};
pub use error::SpawnError;
pub use group::{GroupId, TaskGroup};
pub use priority::Priority;
pub use record::{StatusRecord, StatusRecordKind};
pub use status::{Escalate, StatusRecordHandle};
pub use sync::RawStatusLock;
pub use table::{TableConfig, TaskTable};
pub use task::{TaskBuilder, TaskRef};
