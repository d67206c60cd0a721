// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use crate::actor::Actor;
use crate::priority::Priority;
use crate::status::Escalate;
use crate::task::{Id, TaskRef};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::util::SubscriberInitExt;

/// Installs a thread-local `fmt` subscriber for the duration of a test.
#[must_use]
pub fn trace_init() -> tracing::subscriber::DefaultGuard {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_thread_names(true)
        .set_default()
}

/// An [`Escalate`] implementation that only records the calls it receives.
#[derive(Default)]
pub struct CountingEscalator {
    calls: Mutex<Vec<(Id, Priority)>>,
}

impl CountingEscalator {
    pub fn calls(&self) -> Vec<(Id, Priority)> {
        self.calls.lock().unwrap().clone()
    }
}

impl Escalate for CountingEscalator {
    fn escalate(&self, task: &TaskRef, priority: Priority) {
        self.calls.lock().unwrap().push((task.id(), priority));
    }
}

/// An [`Actor`] that records which waiting tasks were escalated.
#[derive(Default)]
pub struct RecordingActor {
    calls: Mutex<Vec<(Id, Priority)>>,
}

impl RecordingActor {
    pub fn calls(&self) -> Vec<(Id, Priority)> {
        self.calls.lock().unwrap().clone()
    }
}

impl Actor for RecordingActor {
    fn escalate(&self, waiting: &TaskRef, priority: Priority) {
        tracing::trace!(task.tid = %waiting.id(), %priority, "RecordingActor::escalate");
        self.calls.lock().unwrap().push((waiting.id(), priority));
    }
}
