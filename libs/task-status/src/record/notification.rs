// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Callbacks run on cancellation and priority escalation.
//!
//! Both record kinds are invoked synchronously by whichever thread cancels or escalates the task,
//! while that thread holds the task's status lock. The callbacks must therefore not register or
//! unregister records on the same task, and must not unwind: a panic propagates straight into the
//! cancelling (or escalating) thread.

use crate::priority::Priority;
use alloc::boxed::Box;
use core::fmt;

/// A callback to run when the task is cancelled.
pub struct CancellationNotificationRecord {
    callback: Box<dyn Fn() + Send + Sync>,
}

/// A callback to run when the task's priority is escalated.
pub struct EscalationNotificationRecord {
    callback: Box<dyn Fn(Priority) + Send + Sync>,
}

// === impl CancellationNotificationRecord ===

impl CancellationNotificationRecord {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            callback: Box::new(callback),
        }
    }

    pub fn run(&self) {
        (self.callback)();
    }
}

impl fmt::Debug for CancellationNotificationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationNotificationRecord")
            .finish_non_exhaustive()
    }
}

// === impl EscalationNotificationRecord ===

impl EscalationNotificationRecord {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(Priority) + Send + Sync + 'static,
    {
        Self {
            callback: Box::new(callback),
        }
    }

    /// Invoke the callback with the task's new priority.
    pub fn run(&self, priority: Priority) {
        (self.callback)(priority);
    }
}

impl fmt::Debug for EscalationNotificationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EscalationNotificationRecord")
            .finish_non_exhaustive()
    }
}
