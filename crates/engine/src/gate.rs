// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-flight admission gate.
//!
//! A one-permit semaphore. At most one [`GatePermit`] exists at a time and it
//! returns the permit when dropped, so every exit path of the job that holds
//! it (completion, failure, panic unwinding) frees the slot exactly once.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

#[derive(Debug, Clone)]
pub struct ConcurrencyGate {
    slot: Arc<Semaphore>,
}

impl Default for ConcurrencyGate {
    fn default() -> Self {
        Self { slot: Arc::new(Semaphore::new(1)) }
    }
}

impl ConcurrencyGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the gate if it is free. Never blocks.
    pub fn try_acquire(&self) -> Option<GatePermit> {
        Arc::clone(&self.slot).try_acquire_owned().ok().map(|permit| GatePermit { _permit: permit })
    }

    pub fn is_held(&self) -> bool {
        self.slot.available_permits() == 0
    }
}

/// Ownership of the gate.
#[derive(Debug)]
#[must_use = "the gate is released as soon as the permit is dropped"]
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
}

impl GatePermit {
    /// Release the gate now.
    pub fn release(self) {}
}

#[cfg(test)]
#[path = "gate_tests.rs"]
mod tests;
