// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Suppression of nested dispatch while plugin notifications run.
//!
//! A [`ProcessingGate`] is shared between the dispatch coordinators of one
//! input thread and the event loop that drives them. While a guard is alive,
//! the gate reports itself as suppressed; a coordinator refuses to start a new
//! dispatch through a suppressed gate, and event loops can check
//! [`ProcessingGate::is_suppressed`] before pumping work that could re-enter.
//!
//! Guards release the gate when dropped, including on early returns and
//! unwinding.

use alloc::rc::Rc;
use core::cell::Cell;

/// Shared "notifications in progress" flag.
///
/// Clones refer to the same gate.
#[derive(Clone, Debug, Default)]
pub struct ProcessingGate {
    depth: Rc<Cell<u32>>,
}

impl ProcessingGate {
    /// Create an open gate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a guard is currently alive.
    pub fn is_suppressed(&self) -> bool {
        self.depth.get() > 0
    }

    /// Suppress the gate until the returned guard is dropped. Guards nest.
    pub fn suppress(&self) -> ProcessingGuard {
        self.depth.set(self.depth.get() + 1);
        ProcessingGuard {
            depth: self.depth.clone(),
        }
    }

    /// Suppress the gate only if it is currently open.
    pub fn try_suppress(&self) -> Option<ProcessingGuard> {
        if self.is_suppressed() {
            None
        } else {
            Some(self.suppress())
        }
    }
}

/// Keeps a [`ProcessingGate`] suppressed while alive.
#[derive(Debug)]
#[must_use = "the gate is released as soon as the guard is dropped"]
pub struct ProcessingGuard {
    depth: Rc<Cell<u32>>,
}

impl Drop for ProcessingGuard {
    fn drop(&mut self) {
        self.depth.set(self.depth.get().saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guards_nest_and_release() {
        let gate = ProcessingGate::new();
        let shared = gate.clone();
        assert!(!gate.is_suppressed());
        let outer = gate.suppress();
        assert!(shared.is_suppressed());
        let inner = shared.suppress();
        drop(outer);
        assert!(gate.is_suppressed());
        drop(inner);
        assert!(!gate.is_suppressed());
    }

    #[test]
    fn try_suppress_refuses_while_held() {
        let gate = ProcessingGate::new();
        let guard = gate.try_suppress();
        assert!(guard.is_some());
        assert!(gate.try_suppress().is_none());
        drop(guard);
        assert!(gate.try_suppress().is_some());
    }

    #[test]
    fn early_return_releases_gate() {
        fn work(gate: &ProcessingGate) -> Result<(), ()> {
            let _guard = gate.suppress();
            Err(())
        }
        let gate = ProcessingGate::new();
        assert!(work(&gate).is_err());
        assert!(!gate.is_suppressed());
    }
}
