// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_event_state --heading-base-level=0

//! Understory Event State: Common event state managers for UI interactions.
//!
//! This crate provides small, focused state machines for UI interactions that
//! require stateful tracking across multiple events.
//!
//! - [`manipulation`]: Track whether a continuous manipulation gesture is active
//!   per input stream, and whether the stream should be promoted to another
//!   device class once the gesture ends.
//!
//! ## Manipulation Tracking
//!
//! ```rust
//! use understory_event_state::manipulation::{ManipulationState, ManipulationTracker};
//!
//! let mut tracker: ManipulationTracker<u32> = ManipulationTracker::new();
//!
//! tracker.start(7);
//! assert_eq!(tracker.state(&7), ManipulationState::Active);
//!
//! // A cancelled manipulation asks collaborators to promote the stream.
//! tracker.end(&7, true);
//! assert_eq!(tracker.state(&7), ManipulationState::Idle);
//! assert!(tracker.promote(&7));
//! ```
//!
//! The state managers do not assume any particular UI framework; they accept
//! application-specific stream identifiers and only store what collaborators
//! need to query later.
//!
//! This crate is `no_std` compatible (with `alloc`).

#![no_std]

extern crate alloc;

pub mod manipulation;
