// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Manipulation state tracking per input stream.
//!
//! A manipulation is a continuous gesture (pan, zoom, rotate) recognized on top
//! of raw pointer input. While one is active, the raw stream belongs to the
//! gesture recognizer. When it ends, collaborators want to know whether the
//! stream should be offered to another device class (for example promoted to
//! mouse input). That decision depends on *how* the gesture ended:
//!
//! - A normal completion clears the promote flag: the gesture consumed the input.
//! - A cancellation sets the promote flag: the input was not consumed and should
//!   be replayed as another device class.
//!
//! ## Usage
//!
//! ```
//! use understory_event_state::manipulation::{ManipulationState, ManipulationTracker};
//!
//! let mut tracker: ManipulationTracker<u32> = ManipulationTracker::new();
//!
//! assert!(tracker.start(1));
//! assert!(tracker.is_active(&1));
//! // A second start on an active stream is ignored.
//! assert!(!tracker.start(1));
//!
//! assert!(tracker.end(&1, false));
//! assert_eq!(tracker.state(&1), ManipulationState::Idle);
//! assert!(!tracker.promote(&1));
//! ```
//!
//! ## Transition Rules
//!
//! 1. `start` moves `Idle → Active` and clears the promote flag.
//! 2. `end(cancelled)` moves `Active → Idle` and sets `promote = cancelled`.
//! 3. `start` on an active stream and `end` on an idle stream are no-ops.
//! 4. `reset` forgets the stream entirely, as if it had never been seen.
//!
//! The tracker only stores and exposes the flag; it never performs the promotion.

use alloc::collections::BTreeMap;

/// Whether a manipulation is currently in progress on a stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ManipulationState {
    /// No manipulation is in progress.
    #[default]
    Idle,
    /// A manipulation gesture owns the stream.
    Active,
}

#[derive(Clone, Copy, Debug, Default)]
struct Stream {
    state: ManipulationState,
    promote: bool,
}

/// Per-stream manipulation state machine.
///
/// Streams are keyed by an application-specific identifier (a device id, a
/// pointer id, ...). Unknown streams report [`ManipulationState::Idle`] with
/// the promote flag cleared.
#[derive(Clone, Debug)]
pub struct ManipulationTracker<K> {
    streams: BTreeMap<K, Stream>,
}

impl<K: Ord + Clone + core::fmt::Debug> ManipulationTracker<K> {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self {
            streams: BTreeMap::new(),
        }
    }

    /// Begin a manipulation on `stream`.
    ///
    /// Returns `true` if the stream transitioned from idle to active.
    pub fn start(&mut self, stream: K) -> bool {
        let entry = self.streams.entry(stream.clone()).or_default();
        if entry.state == ManipulationState::Active {
            return false;
        }
        entry.state = ManipulationState::Active;
        entry.promote = false;
        tracing::trace!(?stream, "manipulation started");
        true
    }

    /// End the manipulation on `stream`.
    ///
    /// `cancelled` becomes the new promote flag. Returns `true` if the stream
    /// transitioned from active to idle; ending an idle stream changes nothing.
    pub fn end(&mut self, stream: &K, cancelled: bool) -> bool {
        let Some(entry) = self.streams.get_mut(stream) else {
            return false;
        };
        if entry.state != ManipulationState::Active {
            return false;
        }
        entry.state = ManipulationState::Idle;
        entry.promote = cancelled;
        tracing::trace!(?stream, cancelled, "manipulation ended");
        true
    }

    /// Current state of `stream`.
    pub fn state(&self, stream: &K) -> ManipulationState {
        self.streams
            .get(stream)
            .map(|s| s.state)
            .unwrap_or_default()
    }

    /// Whether a manipulation is active on `stream`.
    pub fn is_active(&self, stream: &K) -> bool {
        self.state(stream) == ManipulationState::Active
    }

    /// The promote flag recorded when the last manipulation on `stream` ended.
    pub fn promote(&self, stream: &K) -> bool {
        self.streams.get(stream).is_some_and(|s| s.promote)
    }

    /// Forget `stream`. Returns `true` if it was tracked.
    pub fn reset(&mut self, stream: &K) -> bool {
        self.streams.remove(stream).is_some()
    }

    /// Forget all streams.
    pub fn clear(&mut self) {
        self.streams.clear();
    }

    /// Iterate the streams with an active manipulation.
    pub fn active_streams(&self) -> impl Iterator<Item = &K> {
        self.streams
            .iter()
            .filter(|(_, s)| s.state == ManipulationState::Active)
            .map(|(k, _)| k)
    }
}

impl<K: Ord + Clone + core::fmt::Debug> Default for ManipulationTracker<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    #[test]
    fn unknown_stream_is_idle_without_promote() {
        let tracker: ManipulationTracker<u32> = ManipulationTracker::new();
        assert_eq!(tracker.state(&3), ManipulationState::Idle);
        assert!(!tracker.promote(&3));
    }

    #[test]
    fn normal_end_clears_promote() {
        let mut tracker: ManipulationTracker<u32> = ManipulationTracker::new();
        tracker.start(1);
        assert!(tracker.end(&1, false));
        assert!(!tracker.promote(&1));
        assert_eq!(tracker.state(&1), ManipulationState::Idle);
    }

    #[test]
    fn cancelled_end_sets_promote() {
        let mut tracker: ManipulationTracker<u32> = ManipulationTracker::new();
        tracker.start(1);
        assert!(tracker.end(&1, true));
        assert!(tracker.promote(&1));
    }

    #[test]
    fn start_clears_previous_promote() {
        let mut tracker: ManipulationTracker<u32> = ManipulationTracker::new();
        tracker.start(1);
        tracker.end(&1, true);
        assert!(tracker.promote(&1));
        assert!(tracker.start(1));
        assert!(!tracker.promote(&1));
        assert!(tracker.is_active(&1));
    }

    #[test]
    fn end_on_idle_stream_is_ignored() {
        let mut tracker: ManipulationTracker<u32> = ManipulationTracker::new();
        assert!(!tracker.end(&1, true));
        assert!(!tracker.promote(&1));

        tracker.start(1);
        tracker.end(&1, true);
        // A stray second end must not overwrite the recorded flag.
        assert!(!tracker.end(&1, false));
        assert!(tracker.promote(&1));
    }

    #[test]
    fn repeated_start_is_ignored() {
        let mut tracker: ManipulationTracker<u32> = ManipulationTracker::new();
        assert!(tracker.start(1));
        assert!(!tracker.start(1));
        assert!(tracker.is_active(&1));
    }

    #[test]
    fn streams_are_independent() {
        let mut tracker: ManipulationTracker<u32> = ManipulationTracker::new();
        tracker.start(1);
        tracker.start(2);
        tracker.end(&2, true);
        assert!(tracker.is_active(&1));
        assert!(!tracker.is_active(&2));
        assert!(tracker.promote(&2));
        assert!(!tracker.promote(&1));
        let active: Vec<u32> = tracker.active_streams().copied().collect();
        assert_eq!(active, [1]);
    }

    #[test]
    fn reset_forgets_stream() {
        let mut tracker: ManipulationTracker<u32> = ManipulationTracker::new();
        tracker.start(1);
        assert!(tracker.reset(&1));
        assert!(!tracker.reset(&1));
        assert_eq!(tracker.state(&1), ManipulationState::Idle);
    }
}
