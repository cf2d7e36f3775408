// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types.
//!
//! Stale ids and detached tree nodes are not errors anywhere in this crate;
//! they resolve to `None`. The types here cover contract violations and
//! failures reported by plugin collections.

use crate::types::{CollectionId, DeviceClass};

/// A malformed [`PointDescription`](crate::PointDescription).
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DescriptionError {
    /// The first two properties are not `X` then `Y`.
    #[error("point descriptions must start with X then Y")]
    MissingCoordinates,
    /// `X` or `Y` is declared but not stored in the record.
    #[error("X and Y must be stored in every record")]
    SynthesizedCoordinates,
    /// A non-button property follows a button property.
    #[error("button properties must come after all other properties")]
    ButtonOrder,
}

/// Failure to build a [`RawSample`](crate::RawSample).
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SampleError {
    /// The source reported a device class that cannot be dispatched.
    #[error("unsupported device class {0:?}")]
    UnsupportedDevice(DeviceClass),
}

/// Failure to mutate a [`TargetRegistry`](crate::TargetRegistry).
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// The node already anchors a registered collection.
    #[error("node already anchors plugin collection {existing:?}")]
    DuplicateNode {
        /// The collection already registered for the node.
        existing: CollectionId,
    },
}

/// Failure while dispatching input to plugin collections.
///
/// `E` is the error type of the plugin collections involved. Notifications
/// delivered before the failure are not rolled back.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError<E> {
    /// A plugin collection failed while handling a notification.
    #[error("plugin collection {target:?} failed while handling input")]
    Plugin {
        /// The collection that reported the failure.
        target: CollectionId,
        /// The collection's error.
        #[source]
        source: E,
    },
    /// A dispatch started while another one still held the processing gate.
    #[error("input dispatch re-entered while notifications were in progress")]
    Reentrant,
}
