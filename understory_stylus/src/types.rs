// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Identifiers and small enums shared by the registry, resolver, and coordinator.

/// Identity of a plugin collection registered in a [`TargetRegistry`](crate::TargetRegistry).
///
/// Identifiers are never reused by the registry that issued them, so a stale
/// id held by a capture or a previously built payload can always be detected
/// with [`TargetRegistry::contains`](crate::TargetRegistry::contains).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct CollectionId(pub(crate) u64);

impl CollectionId {
    /// Raw numeric value, for diagnostics.
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Identity of an input device (one stylus, one touch digitizer, ...).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct DeviceId(pub u32);

/// Identity of an input surface (a window or other top-level presentation target).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(pub u32);

/// Class of the physical device that produced a sample.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum DeviceClass {
    /// Touch digitizer.
    Touch,
    /// Pen digitizer.
    Pen,
    /// Anything else. Rejected when building samples.
    Other,
}

/// Action carried by a stylus input report.
///
/// Only [`Down`](Self::Down), [`Move`](Self::Move) and [`Up`](Self::Up)
/// participate in plugin dispatch; see [`StylusAction::is_dispatched`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum StylusAction {
    /// The stylus became known to the system.
    Activate,
    /// The stylus was removed from the system.
    Deactivate,
    /// The stylus entered the detection range of the digitizer.
    InRange,
    /// The stylus left the detection range of the digitizer.
    OutOfRange,
    /// The stylus moved while hovering above the surface.
    InAirMove,
    /// The stylus touched the surface.
    Down,
    /// The stylus moved while in contact with the surface.
    Move,
    /// The stylus lifted off the surface.
    Up,
}

impl StylusAction {
    /// Whether reports with this action are routed to plugin collections.
    pub const fn is_dispatched(self) -> bool {
        matches!(self, Self::Down | Self::Move | Self::Up)
    }
}
