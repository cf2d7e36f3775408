// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Coordinate transforms between device, screen, view, and element spaces.
//!
//! - Device space: raw digitizer units as found in packets.
//! - Screen space: whole device pixels.
//! - View space: the measured coordinate space of the destination surface.
//! - Element space: the local space of a plugin collection's node.
//!
//! Transforms are supplied per surface by the caller and composed per
//! dispatch. Nothing here is cached beyond a single payload.

use kurbo::{Affine, Point};

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;

/// Transforms supplied for one input surface.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SurfaceTransforms {
    /// Raw device units to screen pixels.
    pub device_to_screen: Affine,
    /// Screen pixels to the surface's measured (view) coordinates.
    pub screen_to_measured: Affine,
}

impl Default for SurfaceTransforms {
    fn default() -> Self {
        Self {
            device_to_screen: Affine::IDENTITY,
            screen_to_measured: Affine::IDENTITY,
        }
    }
}

impl SurfaceTransforms {
    /// Create transforms for a surface.
    pub const fn new(device_to_screen: Affine, screen_to_measured: Affine) -> Self {
        Self {
            device_to_screen,
            screen_to_measured,
        }
    }

    /// Transforms for mouse input: mouse positions already are screen pixels.
    pub const fn for_mouse(&self) -> Self {
        Self {
            device_to_screen: Affine::IDENTITY,
            screen_to_measured: self.screen_to_measured,
        }
    }

    /// Composite device → view transform, without pixel rounding.
    pub fn device_to_view(&self) -> Affine {
        self.screen_to_measured * self.device_to_screen
    }

    /// Map a device-space point to the view-space point used for hit testing.
    ///
    /// The screen-space position is rounded to whole device pixels before the
    /// screen → measured step, so hit testing sees the same pixel the user sees.
    pub fn hit_test_point(&self, device: Point) -> Point {
        let screen = self.device_to_screen * device;
        let pixel = Point::new(screen.x.round(), screen.y.round());
        self.screen_to_measured * pixel
    }
}

/// Frozen composition of device → view and view → element transforms.
///
/// A chain is built for one payload addressed to one plugin collection and is
/// never mutated afterwards.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TransformChain {
    device_to_view: Affine,
    view_to_element: Affine,
    combined: Affine,
}

impl TransformChain {
    /// Compose a chain.
    pub fn new(device_to_view: Affine, view_to_element: Affine) -> Self {
        Self {
            device_to_view,
            view_to_element,
            combined: view_to_element * device_to_view,
        }
    }

    /// Device → view part of the chain.
    pub fn device_to_view(&self) -> Affine {
        self.device_to_view
    }

    /// View → element part of the chain.
    pub fn view_to_element(&self) -> Affine {
        self.view_to_element
    }

    /// Map a device-space point into element space.
    pub fn to_element(&self, device: Point) -> Point {
        self.combined * device
    }

    /// Map a device-space point into view space.
    pub fn to_view(&self, device: Point) -> Point {
        self.device_to_view * device
    }

    /// Map an element-space point back into device space.
    ///
    /// Returns `None` when the chain is not invertible.
    pub fn to_device(&self, element: Point) -> Option<Point> {
        let det = self.combined.determinant();
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        Some(self.combined.inverse() * element)
    }
}
