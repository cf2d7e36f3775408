// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Choosing the plugin collection that receives an input report.
//!
//! Capture always wins over hit testing, as long as the captured collection is
//! still registered. A capture whose collection has been removed (for example
//! because a capture change has not been observed yet) is ignored and the
//! resolver falls back to hit testing.

use kurbo::Point;

use crate::input::StylusInputReport;
use crate::plugin::PluginCollection;
use crate::registry::TargetRegistry;
use crate::types::CollectionId;

/// How a target was chosen.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Resolution {
    /// The captured collection.
    Captured(CollectionId),
    /// The front-most collection under the report's last point.
    Hit(CollectionId),
    /// Nothing qualified.
    None,
}

impl Resolution {
    /// The chosen collection, if any.
    pub fn target(self) -> Option<CollectionId> {
        match self {
            Self::Captured(id) | Self::Hit(id) => Some(id),
            Self::None => None,
        }
    }
}

/// Resolves input reports to plugin collections.
#[derive(Copy, Clone, Debug, Default)]
pub struct TargetResolver;

impl TargetResolver {
    /// Resolve `report` against `registry`, honoring `capture` when it is still registered.
    pub fn resolve<N, P>(
        &self,
        registry: &TargetRegistry<N, P>,
        report: &StylusInputReport<P::CustomData>,
        capture: Option<CollectionId>,
    ) -> Resolution
    where
        N: Copy + Eq,
        P: PluginCollection,
    {
        if let Some(id) = capture {
            if registry.contains(id) {
                tracing::trace!(collection = id.get(), "resolved to capture");
                return Resolution::Captured(id);
            }
            tracing::trace!(collection = id.get(), "ignoring stale capture");
        }
        let Some(point) = self.hit_test_point(report) else {
            tracing::trace!("no complete point record to hit test");
            return Resolution::None;
        };
        match registry.hit_test(point) {
            Some(id) => {
                tracing::trace!(
                    collection = id.get(),
                    x = point.x,
                    y = point.y,
                    "resolved by hit test"
                );
                Resolution::Hit(id)
            }
            None => Resolution::None,
        }
    }

    /// View-space point used to hit test `report`.
    ///
    /// This is the report's last complete point record, snapped to whole
    /// screen pixels. Returns `None` when the packet holds no complete record.
    pub fn hit_test_point<D>(&self, report: &StylusInputReport<D>) -> Option<Point> {
        let device = report.last_device_point()?;
        Some(report.transforms().hit_test_point(device))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::description::PointDescription;
    use crate::plugin::recording::{Log, Recorder};
    use crate::transform::SurfaceTransforms;
    use crate::tree::test_tree::VecTree;
    use crate::types::{DeviceId, StylusAction};
    use alloc::vec;
    use alloc::vec::Vec;
    use kurbo::{Affine, Rect};

    fn report(packet: Vec<i32>, transforms: SurfaceTransforms) -> StylusInputReport<u32> {
        StylusInputReport::new(
            DeviceId(1),
            StylusAction::Down,
            PointDescription::MOUSE,
            packet,
            transforms,
        )
    }

    fn two_siblings() -> (TargetRegistry<usize, Recorder>, CollectionId, CollectionId) {
        let log = Log::default();
        let mut t = VecTree::new();
        let root = t.add(None);
        let b = t.add(Some(root));
        let a = t.add(Some(root));
        let mut reg = TargetRegistry::new();
        let ib = reg
            .insert(
                &t,
                b,
                Affine::IDENTITY,
                Recorder::new("b", Rect::new(100.0, 100.0, 200.0, 200.0), &log),
            )
            .unwrap();
        let ia = reg
            .insert(
                &t,
                a,
                Affine::IDENTITY,
                Recorder::new("a", Rect::new(0.0, 0.0, 50.0, 50.0), &log),
            )
            .unwrap();
        (reg, ia, ib)
    }

    #[test]
    fn capture_wins_over_hit_testing() {
        let (reg, ia, ib) = two_siblings();
        let r = report(vec![10, 10, 0, 1], SurfaceTransforms::default());
        assert_eq!(TargetResolver.resolve(&reg, &r, None), Resolution::Hit(ia));
        assert_eq!(
            TargetResolver.resolve(&reg, &r, Some(ib)),
            Resolution::Captured(ib)
        );
    }

    #[test]
    fn stale_capture_falls_back_to_hit_testing() {
        let (mut reg, ia, ib) = two_siblings();
        let r = report(vec![10, 10, 0, 1], SurfaceTransforms::default());
        reg.remove(ib);
        assert_eq!(TargetResolver.resolve(&reg, &r, Some(ib)), Resolution::Hit(ia));
    }

    #[test]
    fn last_record_is_hit_tested_on_whole_pixels() {
        let (reg, ia, ib) = two_siblings();
        // Earlier records are ignored; 99.6 rounds to pixel 100, inside `b`.
        let t = SurfaceTransforms::new(Affine::scale(0.1), Affine::IDENTITY);
        let r = report(vec![100, 100, 0, 1, 996, 996, 0, 1], t);
        assert_eq!(TargetResolver.hit_test_point(&r), Some(Point::new(100.0, 100.0)));
        assert_eq!(TargetResolver.resolve(&reg, &r, None), Resolution::Hit(ib));
        assert_ne!(TargetResolver.resolve(&reg, &r, None).target(), Some(ia));
    }

    #[test]
    fn short_packets_only_resolve_through_capture() {
        let (reg, _, ib) = two_siblings();
        let r = report(vec![10, 10, 0], SurfaceTransforms::default());
        assert_eq!(TargetResolver.resolve(&reg, &r, None), Resolution::None);
        assert_eq!(
            TargetResolver.resolve(&reg, &r, Some(ib)).target(),
            Some(ib)
        );
    }
}
