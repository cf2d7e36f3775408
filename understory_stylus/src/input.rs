// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canonical input reports and the per-target payloads built from them.
//!
//! A [`StylusInputReport`] is the canonical representation of one input event
//! as the rest of the pipeline sees it. A [`RawStylusInput`] is a copy of its
//! packet addressed to one plugin collection, with that collection's
//! transform chain attached. Plugins read and may correct points through the
//! payload; the coordinator copies corrections back into the report.

use alloc::vec::Vec;

use kurbo::Point;
use smallvec::SmallVec;

use crate::description::{PointDescription, PointProperty};
use crate::sample::round_to_i32;
use crate::transform::{SurfaceTransforms, TransformChain};
use crate::types::{CollectionId, DeviceId, StylusAction};

/// When a piece of custom data was attached to a payload.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum CustomDataCategory {
    /// Attached before the owning thread dispatched the payload (for example
    /// by plugins running on a real-time input thread).
    Pre,
    /// Attached while the owning thread delivered the payload.
    Post,
}

/// Data a plugin asked to receive back once its payload has been processed.
#[derive(Clone, Debug, PartialEq)]
pub struct CustomData<D> {
    /// Index of the owning plugin within its collection.
    pub owner: usize,
    /// When the data was attached.
    pub category: CustomDataCategory,
    /// The plugin's data.
    pub data: D,
}

/// Packet data addressed to a single plugin collection.
#[derive(Clone, Debug)]
pub struct RawStylusInput<D> {
    target: CollectionId,
    device: DeviceId,
    action: StylusAction,
    timestamp: u32,
    description: PointDescription,
    packet: Vec<i32>,
    chain: TransformChain,
    modified: bool,
    category: CustomDataCategory,
    custom_data: SmallVec<[CustomData<D>; 2]>,
}

impl<D> RawStylusInput<D> {
    /// Build a payload for `target` from the report's current packet.
    pub fn new(report: &StylusInputReport<D>, chain: TransformChain, target: CollectionId) -> Self {
        Self {
            target,
            device: report.device,
            action: report.action,
            timestamp: report.timestamp,
            description: report.description.clone(),
            packet: report.packet.clone(),
            chain,
            modified: false,
            category: CustomDataCategory::Pre,
            custom_data: SmallVec::new(),
        }
    }

    /// Collection this payload is addressed to.
    pub fn target(&self) -> CollectionId {
        self.target
    }

    /// Device that produced the input.
    pub fn device(&self) -> DeviceId {
        self.device
    }

    /// Action of the originating report.
    pub fn action(&self) -> StylusAction {
        self.action
    }

    /// Timestamp of the originating report, in milliseconds.
    pub fn timestamp(&self) -> u32 {
        self.timestamp
    }

    /// Layout of the packet records.
    pub fn description(&self) -> &PointDescription {
        &self.description
    }

    /// Raw packet, in device units.
    pub fn packet(&self) -> &[i32] {
        &self.packet
    }

    /// Transform chain from device space to the target's element space.
    pub fn transform_chain(&self) -> &TransformChain {
        &self.chain
    }

    /// Points of the packet in the target's element space.
    pub fn points(&self) -> Vec<Point> {
        packet_points(&self.description, &self.packet)
            .map(|p| self.chain.to_element(p))
            .collect()
    }

    /// Replace the positions of the packet's points with element-space `points`.
    ///
    /// The number of points must match the number of records, and the
    /// transform chain must be invertible; otherwise nothing changes and
    /// `false` is returned. Other properties of each record are kept.
    pub fn set_points(&mut self, points: &[Point]) -> bool {
        let stride = self.description.stride();
        if points.len() != self.description.record_count(self.packet.len()) {
            return false;
        }
        let (Some(ix), Some(iy)) = (
            self.description.index_of(PointProperty::X),
            self.description.index_of(PointProperty::Y),
        ) else {
            return false;
        };
        let mut device_points = Vec::with_capacity(points.len());
        for p in points {
            let Some(d) = self.chain.to_device(*p) else {
                return false;
            };
            device_points.push(d);
        }
        for (record, d) in self.packet.chunks_exact_mut(stride).zip(device_points) {
            record[ix] = round_to_i32(d.x);
            record[iy] = round_to_i32(d.y);
        }
        self.modified = true;
        true
    }

    /// Replace the whole packet.
    ///
    /// The length must be a multiple of the description's stride; otherwise
    /// nothing changes and `false` is returned.
    pub fn set_packet(&mut self, packet: Vec<i32>) -> bool {
        if packet.len() % self.description.stride() != 0 {
            return false;
        }
        self.packet = packet;
        self.modified = true;
        true
    }

    /// Whether a plugin corrected the packet.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Ask for `data` to be handed back to plugin `owner` once the payload is processed.
    pub fn notify_when_processed(&mut self, owner: usize, data: D) {
        self.custom_data.push(CustomData {
            owner,
            category: self.category,
            data,
        });
    }

    /// Attached custom data, in attachment order.
    pub fn custom_data(&self) -> &[CustomData<D>] {
        &self.custom_data
    }

    pub(crate) fn begin_delivery(&mut self) {
        self.category = CustomDataCategory::Post;
    }
}

/// The canonical representation of one input event.
#[derive(Clone, Debug)]
pub struct StylusInputReport<D> {
    /// Device that produced the input.
    pub device: DeviceId,
    /// What happened.
    pub action: StylusAction,
    /// Timestamp in milliseconds.
    pub timestamp: u32,
    description: PointDescription,
    packet: Vec<i32>,
    transforms: SurfaceTransforms,
    points: Vec<Point>,
    point_updates: u32,
    raw_input: Option<RawStylusInput<D>>,
}

impl<D> StylusInputReport<D> {
    /// Create a report and compute its view-space points.
    pub fn new(
        device: DeviceId,
        action: StylusAction,
        description: PointDescription,
        packet: Vec<i32>,
        transforms: SurfaceTransforms,
    ) -> Self {
        let mut report = Self {
            device,
            action,
            timestamp: 0,
            description,
            packet,
            transforms,
            points: Vec::new(),
            point_updates: 0,
            raw_input: None,
        };
        report.update_points();
        report
    }

    /// Set the timestamp.
    pub fn with_timestamp(mut self, timestamp: u32) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Layout of the packet records.
    pub fn description(&self) -> &PointDescription {
        &self.description
    }

    /// Raw packet, in device units.
    pub fn packet(&self) -> &[i32] {
        &self.packet
    }

    /// Transforms of the surface the report was produced for.
    pub fn transforms(&self) -> &SurfaceTransforms {
        &self.transforms
    }

    /// Device-space position of the last complete record, if any.
    pub fn last_device_point(&self) -> Option<Point> {
        packet_points(&self.description, &self.packet).last()
    }

    /// View-space points, as of the last [`update_points`](Self::update_points).
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// How many times the view-space points have been recomputed.
    pub fn point_updates(&self) -> u32 {
        self.point_updates
    }

    /// Recompute the view-space points from the packet.
    pub fn update_points(&mut self) {
        let device_to_view = self.transforms.device_to_view();
        self.points.clear();
        self.points.extend(
            packet_points(&self.description, &self.packet).map(|p| device_to_view * p),
        );
        self.point_updates += 1;
    }

    /// Payload previously attached to this report, if any.
    pub fn raw_input(&self) -> Option<&RawStylusInput<D>> {
        self.raw_input.as_ref()
    }

    /// Mutable access to the attached payload.
    pub fn raw_input_mut(&mut self) -> Option<&mut RawStylusInput<D>> {
        self.raw_input.as_mut()
    }

    /// Attach a payload, typically one built and delivered ahead of time on a
    /// real-time input thread. Returns the payload it replaces.
    pub fn attach_raw_input(&mut self, input: RawStylusInput<D>) -> Option<RawStylusInput<D>> {
        self.raw_input.replace(input)
    }

    pub(crate) fn take_raw_input(&mut self) -> Option<RawStylusInput<D>> {
        self.raw_input.take()
    }

    /// Copy a corrected packet back into the canonical report.
    pub(crate) fn apply_correction(&mut self, input: &RawStylusInput<D>) {
        self.packet.clear();
        self.packet.extend_from_slice(&input.packet);
    }
}

/// Device-space positions of every complete record of `packet`.
///
/// Every description stores `X` then `Y` in the first two slots.
pub(crate) fn packet_points<'a>(
    description: &PointDescription,
    packet: &'a [i32],
) -> impl DoubleEndedIterator<Item = Point> + 'a {
    packet
        .chunks_exact(description.stride())
        .map(|r| Point::new(f64::from(r[0]), f64::from(r[1])))
}
