// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_stylus --heading-base-level=0

//! Understory Stylus: target resolution and ordered dispatch for stylus plugins.
//!
//! ## Overview
//!
//! Stylus plugins are anchored to nodes of a visual tree in groups called
//! plugin collections. For every pen, touch, or promoted mouse report, this
//! crate decides which collection receives it and sends that collection an
//! ordered sequence of notifications:
//!
//! 1. leave, to the collection that received the previous enter, if it changed,
//! 2. enter, to the new collection, if it changed,
//! 3. the packet data itself, as a [`RawStylusInput`] in the collection's
//!    element space,
//! 4. custom data that plugins asked to get back once the packet is processed.
//!
//! It does not decode OS pointer messages and does not decide how plugins
//! process points; both are collaborator concerns expressed as traits
//! ([`SampleSource`], [`PluginCollection`]). The visual tree is read through
//! [`VisualTree`].
//!
//! ## Pieces
//!
//! - [`TargetRegistry`]: collections ordered front-most first, by paint order
//!   at insertion time.
//! - [`TargetResolver`]: capture first, then a hit test at the report's last
//!   point snapped to whole screen pixels.
//! - [`DispatchCoordinator`]: per-device confirmed target, capture, and the
//!   leave → enter → data → custom data sequence, plus [`verify`] to correct
//!   reports delivered ahead of time to a stale target.
//! - [`translate_and_dispatch`]: promotes mouse drags into the same sequence.
//! - [`ProcessingGate`]: refuses nested dispatch while notifications run.
//!
//! [`verify`]: DispatchCoordinator::verify
//!
//! ## Example
//!
//! ```rust
//! use kurbo::{Affine, Point, Rect};
//! use understory_stylus::{
//!     DeviceId, DispatchCoordinator, PluginCollection, PointDescription, RawStylusInput,
//!     StylusAction, StylusInputReport, SurfaceTransforms, TargetRegistry, VisualTree,
//! };
//!
//! // A flat tree: node 0 is the root, every other node is its child.
//! struct Flat(usize);
//! impl VisualTree<usize> for Flat {
//!     fn parent_of(&self, node: usize) -> Option<usize> {
//!         (node != 0).then_some(0)
//!     }
//!     fn child_count(&self, node: usize) -> usize {
//!         if node == 0 { self.0 } else { 0 }
//!     }
//!     fn child_at(&self, node: usize, index: usize) -> Option<usize> {
//!         (node == 0 && index < self.0).then_some(index + 1)
//!     }
//! }
//!
//! // Counts the points it receives inside its bounds.
//! struct Ink {
//!     bounds: Rect,
//!     points: usize,
//! }
//! impl PluginCollection for Ink {
//!     type Error = core::convert::Infallible;
//!     type CustomData = ();
//!     fn hit_test(&self, point: Point) -> bool {
//!         self.bounds.contains(point)
//!     }
//!     fn on_enter_leave(&mut self, _: bool, _: &RawStylusInput<()>, _: bool) -> Result<(), Self::Error> {
//!         Ok(())
//!     }
//!     fn on_raw_input(&mut self, input: &mut RawStylusInput<()>) -> Result<(), Self::Error> {
//!         self.points += input.points().len();
//!         Ok(())
//!     }
//!     fn on_custom_data(
//!         &mut self,
//!         _: &understory_stylus::CustomData<()>,
//!         _: StylusAction,
//!         _: bool,
//!     ) -> Result<(), Self::Error> {
//!         Ok(())
//!     }
//! }
//!
//! let tree = Flat(1);
//! let mut registry = TargetRegistry::new();
//! let canvas = registry
//!     .insert(&tree, 1, Affine::IDENTITY, Ink { bounds: Rect::new(0.0, 0.0, 100.0, 100.0), points: 0 })
//!     .unwrap();
//!
//! let mut coordinator = DispatchCoordinator::new();
//! let mut report = StylusInputReport::new(
//!     DeviceId(1),
//!     StylusAction::Down,
//!     PointDescription::STYLUS,
//!     vec![40, 40, 512, 0, 1],
//!     SurfaceTransforms::default(),
//! );
//! let outcome = coordinator.dispatch(&mut registry, &mut report).unwrap().unwrap();
//! assert_eq!(outcome.entered, Some(canvas));
//! assert_eq!(coordinator.confirmed_target(DeviceId(1)), Some(canvas));
//! assert_eq!(registry.get(canvas).unwrap().collection().points, 1);
//! ```
//!
//! ## Staleness
//!
//! Registry order reflects the tree at insertion time. Callers that reorder
//! or reparent nodes call [`TargetRegistry::reinsert`]. Removed collections
//! are never notified again: captures and confirmed targets that name them
//! resolve to no target.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod coordinator;
mod description;
mod error;
mod gate;
mod input;
mod mouse;
mod plugin;
mod registry;
mod resolver;
mod sample;
mod transform;
mod tree;
mod types;

pub use coordinator::{DispatchCoordinator, DispatchOutcome, DispatchPolicy, VerifyTieBreak};
pub use description::{ButtonStatus, PointDescription, PointProperty, PointPropertyInfo};
pub use error::{DescriptionError, DispatchError, RegistryError, SampleError};
pub use gate::{ProcessingGate, ProcessingGuard};
pub use input::{CustomData, CustomDataCategory, RawStylusInput, StylusInputReport};
pub use mouse::{
    MouseBridgeContext, MouseButton, MouseButtons, MouseEvent, MouseEventKind, MouseOrigin,
    SurfaceInput, SurfaceLookup, translate_and_dispatch,
};
pub use plugin::PluginCollection;
pub use registry::{PluginCollectionEntry, TargetRegistry};
pub use resolver::{Resolution, TargetResolver};
pub use sample::{
    DeviceInfo, PenFlags, PenInfo, PointerFlags, PointerInfo, PointerRecord, RawSample,
    SampleSource, TouchInfo,
};
pub use transform::{SurfaceTransforms, TransformChain};
pub use tree::VisualTree;
pub use types::{CollectionId, DeviceClass, DeviceId, StylusAction, SurfaceId};
pub use understory_event_state::manipulation::ManipulationState;
