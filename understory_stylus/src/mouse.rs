// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Promotion of mouse input into stylus dispatch.
//!
//! ## Overview
//!
//! Applications that want plugin collections to see mouse drags as if they
//! were pen strokes feed their mouse events through
//! [`translate_and_dispatch`]. Each qualifying event becomes a one-record
//! packet in the [`PointDescription::MOUSE`] layout and runs through the same
//! leave/enter/data sequence as stylus input.
//!
//! ## Filtering
//!
//! Only these events are promoted:
//!
//! - a left-button press (becomes [`StylusAction::Down`]),
//! - a move with the left button held (becomes [`StylusAction::Move`]),
//! - a left-button release (becomes [`StylusAction::Up`]),
//! - a surface deactivation, which only leaves the active target, and only
//!   when the event comes from a real mouse and no element is directly under
//!   the primary pointer.
//!
//! ## State
//!
//! The target that last received a promoted enter lives in an explicit
//! [`MouseBridgeContext`], one per input thread.

use alloc::vec;

use kurbo::Point;

use crate::coordinator::{DispatchCoordinator, DispatchOutcome};
use crate::description::{ButtonStatus, PointDescription, PointProperty};
use crate::error::DispatchError;
use crate::gate::ProcessingGate;
use crate::input::StylusInputReport;
use crate::plugin::PluginCollection;
use crate::registry::TargetRegistry;
use crate::resolver::TargetResolver;
use crate::sample::round_to_i32;
use crate::transform::SurfaceTransforms;
use crate::types::{CollectionId, DeviceId, StylusAction, SurfaceId};

/// A mouse button.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum MouseButton {
    /// Primary button.
    Left,
    /// Secondary button.
    Right,
    /// Middle button.
    Middle,
}

bitflags::bitflags! {
    /// Buttons held down, as of after the event.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct MouseButtons: u8 {
        /// Primary button.
        const LEFT   = 0b001;
        /// Secondary button.
        const RIGHT  = 0b010;
        /// Middle button.
        const MIDDLE = 0b100;
    }
}

/// What happened to the mouse.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MouseEventKind {
    /// A button went down.
    Press(MouseButton),
    /// The mouse moved.
    Move,
    /// A button went up.
    Release(MouseButton),
    /// The wheel turned.
    Wheel,
    /// The surface lost activation.
    Deactivate,
}

/// Where a mouse event came from.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum MouseOrigin {
    /// A physical mouse report.
    #[default]
    Mouse,
    /// Mouse input synthesized from stylus or touch input.
    Promoted,
}

/// One mouse event on a surface.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MouseEvent {
    /// Surface the event is addressed to.
    pub surface: SurfaceId,
    /// What happened.
    pub kind: MouseEventKind,
    /// Position in screen pixels.
    pub position: Point,
    /// Buttons held after the event.
    pub buttons: MouseButtons,
    /// Where the event came from.
    pub origin: MouseOrigin,
    /// Whether the primary pointer device currently reports a directly-hit element.
    pub primary_direct_hit: bool,
    /// Timestamp in milliseconds.
    pub timestamp: u32,
}

impl MouseEvent {
    /// A physical mouse event with no directly-hit element.
    pub fn new(
        surface: SurfaceId,
        kind: MouseEventKind,
        position: Point,
        buttons: MouseButtons,
    ) -> Self {
        Self {
            surface,
            kind,
            position,
            buttons,
            origin: MouseOrigin::Mouse,
            primary_direct_hit: false,
            timestamp: 0,
        }
    }
}

/// Registry, coordinator, and transforms of one input surface.
#[derive(Debug)]
pub struct SurfaceInput<N, P> {
    /// Plugin collections of the surface.
    pub registry: TargetRegistry<N, P>,
    /// Coordinator for the surface.
    pub coordinator: DispatchCoordinator,
    /// Transforms of the surface.
    pub transforms: SurfaceTransforms,
}

impl<N: Copy + Eq, P> SurfaceInput<N, P> {
    /// An empty surface.
    pub fn new(transforms: SurfaceTransforms) -> Self {
        Self::with_gate(transforms, ProcessingGate::new())
    }

    /// An empty surface whose coordinator shares `gate`.
    pub fn with_gate(transforms: SurfaceTransforms, gate: ProcessingGate) -> Self {
        Self {
            registry: TargetRegistry::new(),
            coordinator: DispatchCoordinator::with_gate(gate),
            transforms,
        }
    }
}

/// Finds the dispatch engine that owns a surface.
pub trait SurfaceLookup {
    /// Visual-tree node type of the surfaces.
    type Node: Copy + Eq;
    /// Plugin collection type of the surfaces.
    type Collection: PluginCollection;

    /// The engine for `surface`, if it has one.
    fn surface_mut(
        &mut self,
        surface: SurfaceId,
    ) -> Option<&mut SurfaceInput<Self::Node, Self::Collection>>;
}

impl<N, P, S> SurfaceLookup for hashbrown::HashMap<SurfaceId, SurfaceInput<N, P>, S>
where
    N: Copy + Eq,
    P: PluginCollection,
    S: core::hash::BuildHasher,
{
    type Node = N;
    type Collection = P;

    fn surface_mut(&mut self, surface: SurfaceId) -> Option<&mut SurfaceInput<N, P>> {
        self.get_mut(&surface)
    }
}

/// Error type of the plugin collections reached through `L`.
type LookupError<L> =
    DispatchError<<<L as SurfaceLookup>::Collection as PluginCollection>::Error>;

/// Per-thread state of the mouse promotion bridge.
#[derive(Clone, Debug)]
pub struct MouseBridgeContext {
    device: DeviceId,
    active: Option<(SurfaceId, CollectionId)>,
    last_position: Point,
}

impl MouseBridgeContext {
    /// Create a context whose synthetic reports carry `device`.
    pub fn new(device: DeviceId) -> Self {
        Self {
            device,
            active: None,
            last_position: Point::ORIGIN,
        }
    }

    /// Device id of the synthetic reports.
    pub fn device(&self) -> DeviceId {
        self.device
    }

    /// Collection that last received a promoted enter.
    pub fn active(&self) -> Option<CollectionId> {
        self.active.map(|(_, id)| id)
    }

    /// Surface of the active collection.
    pub fn active_surface(&self) -> Option<SurfaceId> {
        self.active.map(|(surface, _)| surface)
    }

    /// Last promoted position, in screen pixels.
    pub fn last_position(&self) -> Point {
        self.last_position
    }

    fn translate(&self, event: &MouseEvent) -> Option<StylusAction> {
        match event.kind {
            MouseEventKind::Press(MouseButton::Left) => Some(StylusAction::Down),
            MouseEventKind::Move if event.buttons.contains(MouseButtons::LEFT) => {
                Some(StylusAction::Move)
            }
            MouseEventKind::Release(MouseButton::Left) => Some(StylusAction::Up),
            MouseEventKind::Deactivate
                if self.active.is_some()
                    && event.origin == MouseOrigin::Mouse
                    && !event.primary_direct_hit =>
            {
                Some(StylusAction::Deactivate)
            }
            _ => None,
        }
    }

    /// One-record packet at the last position in the mouse layout.
    fn report<D>(
        &self,
        action: StylusAction,
        buttons: MouseButtons,
        transforms: SurfaceTransforms,
        timestamp: u32,
    ) -> StylusInputReport<D> {
        let description = PointDescription::MOUSE;
        let mut record = vec![0; description.stride()];
        if let Some(ix) = description.index_of(PointProperty::X) {
            record[ix] = round_to_i32(self.last_position.x);
        }
        if let Some(iy) = description.index_of(PointProperty::Y) {
            record[iy] = round_to_i32(self.last_position.y);
        }
        if let Some(ib) = description.button_word_index() {
            let mut status = ButtonStatus::empty();
            status.set(ButtonStatus::TIP, buttons.contains(MouseButtons::LEFT));
            status.set(ButtonStatus::BARREL, buttons.contains(MouseButtons::RIGHT));
            record[ib] = description.pack_buttons(status);
        }
        StylusInputReport::new(self.device, action, description, record, transforms)
            .with_timestamp(timestamp)
    }

    /// Leave the active collection on `surface`.
    fn leave<L: SurfaceLookup + ?Sized>(
        &mut self,
        surfaces: &mut L,
        surface: SurfaceId,
        timestamp: u32,
    ) -> Result<DispatchOutcome, LookupError<L>> {
        let Some(input) = surfaces.surface_mut(surface) else {
            self.active = None;
            return Ok(DispatchOutcome::default());
        };
        let mut report = self.report(
            StylusAction::Up,
            MouseButtons::empty(),
            input.transforms.for_mouse(),
            timestamp,
        );
        let mut active = self.active();
        let result = input.coordinator.dispatch_promoted(
            &mut input.registry,
            &mut report,
            &mut active,
            None,
        );
        self.active = active.map(|id| (surface, id));
        result
    }
}

/// Promote one mouse event and dispatch it to the plugin collections of its surface.
///
/// Returns `Ok(None)` when the event is filtered out or its surface has no
/// dispatch engine. When the pointer moves to another surface, the previous
/// surface's active collection receives a leave first.
///
/// Targets come from hit testing only; coordinator capture is not consulted.
pub fn translate_and_dispatch<L: SurfaceLookup + ?Sized>(
    ctx: &mut MouseBridgeContext,
    surfaces: &mut L,
    event: &MouseEvent,
) -> Result<Option<DispatchOutcome>, LookupError<L>> {
    let Some(action) = ctx.translate(event) else {
        tracing::trace!(kind = ?event.kind, "mouse event not promoted");
        return Ok(None);
    };
    if action == StylusAction::Deactivate {
        let Some(surface) = ctx.active_surface() else {
            return Ok(None);
        };
        tracing::debug!(
            surface = surface.0,
            "surface deactivated, leaving promoted target"
        );
        return ctx.leave(surfaces, surface, event.timestamp).map(Some);
    }

    ctx.last_position = event.position;
    if let Some(previous) = ctx.active_surface().filter(|s| *s != event.surface) {
        ctx.leave(surfaces, previous, event.timestamp)?;
    }
    let Some(input) = surfaces.surface_mut(event.surface) else {
        tracing::trace!(surface = event.surface.0, "no dispatch engine for surface");
        return Ok(None);
    };
    let mut report = ctx.report(
        action,
        event.buttons,
        input.transforms.for_mouse(),
        event.timestamp,
    );
    let target = TargetResolver
        .resolve(&input.registry, &report, None)
        .target();
    let mut active = ctx.active();
    let result = input.coordinator.dispatch_promoted(
        &mut input.registry,
        &mut report,
        &mut active,
        target,
    );
    ctx.active = active.map(|id| (event.surface, id));
    result.map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::recording::{Call, Log, Recorder};
    use crate::tree::test_tree::VecTree;
    use alloc::vec::Vec;
    use hashbrown::HashMap;
    use kurbo::{Affine, Rect};

    const MAIN: SurfaceId = SurfaceId(1);
    const POPUP: SurfaceId = SurfaceId(2);

    struct Fixture {
        log: Log,
        surfaces: HashMap<SurfaceId, SurfaceInput<usize, Recorder>>,
        c: CollectionId,
        p: CollectionId,
    }

    /// `c` covers view 0..50 on MAIN, whose view is half the screen scale.
    /// `p` covers 0..50 on POPUP.
    fn fixture() -> Fixture {
        let log = Log::default();
        let mut tree = VecTree::new();
        let root = tree.add(None);
        let node_c = tree.add(Some(root));
        let node_p = tree.add(None);

        let gate = ProcessingGate::new();
        let mut main = SurfaceInput::with_gate(
            SurfaceTransforms::new(Affine::scale(4.0), Affine::scale(0.5)),
            gate.clone(),
        );
        let c = main
            .registry
            .insert(
                &tree,
                node_c,
                Affine::IDENTITY,
                Recorder::new("c", Rect::new(0.0, 0.0, 50.0, 50.0), &log),
            )
            .unwrap();
        let mut popup = SurfaceInput::with_gate(SurfaceTransforms::default(), gate);
        let p = popup
            .registry
            .insert(
                &tree,
                node_p,
                Affine::IDENTITY,
                Recorder::new("p", Rect::new(0.0, 0.0, 50.0, 50.0), &log),
            )
            .unwrap();
        let mut surfaces = HashMap::new();
        surfaces.insert(MAIN, main);
        surfaces.insert(POPUP, popup);
        Fixture {
            log,
            surfaces,
            c,
            p,
        }
    }

    impl Fixture {
        fn calls(&self) -> Vec<Call> {
            self.log.borrow_mut().drain(..).collect()
        }
    }

    fn event(
        surface: SurfaceId,
        kind: MouseEventKind,
        x: f64,
        y: f64,
        buttons: MouseButtons,
    ) -> MouseEvent {
        MouseEvent::new(surface, kind, Point::new(x, y), buttons)
    }

    fn pt(x: f64, y: f64) -> Vec<Point> {
        vec![Point::new(x, y)]
    }

    #[test]
    fn drag_is_promoted_to_down_move_up() {
        let mut f = fixture();
        let mut ctx = MouseBridgeContext::new(DeviceId(0));
        let left = MouseButtons::LEFT;
        let steps = [
            event(
                MAIN,
                MouseEventKind::Press(MouseButton::Left),
                40.0,
                40.0,
                left,
            ),
            event(MAIN, MouseEventKind::Move, 60.0, 40.0, left),
            event(
                MAIN,
                MouseEventKind::Release(MouseButton::Left),
                60.0,
                40.0,
                MouseButtons::empty(),
            ),
        ];
        for e in &steps {
            let outcome = translate_and_dispatch(&mut ctx, &mut f.surfaces, e)
                .unwrap()
                .unwrap();
            assert_eq!(outcome.target, Some(f.c));
        }
        // Mouse positions skip the device scale; only screen → view applies.
        assert_eq!(
            f.calls(),
            [
                Call::Enter("c", true),
                Call::Raw("c", pt(20.0, 20.0)),
                Call::Raw("c", pt(30.0, 20.0)),
                Call::Raw("c", pt(30.0, 20.0)),
            ]
        );
        assert_eq!(ctx.active(), Some(f.c));
        assert_eq!(ctx.last_position(), Point::new(60.0, 40.0));
    }

    #[test]
    fn other_mouse_events_are_ignored() {
        let mut f = fixture();
        let mut ctx = MouseBridgeContext::new(DeviceId(0));
        for e in [
            event(MAIN, MouseEventKind::Move, 10.0, 10.0, MouseButtons::empty()),
            event(
                MAIN,
                MouseEventKind::Press(MouseButton::Right),
                10.0,
                10.0,
                MouseButtons::RIGHT,
            ),
            event(MAIN, MouseEventKind::Wheel, 10.0, 10.0, MouseButtons::LEFT),
            // Nothing is active yet.
            event(
                MAIN,
                MouseEventKind::Deactivate,
                0.0,
                0.0,
                MouseButtons::empty(),
            ),
        ] {
            assert!(matches!(
                translate_and_dispatch(&mut ctx, &mut f.surfaces, &e),
                Ok(None)
            ));
        }
        assert!(f.calls().is_empty());
        assert_eq!(ctx.last_position(), Point::ORIGIN);
    }

    #[test]
    fn deactivation_leaves_only_for_real_mouse_without_direct_hit() {
        let mut f = fixture();
        let mut ctx = MouseBridgeContext::new(DeviceId(0));
        let press = event(
            MAIN,
            MouseEventKind::Press(MouseButton::Left),
            10.0,
            10.0,
            MouseButtons::LEFT,
        );
        translate_and_dispatch(&mut ctx, &mut f.surfaces, &press).unwrap();
        f.calls();

        let mut deactivate = event(
            MAIN,
            MouseEventKind::Deactivate,
            0.0,
            0.0,
            MouseButtons::empty(),
        );
        deactivate.origin = MouseOrigin::Promoted;
        assert!(matches!(
            translate_and_dispatch(&mut ctx, &mut f.surfaces, &deactivate),
            Ok(None)
        ));
        deactivate.origin = MouseOrigin::Mouse;
        deactivate.primary_direct_hit = true;
        assert!(matches!(
            translate_and_dispatch(&mut ctx, &mut f.surfaces, &deactivate),
            Ok(None)
        ));
        assert!(f.calls().is_empty());

        deactivate.primary_direct_hit = false;
        let outcome = translate_and_dispatch(&mut ctx, &mut f.surfaces, &deactivate)
            .unwrap()
            .unwrap();
        assert_eq!(outcome.left, Some(f.c));
        assert_eq!(f.calls(), [Call::Leave("c", true)]);
        assert_eq!(ctx.active(), None);
    }

    #[test]
    fn switching_surfaces_leaves_the_previous_target() {
        let mut f = fixture();
        let mut ctx = MouseBridgeContext::new(DeviceId(0));
        let left = MouseButtons::LEFT;
        let on_main = event(
            MAIN,
            MouseEventKind::Press(MouseButton::Left),
            10.0,
            10.0,
            left,
        );
        translate_and_dispatch(&mut ctx, &mut f.surfaces, &on_main).unwrap();
        f.calls();

        let on_popup = event(POPUP, MouseEventKind::Move, 5.0, 5.0, left);
        translate_and_dispatch(&mut ctx, &mut f.surfaces, &on_popup).unwrap();
        assert_eq!(
            f.calls(),
            [
                Call::Leave("c", true),
                Call::Enter("p", true),
                Call::Raw("p", pt(5.0, 5.0)),
            ]
        );
        assert_eq!(ctx.active(), Some(f.p));
        assert_eq!(ctx.active_surface(), Some(POPUP));
    }

    #[test]
    fn unknown_surfaces_are_skipped() {
        let mut f = fixture();
        let mut ctx = MouseBridgeContext::new(DeviceId(0));
        let e = event(
            SurfaceId(9),
            MouseEventKind::Press(MouseButton::Left),
            10.0,
            10.0,
            MouseButtons::LEFT,
        );
        assert!(matches!(
            translate_and_dispatch(&mut ctx, &mut f.surfaces, &e),
            Ok(None)
        ));
        assert!(f.calls().is_empty());
    }

    #[test]
    fn synthetic_packet_uses_the_mouse_layout() {
        let mut ctx = MouseBridgeContext::new(DeviceId(3));
        ctx.last_position = Point::new(10.4, 20.6);
        let report: StylusInputReport<u32> = ctx.report(
            StylusAction::Down,
            MouseButtons::LEFT | MouseButtons::RIGHT,
            SurfaceTransforms::default(),
            42,
        );
        assert_eq!(report.description(), &PointDescription::MOUSE);
        assert_eq!(report.packet(), &[10, 21, 0, 0b11]);
        assert_eq!(
            report.description().buttons(report.packet()),
            ButtonStatus::TIP | ButtonStatus::BARREL
        );
        assert_eq!(
            report
                .description()
                .value(report.packet(), PointProperty::NormalPressure),
            Some(511)
        );
        assert_eq!(report.device, DeviceId(3));
        assert_eq!(report.timestamp, 42);
    }
}
