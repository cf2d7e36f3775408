// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Ordered enter/leave/data dispatch to plugin collections.
//!
//! ## Overview
//!
//! [`DispatchCoordinator`] keeps, per device, the collection that last received
//! a confirmed enter (the *confirmed target*) and an optional capture. For each
//! press, move, or release report it:
//!
//! 1. resolves the new target (capture first, then hit testing),
//! 2. sends leave to the confirmed target if it changed,
//! 3. sends enter to the new target if it changed,
//! 4. delivers the payload to the new target and copies any point correction
//!    back into the report,
//! 5. hands custom data back to its owners in attachment order.
//!
//! Every other action is ignored.
//!
//! ## Confirmed and unconfirmed notifications
//!
//! [`DispatchCoordinator::dispatch`] sends confirmed notifications. When a
//! report was already delivered ahead of time to a cached target (for example
//! by a real-time input thread), [`DispatchCoordinator::verify`] recomputes the
//! true target from the directly-hit tree node and corrects the earlier
//! delivery with unconfirmed notifications.
//!
//! The meaning of the payload attached to a report differs between the two:
//! `dispatch` treats it as built but not yet delivered, `verify` as already
//! delivered.
//!
//! ## Reentrancy
//!
//! Notifications run while the coordinator's [`ProcessingGate`] is suppressed.
//! A dispatch that starts while the gate is held fails with
//! [`DispatchError::Reentrant`] without touching any state.
//!
//! ## Failures
//!
//! Errors from plugin collections abort the dispatch and are returned as
//! [`DispatchError::Plugin`]. Notifications already sent are not rolled back,
//! but the confirmed target always names the last collection that actually
//! received an enter.

use hashbrown::HashMap;
use understory_event_state::manipulation::{ManipulationState, ManipulationTracker};

use crate::error::DispatchError;
use crate::gate::ProcessingGate;
use crate::input::{CustomDataCategory, RawStylusInput, StylusInputReport};
use crate::plugin::PluginCollection;
use crate::registry::TargetRegistry;
use crate::resolver::{Resolution, TargetResolver};
use crate::transform::TransformChain;
use crate::tree::VisualTree;
use crate::types::{CollectionId, DeviceId};

/// Which collection [`DispatchCoordinator::verify`] treats as the true target
/// when several registered collections contain the directly-hit node.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum VerifyTieBreak {
    /// Keep the confirmed target when it contains the hit node; otherwise
    /// fall back to registry order.
    #[default]
    PreferConfirmed,
    /// Always take the first containing collection in registry order.
    RegistryOrder,
}

/// Policies applied by a [`DispatchCoordinator`].
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct DispatchPolicy {
    /// Tie-break used when verifying.
    pub verify_tie_break: VerifyTieBreak,
}

/// What one dispatch did.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct DispatchOutcome {
    /// The resolved target.
    pub target: Option<CollectionId>,
    /// Collection that received a leave.
    pub left: Option<CollectionId>,
    /// Collection that received an enter.
    pub entered: Option<CollectionId>,
    /// Whether the payload was delivered to the target's raw-input handler.
    pub delivered: bool,
    /// Target of a previously delivered payload that verification discarded.
    pub discarded: Option<CollectionId>,
    /// Whether a point correction was copied back into the report.
    pub points_updated: bool,
}

#[derive(Copy, Clone, Debug, Default)]
struct DeviceState {
    confirmed: Option<CollectionId>,
    capture: Option<CollectionId>,
}

/// Sequences notifications to plugin collections, per device.
///
/// ## Usage
///
/// - Call [`DispatchCoordinator::dispatch`] for every report on the thread that
///   owns the [`TargetRegistry`].
/// - Report capture changes with [`DispatchCoordinator::capture`].
/// - Call [`DispatchCoordinator::verify`] for reports that were delivered
///   ahead of time to a cached target.
/// - Call [`DispatchCoordinator::deactivate_device`] when a device goes away.
pub struct DispatchCoordinator {
    devices: HashMap<DeviceId, DeviceState>,
    manipulation: ManipulationTracker<DeviceId>,
    gate: ProcessingGate,
    resolver: TargetResolver,
    policy: DispatchPolicy,
}

impl core::fmt::Debug for DispatchCoordinator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DispatchCoordinator")
            .field("devices", &self.devices.len())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Default for DispatchCoordinator {
    fn default() -> Self {
        Self::with_gate(ProcessingGate::new())
    }
}

impl DispatchCoordinator {
    /// Create a coordinator with its own processing gate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a coordinator sharing `gate` with other coordinators of the same thread.
    pub fn with_gate(gate: ProcessingGate) -> Self {
        Self {
            devices: HashMap::new(),
            manipulation: ManipulationTracker::new(),
            gate,
            resolver: TargetResolver,
            policy: DispatchPolicy::default(),
        }
    }

    /// The gate held while notifications run.
    pub fn gate(&self) -> &ProcessingGate {
        &self.gate
    }

    /// Current policies.
    pub fn policy(&self) -> DispatchPolicy {
        self.policy
    }

    /// Replace the policies.
    pub fn set_policy(&mut self, policy: DispatchPolicy) {
        self.policy = policy;
    }

    /// Route all reports of `device` to `target` until released with `None`.
    pub fn capture(&mut self, device: DeviceId, target: Option<CollectionId>) {
        self.devices.entry(device).or_default().capture = target;
    }

    /// Current capture of `device`.
    pub fn captured(&self, device: DeviceId) -> Option<CollectionId> {
        self.devices.get(&device).and_then(|s| s.capture)
    }

    /// Collection that last received a confirmed enter from `device`.
    pub fn confirmed_target(&self, device: DeviceId) -> Option<CollectionId> {
        self.devices.get(&device).and_then(|s| s.confirmed)
    }

    /// A manipulation gesture started on `device`.
    pub fn manipulation_started(&mut self, device: DeviceId) -> bool {
        self.manipulation.start(device)
    }

    /// A manipulation gesture on `device` ended, normally or cancelled.
    pub fn manipulation_ended(&mut self, device: DeviceId, cancelled: bool) -> bool {
        self.manipulation.end(&device, cancelled)
    }

    /// Manipulation state of `device`.
    pub fn manipulation_state(&self, device: DeviceId) -> ManipulationState {
        self.manipulation.state(&device)
    }

    /// Whether collaborators should promote `device`'s input after its last gesture.
    pub fn promote_to_mouse(&self, device: DeviceId) -> bool {
        self.manipulation.promote(&device)
    }

    /// Dispatch `report` to the collection it resolves to.
    ///
    /// Returns `Ok(None)` for actions other than press, move, and release.
    /// A payload attached to the report is reused when it is addressed to the
    /// resolved target. A payload addressed elsewhere has its custom data
    /// handed back and is dropped. After the call the report carries the
    /// delivered payload.
    pub fn dispatch<N, P>(
        &mut self,
        registry: &mut TargetRegistry<N, P>,
        report: &mut StylusInputReport<P::CustomData>,
    ) -> Result<Option<DispatchOutcome>, DispatchError<P::Error>>
    where
        N: Copy + Eq,
        P: PluginCollection,
    {
        if !report.action.is_dispatched() {
            tracing::trace!(action = ?report.action, "ignoring action");
            return Ok(None);
        }
        let _guard = self.gate.try_suppress().ok_or(DispatchError::Reentrant)?;
        let state = self.devices.entry(report.device).or_default();
        let resolution = self.resolver.resolve(registry, report, state.capture);
        if state.capture.is_some() && !matches!(resolution, Resolution::Captured(_)) {
            state.capture = None;
        }
        let outcome = transition(
            registry,
            report,
            &mut state.confirmed,
            resolution.target(),
            Delivery::CONFIRMED,
        )?;
        Ok(Some(outcome))
    }

    /// Correct a report that was already delivered to a possibly stale target.
    ///
    /// `hit` is the tree node directly under the report's last point. The true
    /// target is the collection anchored at it or at its nearest registered
    /// ancestor; capture is not consulted.
    ///
    /// If the attached payload went to another collection, that collection's
    /// custom data is handed back unconfirmed and the payload is discarded.
    /// Leave, enter, and (for discarded or missing payloads) data then follow
    /// as in [`dispatch`](Self::dispatch), all unconfirmed. A payload that was
    /// delivered to the right target is not delivered again, but its custom
    /// data is handed back unconfirmed. Any correction
    /// left on the final payload is copied into the report at the end.
    pub fn verify<N, P>(
        &mut self,
        tree: &impl VisualTree<N>,
        registry: &mut TargetRegistry<N, P>,
        report: &mut StylusInputReport<P::CustomData>,
        hit: Option<N>,
    ) -> Result<Option<DispatchOutcome>, DispatchError<P::Error>>
    where
        N: Copy + Eq,
        P: PluginCollection,
    {
        if !report.action.is_dispatched() {
            return Ok(None);
        }
        let _guard = self.gate.try_suppress().ok_or(DispatchError::Reentrant)?;
        let state = self.devices.entry(report.device).or_default();
        let preferred = match self.policy.verify_tie_break {
            VerifyTieBreak::PreferConfirmed => state.confirmed,
            VerifyTieBreak::RegistryOrder => None,
        };
        let truth = hit.and_then(|node| registry.find_by_node_preferring(tree, node, preferred));

        let mut discarded = None;
        let stale = report.raw_input().map(RawStylusInput::target);
        if let Some(stale) = stale.filter(|id| Some(*id) != truth) {
            if let Some(payload) = report.take_raw_input() {
                tracing::debug!(
                    stale = stale.get(),
                    truth = ?truth.map(CollectionId::get),
                    "discarding payload delivered to the wrong collection"
                );
                return_custom_data(registry, &payload, report.action, false)?;
                discarded = Some(stale);
            }
        }

        let mut outcome = transition(
            registry,
            report,
            &mut state.confirmed,
            truth,
            Delivery::UNCONFIRMED,
        )?;
        outcome.discarded = discarded;

        if let Some(payload) = report.take_raw_input() {
            if payload.is_modified() {
                report.apply_correction(&payload);
                report.update_points();
                outcome.points_updated = true;
            }
            report.attach_raw_input(payload);
        }
        Ok(Some(outcome))
    }

    /// Forget `device`: leave its confirmed target and drop its capture and manipulation state.
    ///
    /// Returns the collection that received the leave.
    pub fn deactivate_device<N, P>(
        &mut self,
        registry: &mut TargetRegistry<N, P>,
        report: &mut StylusInputReport<P::CustomData>,
    ) -> Result<Option<CollectionId>, DispatchError<P::Error>>
    where
        N: Copy + Eq,
        P: PluginCollection,
    {
        let _guard = self.gate.try_suppress().ok_or(DispatchError::Reentrant)?;
        self.manipulation.reset(&report.device);
        let Some(mut state) = self.devices.remove(&report.device) else {
            return Ok(None);
        };
        tracing::debug!(device = report.device.0, "deactivating device");
        let outcome = transition(
            registry,
            report,
            &mut state.confirmed,
            None,
            Delivery::CONFIRMED,
        )?;
        Ok(outcome.left)
    }

    /// Mouse-promotion variant of [`dispatch`](Self::dispatch).
    ///
    /// The confirmed target lives in `active` rather than in per-device state,
    /// and `target` has already been resolved by the caller.
    pub(crate) fn dispatch_promoted<N, P>(
        &self,
        registry: &mut TargetRegistry<N, P>,
        report: &mut StylusInputReport<P::CustomData>,
        active: &mut Option<CollectionId>,
        target: Option<CollectionId>,
    ) -> Result<DispatchOutcome, DispatchError<P::Error>>
    where
        N: Copy + Eq,
        P: PluginCollection,
    {
        let _guard = self.gate.try_suppress().ok_or(DispatchError::Reentrant)?;
        transition(registry, report, active, target, Delivery::CONFIRMED)
    }
}

#[derive(Copy, Clone, Debug)]
struct Delivery {
    confirmed: bool,
    /// Whether a payload already addressed to the target reaches its raw-input
    /// handler again. Its custom data is always handed back.
    redeliver: bool,
}

impl Delivery {
    const CONFIRMED: Self = Self {
        confirmed: true,
        redeliver: true,
    };
    const UNCONFIRMED: Self = Self {
        confirmed: false,
        redeliver: false,
    };
}

/// Move `slot` from its current target to `target`: leave, enter, data, custom data.
fn transition<N, P>(
    registry: &mut TargetRegistry<N, P>,
    report: &mut StylusInputReport<P::CustomData>,
    slot: &mut Option<CollectionId>,
    target: Option<CollectionId>,
    delivery: Delivery,
) -> Result<DispatchOutcome, DispatchError<P::Error>>
where
    N: Copy + Eq,
    P: PluginCollection,
{
    let confirmed = delivery.confirmed;
    let mut outcome = DispatchOutcome {
        target,
        ..DispatchOutcome::default()
    };
    // Removed collections count as no target.
    let previous = slot.filter(|id| registry.contains(*id));
    *slot = previous;
    let mut payload = report.take_raw_input();

    if previous != target {
        if let Some(old) = previous {
            let synthesized = match payload {
                Some(_) => None,
                None => payload_for(registry, report, old),
            };
            if let Some(input) = payload.as_ref().or(synthesized.as_ref()) {
                notify(registry, old, |c| c.on_enter_leave(false, input, confirmed))?;
            }
            tracing::trace!(collection = old.get(), confirmed, "left");
            *slot = None;
            outcome.left = Some(old);
        }
    }

    let Some(new) = target else {
        if let Some(payload) = payload {
            report.attach_raw_input(payload);
        }
        return Ok(outcome);
    };
    let (mut input, attached) = match payload.take() {
        Some(p) if p.target() == new => (p, true),
        other => {
            if let Some(dropped) = other {
                tracing::debug!(
                    collection = dropped.target().get(),
                    "dropping payload addressed to another collection"
                );
                return_custom_data(registry, &dropped, report.action, confirmed)?;
            }
            match payload_for(registry, report, new) {
                Some(p) => (p, false),
                None => return Ok(outcome),
            }
        }
    };

    if previous != target {
        notify(registry, new, |c| c.on_enter_leave(true, &input, confirmed))?;
        tracing::trace!(collection = new.get(), confirmed, "entered");
        *slot = Some(new);
        outcome.entered = Some(new);
    }

    if !attached || delivery.redeliver {
        input.begin_delivery();
        notify(registry, new, |c| c.on_raw_input(&mut input))?;
        outcome.delivered = true;
        if input.is_modified() {
            report.apply_correction(&input);
            report.update_points();
            outcome.points_updated = true;
        }
    }
    return_custom_data(registry, &input, report.action, confirmed)?;
    report.attach_raw_input(input);
    Ok(outcome)
}

/// Hand the payload's custom data back to its owners: pre-dispatch data
/// first, then data attached during delivery, each in attachment order.
fn return_custom_data<N, P>(
    registry: &mut TargetRegistry<N, P>,
    input: &RawStylusInput<P::CustomData>,
    action: crate::types::StylusAction,
    confirmed: bool,
) -> Result<(), DispatchError<P::Error>>
where
    N: Copy + Eq,
    P: PluginCollection,
{
    let target = input.target();
    for category in [CustomDataCategory::Pre, CustomDataCategory::Post] {
        for data in input.custom_data().iter().filter(|d| d.category == category) {
            notify(registry, target, |c| c.on_custom_data(data, action, confirmed))?;
        }
    }
    Ok(())
}

/// Build a payload addressed to `id` from the report's current packet.
fn payload_for<N, P>(
    registry: &TargetRegistry<N, P>,
    report: &StylusInputReport<P::CustomData>,
    id: CollectionId,
) -> Option<RawStylusInput<P::CustomData>>
where
    N: Copy + Eq,
    P: PluginCollection,
{
    let entry = registry.get(id)?;
    let chain = TransformChain::new(
        report.transforms().device_to_view(),
        entry.view_to_element(),
    );
    Some(RawStylusInput::new(report, chain, id))
}

fn notify<N, P>(
    registry: &mut TargetRegistry<N, P>,
    id: CollectionId,
    f: impl FnOnce(&mut P) -> Result<(), P::Error>,
) -> Result<(), DispatchError<P::Error>>
where
    N: Copy + Eq,
    P: PluginCollection,
{
    match registry.collection_mut(id) {
        Some(collection) => f(collection).map_err(|source| DispatchError::Plugin {
            target: id,
            source,
        }),
        None => Ok(()),
    }
}
