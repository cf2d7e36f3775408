// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Raw pointer samples and the source that produces them.
//!
//! A [`RawSample`] is built once per OS pointer message from a [`SampleSource`],
//! is immutable afterwards, and lives for a single dispatch cycle. Any query
//! failure marks the sample invalid: device-specific data and history are then
//! dropped rather than trusted, and callers are expected to discard the sample.

use alloc::vec::Vec;

use kurbo::{Point, Rect};
use smallvec::SmallVec;

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;

use crate::description::{ButtonStatus, PointDescription, PointProperty};
use crate::error::SampleError;
use crate::types::DeviceClass;

bitflags::bitflags! {
    /// State bits reported with every pointer sample.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct PointerFlags: u32 {
        /// The pointer is within detection range.
        const IN_RANGE   = 0b0000_0001;
        /// The pointer is in contact with the surface.
        const IN_CONTACT = 0b0000_0010;
        /// The pointer is the primary pointer of its device.
        const PRIMARY    = 0b0000_0100;
        /// The pointer's input was cancelled by the system.
        const CANCELED   = 0b0000_1000;
    }
}

bitflags::bitflags! {
    /// Pen-specific state bits.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct PenFlags: u32 {
        /// The barrel button is pressed.
        const BARREL   = 0b0000_0001;
        /// The pen is inverted (eraser end toward the surface).
        const INVERTED = 0b0000_0010;
        /// The eraser is in contact with the surface.
        const ERASER   = 0b0000_0100;
    }
}

/// Device-independent part of a pointer sample.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PointerInfo {
    /// Pointer identifier assigned by the OS.
    pub pointer_id: u32,
    /// Frame the sample belongs to; samples from one frame were reported together.
    pub frame_id: u32,
    /// Pointer state bits.
    pub flags: PointerFlags,
    /// Position in raw device units.
    pub position: Point,
    /// Timestamp in milliseconds.
    pub timestamp: u32,
}

/// Touch-specific part of a pointer sample.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TouchInfo {
    /// Contact area in raw device units.
    pub contact: Rect,
    /// Contact orientation in degrees.
    pub orientation: u32,
    /// Contact pressure (0..=1023).
    pub pressure: u32,
}

/// Pen-specific part of a pointer sample.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PenInfo {
    /// Pen state bits.
    pub flags: PenFlags,
    /// Tip pressure (0..=1023).
    pub pressure: u32,
    /// Barrel rotation in degrees.
    pub rotation: u32,
    /// Horizontal tilt in degrees.
    pub tilt_x: i32,
    /// Vertical tilt in degrees.
    pub tilt_y: i32,
}

/// Device-specific part of a pointer sample.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DeviceInfo {
    /// Touch contact data.
    Touch(TouchInfo),
    /// Pen data.
    Pen(PenInfo),
}

impl DeviceInfo {
    fn pressure(&self) -> u32 {
        match self {
            Self::Touch(t) => t.pressure,
            Self::Pen(p) => p.pressure,
        }
    }

    fn pen_flags(&self) -> PenFlags {
        match self {
            Self::Touch(_) => PenFlags::empty(),
            Self::Pen(p) => p.flags,
        }
    }
}

/// One coalesced sample: device-independent and device-specific data together.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerRecord {
    /// Device-independent data.
    pub info: PointerInfo,
    /// Device-specific data.
    pub device: DeviceInfo,
}

/// Producer of raw pointer data, typically a thin layer over OS pointer APIs.
///
/// Every query may fail by returning `None`.
pub trait SampleSource {
    /// Class of the device that owns `pointer_id`.
    fn device_class(&self, pointer_id: u32) -> DeviceClass;

    /// Device-independent data for the current sample.
    fn pointer_info(&self, pointer_id: u32) -> Option<PointerInfo>;

    /// Device-specific data for the current sample.
    fn device_info(&self, pointer_id: u32, class: DeviceClass) -> Option<DeviceInfo>;

    /// Samples coalesced since the last dispatch, oldest first, excluding the current one.
    fn history(&self, pointer_id: u32, class: DeviceClass) -> Option<Vec<PointerRecord>>;
}

/// A decoded pointer sample.
#[derive(Clone, Debug, PartialEq)]
pub struct RawSample {
    valid: bool,
    class: DeviceClass,
    current: PointerInfo,
    device: Option<DeviceInfo>,
    history: SmallVec<[PointerRecord; 4]>,
}

impl RawSample {
    /// Query `source` for the current sample of `pointer_id`.
    ///
    /// Devices of class [`DeviceClass::Other`] are rejected. Query failures do
    /// not produce an error; they produce a sample with
    /// [`is_valid`](Self::is_valid) `== false`.
    pub fn query(source: &impl SampleSource, pointer_id: u32) -> Result<Self, SampleError> {
        let class = source.device_class(pointer_id);
        if class == DeviceClass::Other {
            return Err(SampleError::UnsupportedDevice(class));
        }

        let current = source.pointer_info(pointer_id);
        let device = current.and_then(|_| source.device_info(pointer_id, class));
        let history = device.and_then(|_| source.history(pointer_id, class));

        let valid = current.is_some() && device.is_some() && history.is_some();
        if !valid {
            tracing::trace!(pointer_id, ?class, "pointer query failed, sample invalid");
        }
        Ok(Self {
            valid,
            class,
            current: current.unwrap_or(PointerInfo {
                pointer_id,
                ..PointerInfo::default()
            }),
            device: if valid { device } else { None },
            history: match history {
                Some(h) if valid => h.into_iter().collect(),
                _ => SmallVec::new(),
            },
        })
    }

    /// Whether every query succeeded. Invalid samples must not be dispatched.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Class of the producing device.
    pub fn device_class(&self) -> DeviceClass {
        self.class
    }

    /// Pointer identifier.
    pub fn pointer_id(&self) -> u32 {
        self.current.pointer_id
    }

    /// Frame identifier.
    pub fn frame_id(&self) -> u32 {
        self.current.frame_id
    }

    /// Device-independent data of the current sample.
    pub fn current(&self) -> &PointerInfo {
        &self.current
    }

    /// Device-specific data of the current sample; `None` for invalid samples.
    pub fn device_info(&self) -> Option<&DeviceInfo> {
        self.device.as_ref()
    }

    /// Coalesced samples since the last dispatch, oldest first.
    pub fn history(&self) -> &[PointerRecord] {
        &self.history
    }

    /// Flatten history then the current sample into a packet laid out by `description`.
    ///
    /// Invalid samples produce a single record built from the current
    /// position only, with no buttons and default pressure.
    pub fn to_packet(&self, description: &PointDescription) -> Vec<i32> {
        let mut out = Vec::with_capacity(description.stride() * (self.history.len() + 1));
        for record in &self.history {
            write_record(&mut out, description, &record.info, Some(&record.device));
        }
        write_record(&mut out, description, &self.current, self.device.as_ref());
        out
    }
}

fn write_record(
    out: &mut Vec<i32>,
    description: &PointDescription,
    info: &PointerInfo,
    device: Option<&DeviceInfo>,
) {
    for prop in description.properties() {
        if !prop.stored || prop.property.is_button() {
            continue;
        }
        let value = match prop.property {
            PointProperty::X => round_to_i32(info.position.x),
            PointProperty::Y => round_to_i32(info.position.y),
            PointProperty::NormalPressure => match device {
                Some(d) => i32::try_from(d.pressure())
                    .unwrap_or(i32::MAX)
                    .clamp(prop.minimum, prop.maximum),
                None => prop.default_value(),
            },
            PointProperty::PacketStatus => {
                device.map_or(0, |d| i32::try_from(d.pen_flags().bits()).unwrap_or(0))
            }
            PointProperty::TipButton | PointProperty::BarrelButton => continue,
        };
        out.push(value);
    }
    if description.button_word_index().is_some() {
        let mut status = ButtonStatus::empty();
        if device.is_some() {
            if info.flags.contains(PointerFlags::IN_CONTACT) {
                status |= ButtonStatus::TIP;
            }
            if device.is_some_and(|d| d.pen_flags().contains(PenFlags::BARREL)) {
                status |= ButtonStatus::BARREL;
            }
        }
        out.push(description.pack_buttons(status));
    }
}

#[allow(
    clippy::cast_possible_truncation,
    reason = "Device coordinates are whole device units; out-of-range values saturate."
)]
pub(crate) fn round_to_i32(v: f64) -> i32 {
    v.round() as i32
}
