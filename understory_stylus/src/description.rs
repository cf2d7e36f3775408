// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Point-shape descriptors: how a packet of integers encodes stylus points.
//!
//! A packet is a flat `[i32]` made of fixed-size records, one record per point.
//! The [`PointDescription`] lists the properties of a record in order:
//!
//! - `X` and `Y` always come first.
//! - Every other non-button property with `stored == true` takes one integer.
//! - Non-stored properties are declared but synthesized on read (their
//!   midpoint value). The mouse descriptor uses this for pressure.
//! - Button properties come last and share one trailing integer, one bit per
//!   button in declaration order.
//!
//! ```
//! use understory_stylus::{ButtonStatus, PointDescription, PointProperty};
//!
//! let mouse = &PointDescription::MOUSE;
//! assert_eq!(mouse.stride(), 4);
//!
//! let record = [10, 20, 0, mouse.pack_buttons(ButtonStatus::TIP)];
//! assert_eq!(mouse.value(&record, PointProperty::X), Some(10));
//! assert_eq!(mouse.buttons(&record), ButtonStatus::TIP);
//! ```

use alloc::borrow::Cow;
use alloc::vec::Vec;

use crate::error::DescriptionError;

/// A property carried by each stylus point.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum PointProperty {
    /// Horizontal position in device units.
    X,
    /// Vertical position in device units.
    Y,
    /// Pen or contact pressure.
    NormalPressure,
    /// Driver-specific packet status bits.
    PacketStatus,
    /// Tip contact button.
    TipButton,
    /// Barrel (side) button.
    BarrelButton,
}

impl PointProperty {
    /// Whether this property is packed as a single bit into the trailing button word.
    pub const fn is_button(self) -> bool {
        matches!(self, Self::TipButton | Self::BarrelButton)
    }
}

/// A declared property together with its value range.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct PointPropertyInfo {
    /// Which property.
    pub property: PointProperty,
    /// Smallest reported value.
    pub minimum: i32,
    /// Largest reported value.
    pub maximum: i32,
    /// Whether the value occupies a slot in each record.
    ///
    /// Ignored for buttons, which always live in the trailing button word.
    pub stored: bool,
}

impl PointPropertyInfo {
    /// Declare a stored property with the given range.
    pub const fn new(property: PointProperty, minimum: i32, maximum: i32) -> Self {
        Self {
            property,
            minimum,
            maximum,
            stored: true,
        }
    }

    /// Declare a property that is not carried in records.
    pub const fn synthesized(property: PointProperty, minimum: i32, maximum: i32) -> Self {
        Self {
            property,
            minimum,
            maximum,
            stored: false,
        }
    }

    /// Declare a button property.
    pub const fn button(property: PointProperty) -> Self {
        Self::new(property, 0, 1)
    }

    /// Value reported for a synthesized property.
    pub const fn default_value(&self) -> i32 {
        self.minimum + (self.maximum - self.minimum) / 2
    }
}

bitflags::bitflags! {
    /// Logical button state of a stylus point.
    ///
    /// This is independent of any particular descriptor; use
    /// [`PointDescription::pack_buttons`] to place the bits where a descriptor
    /// expects them.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ButtonStatus: u32 {
        /// The tip is in contact with the surface (or the primary mouse button is down).
        const TIP    = 0b0000_0001;
        /// The barrel button is pressed (or the secondary mouse button is down).
        const BARREL = 0b0000_0010;
    }
}

const PRESSURE_MAX: i32 = 1023;

const STYLUS_PROPERTIES: [PointPropertyInfo; 6] = [
    PointPropertyInfo::new(PointProperty::X, i32::MIN, i32::MAX),
    PointPropertyInfo::new(PointProperty::Y, i32::MIN, i32::MAX),
    PointPropertyInfo::new(PointProperty::NormalPressure, 0, PRESSURE_MAX),
    PointPropertyInfo::new(PointProperty::PacketStatus, i32::MIN, i32::MAX),
    PointPropertyInfo::button(PointProperty::TipButton),
    PointPropertyInfo::button(PointProperty::BarrelButton),
];

const MOUSE_PROPERTIES: [PointPropertyInfo; 6] = [
    PointPropertyInfo::new(PointProperty::X, i32::MIN, i32::MAX),
    PointPropertyInfo::new(PointProperty::Y, i32::MIN, i32::MAX),
    PointPropertyInfo::synthesized(PointProperty::NormalPressure, 0, PRESSURE_MAX),
    PointPropertyInfo::new(PointProperty::PacketStatus, i32::MIN, i32::MAX),
    PointPropertyInfo::button(PointProperty::TipButton),
    PointPropertyInfo::button(PointProperty::BarrelButton),
];

/// Ordered description of the properties in each packet record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PointDescription {
    properties: Cow<'static, [PointPropertyInfo]>,
}

impl PointDescription {
    /// Descriptor for pen and touch packets: position, pressure, status, tip and barrel.
    pub const STYLUS: Self = Self {
        properties: Cow::Borrowed(&STYLUS_PROPERTIES),
    };

    /// Descriptor for packets synthesized from mouse input.
    ///
    /// Declares pressure so consumers see the same shape as [`Self::STYLUS`],
    /// but there is no real pressure channel: records hold X, Y, status and
    /// the button word, and pressure reads back as its midpoint.
    pub const MOUSE: Self = Self {
        properties: Cow::Borrowed(&MOUSE_PROPERTIES),
    };

    /// Build a descriptor from an ordered property list.
    ///
    /// The list must start with stored `X` then `Y`, and every button must
    /// come after every non-button property.
    pub fn new(properties: Vec<PointPropertyInfo>) -> Result<Self, DescriptionError> {
        match properties.as_slice() {
            [x, y, ..] if x.property == PointProperty::X && y.property == PointProperty::Y => {
                if !(x.stored && y.stored) {
                    return Err(DescriptionError::SynthesizedCoordinates);
                }
            }
            _ => return Err(DescriptionError::MissingCoordinates),
        }
        if let Some(first_button) = properties.iter().position(|p| p.property.is_button())
            && properties[first_button..]
                .iter()
                .any(|p| !p.property.is_button())
        {
            return Err(DescriptionError::ButtonOrder);
        }
        Ok(Self {
            properties: Cow::Owned(properties),
        })
    }

    /// Declared properties, in order.
    pub fn properties(&self) -> &[PointPropertyInfo] {
        &self.properties
    }

    /// Whether the descriptor declares `property`.
    pub fn has_property(&self, property: PointProperty) -> bool {
        self.properties.iter().any(|p| p.property == property)
    }

    /// Number of integers per record.
    pub fn stride(&self) -> usize {
        let values = self
            .properties
            .iter()
            .filter(|p| p.stored && !p.property.is_button())
            .count();
        values + usize::from(self.has_buttons())
    }

    /// Number of complete records in a packet of `len` integers.
    pub fn record_count(&self, len: usize) -> usize {
        len / self.stride()
    }

    /// Slot of a stored, non-button property within a record.
    pub fn index_of(&self, property: PointProperty) -> Option<usize> {
        self.properties
            .iter()
            .filter(|p| p.stored && !p.property.is_button())
            .position(|p| p.property == property)
    }

    /// Slot of the trailing button word, if any button is declared.
    pub fn button_word_index(&self) -> Option<usize> {
        self.has_buttons().then(|| self.stride() - 1)
    }

    /// Read `property` from one record.
    ///
    /// Stored properties read their slot, synthesized ones read their
    /// midpoint, and buttons read `0` or `1`. Returns `None` when the
    /// property is not declared or the record is too short.
    pub fn value(&self, record: &[i32], property: PointProperty) -> Option<i32> {
        let info = self.properties.iter().find(|p| p.property == property)?;
        if property.is_button() {
            let word = *record.get(self.button_word_index()?)?;
            let bit = self.button_bit(property)?;
            return Some((word >> bit) & 1);
        }
        if !info.stored {
            return Some(info.default_value());
        }
        record.get(self.index_of(property)?).copied()
    }

    /// Logical button state of one record.
    pub fn buttons(&self, record: &[i32]) -> ButtonStatus {
        let mut status = ButtonStatus::empty();
        if self.value(record, PointProperty::TipButton) == Some(1) {
            status |= ButtonStatus::TIP;
        }
        if self.value(record, PointProperty::BarrelButton) == Some(1) {
            status |= ButtonStatus::BARREL;
        }
        status
    }

    /// Pack a logical button state into this descriptor's button word.
    ///
    /// Buttons the descriptor does not declare are dropped.
    pub fn pack_buttons(&self, status: ButtonStatus) -> i32 {
        let mut word = 0;
        if status.contains(ButtonStatus::TIP)
            && let Some(bit) = self.button_bit(PointProperty::TipButton)
        {
            word |= 1 << bit;
        }
        if status.contains(ButtonStatus::BARREL)
            && let Some(bit) = self.button_bit(PointProperty::BarrelButton)
        {
            word |= 1 << bit;
        }
        word
    }

    fn has_buttons(&self) -> bool {
        self.properties.iter().any(|p| p.property.is_button())
    }

    fn button_bit(&self, property: PointProperty) -> Option<u32> {
        let bit = self
            .properties
            .iter()
            .filter(|p| p.property.is_button())
            .position(|p| p.property == property)?;
        u32::try_from(bit).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn builtin_strides() {
        assert_eq!(PointDescription::STYLUS.stride(), 5);
        assert_eq!(PointDescription::MOUSE.stride(), 4);
        assert_eq!(PointDescription::STYLUS.button_word_index(), Some(4));
        assert_eq!(PointDescription::MOUSE.button_word_index(), Some(3));
    }

    #[test]
    fn mouse_pressure_is_synthesized() {
        let mouse = &PointDescription::MOUSE;
        assert!(mouse.has_property(PointProperty::NormalPressure));
        assert_eq!(mouse.index_of(PointProperty::NormalPressure), None);
        let record = [1, 2, 0, 0];
        assert_eq!(
            mouse.value(&record, PointProperty::NormalPressure),
            Some(PRESSURE_MAX / 2)
        );
        assert_eq!(mouse.value(&record, PointProperty::PacketStatus), Some(0));
    }

    #[test]
    fn buttons_round_trip_through_word() {
        let d = &PointDescription::STYLUS;
        let word = d.pack_buttons(ButtonStatus::TIP | ButtonStatus::BARREL);
        assert_eq!(word, 0b11);
        let record = [0, 0, 0, 0, word];
        assert_eq!(d.buttons(&record), ButtonStatus::TIP | ButtonStatus::BARREL);
        let record = [0, 0, 0, 0, d.pack_buttons(ButtonStatus::BARREL)];
        assert_eq!(d.buttons(&record), ButtonStatus::BARREL);
    }

    #[test]
    fn undeclared_buttons_are_dropped() {
        let d = PointDescription::new(vec![
            PointPropertyInfo::new(PointProperty::X, 0, 100),
            PointPropertyInfo::new(PointProperty::Y, 0, 100),
            PointPropertyInfo::button(PointProperty::BarrelButton),
        ])
        .unwrap();
        assert_eq!(d.stride(), 3);
        assert_eq!(d.pack_buttons(ButtonStatus::TIP), 0);
        assert_eq!(d.pack_buttons(ButtonStatus::BARREL), 1);
    }

    #[test]
    fn rejects_malformed_descriptors() {
        let missing_y = PointDescription::new(vec![
            PointPropertyInfo::new(PointProperty::X, 0, 100),
            PointPropertyInfo::new(PointProperty::NormalPressure, 0, 100),
        ]);
        assert_eq!(missing_y, Err(DescriptionError::MissingCoordinates));

        let button_first = PointDescription::new(vec![
            PointPropertyInfo::new(PointProperty::X, 0, 100),
            PointPropertyInfo::new(PointProperty::Y, 0, 100),
            PointPropertyInfo::button(PointProperty::TipButton),
            PointPropertyInfo::new(PointProperty::NormalPressure, 0, 100),
        ]);
        assert_eq!(button_first, Err(DescriptionError::ButtonOrder));
    }

    #[test]
    fn rejects_synthesized_coordinates() {
        let neither = PointDescription::new(vec![
            PointPropertyInfo::synthesized(PointProperty::X, 0, 100),
            PointPropertyInfo::synthesized(PointProperty::Y, 0, 100),
        ]);
        assert_eq!(neither, Err(DescriptionError::SynthesizedCoordinates));

        let only_x = PointDescription::new(vec![
            PointPropertyInfo::new(PointProperty::X, 0, 100),
            PointPropertyInfo::synthesized(PointProperty::Y, 0, 100),
            PointPropertyInfo::button(PointProperty::TipButton),
        ]);
        assert_eq!(only_x, Err(DescriptionError::SynthesizedCoordinates));
    }

    #[test]
    fn short_records_read_as_missing() {
        let d = &PointDescription::STYLUS;
        assert_eq!(d.value(&[1], PointProperty::Y), None);
        assert_eq!(d.record_count(9), 1);
        assert_eq!(d.record_count(10), 2);
    }
}
