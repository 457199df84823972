// SPDX-License-Identifier: MIT

//! Assembling a HID Report Descriptor from capability records.
//!
//! The sequence is fixed: one Application Collection with the device's
//! top-level usage, then all input buttons, all input values and all output
//! values, each in provider order, then the End Collection.
//!
//! The capability records lack the bit layout of the reports, which is
//! handled as follows:
//!
//! - buttons are assumed to be one bit each (Report Size 1)
//! - input values get no Report Size/Report Count at all. The resulting
//!   descriptor is incomplete for multi-bit input values, it is not
//!   a byte-faithful reconstruction
//! - an output value is assumed to span the whole output report,
//!   i.e. Report Size 8 and Report Count of the output report length.
//!   This holds for devices with a single opaque output report only.

use crate::caps::{
    ButtonCapability, CapabilityExtractor, CapabilityProvider, ReportKind, UsageSpec,
    ValueCapability,
};
use crate::item::{DescriptorBuffer, ItemTag};
use crate::Result;

/// Collection type of the top-level collection
const COLLECTION_APPLICATION: u8 = 0x01;

/// Main item flag bits. Bit 0 (Constant) is never set.
const MAIN_VARIABLE: u8 = 0x02;
const MAIN_RELATIVE: u8 = 0x04;

/// Report Size of a button, in bits
const BUTTON_REPORT_SIZE: i32 = 1;
/// Report Size of an output value, in bits
const OUTPUT_REPORT_SIZE: i32 = 8;

/// Initial descriptor buffer size in bytes
pub const DEFAULT_INITIAL_CAPACITY: usize = 256;

fn main_item_flags(is_absolute: bool) -> u8 {
    if is_absolute {
        MAIN_VARIABLE
    } else {
        MAIN_VARIABLE | MAIN_RELATIVE
    }
}

/// Reconstructs a HID Report Descriptor from a [CapabilityProvider].
///
/// ```
/// # use hidrecon::{Assembler, CapabilitySnapshot, ButtonCapability, UsageSpec};
/// let snapshot = CapabilitySnapshot {
///     usage_page: 0x01,
///     usage: 0x02,
///     input_buttons: vec![ButtonCapability {
///         usage_page: 0x09,
///         usage: UsageSpec::Single(0x01),
///         ..Default::default()
///     }],
///     ..Default::default()
/// };
/// let rdesc = Assembler::new().assemble(&snapshot).unwrap();
/// assert_eq!(rdesc.first(), Some(&0x05));
/// assert_eq!(rdesc.last(), Some(&0xC0));
/// ```
#[derive(Clone, Debug)]
pub struct Assembler {
    initial_capacity: usize,
    capacity_limit: Option<usize>,
}

impl Default for Assembler {
    fn default() -> Self {
        Assembler::new()
    }
}

impl Assembler {
    pub fn new() -> Assembler {
        Assembler {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            capacity_limit: None,
        }
    }

    /// Set the size the descriptor buffer starts out with
    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Never let the descriptor buffer grow beyond `limit` bytes.
    ///
    /// A descriptor that does not fit fails with
    /// [AllocationFailed](crate::ReconstructError::AllocationFailed).
    pub fn capacity_limit(mut self, limit: usize) -> Self {
        self.capacity_limit = Some(limit);
        self
    }

    /// Build the report descriptor bytes.
    ///
    /// Any failing query or item aborts the whole assembly. There is
    /// no partial result, everything allocated so far is released.
    pub fn assemble<P: CapabilityProvider + ?Sized>(&self, provider: &P) -> Result<Vec<u8>> {
        let caps = CapabilityExtractor::query(provider)?;
        let summary = *caps.summary();

        let mut bytes = DescriptorBuffer::with_capacity(self.initial_capacity, self.capacity_limit)?;

        bytes.append_value(ItemTag::UsagePage, i32::from(summary.usage_page))?;
        bytes.append_value(ItemTag::Usage, i32::from(summary.usage))?;
        bytes.append_byte(ItemTag::Collection, COLLECTION_APPLICATION)?;

        for button in caps.button_capabilities(ReportKind::Input)? {
            log::debug!("Input button: {button:?}");
            emit_button(&mut bytes, &button)?;
        }

        for value in caps.value_capabilities(ReportKind::Input)? {
            log::debug!("Input value: {value:?}");
            emit_field_usages(&mut bytes, value.report_id, value.usage_page, &value.usage)?;
            emit_value_ranges(&mut bytes, &value)?;
            // No Report Size/Count, the capability doesn't have it
            bytes.append_byte(ItemTag::Input, main_item_flags(value.is_absolute))?;
        }

        if summary.output.button_caps > 0 {
            log::debug!(
                "Skipping {} output button capabilities",
                summary.output.button_caps
            );
        }

        for value in caps.value_capabilities(ReportKind::Output)? {
            log::debug!("Output value: {value:?}");
            emit_field_usages(&mut bytes, value.report_id, value.usage_page, &value.usage)?;
            emit_value_ranges(&mut bytes, &value)?;
            bytes.append_value(ItemTag::ReportSize, OUTPUT_REPORT_SIZE)?;
            bytes.append_value(
                ItemTag::ReportCount,
                i32::from(summary.output.byte_length),
            )?;
            bytes.append_byte(ItemTag::Output, main_item_flags(value.is_absolute))?;
        }

        if summary.feature.button_caps > 0 || summary.feature.value_caps > 0 {
            log::debug!("Feature capabilities are not reconstructed");
        }

        bytes.append_simple(ItemTag::EndCollection)?;

        log::debug!("Reconstructed report descriptor of {} bytes", bytes.len());
        Ok(bytes.into_bytes())
    }
}

/// Report ID, Usage Page, the usage or usage range and the Report Count that goes with it
fn emit_field_usages(
    bytes: &mut DescriptorBuffer,
    report_id: u8,
    usage_page: u16,
    usage: &UsageSpec,
) -> Result<()> {
    if report_id != 0 {
        bytes.append_byte(ItemTag::ReportId, report_id)?;
    }
    bytes.append_value(ItemTag::UsagePage, i32::from(usage_page))?;
    match usage {
        UsageSpec::Range { min, max } => {
            bytes.append_value(ItemTag::UsageMinimum, i32::from(*min))?;
            bytes.append_value(ItemTag::UsageMaximum, i32::from(*max))?;
        }
        UsageSpec::Single(usage) => {
            bytes.append_value(ItemTag::Usage, i32::from(*usage))?;
        }
    }
    bytes.append_value(ItemTag::ReportCount, usage.report_count())
}

fn emit_button(bytes: &mut DescriptorBuffer, button: &ButtonCapability) -> Result<()> {
    emit_field_usages(bytes, button.report_id, button.usage_page, &button.usage)?;
    bytes.append_value(ItemTag::ReportSize, BUTTON_REPORT_SIZE)?;
    bytes.append_byte(ItemTag::Input, main_item_flags(button.is_absolute))
}

/// Logical range, the physical range where it says something, and the unit if any
fn emit_value_ranges(bytes: &mut DescriptorBuffer, value: &ValueCapability) -> Result<()> {
    bytes.append_value(ItemTag::LogicalMinimum, value.logical_min)?;
    bytes.append_value(ItemTag::LogicalMaximum, value.logical_max)?;
    if value.has_distinct_physical_range() {
        bytes.append_value(ItemTag::PhysicalMinimum, value.physical_min)?;
        bytes.append_value(ItemTag::PhysicalMaximum, value.physical_max)?;
    }
    if value.units != 0 {
        // Unit codes are bit fields, keep the bit pattern
        bytes.append_value(ItemTag::Unit, value.units as i32)?;
    }
    Ok(())
}
