// SPDX-License-Identifier: MIT

//! Reconstruct a HID Report Descriptor from a device's parsed capabilities.
//!
//! Some HID stacks never hand out the report descriptor of a device. What they do
//! hand out is the result of parsing it: a summary of the top-level collection and
//! a list of button and value capabilities per report kind. This crate turns those
//! capabilities back into report descriptor bytes.
//!
//! The result is a *reconstruction*, not a copy. The capabilities do not carry the
//! bit size of value fields, so those fields come out without Report Size and
//! Report Count (see [Assembler] for the details). The bytes are good enough to
//! identify a device, to diff two devices against each other or to feed back into
//! tools that only look at usages and ranges.
//!
//! ## Capabilities
//!
//! The source of capabilities is a [CapabilityProvider]. The crate ships with one,
//! the [CapabilitySnapshot], which is just the capabilities in memory and can be
//! loaded from YAML. Anything else, e.g. the operating system's HID API, needs to
//! implement the trait.
//!
//! # Example
//!
//! A 3-button mouse with a relative x axis:
//! ```
//! # use hidrecon::{ButtonCapability, CapabilitySnapshot, ValueCapability};
//! # use hidreport::{Usage, UsageId, UsagePage};
//! # use hut::{AsUsage, GenericDesktop};
//! #
//! # fn main() -> Result<(), hidrecon::ReconstructError> {
//! let button = |id: u16| Usage::from_page_and_id(UsagePage::from(0x09), UsageId::from(id));
//!
//! let snapshot = CapabilitySnapshot {
//!     usage_page: 0x01,
//!     usage: 0x02,
//!     input_report_byte_length: 3,
//!     input_buttons: vec![ButtonCapability::range(&button(1), &button(3))],
//!     input_values: vec![
//!         ValueCapability::new(&Usage::from(GenericDesktop::X.usage_value()), -127, 127)
//!             .relative(),
//!     ],
//!     ..Default::default()
//! };
//!
//! let rdesc: Vec<u8> = hidrecon::reconstruct_descriptor(Some(&snapshot))?;
//! assert_eq!(&rdesc[..6], &[0x05, 0x01, 0x09, 0x02, 0xA1, 0x01]);
//! # Ok(())
//! # }
//! ```

use thiserror::Error;

mod assemble;
mod caps;
pub mod dump;
pub mod finder;
mod item;
mod snapshot;

pub use assemble::{Assembler, DEFAULT_INITIAL_CAPACITY};
pub use caps::{
    ButtonCapability, CapabilityExtractor, CapabilityProvider, CapabilityQuery,
    DeviceCapabilitySummary, QueryStatus, ReportKind, ReportSummary, UsageSpec, ValueCapability,
};
pub use item::{DescriptorBuffer, ItemClass, ItemTag, LengthClass, LengthCode};
pub use snapshot::{CapabilitySnapshot, LoadError};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconstructError {
    #[error("No capability provider given")]
    NullInput,
    #[error("Capability query for {query} failed with status {status}")]
    CapabilityQueryFailed {
        query: CapabilityQuery,
        status: QueryStatus,
    },
    #[error("Failed to allocate {requested} bytes")]
    AllocationFailed { requested: usize },
    #[error("Unsupported item length code {0}")]
    UnsupportedLengthCode(u8),
}

pub type Result<T> = core::result::Result<T, ReconstructError>;

/// Reconstruct the report descriptor of the device behind `provider` with the
/// default [Assembler].
///
/// A missing provider is an error, not an empty descriptor.
pub fn reconstruct_descriptor<P: CapabilityProvider + ?Sized>(
    provider: Option<&P>,
) -> Result<Vec<u8>> {
    let provider = provider.ok_or(ReconstructError::NullInput)?;
    Assembler::new().assemble(provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_input() {
        let result = reconstruct_descriptor::<CapabilitySnapshot>(None);
        assert_eq!(result, Err(ReconstructError::NullInput));

        let result = reconstruct_descriptor::<dyn CapabilityProvider>(None);
        assert_eq!(result, Err(ReconstructError::NullInput));
    }

    #[test]
    fn test_single_button_mouse() {
        let snapshot = CapabilitySnapshot {
            usage_page: 0x0001,
            usage: 0x0002,
            input_buttons: vec![ButtonCapability {
                usage_page: 0x0009,
                report_id: 0,
                usage: UsageSpec::Single(0x01),
                is_absolute: true,
            }],
            ..Default::default()
        };
        let rdesc = reconstruct_descriptor(Some(&snapshot)).unwrap();
        assert_eq!(
            dump::hex_string(&rdesc),
            "05 01 09 02 A1 01 05 09 09 01 95 01 75 01 81 02 C0"
        );
    }

    #[test]
    fn test_dyn_provider() {
        let snapshot = CapabilitySnapshot {
            usage_page: 0x0C,
            usage: 0x01,
            ..Default::default()
        };
        let provider: &dyn CapabilityProvider = &snapshot;
        let rdesc = reconstruct_descriptor(Some(provider)).unwrap();
        assert_eq!(rdesc, vec![0x05, 0x0C, 0x09, 0x01, 0xA1, 0x01, 0xC0]);
    }

    #[test]
    fn test_error_messages() {
        let err = ReconstructError::CapabilityQueryFailed {
            query: CapabilityQuery::Values(ReportKind::Output),
            status: QueryStatus::BUFFER_TOO_SMALL,
        };
        assert_eq!(
            err.to_string(),
            "Capability query for output values failed with status 0xc0110007"
        );
    }
}
