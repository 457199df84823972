// SPDX-License-Identifier: MIT

//! Capability records and their extraction from a [CapabilityProvider].
//!
//! A capability provider is whatever has already parsed the device's report descriptor
//! (typically the operating system's HID stack) and now only exposes a summary of it:
//! which usages exist, their ranges and which report they're in. Notably it does
//! *not* expose the bit size or count of value fields.

use crate::{ReconstructError, Result};
use hidreport::Usage;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The report kinds that are queried for capabilities.
///
/// Feature reports are never queried, their counts are only carried
/// in the [DeviceCapabilitySummary].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportKind {
    Input,
    Output,
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportKind::Input => write!(f, "input"),
            ReportKind::Output => write!(f, "output"),
        }
    }
}

/// Status code of a failed capability query, as reported by the provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct QueryStatus(pub u32);

impl QueryStatus {
    /// The provider returned more records than the summary announced
    pub const BUFFER_TOO_SMALL: QueryStatus = QueryStatus(0xC011_0007);
    pub const INVALID_PREPARSED_DATA: QueryStatus = QueryStatus(0xC011_0001);
}

impl fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// The query that failed, see [ReconstructError::CapabilityQueryFailed].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CapabilityQuery {
    Summary,
    Buttons(ReportKind),
    Values(ReportKind),
}

impl fmt::Display for CapabilityQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapabilityQuery::Summary => write!(f, "summary"),
            CapabilityQuery::Buttons(kind) => write!(f, "{kind} buttons"),
            CapabilityQuery::Values(kind) => write!(f, "{kind} values"),
        }
    }
}

/// Lengths and capability counts of one report kind
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReportSummary {
    /// Length of the longest report of this kind in bytes, including the Report ID byte
    pub byte_length: u16,
    pub button_caps: u16,
    pub value_caps: u16,
}

/// Device-level summary of all capabilities
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeviceCapabilitySummary {
    /// Usage Page of the top-level collection
    pub usage_page: u16,
    /// Usage of the top-level collection
    pub usage: u16,
    pub input: ReportSummary,
    pub output: ReportSummary,
    pub feature: ReportSummary,
}

impl DeviceCapabilitySummary {
    pub fn report(&self, kind: ReportKind) -> &ReportSummary {
        match kind {
            ReportKind::Input => &self.input,
            ReportKind::Output => &self.output,
        }
    }
}

/// Either a single usage or an inclusive usage range, both within one usage page.
///
/// In YAML this is a single-key map, `{ single: 0x30 }` or `{ range: { min: 1, max: 3 } }`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageSpec {
    Single(u16),
    Range { min: u16, max: u16 },
}

impl Default for UsageSpec {
    fn default() -> Self {
        UsageSpec::Single(0)
    }
}

impl UsageSpec {
    pub fn is_range(&self) -> bool {
        matches!(self, UsageSpec::Range { .. })
    }

    /// The number of report fields this usage spec implies: one per usage.
    ///
    /// An inverted range gives a count of zero or less, it is not corrected.
    pub fn report_count(&self) -> i32 {
        match self {
            UsageSpec::Single(_) => 1,
            UsageSpec::Range { min, max } => i32::from(*max) - i32::from(*min) + 1,
        }
    }
}

fn split_usage(usage: &Usage) -> (u16, u16) {
    let value = u32::from(usage);
    ((value >> 16) as u16, (value & 0xFFFF) as u16)
}

fn default_absolute() -> bool {
    true
}

/// One button capability. Buttons are treated as one bit per usage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ButtonCapability {
    pub usage_page: u16,
    /// The report this button lives in, 0 if the device does not use Report IDs
    #[serde(default)]
    pub report_id: u8,
    #[serde(with = "serde_yaml::with::singleton_map")]
    pub usage: UsageSpec,
    #[serde(default = "default_absolute")]
    pub is_absolute: bool,
}

impl Default for ButtonCapability {
    fn default() -> Self {
        ButtonCapability {
            usage_page: 0,
            report_id: 0,
            usage: UsageSpec::default(),
            is_absolute: true,
        }
    }
}

impl ButtonCapability {
    /// A single absolute button
    pub fn new(usage: &Usage) -> Self {
        let (usage_page, usage_id) = split_usage(usage);
        ButtonCapability {
            usage_page,
            usage: UsageSpec::Single(usage_id),
            ..Default::default()
        }
    }

    /// A range of absolute buttons. The usage page is taken from `min`.
    pub fn range(min: &Usage, max: &Usage) -> Self {
        let (usage_page, min) = split_usage(min);
        let (_, max) = split_usage(max);
        ButtonCapability {
            usage_page,
            usage: UsageSpec::Range { min, max },
            ..Default::default()
        }
    }

    pub fn report_id(mut self, report_id: u8) -> Self {
        self.report_id = report_id;
        self
    }

    pub fn relative(mut self) -> Self {
        self.is_absolute = false;
        self
    }
}

/// One value capability.
///
/// There is no report size or report count here, the provider does not know them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ValueCapability {
    pub usage_page: u16,
    #[serde(default)]
    pub report_id: u8,
    #[serde(with = "serde_yaml::with::singleton_map")]
    pub usage: UsageSpec,
    pub logical_min: i32,
    pub logical_max: i32,
    #[serde(default)]
    pub physical_min: i32,
    #[serde(default)]
    pub physical_max: i32,
    /// The raw HID unit code, 0 for none
    #[serde(default)]
    pub units: u32,
    #[serde(default = "default_absolute")]
    pub is_absolute: bool,
}

impl Default for ValueCapability {
    fn default() -> Self {
        ValueCapability {
            usage_page: 0,
            report_id: 0,
            usage: UsageSpec::default(),
            logical_min: 0,
            logical_max: 0,
            physical_min: 0,
            physical_max: 0,
            units: 0,
            is_absolute: true,
        }
    }
}

impl ValueCapability {
    /// An absolute value with the given logical range
    pub fn new(usage: &Usage, logical_min: i32, logical_max: i32) -> Self {
        let (usage_page, usage_id) = split_usage(usage);
        ValueCapability {
            usage_page,
            usage: UsageSpec::Single(usage_id),
            logical_min,
            logical_max,
            ..Default::default()
        }
    }

    pub fn report_id(mut self, report_id: u8) -> Self {
        self.report_id = report_id;
        self
    }

    pub fn physical_range(mut self, min: i32, max: i32) -> Self {
        self.physical_min = min;
        self.physical_max = max;
        self
    }

    pub fn units(mut self, units: u32) -> Self {
        self.units = units;
        self
    }

    pub fn relative(mut self) -> Self {
        self.is_absolute = false;
        self
    }

    /// Whether the physical range carries information beyond the logical range.
    ///
    /// An all-zero physical range means "same as logical", and so does one
    /// that is identical to the logical range.
    pub fn has_distinct_physical_range(&self) -> bool {
        (self.physical_min != 0 || self.physical_max != 0)
            && (self.physical_min != self.logical_min || self.physical_max != self.logical_max)
    }
}

/// Something that has parsed a device's capabilities and can be queried for them.
///
/// The array queries fill the given slice, which is sized to the count announced in
/// the summary, and return the number of records written.
pub trait CapabilityProvider {
    fn summary(&self) -> core::result::Result<DeviceCapabilitySummary, QueryStatus>;

    fn button_capabilities(
        &self,
        kind: ReportKind,
        caps: &mut [ButtonCapability],
    ) -> core::result::Result<usize, QueryStatus>;

    fn value_capabilities(
        &self,
        kind: ReportKind,
        caps: &mut [ValueCapability],
    ) -> core::result::Result<usize, QueryStatus>;
}

/// Pulls capability records out of a [CapabilityProvider].
///
/// The summary is read once, in [CapabilityExtractor::query], and
/// determines the size of every subsequent array query.
pub struct CapabilityExtractor<'a, P: CapabilityProvider + ?Sized> {
    provider: &'a P,
    summary: DeviceCapabilitySummary,
}

impl<'a, P: CapabilityProvider + ?Sized> CapabilityExtractor<'a, P> {
    /// Query the device summary from the provider
    pub fn query(provider: &'a P) -> Result<Self> {
        let summary = provider
            .summary()
            .map_err(|status| ReconstructError::CapabilityQueryFailed {
                query: CapabilityQuery::Summary,
                status,
            })?;
        log::debug!("Capability summary: {summary:?}");

        Ok(CapabilityExtractor { provider, summary })
    }

    pub fn summary(&self) -> &DeviceCapabilitySummary {
        &self.summary
    }

    /// All button capabilities of the given kind, in provider order
    pub fn button_capabilities(&self, kind: ReportKind) -> Result<Vec<ButtonCapability>> {
        let count = self.summary.report(kind).button_caps;
        fetch(count, CapabilityQuery::Buttons(kind), |caps| {
            self.provider.button_capabilities(kind, caps)
        })
    }

    /// All value capabilities of the given kind, in provider order
    pub fn value_capabilities(&self, kind: ReportKind) -> Result<Vec<ValueCapability>> {
        let count = self.summary.report(kind).value_caps;
        fetch(count, CapabilityQuery::Values(kind), |caps| {
            self.provider.value_capabilities(kind, caps)
        })
    }
}

fn fetch<T, F>(count: u16, query: CapabilityQuery, fill: F) -> Result<Vec<T>>
where
    T: Clone + Default,
    F: FnOnce(&mut [T]) -> core::result::Result<usize, QueryStatus>,
{
    let count = usize::from(count);
    let mut caps: Vec<T> = Vec::new();
    if count == 0 {
        return Ok(caps);
    }

    caps.try_reserve_exact(count)
        .map_err(|_| ReconstructError::AllocationFailed {
            requested: count * core::mem::size_of::<T>(),
        })?;
    caps.resize(count, T::default());

    let written =
        fill(&mut caps).map_err(|status| ReconstructError::CapabilityQueryFailed { query, status })?;
    if written > count {
        return Err(ReconstructError::CapabilityQueryFailed {
            query,
            status: QueryStatus::BUFFER_TOO_SMALL,
        });
    }
    if written < count {
        log::warn!("Expected {count} {query} capabilities, got {written}");
        caps.truncate(written);
    }

    Ok(caps)
}
