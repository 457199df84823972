// SPDX-License-Identifier: MIT

//! An in-memory [CapabilityProvider], loadable from YAML.
//!
//! Capabilities captured on one host can be written down once and replayed anywhere:
//!
//! ```yaml
//! usage_page: 0x01
//! usage: 0x02
//! input_report_byte_length: 4
//! input_buttons:
//!   - usage_page: 0x09
//!     usage: { range: { min: 1, max: 3 } }
//! input_values:
//!   - usage_page: 0x01
//!     usage: { single: 0x30 }
//!     logical_min: -127
//!     logical_max: 127
//!     is_absolute: false
//! ```

use crate::caps::{
    ButtonCapability, CapabilityProvider, DeviceCapabilitySummary, QueryStatus, ReportKind,
    ReportSummary, ValueCapability,
};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use thiserror::Error;

/// Error when loading a [CapabilitySnapshot]
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Could not read: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Unable to deserialize: {0}")]
    DeserializeError(#[from] serde_yaml::Error),
}

/// A complete, owned set of device capabilities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct CapabilitySnapshot {
    pub usage_page: u16,
    pub usage: u16,
    #[serde(default)]
    pub input_report_byte_length: u16,
    #[serde(default)]
    pub output_report_byte_length: u16,
    #[serde(default)]
    pub feature_report_byte_length: u16,
    #[serde(default)]
    pub input_buttons: Vec<ButtonCapability>,
    #[serde(default)]
    pub input_values: Vec<ValueCapability>,
    #[serde(default)]
    pub output_buttons: Vec<ButtonCapability>,
    #[serde(default)]
    pub output_values: Vec<ValueCapability>,
}

impl CapabilitySnapshot {
    /// Load a snapshot from the given YAML string
    pub fn from_yaml(content: &str) -> Result<CapabilitySnapshot, LoadError> {
        let snapshot: CapabilitySnapshot = serde_yaml::from_str(content)?;
        Ok(snapshot)
    }

    /// Load a snapshot from the given YAML file
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<CapabilitySnapshot, LoadError> {
        let file = File::open(path)?;
        let snapshot: CapabilitySnapshot = serde_yaml::from_reader(file)?;
        Ok(snapshot)
    }

    /// Serialize this snapshot to YAML
    pub fn to_yaml(&self) -> Result<String, LoadError> {
        Ok(serde_yaml::to_string(self)?)
    }

    fn buttons(&self, kind: ReportKind) -> &[ButtonCapability] {
        match kind {
            ReportKind::Input => &self.input_buttons,
            ReportKind::Output => &self.output_buttons,
        }
    }

    fn values(&self, kind: ReportKind) -> &[ValueCapability] {
        match kind {
            ReportKind::Input => &self.input_values,
            ReportKind::Output => &self.output_values,
        }
    }
}

fn count(len: usize) -> Result<u16, QueryStatus> {
    u16::try_from(len).map_err(|_| QueryStatus::BUFFER_TOO_SMALL)
}

fn copy_into<T: Copy>(src: &[T], dst: &mut [T]) -> Result<usize, QueryStatus> {
    if src.len() > dst.len() {
        return Err(QueryStatus::BUFFER_TOO_SMALL);
    }
    dst[..src.len()].copy_from_slice(src);
    Ok(src.len())
}

impl CapabilityProvider for CapabilitySnapshot {
    fn summary(&self) -> Result<DeviceCapabilitySummary, QueryStatus> {
        Ok(DeviceCapabilitySummary {
            usage_page: self.usage_page,
            usage: self.usage,
            input: ReportSummary {
                byte_length: self.input_report_byte_length,
                button_caps: count(self.input_buttons.len())?,
                value_caps: count(self.input_values.len())?,
            },
            output: ReportSummary {
                byte_length: self.output_report_byte_length,
                button_caps: count(self.output_buttons.len())?,
                value_caps: count(self.output_values.len())?,
            },
            feature: ReportSummary {
                byte_length: self.feature_report_byte_length,
                ..Default::default()
            },
        })
    }

    fn button_capabilities(
        &self,
        kind: ReportKind,
        caps: &mut [ButtonCapability],
    ) -> Result<usize, QueryStatus> {
        copy_into(self.buttons(kind), caps)
    }

    fn value_capabilities(
        &self,
        kind: ReportKind,
        caps: &mut [ValueCapability],
    ) -> Result<usize, QueryStatus> {
        copy_into(self.values(kind), caps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caps::UsageSpec;

    const MOUSE: &str = r#"
usage_page: 0x01
usage: 0x02
input_report_byte_length: 4
input_buttons:
  - usage_page: 0x09
    usage: { range: { min: 1, max: 3 } }
input_values:
  - usage_page: 0x01
    usage: { single: 0x30 }
    logical_min: -127
    logical_max: 127
    is_absolute: false
"#;

    #[test]
    fn test_from_yaml() {
        let snapshot = CapabilitySnapshot::from_yaml(MOUSE).expect("Should parse snapshot");
        assert_eq!(snapshot.usage_page, 0x01);
        assert_eq!(snapshot.usage, 0x02);
        assert_eq!(snapshot.input_buttons.len(), 1);
        assert_eq!(
            snapshot.input_buttons[0].usage,
            UsageSpec::Range { min: 1, max: 3 }
        );
        assert!(snapshot.input_buttons[0].is_absolute, "Absolute by default");
        assert_eq!(snapshot.input_buttons[0].report_id, 0);

        let x = &snapshot.input_values[0];
        assert_eq!(x.usage, UsageSpec::Single(0x30));
        assert_eq!((x.logical_min, x.logical_max), (-127, 127));
        assert_eq!((x.physical_min, x.physical_max), (0, 0));
        assert!(!x.is_absolute);
        assert!(snapshot.output_values.is_empty());
    }

    #[test]
    fn test_yaml_round_trip() {
        let snapshot = CapabilitySnapshot::from_yaml(MOUSE).unwrap();
        let yaml = snapshot.to_yaml().unwrap();
        assert_eq!(CapabilitySnapshot::from_yaml(&yaml).unwrap(), snapshot);
    }

    #[test]
    fn test_from_yaml_file() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().expect("Should create temp file");
        file.write_all(MOUSE.as_bytes()).unwrap();

        let snapshot =
            CapabilitySnapshot::from_yaml_file(file.path()).expect("Should load snapshot file");
        assert_eq!(snapshot, CapabilitySnapshot::from_yaml(MOUSE).unwrap());
        assert_eq!(
            snapshot.input_buttons[0].usage,
            UsageSpec::Range { min: 1, max: 3 }
        );
    }

    #[test]
    fn test_usage_is_a_plain_map() {
        let snapshot = CapabilitySnapshot::from_yaml(MOUSE).unwrap();
        let yaml = snapshot.to_yaml().unwrap();
        assert!(!yaml.contains('!'), "No YAML tags in {yaml}");
        assert!(yaml.contains("single: 48"), "Single usage in {yaml}");
        assert!(yaml.contains("range:"), "Usage range in {yaml}");

        let yaml = "usage_page: 1\nusage: 2\ninput_values:\n  - usage_page: 1\n    usage: !single 48\n    logical_min: 0\n    logical_max: 1\n";
        assert!(
            CapabilitySnapshot::from_yaml(yaml).is_err(),
            "Tagged usages are not the snapshot format"
        );
    }

    #[test]
    fn test_invalid_yaml() {
        let result = CapabilitySnapshot::from_yaml("usage_page: [1, 2]");
        assert!(matches!(result, Err(LoadError::DeserializeError(_))));

        let result = CapabilitySnapshot::from_yaml_file("/nonexistent/snapshot.yaml");
        assert!(matches!(result, Err(LoadError::IoError(_))));
    }

    #[test]
    fn test_provider() {
        let snapshot = CapabilitySnapshot::from_yaml(MOUSE).unwrap();
        let summary = snapshot.summary().unwrap();
        assert_eq!(summary.input.button_caps, 1);
        assert_eq!(summary.input.value_caps, 1);
        assert_eq!(summary.output, ReportSummary::default());

        let mut buttons = [ButtonCapability::default(); 2];
        assert_eq!(
            snapshot.button_capabilities(ReportKind::Input, &mut buttons),
            Ok(1)
        );
        assert_eq!(buttons[0], snapshot.input_buttons[0]);

        let mut values: [ValueCapability; 0] = [];
        assert_eq!(
            snapshot.value_capabilities(ReportKind::Input, &mut values),
            Err(QueryStatus::BUFFER_TOO_SMALL)
        );
    }
}
