// SPDX-License-Identifier: MIT

use hidrecon::dump::{describe, hex_string, items};
use hidrecon::finder::{find_descriptors, FinderConfig};
use hidrecon::{
    reconstruct_descriptor, Assembler, ButtonCapability, CapabilitySnapshot, ItemTag, LoadError,
    ValueCapability,
};
use hidreport::{
    LogicalMaximum, LogicalMinimum, Report, ReportDescriptor, Usage, UsageId, UsagePage,
};
use hut::{AsUsage, GenericDesktop};
use std::io::Write;

fn usage(page: u16, id: u16) -> Usage {
    Usage::from_page_and_id(UsagePage::from(page), UsageId::from(id))
}

fn mouse() -> CapabilitySnapshot {
    CapabilitySnapshot {
        usage_page: 0x01,
        usage: 0x02,
        input_report_byte_length: 5,
        input_buttons: vec![
            ButtonCapability::range(&usage(0x09, 1), &usage(0x09, 5)).report_id(1),
        ],
        input_values: vec![
            ValueCapability::new(&Usage::from(GenericDesktop::X.usage_value()), -32767, 32767)
                .report_id(1)
                .relative(),
            ValueCapability::new(&Usage::from(GenericDesktop::Y.usage_value()), -32767, 32767)
                .report_id(1)
                .relative(),
            ValueCapability::new(&Usage::from(GenericDesktop::Wheel.usage_value()), -127, 127)
                .report_id(1)
                .relative(),
        ],
        ..Default::default()
    }
}

/// The fixed frame of every reconstruction: one Application Collection around everything
fn check_structure(bytes: &[u8]) {
    let items = items(bytes).expect("Should be a sequence of short items");

    assert_eq!(items[0].tag, Some(ItemTag::UsagePage));
    assert_eq!(items[1].tag, Some(ItemTag::Usage));
    assert_eq!(items[2].tag, Some(ItemTag::Collection));
    assert_eq!(items[2].value_unsigned(), 0x01, "Application collection");

    let collections = items
        .iter()
        .filter(|i| i.tag == Some(ItemTag::Collection))
        .count();
    let ends = items
        .iter()
        .filter(|i| i.tag == Some(ItemTag::EndCollection))
        .count();
    assert_eq!(collections, 1, "Exactly one collection");
    assert_eq!(ends, 1, "Exactly one End Collection");
    assert_eq!(items.last().and_then(|i| i.tag), Some(ItemTag::EndCollection));
}

#[test]
fn test_mouse() {
    let rdesc = reconstruct_descriptor(Some(&mouse())).expect("Should reconstruct");
    check_structure(&rdesc);

    let expected = [
        "05 01 09 02 A1 01",
        // buttons
        "85 01 05 09 19 01 29 05 95 05 75 01 81 02",
        // x
        "85 01 05 01 09 30 95 01 16 01 80 26 FF 7F 81 06",
        // y
        "85 01 05 01 09 31 95 01 16 01 80 26 FF 7F 81 06",
        // wheel
        "85 01 05 01 09 38 95 01 15 81 25 7F 81 06",
        "C0",
    ]
    .join(" ");
    assert_eq!(hex_string(&rdesc), expected);
}

#[test]
fn test_every_field_has_its_report_id() {
    let rdesc = reconstruct_descriptor(Some(&mouse())).unwrap();
    let items = items(&rdesc).expect("Should be a sequence of short items");

    let report_ids = items
        .iter()
        .filter(|i| i.tag == Some(ItemTag::ReportId))
        .count();
    let inputs = items
        .iter()
        .filter(|i| i.tag == Some(ItemTag::Input))
        .count();
    assert_eq!(report_ids, inputs, "One Report ID per capability");
}

#[test]
fn test_output_report_parses() {
    let snapshot = CapabilitySnapshot {
        usage_page: 0x0C,
        usage: 0x01,
        output_report_byte_length: 8,
        output_values: vec![ValueCapability::new(&usage(0x0C, 0x01), 0, 255)],
        ..Default::default()
    };
    let rdesc = reconstruct_descriptor(Some(&snapshot)).unwrap();
    check_structure(&rdesc);

    let parsed =
        ReportDescriptor::try_from(rdesc.as_slice()).expect("Should parse reconstructed descriptor");
    let output_reports = parsed.output_reports();
    assert_eq!(output_reports.len(), 1, "Should have exactly one output report");
    assert!(parsed.input_reports().is_empty());

    let report = &output_reports[0];
    assert_eq!(report.report_id(), &None, "No Report ID in use");

    let variable_fields: Vec<_> = report
        .fields()
        .iter()
        .filter_map(|f| match f {
            hidreport::Field::Variable(v) => Some(v),
            _ => None,
        })
        .collect();
    assert!(!variable_fields.is_empty(), "Should have variable fields");
    assert_eq!(u32::from(&variable_fields[0].usage), 0x000C0001);
    assert_eq!(variable_fields[0].logical_minimum, LogicalMinimum::from(0));
    assert_eq!(variable_fields[0].logical_maximum, LogicalMaximum::from(255));
}

#[test]
fn test_snapshot_file() {
    let yaml = r#"
usage_page: 0x01
usage: 0x06
input_report_byte_length: 8
input_buttons:
  - usage_page: 0x07
    usage: { range: { min: 0xE0, max: 0xE7 } }
output_report_byte_length: 1
output_values:
  - usage_page: 0x08
    usage: { range: { min: 1, max: 5 } }
    logical_min: 0
    logical_max: 1
"#;
    let mut file = tempfile::NamedTempFile::new().expect("Should create temp file");
    file.write_all(yaml.as_bytes()).unwrap();

    let snapshot = CapabilitySnapshot::from_yaml_file(file.path()).expect("Should load snapshot");
    let rdesc = Assembler::new()
        .initial_capacity(8)
        .assemble(&snapshot)
        .expect("Should reconstruct");
    assert_eq!(
        hex_string(&rdesc),
        "05 01 09 06 A1 01 \
         05 07 1A E0 00 2A E7 00 95 08 75 01 81 02 \
         05 08 19 01 29 05 95 05 15 00 25 01 75 08 95 01 91 02 \
         C0"
    );
}

#[test]
fn test_snapshot_file_missing() {
    let dir = tempfile::tempdir().unwrap();
    let result = CapabilitySnapshot::from_yaml_file(dir.path().join("missing.yaml"));
    assert!(matches!(result, Err(LoadError::IoError(_))));
}

#[test]
fn test_describe_reconstruction() {
    let rdesc = reconstruct_descriptor(Some(&mouse())).unwrap();
    let listing = describe(&rdesc).expect("Should describe");
    let lines: Vec<&str> = listing.lines().collect();
    assert_eq!(lines[0], "05 01        // Usage Page (0x0001)");
    assert_eq!(lines[2], "A1 01        // Collection (Application)");
    assert_eq!(lines[9], "81 02        //   Input (Data,Var,Abs)");
    assert_eq!(lines.last(), Some(&"C0           // End Collection"));
}

#[test]
fn test_find_reconstruction_in_blob() {
    let rdesc = reconstruct_descriptor(Some(&mouse())).unwrap();
    let mut blob = vec![0u8; 0x40];
    blob.extend_from_slice(&rdesc);
    blob.extend_from_slice(&[0xFF; 0x40]);

    let candidates = find_descriptors(&blob, &FinderConfig::default());
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].offset, 0x40);
    assert_eq!(candidates[0].bytes, rdesc.as_slice());
}
