// SPDX-License-Identifier: MIT

//! Diagnostic dumps of report descriptor bytes.

use crate::item::{ItemTag, LengthClass};
use hidreport::hid::{Item, ReportDescriptorItems};
use hidreport::ParserError;
use thiserror::Error;

/// The prefix byte of a long item
const LONG_ITEM_PREFIX: u8 = 0xFE;

#[derive(Error, Debug)]
pub enum DumpError {
    #[error("Not a sequence of short items: {0}")]
    Parse(#[from] ParserError),
    #[error("Long item at offset {offset} is not supported")]
    LongItem { offset: usize },
}

/// Format bytes as upper-case hex, separated by spaces: `"05 01 09 02"`.
pub fn hex_string(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// One short item as found in a byte sequence
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecodedItem<'a> {
    /// Offset of the prefix byte
    pub offset: usize,
    pub prefix: u8,
    /// The tag, if it's one we know
    pub tag: Option<ItemTag>,
    pub data: &'a [u8],
}

impl DecodedItem<'_> {
    /// The data as little-endian, sign-extended value
    pub fn value_signed(&self) -> i32 {
        match self.data {
            [b0] => i32::from(*b0 as i8),
            [b0, b1] => i32::from(i16::from_le_bytes([*b0, *b1])),
            [b0, b1, b2, b3] => i32::from_le_bytes([*b0, *b1, *b2, *b3]),
            _ => 0,
        }
    }

    /// The data as little-endian, zero-extended value
    pub fn value_unsigned(&self) -> u32 {
        self.data
            .iter()
            .rev()
            .fold(0u32, |acc, b| (acc << 8) | u32::from(*b))
    }
}

/// Split `bytes` into its short items.
///
/// The item boundaries come from [hidreport]'s itemizer, the data of each
/// item borrows from `bytes`. An empty sequence has no items. Long items
/// are rejected.
pub fn items(bytes: &[u8]) -> Result<Vec<DecodedItem<'_>>, DumpError> {
    if bytes.is_empty() {
        return Ok(Vec::new());
    }

    ReportDescriptorItems::try_from(bytes)?
        .iter()
        .map(|rdesc_item| {
            let offset = rdesc_item.offset();
            let item = rdesc_item.item();
            let prefix = item.header();
            if prefix == LONG_ITEM_PREFIX {
                return Err(DumpError::LongItem { offset });
            }
            Ok(DecodedItem {
                offset,
                prefix,
                tag: ItemTag::from_prefix(prefix),
                data: bytes
                    .get(offset + 1..offset + item.size())
                    .unwrap_or_default(),
            })
        })
        .collect()
}

fn collection_name(kind: u32) -> &'static str {
    match kind {
        0x00 => "Physical",
        0x01 => "Application",
        0x02 => "Logical",
        0x03 => "Report",
        0x04 => "Named Array",
        0x05 => "Usage Switch",
        0x06 => "Usage Modifier",
        _ => "Vendor Defined",
    }
}

fn main_item_flags(flags: u32) -> String {
    let names = [
        ["Data", "Const"],
        ["Array", "Var"],
        ["Abs", "Rel"],
    ];
    names
        .iter()
        .enumerate()
        .map(|(bit, pair)| pair[((flags >> bit) & 1) as usize])
        .collect::<Vec<_>>()
        .join(",")
}

fn describe_item(item: &DecodedItem) -> String {
    let Some(tag) = item.tag else {
        return format!("Unknown item {:#04x}", item.prefix);
    };
    match tag {
        ItemTag::Collection => {
            format!("{} ({})", tag.name(), collection_name(item.value_unsigned()))
        }
        ItemTag::Input | ItemTag::Output | ItemTag::Feature => {
            format!("{} ({})", tag.name(), main_item_flags(item.value_unsigned()))
        }
        ItemTag::UsagePage | ItemTag::Usage | ItemTag::UsageMinimum | ItemTag::UsageMaximum => {
            format!("{} ({:#06x})", tag.name(), item.value_unsigned())
        }
        ItemTag::Unit => format!("{} ({:#x})", tag.name(), item.value_unsigned()),
        _ => match tag.length_class() {
            LengthClass::Empty => tag.name().to_string(),
            LengthClass::Byte => format!("{} ({})", tag.name(), item.value_unsigned()),
            LengthClass::Value => format!("{} ({})", tag.name(), item.value_signed()),
        },
    }
}

/// An annotated listing of `bytes`, one item per line, indented by collection depth.
/// There is no newline after the last line.
///
/// ```text
/// 05 01        // Usage Page (0x0001)
/// 09 02        // Usage (0x0002)
/// A1 01        // Collection (Application)
/// C0           // End Collection
/// ```
pub fn describe(bytes: &[u8]) -> Result<String, DumpError> {
    let mut depth: usize = 0;
    let lines = items(bytes)?
        .iter()
        .map(|item| {
            if item.tag == Some(ItemTag::EndCollection) {
                depth = depth.saturating_sub(1);
            }
            let raw = hex_string(&bytes[item.offset..=item.offset + item.data.len()]);
            let line = format!(
                "{raw:<12} // {:indent$}{}",
                "",
                describe_item(item),
                indent = depth * 2
            );
            if item.tag == Some(ItemTag::Collection) {
                depth += 1;
            }
            line
        })
        .collect::<Vec<_>>();

    Ok(lines.join("\n"))
}
