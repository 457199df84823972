// SPDX-License-Identifier: MIT

//! Short item encoding.
//!
//! A HID Report Descriptor is a sequence of items. Every item used here is a
//! "short item": one prefix byte followed by 0, 1, 2 or 4 bytes of
//! little-endian data. Bits 7..2 of the prefix hold the item tag and type,
//! bits 1..0 hold the [LengthCode].
//!
//! The [DescriptorBuffer] is the only thing that ever writes descriptor bytes.

use crate::{ReconstructError, Result};
use core::cmp;

/// The item type, encoded in bits 3..2 of the prefix byte
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ItemClass {
    Main,
    Global,
    Local,
}

/// How the data of an item is sized
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LengthClass {
    /// No data bytes
    Empty,
    /// Exactly one data byte, e.g. a collection type or a set of main item flags
    Byte,
    /// A signed value in the narrowest of 1, 2 or 4 bytes
    Value,
}

macro_rules! item_tags {
    ($($name:ident = $prefix:literal, $class:ident, $len:ident, $label:literal;)*) => {
        /// The known short item tags.
        ///
        /// Each tag is the prefix byte with the two length bits cleared, paired with the
        /// [ItemClass] and [LengthClass] of that item.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum ItemTag {
            $($name = $prefix,)*
        }

        impl ItemTag {
            /// Look up the tag for a prefix byte, ignoring its length bits
            pub fn from_prefix(prefix: u8) -> Option<ItemTag> {
                match prefix & !LengthCode::MASK {
                    $($prefix => Some(ItemTag::$name),)*
                    _ => None,
                }
            }

            /// The item class of this tag
            pub fn class(&self) -> ItemClass {
                match self {
                    $(ItemTag::$name => ItemClass::$class,)*
                }
            }

            /// The way this item's data is sized
            pub fn length_class(&self) -> LengthClass {
                match self {
                    $(ItemTag::$name => LengthClass::$len,)*
                }
            }

            /// Human-readable name as used in descriptor listings
            pub fn name(&self) -> &'static str {
                match self {
                    $(ItemTag::$name => $label,)*
                }
            }
        }
    };
}

item_tags! {
    Input = 0x80, Main, Byte, "Input";
    Output = 0x90, Main, Byte, "Output";
    Collection = 0xA0, Main, Byte, "Collection";
    Feature = 0xB0, Main, Byte, "Feature";
    EndCollection = 0xC0, Main, Empty, "End Collection";

    UsagePage = 0x04, Global, Value, "Usage Page";
    LogicalMinimum = 0x14, Global, Value, "Logical Minimum";
    LogicalMaximum = 0x24, Global, Value, "Logical Maximum";
    PhysicalMinimum = 0x34, Global, Value, "Physical Minimum";
    PhysicalMaximum = 0x44, Global, Value, "Physical Maximum";
    UnitExponent = 0x54, Global, Value, "Unit Exponent";
    Unit = 0x64, Global, Value, "Unit";
    ReportSize = 0x74, Global, Value, "Report Size";
    ReportId = 0x84, Global, Byte, "Report ID";
    ReportCount = 0x94, Global, Value, "Report Count";
    Push = 0xA4, Global, Empty, "Push";
    Pop = 0xB4, Global, Empty, "Pop";

    Usage = 0x08, Local, Value, "Usage";
    UsageMinimum = 0x18, Local, Value, "Usage Minimum";
    UsageMaximum = 0x28, Local, Value, "Usage Maximum";
    DesignatorIndex = 0x38, Local, Value, "Designator Index";
    DesignatorMinimum = 0x48, Local, Value, "Designator Minimum";
    DesignatorMaximum = 0x58, Local, Value, "Designator Maximum";
    StringIndex = 0x78, Local, Value, "String Index";
    StringMinimum = 0x88, Local, Value, "String Minimum";
    StringMaximum = 0x98, Local, Value, "String Maximum";
    Delimiter = 0xA8, Local, Value, "Delimiter";
}

impl ItemTag {
    /// The prefix byte without length bits
    pub fn base(&self) -> u8 {
        *self as u8
    }
}

/// The two length bits of a short item prefix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LengthCode {
    Zero = 0,
    One = 1,
    Two = 2,
    Four = 3,
}

impl LengthCode {
    pub const MASK: u8 = 0b11;

    /// Number of data bytes following the prefix
    pub fn data_len(&self) -> usize {
        match self {
            LengthCode::Zero => 0,
            LengthCode::One => 1,
            LengthCode::Two => 2,
            LengthCode::Four => 4,
        }
    }

    /// The length code in the low two bits of a prefix byte. Never fails.
    pub fn of_prefix(prefix: u8) -> LengthCode {
        match prefix & Self::MASK {
            0 => LengthCode::Zero,
            1 => LengthCode::One,
            2 => LengthCode::Two,
            _ => LengthCode::Four,
        }
    }

    /// The narrowest length code that holds `value` as a signed integer
    pub fn for_value(value: i32) -> LengthCode {
        if i8::try_from(value).is_ok() {
            LengthCode::One
        } else if i16::try_from(value).is_ok() {
            LengthCode::Two
        } else {
            LengthCode::Four
        }
    }
}

impl TryFrom<u8> for LengthCode {
    type Error = ReconstructError;

    fn try_from(code: u8) -> Result<LengthCode> {
        match code {
            0 => Ok(LengthCode::Zero),
            1 => Ok(LengthCode::One),
            2 => Ok(LengthCode::Two),
            3 => Ok(LengthCode::Four),
            _ => Err(ReconstructError::UnsupportedLengthCode(code)),
        }
    }
}

/// Extra bytes allocated on top of what is needed when the buffer grows
const GROWTH_SLACK: usize = 64;

/// A growable, exclusively owned descriptor byte buffer.
///
/// Growth at least doubles the capacity (or allocates what's needed plus some slack,
/// whichever is larger). An optional capacity limit turns any growth beyond that
/// limit into [ReconstructError::AllocationFailed].
#[derive(Debug)]
pub struct DescriptorBuffer {
    bytes: Vec<u8>,
    limit: Option<usize>,
}

impl DescriptorBuffer {
    /// Create an empty buffer with room for `capacity` bytes, capped at `limit` if any.
    pub fn with_capacity(capacity: usize, limit: Option<usize>) -> Result<DescriptorBuffer> {
        let capacity = limit.map_or(capacity, |limit| cmp::min(capacity, limit));
        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(capacity)
            .map_err(|_| ReconstructError::AllocationFailed {
                requested: capacity,
            })?;
        Ok(DescriptorBuffer { bytes, limit })
    }

    /// Number of bytes written so far
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether nothing has been written yet
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Bytes currently allocated
    pub fn capacity(&self) -> usize {
        self.bytes.capacity()
    }

    /// The bytes written so far
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Shrink the allocation to the written length and hand the bytes over.
    pub fn into_bytes(mut self) -> Vec<u8> {
        self.bytes.shrink_to_fit();
        self.bytes
    }

    fn grow_for(&mut self, additional: usize) -> Result<()> {
        let needed = self.bytes.len() + additional;
        if needed <= self.bytes.capacity() {
            return Ok(());
        }

        let mut target = cmp::max(self.bytes.capacity() * 2, needed + GROWTH_SLACK);
        if let Some(limit) = self.limit {
            if needed > limit {
                return Err(ReconstructError::AllocationFailed { requested: needed });
            }
            target = cmp::min(target, limit);
        }

        self.bytes
            .try_reserve_exact(target - self.bytes.len())
            .map_err(|_| ReconstructError::AllocationFailed { requested: target })
    }

    /// Append one item: the prefix `tag | length_code` followed by the first
    /// `length_code` worth of bytes from `payload`.
    ///
    /// Fails with [ReconstructError::UnsupportedLengthCode] if `length_code` is not
    /// one of 0..=3 or if `payload` is too short for it.
    pub fn append_item(&mut self, tag: ItemTag, payload: &[u8], length_code: u8) -> Result<()> {
        let code = LengthCode::try_from(length_code)?;
        let data = payload
            .get(..code.data_len())
            .ok_or(ReconstructError::UnsupportedLengthCode(length_code))?;

        self.grow_for(1 + data.len())?;
        self.bytes.push(tag.base() | code as u8);
        self.bytes.extend_from_slice(data);

        log::trace!("{} {:02x?}", tag.name(), data);
        Ok(())
    }

    /// Append an item carrying `value` in the narrowest signed width
    /// (1 byte for -128..=127, 2 bytes for -32768..=32767, 4 bytes otherwise).
    pub fn append_value(&mut self, tag: ItemTag, value: i32) -> Result<()> {
        let code = LengthCode::for_value(value);
        self.append_item(tag, &value.to_le_bytes(), code as u8)
    }

    /// Append an item with exactly one data byte
    pub fn append_byte(&mut self, tag: ItemTag, byte: u8) -> Result<()> {
        self.append_item(tag, &[byte], LengthCode::One as u8)
    }

    /// Append an item without data
    pub fn append_simple(&mut self, tag: ItemTag) -> Result<()> {
        self.append_item(tag, &[], LengthCode::Zero as u8)
    }
}
