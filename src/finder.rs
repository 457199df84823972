// SPDX-License-Identifier: MIT

//! Finding report descriptors inside arbitrary binary blobs, e.g. a firmware image.
//!
//! This is a heuristic on raw bytes, not a parser: a candidate starts at a
//! Usage Page prefix, collection depth is tracked on the raw Collection and
//! End Collection bytes, and a span is accepted if enough of its bytes look
//! like common item prefixes.

/// Prefix bytes that are common in report descriptors
const COMMON_PREFIXES: [u8; 11] = [
    0x05, // Usage Page
    0x09, // Usage
    0xA1, // Collection
    0xC0, // End Collection
    0x15, // Logical Minimum
    0x25, // Logical Maximum
    0x75, // Report Size
    0x95, // Report Count
    0x81, // Input
    0x91, // Output
    0x85, // Report ID
];

/// Descriptors usually start with a one-byte Usage Page
const START_PREFIX: u8 = 0x05;
const COLLECTION_PREFIX: u8 = 0xA1;
const END_COLLECTION_PREFIX: u8 = 0xC0;

/// Configuration of [find_descriptors]
#[derive(Clone, Debug, PartialEq)]
pub struct FinderConfig {
    /// Shortest candidate in bytes
    pub min_len: usize,
    /// Longest span scanned from a start byte
    pub max_len: usize,
    /// Minimum share of common prefix bytes in a candidate, 0.0 to 1.0
    pub min_score: f64,
}

impl Default for FinderConfig {
    fn default() -> Self {
        FinderConfig {
            min_len: 32,
            max_len: 256,
            min_score: 0.2,
        }
    }
}

/// A byte span that looks like a report descriptor
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Candidate<'a> {
    pub offset: usize,
    pub bytes: &'a [u8],
}

/// Whether enough of `bytes` are common item prefixes
pub fn is_possible_descriptor(bytes: &[u8], min_score: f64) -> bool {
    let score = bytes.iter().filter(|&b| COMMON_PREFIXES.contains(b)).count();
    score as f64 >= bytes.len() as f64 * min_score
}

/// Scan `blob` for report descriptor candidates, in blob order.
pub fn find_descriptors<'a>(blob: &'a [u8], config: &FinderConfig) -> Vec<Candidate<'a>> {
    let mut candidates = Vec::new();
    let mut offset: usize = 0;

    while offset.saturating_add(config.min_len) < blob.len() {
        if blob[offset] != START_PREFIX {
            offset += 1;
            continue;
        }

        match candidate_at(blob, offset, config) {
            Some(bytes) => {
                log::debug!("Candidate at offset {offset:#x}, {} bytes", bytes.len());
                candidates.push(Candidate { offset, bytes });
                offset += bytes.len();
            }
            None => offset += 1,
        }
    }

    candidates
}

fn candidate_at<'a>(blob: &'a [u8], offset: usize, config: &FinderConfig) -> Option<&'a [u8]> {
    let end = blob.len().min(offset.saturating_add(config.max_len));
    let mut depth: i64 = 0;

    for (idx, b) in blob[offset..end].iter().enumerate() {
        match *b {
            COLLECTION_PREFIX => depth += 1,
            END_COLLECTION_PREFIX => {
                depth -= 1;
                let span = &blob[offset..=offset + idx];
                if depth <= 0
                    && span.len() >= config.min_len
                    && is_possible_descriptor(span, config.min_score)
                {
                    return Some(span);
                }
            }
            _ => {}
        }
    }

    None
}
