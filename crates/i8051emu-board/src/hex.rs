//! Program images: Intel HEX text or a raw binary dump.

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    #[error("image is empty")]
    Empty,
    #[error("line {line}: record does not start with ':'")]
    MissingColon { line: usize },
    #[error("line {line}: invalid hex digit")]
    BadDigit { line: usize },
    #[error("line {line}: record is truncated")]
    Truncated { line: usize },
    #[error("line {line}: checksum mismatch (expected {expected:02X}h, found {found:02X}h)")]
    Checksum { line: usize, expected: u8, found: u8 },
    #[error("line {line}: unsupported record type {kind:02X}h")]
    UnsupportedRecord { line: usize, kind: u8 },
    #[error("line {line}: data extends past the 64K program space")]
    OutOfRange { line: usize },
    #[error("binary image of {0} bytes does not fit in 64K")]
    TooLarge(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFormat {
    /// Intel HEX when the first non-blank character is `:`, binary otherwise.
    #[default]
    Auto,
    IntelHex,
    Binary,
}

/// A decoded image: a sparse map from code address to byte.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Image {
    bytes: BTreeMap<u16, u8>,
}

impl Image {
    pub fn parse(data: &[u8], format: ImageFormat) -> Result<Self, ImageError> {
        match format {
            ImageFormat::IntelHex => Self::parse_hex(data),
            ImageFormat::Binary => Self::from_binary(data),
            ImageFormat::Auto => {
                let first = data.iter().find(|b| !b.is_ascii_whitespace());
                if first == Some(&b':') {
                    Self::parse_hex(data)
                } else {
                    Self::from_binary(data)
                }
            }
        }
    }

    /// A binary dump is loaded at address zero.
    pub fn from_binary(data: &[u8]) -> Result<Self, ImageError> {
        if data.is_empty() {
            return Err(ImageError::Empty);
        }
        if data.len() > 0x10000 {
            return Err(ImageError::TooLarge(data.len()));
        }
        let bytes = data
            .iter()
            .enumerate()
            .map(|(addr, byte)| (addr as u16, *byte))
            .collect();
        Ok(Self { bytes })
    }

    /// Parse Intel HEX. Record types 00 and 01 are supported, as are 02 and 04
    /// when they select the first 64K. Start-address records are ignored.
    pub fn parse_hex(data: &[u8]) -> Result<Self, ImageError> {
        let text = String::from_utf8_lossy(data);
        let mut bytes = BTreeMap::new();
        let mut saw_eof = false;

        for (index, raw) in text.lines().enumerate() {
            let line = index + 1;
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            let record = raw
                .strip_prefix(':')
                .ok_or(ImageError::MissingColon { line })?;
            let record = decode_hex_pairs(record, line)?;
            if record.len() < 5 {
                return Err(ImageError::Truncated { line });
            }

            let count = record[0] as usize;
            if record.len() != count + 5 {
                return Err(ImageError::Truncated { line });
            }
            let sum = record.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
            if sum != 0 {
                let found = record[record.len() - 1];
                let expected = found.wrapping_sub(sum);
                return Err(ImageError::Checksum {
                    line,
                    expected,
                    found,
                });
            }

            let address = u16::from_be_bytes([record[1], record[2]]);
            let kind = record[3];
            let payload = &record[4..4 + count];
            match kind {
                0x00 => {
                    if address as usize + payload.len() > 0x10000 {
                        return Err(ImageError::OutOfRange { line });
                    }
                    for (offset, byte) in payload.iter().enumerate() {
                        bytes.insert(address + offset as u16, *byte);
                    }
                }
                0x01 => {
                    saw_eof = true;
                    break;
                }
                0x02 | 0x04 => {
                    if payload.iter().any(|b| *b != 0) {
                        return Err(ImageError::OutOfRange { line });
                    }
                }
                0x03 | 0x05 => debug!(line, "ignoring start address record"),
                kind => return Err(ImageError::UnsupportedRecord { line, kind }),
            }
        }

        if !saw_eof {
            warn!("Intel HEX image has no end-of-file record");
        }
        if bytes.is_empty() {
            return Err(ImageError::Empty);
        }
        Ok(Self { bytes })
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Contiguous runs of bytes, in address order.
    pub fn runs(&self) -> Vec<(u16, Vec<u8>)> {
        let mut runs: Vec<(u16, Vec<u8>)> = Vec::new();
        for (&addr, &byte) in &self.bytes {
            match runs.last_mut() {
                Some((start, run)) if *start as usize + run.len() == addr as usize => {
                    run.push(byte)
                }
                _ => runs.push((addr, vec![byte])),
            }
        }
        runs
    }
}

fn decode_hex_pairs(text: &str, line: usize) -> Result<Vec<u8>, ImageError> {
    if text.len() % 2 != 0 {
        return Err(ImageError::Truncated { line });
    }
    if !text.is_ascii() {
        return Err(ImageError::BadDigit { line });
    }
    (0..text.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&text[i..i + 2], 16).map_err(|_| ImageError::BadDigit { line }))
        .collect()
}
