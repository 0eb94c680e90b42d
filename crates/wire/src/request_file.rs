// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Token-request file format.
//!
//! Per-endpoint request blobs are aggregated into one downloadable file: a
//! 16-byte little-endian header followed by the concatenated records.

use crate::error::WireError;

/// Byte length of the encoded file header.
pub const FILE_HEADER_LEN: usize = 16;

const FILE_VERSION: u8 = 0x01;

/// What the file's records contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    TokenRequest,
    DebugToken,
}

impl FileKind {
    fn to_byte(self) -> u8 {
        match self {
            FileKind::TokenRequest => 1,
            FileKind::DebugToken => 2,
        }
    }

    fn from_byte(b: u8) -> Option<FileKind> {
        match b {
            1 => Some(FileKind::TokenRequest),
            2 => Some(FileKind::DebugToken),
            _ => None,
        }
    }
}

/// Header of an aggregated token-request or token-data file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    pub kind: FileKind,
    pub number_of_records: u16,
    /// Offset of the first record; the header length for version 1.
    pub offset_to_records: u16,
    /// Total file size including this header.
    pub file_size: u32,
}

impl FileHeader {
    pub fn encode(self) -> [u8; FILE_HEADER_LEN] {
        let mut out = [0u8; FILE_HEADER_LEN];
        out[0] = FILE_VERSION;
        out[1] = self.kind.to_byte();
        out[2..4].copy_from_slice(&self.number_of_records.to_le_bytes());
        out[4..6].copy_from_slice(&self.offset_to_records.to_le_bytes());
        out[6..10].copy_from_slice(&self.file_size.to_le_bytes());
        // bytes 10..16 reserved
        out
    }

    /// Decode the first 16 bytes of a buffer. Returns `None` for a short
    /// buffer, an unknown version, or an unknown record kind.
    pub fn parse(data: &[u8]) -> Option<FileHeader> {
        if data.len() < FILE_HEADER_LEN || data[0] != FILE_VERSION {
            return None;
        }
        Some(FileHeader {
            kind: FileKind::from_byte(data[1])?,
            number_of_records: u16::from_le_bytes([data[2], data[3]]),
            offset_to_records: u16::from_le_bytes([data[4], data[5]]),
            file_size: u32::from_le_bytes([data[6], data[7], data[8], data[9]]),
        })
    }
}

/// Build an aggregated file from per-endpoint records.
///
/// Empty records are not written by callers; an empty record set is an
/// `Oversize`-free degenerate case and yields a header-only file with zero
/// records.
pub fn build_request_file(kind: FileKind, records: &[Vec<u8>]) -> Result<Vec<u8>, WireError> {
    let body: usize = records.iter().map(Vec::len).sum();
    let total = FILE_HEADER_LEN + body;
    if records.len() > u16::MAX as usize || total > u32::MAX as usize {
        return Err(WireError::Oversize { len: total, max: u32::MAX as usize });
    }
    let header = FileHeader {
        kind,
        number_of_records: records.len() as u16,
        offset_to_records: FILE_HEADER_LEN as u16,
        file_size: total as u32,
    };
    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(&header.encode());
    for record in records {
        out.extend_from_slice(record);
    }
    Ok(out)
}

#[cfg(test)]
#[path = "request_file_tests.rs"]
mod tests;
