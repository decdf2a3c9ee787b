//! Versioned snapshot header for ML states.
//!
//! Format (all integers little-endian):
//!
//! ```text
//! [version: u8][config_len: u32][config: MessagePack map][model payload...]
//! ```
//!
//! The header carries only the state's own configuration. The bytes after
//! it belong to the model handle and are never interpreted here. New layouts
//! must keep the version byte first and add a new `FormatVersion` variant;
//! the V1 layout is never reinterpreted.

use std::io::{ErrorKind, Read, Write};

use crate::config::MlConfig;
use crate::error::StateError;

/// Version written by `save`.
pub const CURRENT_FORMAT_VERSION: FormatVersion = FormatVersion::V1;

/// Upper bound on the encoded configuration block.
pub const MAX_CONFIG_BLOCK_LEN: u32 = 64 * 1024;

/// Bytes preceding the configuration block in a V1 header.
pub const V1_PREFIX_LEN: usize = 1 + 4;

/// Snapshot format versions understood by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FormatVersion {
    V1 = 1,
}

impl FormatVersion {
    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

/// A decoded snapshot header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotHeader {
    pub version: FormatVersion,
    pub config: MlConfig,
}

impl TryFrom<u8> for FormatVersion {
    type Error = StateError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            1 => Ok(Self::V1),
            other => Err(StateError::UnsupportedVersion(other)),
        }
    }
}

/// Encode the header for `config` in the current format.
pub fn encode_header(config: &MlConfig) -> Result<Vec<u8>, StateError> {
    let block = rmp_serde::to_vec_named(config).map_err(|e| StateError::Encode(e.to_string()))?;
    let len = u32::try_from(block.len())
        .ok()
        .filter(|len| *len > 0 && *len <= MAX_CONFIG_BLOCK_LEN)
        .ok_or_else(|| StateError::Encode(format!("config block of {} bytes", block.len())))?;

    let mut buf = Vec::with_capacity(V1_PREFIX_LEN + block.len());
    buf.push(CURRENT_FORMAT_VERSION.as_byte());
    buf.extend_from_slice(&len.to_le_bytes());
    buf.extend_from_slice(&block);
    Ok(buf)
}

/// Write the header for `config`. The model payload goes right after it.
pub fn write_header(writer: &mut dyn Write, config: &MlConfig) -> Result<(), StateError> {
    let header = encode_header(config)?;
    writer.write_all(&header)?;
    Ok(())
}

/// Read a header, consuming exactly its bytes and nothing of the payload.
pub fn read_header(reader: &mut dyn Read) -> Result<SnapshotHeader, StateError> {
    let mut version = [0u8; 1];
    read_exact_or_corrupt(reader, &mut version, "format version")?;

    let version = FormatVersion::try_from(version[0])?;
    let config = match version {
        FormatVersion::V1 => read_config_v1(reader)?,
    };
    Ok(SnapshotHeader { version, config })
}

/// Decode a header from the front of `bytes`.
/// Returns the header and the number of bytes consumed.
pub fn decode_header(bytes: &[u8]) -> Result<(SnapshotHeader, usize), StateError> {
    let mut cursor = bytes;
    let header = read_header(&mut cursor)?;
    Ok((header, bytes.len() - cursor.len()))
}

fn read_config_v1(reader: &mut dyn Read) -> Result<MlConfig, StateError> {
    let mut len_bytes = [0u8; 4];
    read_exact_or_corrupt(reader, &mut len_bytes, "config length")?;
    let len = u32::from_le_bytes(len_bytes);

    if len == 0 {
        return Err(StateError::Corrupt("config block length must be greater than 0".into()));
    }
    if len > MAX_CONFIG_BLOCK_LEN {
        return Err(StateError::Corrupt(format!(
            "config block length {} exceeds limit {}",
            len, MAX_CONFIG_BLOCK_LEN
        )));
    }

    let mut block = vec![0u8; len as usize];
    read_exact_or_corrupt(reader, &mut block, "config block")?;

    let config: MlConfig = rmp_serde::from_slice(&block)
        .map_err(|e| StateError::Corrupt(format!("config block: {e}")))?;
    config
        .validate()
        .map_err(|e| StateError::Corrupt(e.to_string()))?;
    Ok(config)
}

fn read_exact_or_corrupt(reader: &mut dyn Read, buf: &mut [u8], what: &str) -> Result<(), StateError> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => StateError::Corrupt(format!("truncated {what}")),
        _ => StateError::Io(e),
    })
}
