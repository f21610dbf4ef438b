use async_trait::async_trait;
use bytes::Bytes;

use crate::error::IoError;

/// Trait for positional reads from a byte source.
///
/// Readers never consume a whole image file up front: headers are parsed with
/// small scattered reads and pixel data is fetched tile by tile. Every stream a
/// format plugin sees is ultimately backed by one of these.
#[async_trait]
pub trait RangeReader: Send + Sync {
    /// Read exactly `len` bytes starting at `offset`.
    ///
    /// Returns an error if the range is out of bounds or if the read fails.
    async fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError>;

    /// Get the total size of the resource in bytes.
    fn size(&self) -> u64;

    /// Get a unique identifier for this resource (for logging and cache keys).
    ///
    /// For local files this is the path the reader was opened with.
    fn identifier(&self) -> &str;
}

// =============================================================================
// In-memory reader
// =============================================================================

/// A [`RangeReader`] over bytes already held in memory.
///
/// Used for content sniffing on signature buffers and by plugins that decode a
/// file once and serve tiles from the decoded raster.
#[derive(Debug, Clone)]
pub struct MemoryRangeReader {
    data: Bytes,
    identifier: String,
}

impl MemoryRangeReader {
    pub fn new(data: impl Into<Bytes>, identifier: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            identifier: identifier.into(),
        }
    }
}

#[async_trait]
impl RangeReader for MemoryRangeReader {
    async fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError> {
        let end = offset.checked_add(len as u64);
        match end {
            Some(end) if end <= self.data.len() as u64 => {
                Ok(self.data.slice(offset as usize..end as usize))
            }
            _ => Err(IoError::RangeOutOfBounds {
                offset,
                requested: len as u64,
                size: self.data.len() as u64,
            }),
        }
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }
}

// =============================================================================
// Endian Helper Functions
// =============================================================================
//
// Pixel data and binary headers come in either byte order. The stream and the
// pixel packing code pick the right variant from the configured order.

/// Read a little-endian u16 from a byte slice.
///
/// # Panics
/// Panics if the slice has fewer than 2 bytes.
#[inline]
pub fn read_u16_le(bytes: &[u8]) -> u16 {
    u16::from_le_bytes([bytes[0], bytes[1]])
}

/// Read a big-endian u16 from a byte slice.
///
/// # Panics
/// Panics if the slice has fewer than 2 bytes.
#[inline]
pub fn read_u16_be(bytes: &[u8]) -> u16 {
    u16::from_be_bytes([bytes[0], bytes[1]])
}

/// Read a little-endian u32 from a byte slice.
///
/// # Panics
/// Panics if the slice has fewer than 4 bytes.
#[inline]
pub fn read_u32_le(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Read a big-endian u32 from a byte slice.
///
/// # Panics
/// Panics if the slice has fewer than 4 bytes.
#[inline]
pub fn read_u32_be(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Write the low `bytes.len()` bytes of `value` in the requested byte order.
///
/// This is the inverse of the typed reads above, generalized to any width up
/// to 8 bytes. Pixel generators and writers use it to pack samples.
pub fn pack_bytes(value: u64, bytes: &mut [u8], little_endian: bool) {
    let width = bytes.len().min(8);
    for i in 0..width {
        let shift = 8 * i;
        let byte = ((value >> shift) & 0xFF) as u8;
        if little_endian {
            bytes[i] = byte;
        } else {
            bytes[width - 1 - i] = byte;
        }
    }
}
