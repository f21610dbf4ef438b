//! Plain-text any-maps (`P2`, `P3`).
//!
//! The decimal samples are decoded once at `set_id` into a big-endian binary
//! raster held in memory; tile reads then go through the same plane reader as
//! binary files.

use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use tracing::debug;

use super::pnm::{read_header, sniff, Tokens, FORMAT, SUFFIXES};
use crate::error::{FormatError, IoError};
use crate::io::RandomAccessStream;
use crate::meta::PixelType;
use crate::reader::{ReaderCore, ReaderPlugin, Region};

/// Legacy reader for plain-text any-maps.
#[derive(Debug, Clone, Default)]
pub struct PlainPnmReader {
    raster: Option<Bytes>,
}

impl PlainPnmReader {
    pub const IDENTIFIER: &'static str = "formats.in.PlainPnmReader";

    pub fn new() -> Self {
        Self::default()
    }
}

fn malformed(reason: impl Into<String>) -> FormatError {
    FormatError::Malformed {
        format: FORMAT,
        reason: reason.into(),
    }
}

/// Decode `count` decimal samples starting at `offset` into a binary raster.
fn decode_samples(
    data: &[u8],
    offset: usize,
    count: usize,
    pixel_type: PixelType,
    max_value: u32,
) -> Result<Bytes, FormatError> {
    // Every sample takes at least one byte of text
    let available = data.len().saturating_sub(offset);
    if count > available {
        return Err(malformed(format!(
            "{} bytes of samples cannot hold {} values",
            available, count
        )));
    }
    let mut raster = BytesMut::with_capacity(count * pixel_type.bytes_per_pixel());
    let mut tokens = Tokens::new(data, offset);
    for index in 0..count {
        let sample = tokens
            .next_number()?
            .ok_or_else(|| malformed(format!("found {} samples, expected {}", index, count)))?;
        if sample > max_value {
            return Err(malformed(format!(
                "sample {} exceeds maximum value {}",
                sample, max_value
            )));
        }
        match pixel_type {
            PixelType::Uint16 => raster.put_u16(sample as u16),
            _ => raster.put_u8(sample as u8),
        }
    }
    Ok(raster.freeze())
}

#[async_trait]
impl ReaderPlugin for PlainPnmReader {
    fn identifier(&self) -> &'static str {
        Self::IDENTIFIER
    }

    fn format(&self) -> &'static str {
        FORMAT
    }

    fn suffixes(&self) -> &'static [&'static str] {
        SUFFIXES
    }

    fn suffix_sufficient(&self) -> bool {
        false
    }

    async fn is_this_type_stream(&self, stream: &mut RandomAccessStream) -> Result<bool, IoError> {
        sniff(stream).await
    }

    async fn init_file(&mut self, core: &mut ReaderCore, id: &str) -> Result<(), FormatError> {
        let mut file = RandomAccessStream::open(id).await?;
        let header = read_header(&mut file).await?;
        if !header.kind.is_plain() {
            return Err(FormatError::unsupported(format!(
                "binary {} samples",
                header.kind.magic()
            )));
        }

        file.seek(0);
        let data = file.read_bytes(file.length() as usize).await?;
        let count = header.sample_count()?;
        let raster = decode_samples(
            &data,
            header.data_offset,
            count,
            header.pixel_type(),
            header.max_value,
        )?;
        debug!(id, magic = header.kind.magic(), samples = count, "Decoded plain PNM raster");

        header.describe(core)?;
        core.set_stream(RandomAccessStream::from_bytes(raster.clone(), id));
        self.raster = Some(raster);
        Ok(())
    }

    async fn open_bytes(
        &mut self,
        core: &mut ReaderCore,
        _plane: usize,
        buf: &mut [u8],
        region: Region,
    ) -> Result<(), FormatError> {
        core.stream_mut()?.seek(0);
        core.read_plane(region, 0, buf).await
    }

    /// The decoded raster survives `close(true)`, so reopening does not parse
    /// the text again.
    async fn reopen_file(&mut self, core: &mut ReaderCore) -> Result<(), FormatError> {
        let raster = self
            .raster
            .clone()
            .ok_or(FormatError::NotInitialized { operation: "reopen" })?;
        let id = core.current_file().unwrap_or_default().to_string();
        core.set_stream(RandomAccessStream::from_bytes(raster, id));
        Ok(())
    }

    fn close(&mut self, file_only: bool) {
        if !file_only {
            self.raster = None;
        }
    }

    fn fresh(&self) -> Box<dyn ReaderPlugin> {
        Box::new(PlainPnmReader::new())
    }
}
