//! Portable any-map (PBM family) images.
//!
//! Binary grayscale (`P5`) and color (`P6`) files are read directly from disk
//! with tile-sized reads. Their plain-text siblings (`P2`, `P3`) are handled by
//! [`PlainPnmReader`](super::PlainPnmReader), which the registry pairs with this
//! reader as its legacy fallback.

use async_trait::async_trait;
use tracing::debug;

use crate::dimension::DimensionOrder;
use crate::error::{FormatError, IoError};
use crate::io::RandomAccessStream;
use crate::meta::{checked_size, PixelType};
use crate::reader::{ReaderCore, ReaderPlugin, Region};

pub(crate) const FORMAT: &str = "Portable Any Map";
pub(crate) const SUFFIXES: &[&str] = &["pgm", "ppm", "pnm"];

/// Longest header we are willing to scan, comments included.
pub const MAX_HEADER_BYTES: usize = 4096;

// =============================================================================
// Header
// =============================================================================

/// The four any-map variants with more than one bit per sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PnmKind {
    PlainGray,
    PlainColor,
    Gray,
    Color,
}

impl PnmKind {
    pub fn from_magic(magic: &[u8]) -> Option<Self> {
        match magic {
            b"P2" => Some(PnmKind::PlainGray),
            b"P3" => Some(PnmKind::PlainColor),
            b"P5" => Some(PnmKind::Gray),
            b"P6" => Some(PnmKind::Color),
            _ => None,
        }
    }

    pub fn magic(self) -> &'static str {
        match self {
            PnmKind::PlainGray => "P2",
            PnmKind::PlainColor => "P3",
            PnmKind::Gray => "P5",
            PnmKind::Color => "P6",
        }
    }

    pub fn channels(self) -> usize {
        match self {
            PnmKind::PlainGray | PnmKind::Gray => 1,
            PnmKind::PlainColor | PnmKind::Color => 3,
        }
    }

    /// Samples stored as decimal text.
    pub fn is_plain(self) -> bool {
        matches!(self, PnmKind::PlainGray | PnmKind::PlainColor)
    }
}

/// A parsed any-map header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PnmHeader {
    pub kind: PnmKind,
    pub width: usize,
    pub height: usize,
    pub max_value: u32,
    /// Offset of the first sample
    pub data_offset: usize,
}

impl PnmHeader {
    pub fn pixel_type(&self) -> PixelType {
        if self.max_value > u8::MAX as u32 {
            PixelType::Uint16
        } else {
            PixelType::Uint8
        }
    }

    /// Samples in the raster, all channels counted.
    pub fn sample_count(&self) -> Result<usize, FormatError> {
        checked_size(&[self.width, self.height, self.kind.channels()])
            .map_err(|_| malformed(format!("image too large: {}x{}", self.width, self.height)))
    }

    /// Bytes of the binary raster.
    pub fn raster_size(&self) -> Result<usize, FormatError> {
        checked_size(&[self.sample_count()?, self.pixel_type().bytes_per_pixel()])
            .map_err(|_| malformed(format!("image too large: {}x{}", self.width, self.height)))
    }

    /// Fill the core metadata at the cursor with this image's geometry.
    pub(crate) fn describe(&self, core: &mut ReaderCore) -> Result<(), FormatError> {
        let channels = self.kind.channels();
        let meta = core.current_core_mut()?;
        meta.size_x = self.width;
        meta.size_y = self.height;
        meta.size_z = 1;
        meta.size_c = channels;
        meta.size_t = 1;
        meta.rgb = channels > 1;
        meta.interleaved = true;
        meta.little_endian = false;
        meta.pixel_type = self.pixel_type();
        meta.bits_per_pixel = u32::BITS - self.max_value.leading_zeros();
        meta.image_count = 1;
        meta.dimension_order = DimensionOrder::XYCZT;

        core.add_global_meta("Magic", self.kind.magic());
        core.add_global_meta("Maximum value", self.max_value);
        Ok(())
    }
}

fn malformed(reason: impl Into<String>) -> FormatError {
    FormatError::Malformed {
        format: FORMAT,
        reason: reason.into(),
    }
}

/// Cursor over header text: decimal fields separated by whitespace, with `#`
/// comments running to the end of the line.
pub(crate) struct Tokens<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Tokens<'a> {
    pub(crate) fn new(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos }
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    fn skip_blank(&mut self) {
        while let Some(&byte) = self.data.get(self.pos) {
            if byte == b'#' {
                while let Some(&b) = self.data.get(self.pos) {
                    self.pos += 1;
                    if b == b'\n' || b == b'\r' {
                        break;
                    }
                }
            } else if byte.is_ascii_whitespace() {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    /// The next decimal number, or `None` at the end of the data.
    pub(crate) fn next_number(&mut self) -> Result<Option<u32>, FormatError> {
        self.skip_blank();
        let start = self.pos;
        while self.data.get(self.pos).is_some_and(u8::is_ascii_digit) {
            self.pos += 1;
        }
        if start == self.pos {
            return match self.data.get(self.pos) {
                None => Ok(None),
                Some(&byte) => Err(malformed(format!(
                    "unexpected byte 0x{:02x} at offset {}",
                    byte, self.pos
                ))),
            };
        }
        std::str::from_utf8(&self.data[start..self.pos])
            .ok()
            .and_then(|digits| digits.parse().ok())
            .map(Some)
            .ok_or_else(|| malformed(format!("number out of range at offset {}", start)))
    }

    fn field(&mut self, name: &str) -> Result<u32, FormatError> {
        self.next_number()?
            .ok_or_else(|| malformed(format!("header ends before {}", name)))
    }
}

/// Parse the header at the start of `data`.
pub fn parse_header(data: &[u8]) -> Result<PnmHeader, FormatError> {
    let kind = data
        .get(..2)
        .and_then(PnmKind::from_magic)
        .ok_or_else(|| malformed("missing P2/P3/P5/P6 signature"))?;

    let mut tokens = Tokens::new(data, 2);
    let width = tokens.field("width")? as usize;
    let height = tokens.field("height")? as usize;
    let max_value = tokens.field("maximum value")?;
    if width == 0 || height == 0 {
        return Err(malformed(format!("invalid size {}x{}", width, height)));
    }
    if max_value == 0 || max_value > u16::MAX as u32 {
        return Err(malformed(format!("invalid maximum value {}", max_value)));
    }

    // Exactly one whitespace byte separates the header from binary samples.
    let end = tokens.position();
    if !data.get(end).is_some_and(u8::is_ascii_whitespace) {
        return Err(malformed("header is not terminated by whitespace"));
    }

    let header = PnmHeader {
        kind,
        width,
        height,
        max_value,
        data_offset: end + 1,
    };
    header.raster_size()?;
    Ok(header)
}

/// Whether `stream` starts with a `P2`, `P3`, `P5` or `P6` signature.
pub(crate) async fn sniff(stream: &mut RandomAccessStream) -> Result<bool, IoError> {
    stream.seek(0);
    let head = stream.read_at_most(3).await?;
    Ok(head.len() == 3
        && PnmKind::from_magic(&head[..2]).is_some()
        && head[2].is_ascii_whitespace())
}

/// Read and parse the header of the stream.
pub(crate) async fn read_header(stream: &mut RandomAccessStream) -> Result<PnmHeader, FormatError> {
    stream.seek(0);
    let head = stream.read_at_most(MAX_HEADER_BYTES).await?;
    parse_header(&head)
}

// =============================================================================
// PnmReader
// =============================================================================

/// Native reader for binary any-maps.
#[derive(Debug, Clone, Default)]
pub struct PnmReader {
    data_offset: u64,
}

impl PnmReader {
    /// Registry identifier of the native/plain pair.
    pub const IDENTIFIER: &'static str = "formats.in.PnmReader";

    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReaderPlugin for PnmReader {
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
        let stream = core.open_stream(id).await?;
        let header = read_header(stream).await?;
        if header.kind.is_plain() {
            return Err(FormatError::unsupported(format!(
                "plain-text {} samples",
                header.kind.magic()
            )));
        }
        let needed = (header.raster_size()? as u64)
            .checked_add(header.data_offset as u64)
            .ok_or_else(|| malformed("image too large"))?;
        if stream.length() < needed {
            return Err(malformed(format!(
                "truncated raster: {} bytes, expected {}",
                stream.length(),
                needed
            )));
        }
        stream.order(false);
        debug!(
            id,
            magic = header.kind.magic(),
            width = header.width,
            height = header.height,
            "Parsed PNM header"
        );

        header.describe(core)?;
        self.data_offset = header.data_offset as u64;
        Ok(())
    }

    async fn open_bytes(
        &mut self,
        core: &mut ReaderCore,
        _plane: usize,
        buf: &mut [u8],
        region: Region,
    ) -> Result<(), FormatError> {
        core.stream_mut()?.seek(self.data_offset);
        core.read_plane(region, 0, buf).await
    }

    fn close(&mut self, file_only: bool) {
        if !file_only {
            self.data_offset = 0;
        }
    }

    fn fresh(&self) -> Box<dyn ReaderPlugin> {
        Box::new(PnmReader::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_binary_header() {
        let header = parse_header(b"P5\n# made by hand\n4 3\n255\n\x00\x01").unwrap();
        assert_eq!(header.kind, PnmKind::Gray);
        assert_eq!((header.width, header.height), (4, 3));
        assert_eq!(header.max_value, 255);
        assert_eq!(header.data_offset, 26);
        assert_eq!(header.pixel_type(), PixelType::Uint8);
        assert_eq!(header.raster_size().unwrap(), 12);
    }

    #[test]
    fn test_parse_sixteen_bit_color_header() {
        let header = parse_header(b"P6 2 2 4095 ").unwrap();
        assert_eq!(header.kind, PnmKind::Color);
        assert_eq!(header.pixel_type(), PixelType::Uint16);
        assert_eq!(header.raster_size().unwrap(), 24);
        assert_eq!(header.data_offset, 12);
    }

    #[test]
    fn test_parse_header_errors() {
        assert!(parse_header(b"P4\n1 1\n").is_err());
        assert!(parse_header(b"P5\n4 3\n").is_err());
        assert!(parse_header(b"P5\n0 3\n255\n").is_err());
        assert!(parse_header(b"P5\n4 3\n70000\n").is_err());
        assert!(parse_header(b"P5\n4 x\n255\n").is_err());
        assert!(parse_header(b"P5\n4 3\n255").is_err());
    }

    #[test]
    fn test_parse_rejects_unaddressable_size() {
        let err = parse_header(b"P6\n4294967295 4294967295\n65535\n").unwrap_err();
        match err {
            FormatError::Malformed { reason, .. } => assert!(reason.contains("too large")),
            other => panic!("expected Malformed, got {}", other),
        }
    }

    #[tokio::test]
    async fn test_sniff() {
        let mut gray = RandomAccessStream::from_bytes(&b"P5\n1 1\n255\n\x00"[..], "a");
        assert!(sniff(&mut gray).await.unwrap());
        let mut plain = RandomAccessStream::from_bytes(&b"P3 1 1 255 0 0 0"[..], "b");
        assert!(sniff(&mut plain).await.unwrap());
        let mut bitmap = RandomAccessStream::from_bytes(&b"P4\n1 1\n\x00"[..], "c");
        assert!(!sniff(&mut bitmap).await.unwrap());
        let mut short = RandomAccessStream::from_bytes(&b"P"[..], "d");
        assert!(!sniff(&mut short).await.unwrap());
    }
}
