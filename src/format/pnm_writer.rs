use async_trait::async_trait;
use tracing::debug;

use super::pnm::PnmKind;
use crate::error::FormatError;
use crate::meta::{PixelType, PixelsGeometry};
use crate::reader::Region;
use crate::writer::{WriterCore, WriterPlugin};

const FORMAT: &str = "Portable Any Map";
const SUFFIXES: &[&str] = &["pgm", "ppm", "pnm"];

/// Writer plugin for binary grayscale and color any-maps.
///
/// The header is written with the first tile, once the geometry is known.
/// Tiles land at their computed raster offsets; 16-bit samples are stored
/// big-endian whatever the input byte order.
#[derive(Debug, Clone, Default)]
pub struct PnmWriter {
    header_len: Option<u64>,
}

impl PnmWriter {
    pub const IDENTIFIER: &'static str = "formats.out.PnmWriter";

    pub fn new() -> Self {
        Self::default()
    }
}

fn kind_for(geometry: &PixelsGeometry) -> Result<PnmKind, FormatError> {
    match geometry.samples_per_pixel {
        1 => Ok(PnmKind::Gray),
        3 => Ok(PnmKind::Color),
        n => Err(FormatError::unsupported(format!(
            "{} stores 1 or 3 samples per pixel, not {}",
            FORMAT, n
        ))),
    }
}

fn raster_size(geometry: &PixelsGeometry) -> Result<u64, FormatError> {
    Ok(geometry.plane_size(geometry.size_x, geometry.size_y)? as u64)
}

/// Header text for `geometry`.
fn header(geometry: &PixelsGeometry) -> Result<String, FormatError> {
    let kind = kind_for(geometry)?;
    let max_value = match geometry.pixel_type {
        PixelType::Uint16 => u16::MAX as u32,
        _ => u8::MAX as u32,
    };
    Ok(format!(
        "{}\n{} {}\n{}\n",
        kind.magic(),
        geometry.size_x,
        geometry.size_y,
        max_value
    ))
}

/// One interleaved big-endian output row of a tile.
fn encode_row(
    geometry: &PixelsGeometry,
    interleaved: bool,
    buf: &[u8],
    region: Region,
    row: usize,
    out: &mut [u8],
) {
    let channels = geometry.samples_per_pixel;
    let bpp = geometry.pixel_type.bytes_per_pixel();
    let (w, h) = (region.width, region.height);
    for col in 0..w {
        for sample in 0..channels {
            let src = if interleaved || channels == 1 {
                ((row * w + col) * channels + sample) * bpp
            } else {
                ((sample * h + row) * w + col) * bpp
            };
            let dst = (col * channels + sample) * bpp;
            out[dst..dst + bpp].copy_from_slice(&buf[src..src + bpp]);
            if bpp == 2 && geometry.little_endian {
                out.swap(dst, dst + 1);
            }
        }
    }
}

#[async_trait]
impl WriterPlugin for PnmWriter {
    fn identifier(&self) -> &'static str {
        Self::IDENTIFIER
    }

    fn format(&self) -> &'static str {
        FORMAT
    }

    fn suffixes(&self) -> &'static [&'static str] {
        SUFFIXES
    }

    fn pixel_types(&self, _compression: &str) -> Vec<PixelType> {
        vec![PixelType::Uint8, PixelType::Uint16]
    }

    async fn save_bytes(
        &mut self,
        core: &mut WriterCore,
        _plane: usize,
        buf: &[u8],
        region: Region,
    ) -> Result<(), FormatError> {
        let geometry = core.geometry()?;
        let header_len = match self.header_len {
            Some(len) => len,
            None => {
                let text = header(&geometry)?;
                let output = core.output_mut()?;
                output.write_at(0, text.as_bytes()).await?;
                let len = text.len() as u64;
                output.set_length(len + raster_size(&geometry)?).await?;
                debug!(
                    id = output.identifier(),
                    width = geometry.size_x,
                    height = geometry.size_y,
                    "Wrote PNM header"
                );
                self.header_len = Some(len);
                len
            }
        };

        let interleaved = core.options().interleaved;
        let pixel_bytes = geometry.samples_per_pixel * geometry.pixel_type.bytes_per_pixel();
        let mut line = vec![0u8; region.width * pixel_bytes];
        for row in 0..region.height {
            encode_row(&geometry, interleaved, buf, region, row, &mut line);
            let offset = header_len
                + (((region.y + row) * geometry.size_x + region.x) * pixel_bytes) as u64;
            core.output_mut()?.write_at(offset, &line).await?;
        }
        Ok(())
    }

    async fn close(&mut self, _core: &mut WriterCore) -> Result<(), FormatError> {
        self.header_len = None;
        Ok(())
    }

    fn fresh(&self) -> Box<dyn WriterPlugin> {
        Box::new(PnmWriter::new())
    }
}
