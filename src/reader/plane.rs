//! Plane regions and raw plane reads.

use serde::{Deserialize, Serialize};

use super::ReaderCore;
use crate::error::FormatError;
use crate::io::RandomAccessStream;

/// A rectangle within one plane, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Region {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl Region {
    pub const fn new(x: usize, y: usize, width: usize, height: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The whole of a `size_x` x `size_y` plane.
    pub const fn full(size_x: usize, size_y: usize) -> Self {
        Self::new(0, 0, size_x, size_y)
    }

    pub fn area(&self) -> usize {
        self.width * self.height
    }

    pub fn fits(&self, size_x: usize, size_y: usize) -> bool {
        self.x.checked_add(self.width).is_some_and(|end| end <= size_x)
            && self.y.checked_add(self.height).is_some_and(|end| end <= size_y)
    }

    /// Cover a `size_x` x `size_y` plane with tiles of at most
    /// `tile_width` x `tile_height`, row by row.
    pub fn tiles(size_x: usize, size_y: usize, tile_width: usize, tile_height: usize) -> Vec<Region> {
        let tile_width = tile_width.max(1);
        let tile_height = tile_height.max(1);
        let mut tiles = Vec::new();
        for y in (0..size_y).step_by(tile_height) {
            for x in (0..size_x).step_by(tile_width) {
                tiles.push(Region::new(
                    x,
                    y,
                    tile_width.min(size_x - x),
                    tile_height.min(size_y - y),
                ));
            }
        }
        tiles
    }
}

/// Storage layout of an uncompressed plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaneLayout {
    pub size_x: usize,
    pub size_y: usize,
    /// Samples per pixel
    pub channels: usize,
    pub bytes_per_pixel: usize,
    pub interleaved: bool,
    /// Extra pixels stored at the end of every row
    pub scanline_pad: usize,
}

impl PlaneLayout {
    fn scanline_width(&self) -> usize {
        self.size_x + self.scanline_pad
    }

    /// Bytes of the whole plane as stored, padding included.
    pub fn stored_size(&self) -> usize {
        self.scanline_width() * self.size_y * self.channels * self.bytes_per_pixel
    }
}

/// Read `region` of an uncompressed plane starting at the stream's position.
///
/// Interleaved planes are copied row by row; planar ones channel by channel,
/// so `buf` ends up with the channel planes one after another.
pub async fn read_region(
    stream: &mut RandomAccessStream,
    layout: PlaneLayout,
    region: Region,
    buf: &mut [u8],
) -> Result<(), FormatError> {
    if !region.fits(layout.size_x, layout.size_y) {
        return Err(FormatError::InvalidTile {
            x: region.x,
            y: region.y,
            width: region.width,
            height: region.height,
            size_x: layout.size_x,
            size_y: layout.size_y,
        });
    }
    let bpp = layout.bytes_per_pixel;
    let c = layout.channels;
    let total = region.area() * c * bpp;
    if buf.len() < total {
        return Err(FormatError::size_mismatch("plane buffer", total, buf.len()));
    }
    if total == 0 {
        return Ok(());
    }

    let base = stream.position();
    let whole_rows = region.x == 0 && region.width == layout.size_x && layout.scanline_pad == 0;

    if whole_rows && layout.interleaved {
        stream.seek(base + (region.y * layout.size_x * c * bpp) as u64);
        stream.read_into(&mut buf[..total]).await?;
        return Ok(());
    }

    let scanline = layout.scanline_width();
    if whole_rows {
        let channel_bytes = layout.size_x * layout.size_y * bpp;
        let chunk = region.height * layout.size_x * bpp;
        for (channel, out) in buf[..total].chunks_exact_mut(chunk).enumerate() {
            stream.seek(base + (channel * channel_bytes + region.y * layout.size_x * bpp) as u64);
            stream.read_into(out).await?;
        }
        return Ok(());
    }

    if layout.interleaved {
        let row_bytes = region.width * c * bpp;
        for (row, out) in buf[..total].chunks_exact_mut(row_bytes).enumerate() {
            let offset = ((region.y + row) * scanline + region.x) * c * bpp;
            stream.seek(base + offset as u64);
            stream.read_into(out).await?;
        }
    } else {
        let row_bytes = region.width * bpp;
        let channel_bytes = scanline * layout.size_y * bpp;
        for (i, out) in buf[..total].chunks_exact_mut(row_bytes).enumerate() {
            let channel = i / region.height;
            let row = i % region.height;
            let offset =
                channel * channel_bytes + ((region.y + row) * scanline + region.x) * bpp;
            stream.seek(base + offset as u64);
            stream.read_into(out).await?;
        }
    }
    Ok(())
}

impl ReaderCore {
    /// Validate a plane read request against the current core metadata.
    /// Check that `plane` exists and `region` lies within it.
    pub fn check_region(&self, plane: usize, region: Region) -> Result<(), FormatError> {
        let core = self.current_core()?;
        if plane >= core.image_count {
            return Err(FormatError::invalid_index("plane", plane, core.image_count));
        }
        if !region.fits(core.size_x, core.size_y) {
            return Err(FormatError::InvalidTile {
                x: region.x,
                y: region.y,
                width: region.width,
                height: region.height,
                size_x: core.size_x,
                size_y: core.size_y,
            });
        }
        Ok(())
    }

    pub fn check_plane_parameters(
        &self,
        plane: usize,
        buf_len: usize,
        region: Region,
    ) -> Result<(), FormatError> {
        self.check_region(plane, region)?;
        let needed = self.current_core()?.plane_size(region.width, region.height)?;
        if buf_len < needed {
            return Err(FormatError::size_mismatch("plane buffer", needed, buf_len));
        }
        Ok(())
    }

    /// Layout of a raw plane of the current core metadata.
    pub fn plane_layout(&self, scanline_pad: usize) -> Result<PlaneLayout, FormatError> {
        let core = self.current_core()?;
        Ok(PlaneLayout {
            size_x: core.size_x,
            size_y: core.size_y,
            channels: core.rgb_channel_count(),
            bytes_per_pixel: core.bytes_per_pixel(),
            interleaved: core.interleaved,
            scanline_pad,
        })
    }

    /// Read `region` of a raw plane from the current stream position.
    pub async fn read_plane(
        &mut self,
        region: Region,
        scanline_pad: usize,
        buf: &mut [u8],
    ) -> Result<(), FormatError> {
        let layout = self.plane_layout(scanline_pad)?;
        read_region(self.stream_mut()?, layout, region, buf).await
    }
}
