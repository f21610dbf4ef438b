use serde::{Deserialize, Serialize};

use super::{MetadataTable, PixelType};
use crate::dimension::{Axis, DimensionOrder, Modulo, Zct};
use crate::error::FormatError;

/// Longest side of a derived thumbnail.
pub const THUMBNAIL_DIMENSION: usize = 128;

/// Product of `factors`, failing when it does not fit in a `usize`.
pub(crate) fn checked_size(factors: &[usize]) -> Result<usize, FormatError> {
    factors
        .iter()
        .try_fold(1usize, |acc, &factor| acc.checked_mul(factor))
        .ok_or_else(|| {
            FormatError::size_mismatch("byte count (too large to address)", usize::MAX, usize::MAX)
        })
}

/// Structural metadata of one (series, resolution) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreMetadata {
    pub size_x: usize,
    pub size_y: usize,
    pub size_z: usize,
    pub size_c: usize,
    pub size_t: usize,
    /// Thumbnail width; 0 derives it from the image size
    pub thumb_size_x: usize,
    /// Thumbnail height; 0 derives it from the image size
    pub thumb_size_y: usize,
    pub pixel_type: PixelType,
    /// Significant bits per sample; 0 means "all of them"
    pub bits_per_pixel: u32,
    pub image_count: usize,
    pub dimension_order: DimensionOrder,
    pub order_certain: bool,
    pub rgb: bool,
    pub little_endian: bool,
    pub interleaved: bool,
    pub indexed: bool,
    pub false_color: bool,
    pub metadata_complete: bool,
    pub thumbnail: bool,
    pub resolution_count: usize,
    pub series_metadata: MetadataTable,
    pub modulo_z: Modulo,
    pub modulo_c: Modulo,
    pub modulo_t: Modulo,
}

impl Default for CoreMetadata {
    fn default() -> Self {
        Self {
            size_x: 0,
            size_y: 0,
            size_z: 1,
            size_c: 1,
            size_t: 1,
            thumb_size_x: 0,
            thumb_size_y: 0,
            pixel_type: PixelType::Uint8,
            bits_per_pixel: 0,
            image_count: 1,
            dimension_order: DimensionOrder::XYZCT,
            order_certain: false,
            rgb: false,
            little_endian: false,
            interleaved: false,
            indexed: false,
            false_color: false,
            metadata_complete: true,
            thumbnail: false,
            resolution_count: 1,
            series_metadata: MetadataTable::new(),
            modulo_z: Modulo::new(Axis::Z),
            modulo_c: Modulo::new(Axis::C),
            modulo_t: Modulo::new(Axis::T),
        }
    }
}

impl CoreMetadata {
    /// Planes per channel group: `image_count / (size_z * size_t)`.
    pub fn effective_size_c(&self) -> usize {
        let zt = self.size_z * self.size_t;
        if zt == 0 {
            return 0;
        }
        self.image_count / zt
    }

    /// Samples stored in each plane (3 for packed RGB, 1 otherwise).
    pub fn rgb_channel_count(&self) -> usize {
        let effective = self.effective_size_c();
        if effective == 0 {
            return 0;
        }
        self.size_c / effective
    }

    pub fn bytes_per_pixel(&self) -> usize {
        self.pixel_type.bytes_per_pixel()
    }

    /// Significant bits, defaulting to the full sample width.
    pub fn significant_bits(&self) -> u32 {
        if self.bits_per_pixel == 0 {
            8 * self.bytes_per_pixel() as u32
        } else {
            self.bits_per_pixel
        }
    }

    /// Real Z, C and T sizes.
    pub fn sizes(&self) -> Zct {
        Zct::new(self.size_z, self.size_c, self.size_t)
    }

    /// Z, effective C and T sizes: the radix of the plane index.
    pub fn plane_sizes(&self) -> Zct {
        Zct::new(self.size_z, self.effective_size_c(), self.size_t)
    }

    pub fn modulo(&self, axis: Axis) -> Option<&Modulo> {
        match axis {
            Axis::Z => Some(&self.modulo_z),
            Axis::C => Some(&self.modulo_c),
            Axis::T => Some(&self.modulo_t),
            Axis::X | Axis::Y => None,
        }
    }

    pub fn modulo_lengths(&self) -> Zct {
        Zct::new(
            self.modulo_z.length(),
            self.modulo_c.length(),
            self.modulo_t.length(),
        )
    }

    /// Bytes in a `width` x `height` region of one plane.
    pub fn plane_size(&self, width: usize, height: usize) -> Result<usize, FormatError> {
        checked_size(&[width, height, self.rgb_channel_count(), self.bytes_per_pixel()])
    }

    /// Thumbnail width: the image width scaled so the longer side fits 128.
    pub fn thumb_width(&self) -> usize {
        if self.thumb_size_x > 0 {
            return self.thumb_size_x;
        }
        let (w, h) = (self.size_x, self.size_y);
        if w < THUMBNAIL_DIMENSION && h < THUMBNAIL_DIMENSION {
            return w;
        }
        if w >= h {
            THUMBNAIL_DIMENSION
        } else {
            (w * THUMBNAIL_DIMENSION / h.max(1)).max(1)
        }
    }

    /// Thumbnail height, see [`thumb_width`](Self::thumb_width).
    pub fn thumb_height(&self) -> usize {
        if self.thumb_size_y > 0 {
            return self.thumb_size_y;
        }
        let (w, h) = (self.size_x, self.size_y);
        if w < THUMBNAIL_DIMENSION && h < THUMBNAIL_DIMENSION {
            return h;
        }
        if h >= w {
            THUMBNAIL_DIMENSION
        } else {
            (h * THUMBNAIL_DIMENSION / w.max(1)).max(1)
        }
    }

    /// Check the structural invariants a parsed entry must satisfy.
    ///
    /// Positive sizes, `image_count == effective_size_c * size_z * size_t`
    /// with an integral RGB channel count.
    pub fn validate(&self) -> Result<(), FormatError> {
        for (name, size) in [
            ("sizeX", self.size_x),
            ("sizeY", self.size_y),
            ("sizeZ", self.size_z),
            ("sizeC", self.size_c),
            ("sizeT", self.size_t),
            ("imageCount", self.image_count),
        ] {
            if size == 0 {
                return Err(FormatError::size_mismatch(
                    format!("{} (must be positive)", name),
                    1,
                    0,
                ));
            }
        }

        let zt = checked_size(&[self.size_z, self.size_t])?;
        if self.image_count % zt != 0 {
            return Err(FormatError::size_mismatch(
                "image count (must be a multiple of sizeZ * sizeT)",
                zt * (self.image_count / zt).max(1),
                self.image_count,
            ));
        }

        let effective = self.effective_size_c();
        if self.size_c % effective != 0 {
            return Err(FormatError::size_mismatch(
                "sizeC (must be a multiple of the effective channel count)",
                effective * (self.size_c / effective).max(1),
                self.size_c,
            ));
        }

        self.plane_size(self.size_x, self.size_y)?;
        Ok(())
    }
}
