//! Synthetic images described entirely by their file name.
//!
//! A name such as `cells&sizeX=64&sizeY=32&sizeC=3&rgb=3.fake` opens as a
//! 64x32 RGB image without touching the filesystem. Pixels are a gradient
//! along X; the top [`BOX_SIZE`] rows carry boxes whose values encode the
//! series, plane, Z, C and T indices, so a test can tell which plane it got.

use std::path::Path;

use async_trait::async_trait;
use tracing::warn;

use crate::dimension::{modulo_type, Axis, DimensionOrder, Modulo};
use crate::error::FormatError;
use crate::io::pack_bytes;
use crate::meta::{CoreMetadata, CoreMetadataList, PixelType};
use crate::reader::{LookupTable, ReaderCore, ReaderPlugin, Region};

/// Side of the index-encoding boxes at the top of every plane.
pub const BOX_SIZE: usize = 10;

const FORMAT: &str = "Simulated data";
const SUFFIXES: &[&str] = &["fake"];
const TOKEN_SEPARATOR: char = '&';

// =============================================================================
// Name parsing
// =============================================================================

/// Image description decoded from a fake file name.
#[derive(Debug, Clone, PartialEq)]
pub struct FakeSpec {
    pub name: String,
    pub size_x: usize,
    pub size_y: usize,
    pub size_z: usize,
    pub size_c: usize,
    pub size_t: usize,
    pub thumb_size_x: usize,
    pub thumb_size_y: usize,
    pub pixel_type: PixelType,
    pub bits_per_pixel: u32,
    /// Samples per pixel
    pub rgb: usize,
    pub dimension_order: DimensionOrder,
    pub order_certain: bool,
    pub little_endian: bool,
    pub interleaved: bool,
    pub indexed: bool,
    pub false_color: bool,
    pub metadata_complete: bool,
    pub thumbnail: bool,
    pub series: usize,
    pub resolutions: usize,
    pub resolution_scale: usize,
    pub scale_factor: f64,
    pub modulo_z: usize,
    pub modulo_c: usize,
    pub modulo_t: usize,
    pub lut_length: usize,
}

impl Default for FakeSpec {
    fn default() -> Self {
        Self {
            name: String::new(),
            size_x: 512,
            size_y: 512,
            size_z: 1,
            size_c: 1,
            size_t: 1,
            thumb_size_x: 0,
            thumb_size_y: 0,
            pixel_type: PixelType::Uint8,
            bits_per_pixel: 0,
            rgb: 1,
            dimension_order: DimensionOrder::XYZCT,
            order_certain: true,
            little_endian: true,
            interleaved: false,
            indexed: false,
            false_color: false,
            metadata_complete: true,
            thumbnail: false,
            series: 1,
            resolutions: 1,
            resolution_scale: 2,
            scale_factor: 1.0,
            modulo_z: 1,
            modulo_c: 1,
            modulo_t: 1,
            lut_length: 3,
        }
    }
}

fn malformed(reason: impl Into<String>) -> FormatError {
    FormatError::Malformed {
        format: FORMAT,
        reason: reason.into(),
    }
}

fn parse_count(key: &str, value: &str) -> Result<usize, FormatError> {
    let parsed: f64 = value
        .parse()
        .map_err(|_| malformed(format!("invalid {}: {}", key, value)))?;
    if !parsed.is_finite() || parsed < 0.0 {
        return Err(malformed(format!("invalid {}: {}", key, value)));
    }
    Ok(parsed as usize)
}

fn positive(key: &str, value: usize) -> Result<(), FormatError> {
    if value < 1 {
        return Err(malformed(format!("invalid {}: {}", key, value)));
    }
    Ok(())
}

impl FakeSpec {
    /// Decode the `&`-separated tokens of a fake file name.
    ///
    /// The first token is the image name; unknown keys and tokens without `=`
    /// are ignored with a warning.
    pub fn parse(id: &str) -> Result<Self, FormatError> {
        let file_name = Path::new(id)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| id.to_string());
        let suffix = ".fake";
        let stem = match file_name.get(file_name.len().saturating_sub(suffix.len())..) {
            Some(tail) if tail.eq_ignore_ascii_case(suffix) => {
                file_name[..file_name.len() - suffix.len()].to_string()
            }
            _ => file_name,
        };

        let mut tokens = stem.split(TOKEN_SEPARATOR);
        let mut spec = FakeSpec {
            name: tokens.next().unwrap_or_default().to_string(),
            ..FakeSpec::default()
        };

        for token in tokens {
            let Some((key, value)) = token.split_once('=') else {
                warn!(token, "Ignoring fake token without '='");
                continue;
            };
            let flag = value == "true";
            match key {
                "sizeX" => spec.size_x = parse_count(key, value)?,
                "sizeY" => spec.size_y = parse_count(key, value)?,
                "sizeZ" => spec.size_z = parse_count(key, value)?,
                "sizeC" => spec.size_c = parse_count(key, value)?,
                "sizeT" => spec.size_t = parse_count(key, value)?,
                "thumbSizeX" => spec.thumb_size_x = parse_count(key, value)?,
                "thumbSizeY" => spec.thumb_size_y = parse_count(key, value)?,
                "pixelType" => spec.pixel_type = value.parse()?,
                "bitsPerPixel" => spec.bits_per_pixel = parse_count(key, value)? as u32,
                "rgb" => spec.rgb = parse_count(key, value)?,
                "dimOrder" => spec.dimension_order = value.to_uppercase().parse()?,
                "orderCertain" => spec.order_certain = flag,
                "little" => spec.little_endian = flag,
                "interleaved" => spec.interleaved = flag,
                "indexed" => spec.indexed = flag,
                "falseColor" => spec.false_color = flag,
                "metadataComplete" => spec.metadata_complete = flag,
                "thumbnail" => spec.thumbnail = flag,
                "series" => spec.series = parse_count(key, value)?,
                "resolutions" => spec.resolutions = parse_count(key, value)?,
                "resolutionScale" => spec.resolution_scale = parse_count(key, value)?,
                "scaleFactor" => {
                    spec.scale_factor = value
                        .parse()
                        .map_err(|_| malformed(format!("invalid scaleFactor: {}", value)))?
                }
                "moduloZ" => spec.modulo_z = parse_count(key, value)?,
                "moduloC" => spec.modulo_c = parse_count(key, value)?,
                "moduloT" => spec.modulo_t = parse_count(key, value)?,
                "lutLength" => spec.lut_length = parse_count(key, value)?,
                _ => warn!(key, value, "Ignoring unknown fake token"),
            }
        }

        spec.check()?;
        Ok(spec)
    }

    fn check(&self) -> Result<(), FormatError> {
        positive("sizeX", self.size_x)?;
        positive("sizeY", self.size_y)?;
        positive("sizeZ", self.size_z)?;
        positive("sizeC", self.size_c)?;
        positive("sizeT", self.size_t)?;
        positive("series", self.series)?;
        positive("resolutions", self.resolutions)?;
        positive("lutLength", self.lut_length)?;
        if self.resolution_scale < 2 {
            return Err(malformed(format!(
                "invalid resolutionScale: {}",
                self.resolution_scale
            )));
        }
        if self.rgb < 1 || self.rgb > self.size_c || self.size_c % self.rgb != 0 {
            return Err(malformed(format!(
                "invalid sizeC/rgb combination: {}/{}",
                self.size_c, self.rgb
            )));
        }
        if self.false_color && !self.indexed {
            return Err(malformed("false color images must be indexed"));
        }
        Ok(())
    }

    /// Core metadata of resolution `level` (0 = full size).
    fn core(&self, level: usize) -> CoreMetadata {
        let scale = self.resolution_scale.pow(level as u32);
        let mut core = CoreMetadata {
            size_x: (self.size_x / scale).max(1),
            size_y: (self.size_y / scale).max(1),
            size_z: self.size_z,
            size_c: self.size_c,
            size_t: self.size_t,
            thumb_size_x: self.thumb_size_x,
            thumb_size_y: self.thumb_size_y,
            pixel_type: self.pixel_type,
            bits_per_pixel: self.bits_per_pixel,
            image_count: self.size_z * (self.size_c / self.rgb) * self.size_t,
            dimension_order: self.dimension_order,
            order_certain: self.order_certain,
            rgb: self.rgb > 1,
            little_endian: self.little_endian,
            interleaved: self.interleaved,
            indexed: self.indexed,
            false_color: self.false_color,
            metadata_complete: self.metadata_complete,
            thumbnail: self.thumbnail,
            ..CoreMetadata::default()
        };
        if self.modulo_z > 1 {
            core.modulo_z = Modulo::with_length(Axis::Z, modulo_type::ROTATION, self.modulo_z);
        }
        if self.modulo_c > 1 {
            core.modulo_c = Modulo::with_length(Axis::C, modulo_type::LIFETIME, self.modulo_c);
        }
        if self.modulo_t > 1 {
            core.modulo_t = Modulo::with_length(Axis::T, modulo_type::PHASE, self.modulo_t);
        }
        core
    }

    fn core_list(&self) -> Result<CoreMetadataList, FormatError> {
        let mut list = CoreMetadataList::new();
        for _ in 0..self.series {
            let series = list.add_series(self.core(0));
            for level in 1..self.resolutions {
                list.add_resolution(series, self.core(level))?;
            }
        }
        Ok(list)
    }
}

// =============================================================================
// Pixel generation
// =============================================================================

/// Indices a plane encodes in its top boxes.
#[derive(Debug, Clone, Copy)]
struct PlaneTags {
    series: usize,
    plane: usize,
    z: usize,
    channel: usize,
    t: usize,
}

impl PlaneTags {
    fn boxed_value(&self, x: usize) -> Option<i64> {
        let value = match x / BOX_SIZE {
            0 => self.series,
            1 => self.plane,
            2 => self.z,
            3 => self.channel,
            4 => self.t,
            _ => return None,
        };
        Some(value as i64)
    }
}

/// Raw bits of the sample at (`x`, `y`).
fn sample_bits(
    pixel_type: PixelType,
    tags: PlaneTags,
    x: usize,
    y: usize,
    indexed: bool,
    scale_factor: f64,
) -> u64 {
    let bits = 8 * pixel_type.bytes_per_pixel() as u32;
    let min: i64 = if pixel_type.is_signed() && !pixel_type.is_floating_point() {
        -(1i64 << (bits - 1))
    } else {
        0
    };

    let boxed = if y < BOX_SIZE { tags.boxed_value(x) } else { None };
    let mut value = boxed.unwrap_or(min + x as i64);

    // The lookup tables are linear ramps, so a value is its own index.
    if indexed {
        match pixel_type {
            PixelType::Uint8 => value = value.rem_euclid(256),
            PixelType::Uint16 => value = value.rem_euclid(65536),
            _ => {}
        }
    }

    let scaled = |v: i64| if boxed.is_some() { v as f64 } else { scale_factor * v as f64 };
    match pixel_type {
        PixelType::Float => (scaled(value) as f32).to_bits() as u64,
        PixelType::Double => scaled(value).to_bits(),
        _ => scaled(value) as i64 as u64,
    }
}

// =============================================================================
// FakeReader
// =============================================================================

/// Reader plugin for `.fake` names.
#[derive(Debug, Clone, Default)]
pub struct FakeReader {
    spec: Option<FakeSpec>,
}

impl FakeReader {
    pub const IDENTIFIER: &'static str = "formats.in.FakeReader";

    pub fn new() -> Self {
        Self::default()
    }

    /// The description parsed from the open file name.
    pub fn spec(&self) -> Option<&FakeSpec> {
        self.spec.as_ref()
    }
}

#[async_trait]
impl ReaderPlugin for FakeReader {
    fn identifier(&self) -> &'static str {
        Self::IDENTIFIER
    }

    fn format(&self) -> &'static str {
        FORMAT
    }

    fn suffixes(&self) -> &'static [&'static str] {
        SUFFIXES
    }

    async fn init_file(&mut self, core: &mut ReaderCore, id: &str) -> Result<(), FormatError> {
        let spec = FakeSpec::parse(id)?;
        core.set_core_list(spec.core_list()?);

        core.add_global_meta("Image name", spec.name.as_str());
        core.add_global_meta("Scale factor", spec.scale_factor);
        for series in 0..spec.series {
            let core_index = core.core_list().flattened_index(series, 0)?;
            core.set_core_index(core_index)?;
            core.add_series_meta("Series index", series);
        }
        core.set_core_index(0)?;

        self.spec = Some(spec);
        Ok(())
    }

    async fn open_bytes(
        &mut self,
        core: &mut ReaderCore,
        plane: usize,
        buf: &mut [u8],
        region: Region,
    ) -> Result<(), FormatError> {
        let spec = self
            .spec
            .as_ref()
            .ok_or(FormatError::NotInitialized { operation: "open_bytes" })?;
        let meta = core.current_core()?;
        let pixel_type = meta.pixel_type;
        let bpp = pixel_type.bytes_per_pixel();
        let rgb = meta.rgb_channel_count();
        let interleaved = meta.interleaved;
        let little = meta.little_endian;
        let indexed = meta.indexed;
        let zct = core.zct_coords(plane)?;
        let series = core.series()?;

        let (w, h) = (region.width, region.height);
        for sample in 0..rgb {
            let tags = PlaneTags {
                series,
                plane,
                z: zct.z,
                channel: rgb * zct.c + sample,
                t: zct.t,
            };
            for row in 0..h {
                for col in 0..w {
                    let bits = sample_bits(
                        pixel_type,
                        tags,
                        region.x + col,
                        region.y + row,
                        indexed,
                        spec.scale_factor,
                    );
                    let index = if interleaved {
                        w * rgb * row + rgb * col + sample
                    } else {
                        h * w * sample + w * row + col
                    } * bpp;
                    pack_bytes(bits, &mut buf[index..index + bpp], little);
                }
            }
        }
        Ok(())
    }

    /// There is no file behind a fake name.
    async fn reopen_file(&mut self, _core: &mut ReaderCore) -> Result<(), FormatError> {
        Ok(())
    }

    fn series_used_files(&self, core: &ReaderCore, _series: usize, no_pixels: bool) -> Vec<String> {
        match core.current_file() {
            Some(id) if !no_pixels => vec![id.to_string()],
            _ => Vec::new(),
        }
    }

    fn lookup_table(&self, core: &ReaderCore) -> Option<LookupTable> {
        let spec = self.spec.as_ref()?;
        let meta = core.current_core().ok()?;
        if !meta.indexed {
            return None;
        }
        match meta.pixel_type {
            PixelType::Uint8 => {
                let ramp: Vec<u8> = (0..=u8::MAX).collect();
                Some(LookupTable::Bits8(vec![ramp; spec.lut_length]))
            }
            PixelType::Uint16 => {
                let ramp: Vec<u16> = (0..=u16::MAX).collect();
                Some(LookupTable::Bits16(vec![ramp; spec.lut_length]))
            }
            _ => None,
        }
    }

    fn close(&mut self, file_only: bool) {
        if !file_only {
            self.spec = None;
        }
    }

    fn fresh(&self) -> Box<dyn ReaderPlugin> {
        Box::new(FakeReader::new())
    }
}
