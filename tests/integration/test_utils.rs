//! Test utilities for integration tests.
//!
//! This module provides a counting mock reader plugin and helpers for
//! writing small PNM files to scratch space.

use async_trait::async_trait;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::NamedTempFile;

use bioimage_formats::error::{FormatError, IoError};
use bioimage_formats::io::RandomAccessStream;
use bioimage_formats::meta::PixelType;
use bioimage_formats::reader::{FormatReader, ReaderCore, ReaderPlugin, Region};
use bioimage_formats::{ReaderCatalog, ReaderHandle};

// =============================================================================
// Counting Mock Reader
// =============================================================================

/// Calls observed by a [`CountingPlugin`] and every fresh copy of it.
#[derive(Debug, Default)]
pub struct CallCounts {
    probes: AtomicUsize,
    inits: AtomicUsize,
}

impl CallCounts {
    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn inits(&self) -> usize {
        self.inits.load(Ordering::SeqCst)
    }
}

/// A reader plugin that claims files by content only and counts how often it
/// is asked.
///
/// Opened files are 8x4 uint8 images with `planes` planes along Z; every
/// pixel of plane `p` has the value `p`.
#[derive(Clone)]
pub struct CountingPlugin {
    identifier: &'static str,
    format: &'static str,
    claims: bool,
    planes: usize,
    counts: Arc<CallCounts>,
}

impl CountingPlugin {
    pub const WIDTH: usize = 8;
    pub const HEIGHT: usize = 4;

    pub fn new(identifier: &'static str, format: &'static str, claims: bool) -> Self {
        Self {
            identifier,
            format,
            claims,
            planes: 2,
            counts: Arc::new(CallCounts::default()),
        }
    }

    pub fn counts(&self) -> Arc<CallCounts> {
        Arc::clone(&self.counts)
    }
}

#[async_trait]
impl ReaderPlugin for CountingPlugin {
    fn identifier(&self) -> &'static str {
        self.identifier
    }

    fn format(&self) -> &'static str {
        self.format
    }

    fn suffixes(&self) -> &'static [&'static str] {
        &["dat"]
    }

    fn suffix_sufficient(&self) -> bool {
        false
    }

    async fn is_this_type_stream(&self, _stream: &mut RandomAccessStream) -> Result<bool, IoError> {
        self.counts.probes.fetch_add(1, Ordering::SeqCst);
        Ok(self.claims)
    }

    async fn init_file(&mut self, core: &mut ReaderCore, _id: &str) -> Result<(), FormatError> {
        self.counts.inits.fetch_add(1, Ordering::SeqCst);
        let meta = core.current_core_mut()?;
        meta.size_x = Self::WIDTH;
        meta.size_y = Self::HEIGHT;
        meta.size_z = self.planes;
        meta.image_count = self.planes;
        meta.pixel_type = PixelType::Uint8;
        core.add_global_meta("Mock", self.identifier);
        Ok(())
    }

    async fn open_bytes(
        &mut self,
        _core: &mut ReaderCore,
        plane: usize,
        buf: &mut [u8],
        region: Region,
    ) -> Result<(), FormatError> {
        let len = region.width * region.height;
        buf[..len].fill(plane as u8);
        Ok(())
    }

    fn fresh(&self) -> Box<dyn ReaderPlugin> {
        Box::new(self.clone())
    }
}

/// A catalog holding `plugins` under their own identifiers.
pub fn mock_catalog(plugins: &[CountingPlugin]) -> ReaderCatalog {
    let mut catalog = ReaderCatalog::new();
    for plugin in plugins {
        let plugin = plugin.clone();
        catalog.register(plugin.identifier, move || {
            ReaderHandle::from(FormatReader::new(plugin.clone()))
        });
    }
    catalog
}

// =============================================================================
// Scratch Files
// =============================================================================

/// Write `data` to a temporary file ending in `.{suffix}`.
pub fn temp_file(data: &[u8], suffix: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(&format!(".{}", suffix))
        .tempfile()
        .unwrap();
    file.write_all(data).unwrap();
    file.flush().unwrap();
    file
}

pub fn path_of(file: &NamedTempFile) -> String {
    file.path().to_string_lossy().into_owned()
}

/// A path inside `dir` that does not exist yet.
pub fn output_path(dir: &tempfile::TempDir, name: &str) -> String {
    dir.path().join(name).to_string_lossy().into_owned()
}

// =============================================================================
// PNM Builders
// =============================================================================

/// Deterministic sample `i` of a test raster.
pub fn sample(i: usize) -> u8 {
    (i * 7 % 251) as u8
}

/// A binary graymap (P5, 8-bit) of `width` x `height` using [`sample`].
pub fn binary_pgm(width: usize, height: usize) -> Vec<u8> {
    let mut data = format!("P5\n{} {}\n255\n", width, height).into_bytes();
    data.extend((0..width * height).map(sample));
    data
}

/// A binary pixmap (P6, 8-bit) of `width` x `height`, interleaved RGB.
pub fn binary_ppm(width: usize, height: usize) -> Vec<u8> {
    let mut data = format!("P6\n{} {}\n255\n", width, height).into_bytes();
    data.extend((0..width * height * 3).map(sample));
    data
}

/// A binary 16-bit graymap; samples are `i * 300`, stored big-endian.
pub fn binary_pgm16(width: usize, height: usize) -> Vec<u8> {
    let mut data = format!("P5\n{} {}\n65535\n", width, height).into_bytes();
    for i in 0..width * height {
        data.extend_from_slice(&((i * 300) as u16).to_be_bytes());
    }
    data
}

/// A plain-text graymap (P2) with the same samples as [`binary_pgm`].
pub fn plain_pgm(width: usize, height: usize) -> Vec<u8> {
    let mut text = format!("P2\n# plain test image\n{} {}\n255\n", width, height);
    for row in 0..height {
        let line: Vec<String> = (0..width)
            .map(|col| sample(row * width + col).to_string())
            .collect();
        text.push_str(&line.join(" "));
        text.push('\n');
    }
    text.into_bytes()
}
