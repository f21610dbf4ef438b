//! Shared writer state: output handle, metadata retrieve, series cursor and
//! the record of which planes were written.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{FormatError, IoError};
use crate::io::RandomAccessOutput;
use crate::meta::{MetadataStore, PixelsGeometry};

/// Frame rate recorded by formats that store one.
pub const DEFAULT_FRAMES_PER_SECOND: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterOptions {
    /// Input buffers hold interleaved samples
    pub interleaved: bool,
    /// One of the writer's compression types; `None` picks the first
    pub compression: Option<String>,
    pub frames_per_second: u32,
    /// Planes arrive in order, so the writer may stream them
    pub sequential: bool,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            interleaved: false,
            compression: None,
            frames_per_second: DEFAULT_FRAMES_PER_SECOND,
            sequential: false,
        }
    }
}

impl WriterOptions {
    pub fn with_interleaved(mut self, interleaved: bool) -> Self {
        self.interleaved = interleaved;
        self
    }

    pub fn with_compression(mut self, compression: impl Into<String>) -> Self {
        self.compression = Some(compression.into());
        self
    }

    pub fn with_frames_per_second(mut self, fps: u32) -> Self {
        self.frames_per_second = fps;
        self
    }
}

pub struct WriterCore {
    format: &'static str,
    current_id: Option<String>,
    out: Option<RandomAccessOutput>,
    retrieve: Option<Arc<dyn MetadataStore>>,
    series: usize,
    options: WriterOptions,
    written: BTreeSet<(usize, usize)>,
}

impl WriterCore {
    pub fn new(format: &'static str) -> Self {
        Self {
            format,
            current_id: None,
            out: None,
            retrieve: None,
            series: 0,
            options: WriterOptions::default(),
            written: BTreeSet::new(),
        }
    }

    pub fn format(&self) -> &'static str {
        self.format
    }

    pub fn current_file(&self) -> Option<&str> {
        self.current_id.as_deref()
    }

    pub fn is_open(&self) -> bool {
        self.current_id.is_some()
    }

    pub(crate) fn require_open(&self, operation: &'static str) -> Result<(), FormatError> {
        if self.is_open() {
            Ok(())
        } else {
            Err(FormatError::NotInitialized { operation })
        }
    }

    /// Open `id` for writing, truncating it.
    pub(crate) async fn open(&mut self, id: &str) -> Result<(), FormatError> {
        let out = RandomAccessOutput::create(id).await?;
        debug!(format = self.format, id, "Opened output");
        self.current_id = Some(id.to_string());
        self.out = Some(out);
        self.written.clear();
        Ok(())
    }

    /// Flush and release the output.
    pub(crate) async fn close(&mut self) -> Result<(), FormatError> {
        self.current_id = None;
        self.written.clear();
        if let Some(out) = self.out.take() {
            out.close().await?;
        }
        Ok(())
    }

    pub fn output_mut(&mut self) -> Result<&mut RandomAccessOutput, FormatError> {
        let id = self.current_id.clone().unwrap_or_default();
        self.out
            .as_mut()
            .ok_or(FormatError::Io(IoError::Closed(id)))
    }

    // =========================================================================
    // Metadata retrieve
    // =========================================================================

    pub fn set_metadata_retrieve(&mut self, retrieve: Arc<dyn MetadataStore>) {
        self.retrieve = Some(retrieve);
    }

    pub fn metadata_retrieve(&self) -> Option<Arc<dyn MetadataStore>> {
        self.retrieve.clone()
    }

    fn retrieve(&self) -> Result<&dyn MetadataStore, FormatError> {
        self.retrieve
            .as_deref()
            .ok_or(FormatError::NotInitialized {
                operation: "metadata retrieve",
            })
    }

    /// Pixel geometry of the current series, read from the retrieve.
    pub fn geometry(&self) -> Result<PixelsGeometry, FormatError> {
        PixelsGeometry::from_store(self.retrieve()?, self.series)
    }

    // =========================================================================
    // Series and options
    // =========================================================================

    pub fn series(&self) -> usize {
        self.series
    }

    pub fn set_series(&mut self, series: usize) -> Result<(), FormatError> {
        let count = self.retrieve()?.series_count();
        if series >= count {
            return Err(FormatError::invalid_index("series", series, count));
        }
        self.series = series;
        Ok(())
    }

    pub fn options(&self) -> &WriterOptions {
        &self.options
    }

    pub(crate) fn set_options(&mut self, options: WriterOptions) {
        self.options = options;
    }

    // =========================================================================
    // Written planes
    // =========================================================================

    pub(crate) fn mark_written(&mut self, plane: usize) {
        self.written.insert((self.series, plane));
    }

    pub fn is_plane_written(&self, series: usize, plane: usize) -> bool {
        self.written.contains(&(series, plane))
    }

    pub fn written_count(&self) -> usize {
        self.written.len()
    }

    /// Whether every plane of `series` has been written.
    pub fn is_series_complete(&self, series: usize) -> Result<bool, FormatError> {
        let geometry = PixelsGeometry::from_store(self.retrieve()?, series)?;
        Ok((0..geometry.image_count()).all(|plane| self.is_plane_written(series, plane)))
    }
}

impl std::fmt::Debug for WriterCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriterCore")
            .field("format", &self.format)
            .field("current_id", &self.current_id)
            .field("series", &self.series)
            .field("options", &self.options)
            .field("written", &self.written.len())
            .finish()
    }
}
