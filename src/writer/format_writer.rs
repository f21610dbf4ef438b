use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{PlaneWriter, WriterCore, WriterOptions, WriterPlugin};
use crate::error::FormatError;
use crate::meta::{MetadataStore, PixelType};
use crate::reader::{same_file, Region};

/// A writer for one concrete format: [`WriterCore`] state driving a
/// [`WriterPlugin`].
pub struct FormatWriter {
    core: WriterCore,
    plugin: Box<dyn WriterPlugin>,
}

impl FormatWriter {
    pub fn new(plugin: impl WriterPlugin + 'static) -> Self {
        Self::from_boxed(Box::new(plugin))
    }

    pub fn from_boxed(plugin: Box<dyn WriterPlugin>) -> Self {
        Self {
            core: WriterCore::new(plugin.format()),
            plugin,
        }
    }

    pub fn identifier(&self) -> &'static str {
        self.plugin.identifier()
    }

    /// An unopened writer of the same format with the same options.
    pub fn duplicate(&self) -> Self {
        let mut writer = Self::from_boxed(self.plugin.fresh());
        writer.core.set_options(self.core.options().clone());
        writer
    }

    /// Validate a save request against the retrieve and the plugin's
    /// capabilities. Checks run in a fixed order so the first problem wins.
    fn check_save_parameters(
        &self,
        plane: usize,
        buf_len: usize,
        region: Region,
    ) -> Result<(), FormatError> {
        self.core.require_open("save bytes")?;
        let geometry = self.core.geometry()?;

        let image_count = geometry.image_count();
        if plane >= image_count {
            return Err(FormatError::invalid_index("plane", plane, image_count));
        }
        if plane > 0 && !self.plugin.can_do_stacks() {
            return Err(FormatError::unsupported(format!(
                "{} stores a single plane per file",
                self.plugin.format()
            )));
        }
        if !region.fits(geometry.size_x, geometry.size_y) {
            return Err(FormatError::InvalidTile {
                x: region.x,
                y: region.y,
                width: region.width,
                height: region.height,
                size_x: geometry.size_x,
                size_y: geometry.size_y,
            });
        }
        if !self.is_supported_type(geometry.pixel_type) {
            return Err(FormatError::unsupported(format!(
                "{} cannot store {} pixels with {} compression",
                self.plugin.format(),
                geometry.pixel_type,
                self.compression().unwrap_or_default()
            )));
        }
        let needed = geometry.plane_size(region.width, region.height)?;
        if buf_len < needed {
            return Err(FormatError::size_mismatch("plane buffer", needed, buf_len));
        }
        Ok(())
    }
}

#[async_trait]
impl PlaneWriter for FormatWriter {
    fn format(&self) -> &str {
        self.plugin.format()
    }

    fn suffixes(&self) -> Vec<&'static str> {
        self.plugin.suffixes().to_vec()
    }

    fn compression_types(&self) -> Vec<&'static str> {
        self.plugin.compression_types().to_vec()
    }

    fn pixel_types(&self, compression: &str) -> Vec<PixelType> {
        self.plugin.pixel_types(compression)
    }

    fn can_do_stacks(&self) -> bool {
        self.plugin.can_do_stacks()
    }

    fn core(&self) -> Result<&WriterCore, FormatError> {
        Ok(&self.core)
    }

    fn set_metadata_retrieve(&mut self, retrieve: Arc<dyn MetadataStore>) {
        self.core.set_metadata_retrieve(retrieve);
    }

    fn options(&self) -> WriterOptions {
        self.core.options().clone()
    }

    fn set_options(&mut self, options: WriterOptions) -> Result<(), FormatError> {
        if let Some(compression) = &options.compression {
            if !self.plugin.compression_types().contains(&compression.as_str()) {
                return Err(FormatError::unsupported(format!(
                    "{} does not support {} compression",
                    self.plugin.format(),
                    compression
                )));
            }
        }
        self.core.set_options(options);
        Ok(())
    }

    async fn set_id(&mut self, id: &str) -> Result<(), FormatError> {
        if self.core.current_file().is_some_and(|current| same_file(current, id)) {
            return Ok(());
        }
        if self.core.is_open() {
            self.close().await?;
        }
        self.core.open(id).await?;
        if let Err(e) = self.plugin.init(&mut self.core).await {
            warn!(format = self.plugin.format(), id, error = %e, "Failed to initialize writer");
            self.core.close().await?;
            return Err(e);
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), FormatError> {
        if !self.core.is_open() {
            return Ok(());
        }
        debug!(
            format = self.plugin.format(),
            planes = self.core.written_count(),
            "Closing writer"
        );
        let finalized = self.plugin.close(&mut self.core).await;
        self.core.close().await?;
        finalized
    }

    fn set_series(&mut self, series: usize) -> Result<(), FormatError> {
        self.core.set_series(series)
    }

    async fn save_bytes(&mut self, plane: usize, buf: &[u8], region: Region) -> Result<(), FormatError> {
        self.check_save_parameters(plane, buf.len(), region)?;
        self.plugin
            .save_bytes(&mut self.core, plane, buf, region)
            .await?;
        self.core.mark_written(plane);
        Ok(())
    }
}

impl std::fmt::Debug for FormatWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormatWriter")
            .field("identifier", &self.plugin.identifier())
            .field("core", &self.core)
            .finish()
    }
}
