use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::WriterHandle;
use crate::error::FormatError;
use crate::meta::{MetadataStore, PixelType};
use crate::reader::{same_file, Region};
use crate::registry::PluginList;
use crate::writer::{PlaneWriter, WriterCore, WriterOptions};

/// Writer facade that picks the first registered writer whose suffixes match
/// the output name.
pub struct ImageWriter {
    writers: Vec<WriterHandle>,
    current: Option<usize>,
    retrieve: Option<Arc<dyn MetadataStore>>,
    options: WriterOptions,
}

impl ImageWriter {
    pub const IDENTIFIER: &'static str = "formats.out.ImageWriter";

    pub fn new(writers: Vec<WriterHandle>) -> Self {
        Self {
            writers,
            current: None,
            retrieve: None,
            options: WriterOptions::default(),
        }
    }

    pub fn from_list(list: &PluginList<WriterHandle>) -> Self {
        Self::new(list.instantiate())
    }

    pub fn writers(&self) -> &[WriterHandle] {
        &self.writers
    }

    pub fn writer(&self, identifier: &str) -> Option<&WriterHandle> {
        self.writers.iter().find_map(|w| w.unwrap(identifier))
    }

    pub fn current_writer(&self) -> Option<&WriterHandle> {
        self.writers.get(self.current?)
    }

    fn selected(&self) -> Result<&WriterHandle, FormatError> {
        self.current_writer().ok_or(FormatError::NotInitialized {
            operation: "image writer",
        })
    }

    fn selected_mut(&mut self) -> Result<&mut WriterHandle, FormatError> {
        let index = self.current.ok_or(FormatError::NotInitialized {
            operation: "image writer",
        })?;
        Ok(&mut self.writers[index])
    }

    /// Select the writer for `id` by suffix.
    pub fn get_writer(&mut self, id: &str) -> Result<&mut WriterHandle, FormatError> {
        let index = self
            .writers
            .iter()
            .position(|w| w.is_this_type(id))
            .ok_or_else(|| FormatError::UnrecognizedFormat { id: id.to_string() })?;
        debug!(id, writer = self.writers[index].identifier(), "Selected writer");
        self.current = Some(index);
        Ok(&mut self.writers[index])
    }

    pub fn duplicate(&self) -> Self {
        let mut fresh = Self::new(self.writers.iter().map(WriterHandle::duplicate).collect());
        fresh.options = self.options.clone();
        fresh
    }
}

#[async_trait]
impl PlaneWriter for ImageWriter {
    fn format(&self) -> &str {
        match self.current_writer() {
            Some(writer) => writer.format(),
            None => "Image writer",
        }
    }

    fn suffixes(&self) -> Vec<&'static str> {
        let mut suffixes: Vec<&'static str> =
            self.writers.iter().flat_map(|w| w.suffixes()).collect();
        suffixes.sort_unstable();
        suffixes.dedup();
        suffixes
    }

    fn compression_types(&self) -> Vec<&'static str> {
        self.current_writer()
            .map(|w| w.compression_types())
            .unwrap_or_default()
    }

    fn pixel_types(&self, compression: &str) -> Vec<PixelType> {
        self.current_writer()
            .map(|w| w.pixel_types(compression))
            .unwrap_or_default()
    }

    fn can_do_stacks(&self) -> bool {
        self.current_writer().is_some_and(|w| w.can_do_stacks())
    }

    fn core(&self) -> Result<&WriterCore, FormatError> {
        self.selected()?.core()
    }

    fn set_metadata_retrieve(&mut self, retrieve: Arc<dyn MetadataStore>) {
        for writer in &mut self.writers {
            writer.set_metadata_retrieve(retrieve.clone());
        }
        self.retrieve = Some(retrieve);
    }

    fn options(&self) -> WriterOptions {
        self.options.clone()
    }

    /// Options are checked against a writer when one is selected by `set_id`.
    fn set_options(&mut self, options: WriterOptions) -> Result<(), FormatError> {
        if let Some(index) = self.current {
            self.writers[index].set_options(options.clone())?;
        }
        self.options = options;
        Ok(())
    }

    async fn set_id(&mut self, id: &str) -> Result<(), FormatError> {
        if self.current_file().is_some_and(|current| same_file(current, id)) {
            return Ok(());
        }
        let previous = self.current;
        let options = self.options.clone();
        let retrieve = self.retrieve.clone();

        let writer = self.get_writer(id)?;
        if let Some(retrieve) = retrieve {
            writer.set_metadata_retrieve(retrieve);
        }
        writer.set_options(options)?;

        if let Some(previous) = previous.filter(|&p| Some(p) != self.current) {
            self.writers[previous].close().await?;
        }
        self.selected_mut()?.set_id(id).await
    }

    async fn close(&mut self) -> Result<(), FormatError> {
        for writer in &mut self.writers {
            writer.close().await?;
        }
        Ok(())
    }

    fn set_series(&mut self, series: usize) -> Result<(), FormatError> {
        self.selected_mut()?.set_series(series)
    }

    async fn save_bytes(&mut self, plane: usize, buf: &[u8], region: Region) -> Result<(), FormatError> {
        self.selected_mut()?.save_bytes(plane, buf, region).await
    }
}

impl std::fmt::Debug for ImageWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageWriter")
            .field(
                "writers",
                &self.writers.iter().map(WriterHandle::identifier).collect::<Vec<_>>(),
            )
            .field("current", &self.current)
            .finish()
    }
}
