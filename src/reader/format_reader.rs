use async_trait::async_trait;
use tracing::{debug, warn};

use super::{
    check_suffix, LookupTable, PlaneReader, ReaderCore, ReaderOptions, ReaderPlugin, Region,
};
use crate::error::FormatError;
use crate::io::RandomAccessStream;
use crate::meta::MetadataStore;

/// Bytes read from the start of a file for content sniffing.
pub const SNIFF_BLOCK_SIZE: usize = 1024;

/// A reader for one concrete format: the generic state machine in
/// [`ReaderCore`] driving a format [`ReaderPlugin`].
pub struct FormatReader {
    core: ReaderCore,
    plugin: Box<dyn ReaderPlugin>,
}

impl FormatReader {
    pub fn new(plugin: impl ReaderPlugin + 'static) -> Self {
        Self::from_boxed(Box::new(plugin))
    }

    pub fn from_boxed(plugin: Box<dyn ReaderPlugin>) -> Self {
        Self {
            core: ReaderCore::new(plugin.format()),
            plugin,
        }
    }

    pub fn identifier(&self) -> &'static str {
        self.plugin.identifier()
    }

    pub fn plugin(&self) -> &dyn ReaderPlugin {
        self.plugin.as_ref()
    }

    /// An unopened reader of the same format with the same options.
    pub fn duplicate(&self) -> Self {
        let plugin = self.plugin.fresh();
        Self {
            core: ReaderCore::with_options(plugin.format(), self.core.options().clone()),
            plugin,
        }
    }

    async fn sniff_stream(&self, stream: &mut RandomAccessStream) -> bool {
        match self.plugin.is_this_type_stream(stream).await {
            Ok(found) => found,
            Err(e) => {
                debug!(format = self.plugin.format(), error = %e, "Content check failed");
                false
            }
        }
    }

    async fn init(&mut self, id: &str) -> Result<(), FormatError> {
        self.core.begin_init(id);
        self.plugin.init_file(&mut self.core, id).await?;
        self.core.finish_init()
    }
}

#[async_trait]
impl PlaneReader for FormatReader {
    fn format(&self) -> &str {
        self.plugin.format()
    }

    fn suffixes(&self) -> Vec<&'static str> {
        self.plugin.suffixes().to_vec()
    }

    async fn is_this_type(&self, name: &str, allow_open: bool) -> bool {
        let suffix_match = check_suffix(name, self.plugin.suffixes());
        if self.plugin.suffix_sufficient() && suffix_match {
            return true;
        }
        if self.plugin.suffix_necessary() && !suffix_match {
            return false;
        }
        if !allow_open {
            return false;
        }
        match RandomAccessStream::open(name).await {
            Ok(mut stream) => self.sniff_stream(&mut stream).await,
            Err(e) => {
                debug!(format = self.plugin.format(), name, error = %e, "Cannot open file for type check");
                false
            }
        }
    }

    async fn is_this_type_bytes(&self, bytes: &[u8]) -> bool {
        let len = bytes.len().min(SNIFF_BLOCK_SIZE);
        let mut stream =
            RandomAccessStream::from_bytes(bytes::Bytes::copy_from_slice(&bytes[..len]), "header");
        self.sniff_stream(&mut stream).await
    }

    async fn set_id(&mut self, id: &str) -> Result<(), FormatError> {
        if self.core.is_current(id) {
            return Ok(());
        }
        if self.core.is_open() {
            self.close(false).await?;
        }
        if let Err(e) = self.init(id).await {
            warn!(format = self.plugin.format(), id, error = %e, "Failed to initialize reader");
            self.close(false).await?;
            return Err(e);
        }
        Ok(())
    }

    async fn close(&mut self, file_only: bool) -> Result<(), FormatError> {
        self.plugin.close(file_only);
        self.core.close(file_only);
        Ok(())
    }

    async fn reopen_file(&mut self) -> Result<(), FormatError> {
        if !self.core.is_open() {
            return Err(FormatError::NotInitialized { operation: "reopen" });
        }
        self.plugin.reopen_file(&mut self.core).await
    }

    fn current_file(&self) -> Option<&str> {
        self.core.current_file()
    }

    fn options(&self) -> ReaderOptions {
        self.core.options().clone()
    }

    fn set_options(&mut self, options: ReaderOptions) -> Result<(), FormatError> {
        self.core.set_options(options)
    }

    fn set_metadata_store(&mut self, store: Box<dyn MetadataStore>) -> Result<(), FormatError> {
        self.core.set_metadata_store(store)
    }

    fn core(&self) -> Result<&ReaderCore, FormatError> {
        Ok(&self.core)
    }

    fn set_series(&mut self, series: usize) -> Result<(), FormatError> {
        self.core.set_series(series)
    }

    fn set_core_index(&mut self, core_index: usize) -> Result<(), FormatError> {
        self.core.set_core_index(core_index)
    }

    fn set_resolution(&mut self, resolution: usize) -> Result<(), FormatError> {
        self.core.set_resolution(resolution)
    }

    async fn open_bytes_into(
        &mut self,
        plane: usize,
        buf: &mut [u8],
        region: Region,
    ) -> Result<(), FormatError> {
        self.core.check_plane_parameters(plane, buf.len(), region)?;
        self.plugin
            .open_bytes(&mut self.core, plane, buf, region)
            .await
    }

    fn lookup_table(&self) -> Result<Option<LookupTable>, FormatError> {
        self.core.current_core()?;
        Ok(self.plugin.lookup_table(&self.core))
    }

    fn series_used_files(&self, no_pixels: bool) -> Result<Vec<String>, FormatError> {
        let series = self.core.series()?;
        Ok(self.plugin.series_used_files(&self.core, series, no_pixels))
    }

    fn used_files(&self, no_pixels: bool) -> Result<Vec<String>, FormatError> {
        let mut files: Vec<String> = Vec::new();
        for series in 0..self.core.series_count()? {
            for file in self.plugin.series_used_files(&self.core, series, no_pixels) {
                if !files.contains(&file) {
                    files.push(file);
                }
            }
        }
        Ok(files)
    }
}

impl std::fmt::Debug for FormatReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormatReader")
            .field("identifier", &self.plugin.identifier())
            .field("core", &self.core)
            .finish()
    }
}
