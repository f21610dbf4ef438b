use async_trait::async_trait;
use tracing::debug;

use super::ReaderHandle;
use crate::error::FormatError;
use crate::meta::MetadataStore;
use crate::reader::{LookupTable, PlaneReader, ReaderCore, ReaderOptions, Region};
use crate::registry::PluginList;

/// Suffix of partially transferred files, which are never recognized.
const PARTIAL_SUFFIX: &str = ".filepart";

fn is_partial(id: &str) -> bool {
    id.to_lowercase().ends_with(PARTIAL_SUFFIX)
}

/// Reader facade that picks the first registered reader claiming a file.
///
/// Readers are probed in registration order. The selection is remembered
/// per path, so opening the same path again does not probe again.
pub struct ImageReader {
    readers: Vec<ReaderHandle>,
    current: Option<usize>,
    probed_id: Option<String>,
    allow_open: bool,
    options: ReaderOptions,
}

impl ImageReader {
    pub const IDENTIFIER: &'static str = "formats.in.ImageReader";

    pub fn new(readers: Vec<ReaderHandle>) -> Self {
        Self {
            readers,
            current: None,
            probed_id: None,
            allow_open: true,
            options: ReaderOptions::default(),
        }
    }

    /// A facade over fresh instances of every reader in `list`.
    pub fn from_list(list: &PluginList<ReaderHandle>) -> Self {
        Self::new(list.instantiate())
    }

    /// Whether type detection may open files to inspect their content.
    pub fn allow_open_files(&self) -> bool {
        self.allow_open
    }

    pub fn set_allow_open_files(&mut self, allow_open: bool) {
        self.allow_open = allow_open;
    }

    pub fn readers(&self) -> &[ReaderHandle] {
        &self.readers
    }

    /// The registered reader whose chain contains `identifier`.
    pub fn reader(&self, identifier: &str) -> Option<&ReaderHandle> {
        self.readers.iter().find_map(|r| r.unwrap(identifier))
    }

    pub fn current_reader(&self) -> Option<&ReaderHandle> {
        self.readers.get(self.current?)
    }

    pub fn current_reader_mut(&mut self) -> Option<&mut ReaderHandle> {
        self.readers.get_mut(self.current?)
    }

    fn selected(&self) -> Result<&ReaderHandle, FormatError> {
        self.current_reader().ok_or(FormatError::NotInitialized {
            operation: "image reader",
        })
    }

    fn selected_mut(&mut self) -> Result<&mut ReaderHandle, FormatError> {
        self.current_reader_mut().ok_or(FormatError::NotInitialized {
            operation: "image reader",
        })
    }

    /// Select the reader for `id`, probing only when `id` differs from the
    /// last probed path.
    pub async fn get_handler(&mut self, id: &str) -> Result<&mut ReaderHandle, FormatError> {
        if is_partial(id) {
            return Err(FormatError::UnrecognizedFormat { id: id.to_string() });
        }
        if self.probed_id.as_deref() != Some(id) || self.current.is_none() {
            let mut found = None;
            for (index, reader) in self.readers.iter().enumerate() {
                if reader.is_this_type(id, self.allow_open).await {
                    found = Some(index);
                    break;
                }
            }
            let Some(index) = found else {
                return Err(FormatError::UnrecognizedFormat { id: id.to_string() });
            };
            debug!(id, reader = self.readers[index].identifier(), "Selected reader");
            if let Some(previous) = self.current.filter(|&previous| previous != index) {
                self.readers[previous].close(false).await?;
            }
            self.current = Some(index);
            self.probed_id = Some(id.to_string());
        }
        self.selected_mut()
    }

    /// Format name of the reader that would open `id`.
    pub async fn get_format(&mut self, id: &str) -> Result<String, FormatError> {
        Ok(self.get_handler(id).await?.format().to_string())
    }

    pub fn duplicate(&self) -> Self {
        let mut fresh = Self::new(self.readers.iter().map(ReaderHandle::duplicate).collect());
        fresh.allow_open = self.allow_open;
        fresh.options = self.options.clone();
        fresh
    }
}

#[async_trait]
impl PlaneReader for ImageReader {
    fn format(&self) -> &str {
        match self.current_reader() {
            Some(reader) => reader.format(),
            None => "Image reader",
        }
    }

    /// Every suffix any registered reader claims, sorted and deduplicated.
    fn suffixes(&self) -> Vec<&'static str> {
        let mut suffixes: Vec<&'static str> =
            self.readers.iter().flat_map(|r| r.suffixes()).collect();
        suffixes.sort_unstable();
        suffixes.dedup();
        suffixes
    }

    async fn is_this_type(&self, name: &str, allow_open: bool) -> bool {
        if is_partial(name) {
            return false;
        }
        for reader in &self.readers {
            if reader.is_this_type(name, allow_open).await {
                return true;
            }
        }
        false
    }

    async fn is_this_type_bytes(&self, bytes: &[u8]) -> bool {
        for reader in &self.readers {
            if reader.is_this_type_bytes(bytes).await {
                return true;
            }
        }
        false
    }

    async fn set_id(&mut self, id: &str) -> Result<(), FormatError> {
        self.get_handler(id).await?.set_id(id).await
    }

    async fn close(&mut self, file_only: bool) -> Result<(), FormatError> {
        for reader in &mut self.readers {
            reader.close(file_only).await?;
        }
        if !file_only {
            self.probed_id = None;
        }
        Ok(())
    }

    async fn reopen_file(&mut self) -> Result<(), FormatError> {
        self.selected_mut()?.reopen_file().await
    }

    fn current_file(&self) -> Option<&str> {
        self.current_reader()?.current_file()
    }

    fn options(&self) -> ReaderOptions {
        self.options.clone()
    }

    fn set_options(&mut self, options: ReaderOptions) -> Result<(), FormatError> {
        if let Some(current) = self.current_file() {
            return Err(FormatError::InvalidState {
                current: current.to_string(),
            });
        }
        for reader in &mut self.readers {
            reader.set_options(options.clone())?;
        }
        self.options = options;
        Ok(())
    }

    fn set_metadata_store(&mut self, store: Box<dyn MetadataStore>) -> Result<(), FormatError> {
        if let Some(current) = self.current_file() {
            return Err(FormatError::InvalidState {
                current: current.to_string(),
            });
        }
        for reader in &mut self.readers {
            reader.set_metadata_store(store.clone_store())?;
        }
        Ok(())
    }

    fn core(&self) -> Result<&ReaderCore, FormatError> {
        self.selected()?.core()
    }

    fn set_series(&mut self, series: usize) -> Result<(), FormatError> {
        self.selected_mut()?.set_series(series)
    }

    fn set_core_index(&mut self, core_index: usize) -> Result<(), FormatError> {
        self.selected_mut()?.set_core_index(core_index)
    }

    fn set_resolution(&mut self, resolution: usize) -> Result<(), FormatError> {
        self.selected_mut()?.set_resolution(resolution)
    }

    async fn open_bytes_into(
        &mut self,
        plane: usize,
        buf: &mut [u8],
        region: Region,
    ) -> Result<(), FormatError> {
        self.selected_mut()?.open_bytes_into(plane, buf, region).await
    }

    fn lookup_table(&self) -> Result<Option<LookupTable>, FormatError> {
        self.selected()?.lookup_table()
    }

    fn series_used_files(&self, no_pixels: bool) -> Result<Vec<String>, FormatError> {
        self.selected()?.series_used_files(no_pixels)
    }

    fn used_files(&self, no_pixels: bool) -> Result<Vec<String>, FormatError> {
        self.selected()?.used_files(no_pixels)
    }
}

impl std::fmt::Debug for ImageReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageReader")
            .field(
                "readers",
                &self.readers.iter().map(ReaderHandle::identifier).collect::<Vec<_>>(),
            )
            .field("current", &self.current)
            .field("probed_id", &self.probed_id)
            .finish()
    }
}
