use async_trait::async_trait;
use tracing::{debug, warn};

use super::ReaderHandle;
use crate::error::FormatError;
use crate::meta::MetadataStore;
use crate::reader::{LookupTable, PlaneReader, ReaderCore, ReaderOptions, Region};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Candidate {
    Native,
    Legacy,
}

/// A reader with two implementations of the same format.
///
/// `set_id` tries the preferred candidate first and falls back to the other
/// one; every later call goes to whichever succeeded. Type detection always
/// uses the native candidate.
pub struct DelegateReader {
    identifier: &'static str,
    native: Box<ReaderHandle>,
    legacy: Box<ReaderHandle>,
    prefer_legacy: bool,
    active: Option<Candidate>,
}

impl DelegateReader {
    pub fn new(
        identifier: &'static str,
        native: impl Into<ReaderHandle>,
        legacy: impl Into<ReaderHandle>,
    ) -> Self {
        Self {
            identifier,
            native: Box::new(native.into()),
            legacy: Box::new(legacy.into()),
            prefer_legacy: false,
            active: None,
        }
    }

    pub fn identifier(&self) -> &'static str {
        self.identifier
    }

    pub fn prefers_legacy(&self) -> bool {
        self.prefer_legacy
    }

    /// Try the legacy candidate first. Only allowed while no file is open.
    pub fn set_prefer_legacy(&mut self, prefer_legacy: bool) -> Result<(), FormatError> {
        if let Some(current) = self.current_file() {
            return Err(FormatError::InvalidState {
                current: current.to_string(),
            });
        }
        self.prefer_legacy = prefer_legacy;
        Ok(())
    }

    /// Whether the open file is being read by the legacy candidate.
    pub fn using_legacy(&self) -> bool {
        self.active == Some(Candidate::Legacy)
    }

    pub fn native(&self) -> &ReaderHandle {
        &self.native
    }

    pub fn legacy(&self) -> &ReaderHandle {
        &self.legacy
    }

    /// The candidate serving calls: the one that opened the file, otherwise
    /// the native one.
    pub fn active_reader(&self) -> &ReaderHandle {
        match self.active {
            Some(Candidate::Legacy) => &self.legacy,
            _ => &self.native,
        }
    }

    pub fn active_reader_mut(&mut self) -> &mut ReaderHandle {
        match self.active {
            Some(Candidate::Legacy) => &mut self.legacy,
            _ => &mut self.native,
        }
    }

    fn candidate_mut(&mut self, candidate: Candidate) -> &mut ReaderHandle {
        match candidate {
            Candidate::Native => &mut self.native,
            Candidate::Legacy => &mut self.legacy,
        }
    }

    fn opened(&self) -> Result<&ReaderHandle, FormatError> {
        match self.active {
            Some(_) => Ok(self.active_reader()),
            None => Err(FormatError::NotInitialized {
                operation: "delegate reader",
            }),
        }
    }

    fn opened_mut(&mut self) -> Result<&mut ReaderHandle, FormatError> {
        match self.active {
            Some(_) => Ok(self.active_reader_mut()),
            None => Err(FormatError::NotInitialized {
                operation: "delegate reader",
            }),
        }
    }

    pub fn duplicate(&self) -> Self {
        Self {
            identifier: self.identifier,
            native: Box::new(self.native.duplicate()),
            legacy: Box::new(self.legacy.duplicate()),
            prefer_legacy: self.prefer_legacy,
            active: None,
        }
    }
}

#[async_trait]
impl PlaneReader for DelegateReader {
    fn format(&self) -> &str {
        self.active_reader().format()
    }

    fn suffixes(&self) -> Vec<&'static str> {
        self.native.suffixes()
    }

    async fn is_this_type(&self, name: &str, allow_open: bool) -> bool {
        self.native.is_this_type(name, allow_open).await
    }

    async fn is_this_type_bytes(&self, bytes: &[u8]) -> bool {
        self.native.is_this_type_bytes(bytes).await
    }

    async fn set_id(&mut self, id: &str) -> Result<(), FormatError> {
        let open_on_id = self.active.is_some()
            && self
                .active_reader()
                .core()
                .is_ok_and(|core| core.is_current(id));
        if open_on_id {
            return Ok(());
        }
        self.close(false).await?;

        let (first, second) = if self.prefer_legacy {
            (Candidate::Legacy, Candidate::Native)
        } else {
            (Candidate::Native, Candidate::Legacy)
        };

        let preferred = match self.candidate_mut(first).set_id(id).await {
            Ok(()) => {
                self.active = Some(first);
                return Ok(());
            }
            Err(e) => e,
        };
        warn!(
            identifier = self.identifier,
            id,
            error = %preferred,
            "Preferred reader failed; trying fallback"
        );

        match self.candidate_mut(second).set_id(id).await {
            Ok(()) => {
                debug!(identifier = self.identifier, id, candidate = ?second, "Fallback reader opened file");
                self.active = Some(second);
                Ok(())
            }
            Err(fallback) => Err(FormatError::DelegateFailed {
                preferred: Box::new(preferred),
                fallback: Box::new(fallback),
            }),
        }
    }

    async fn close(&mut self, file_only: bool) -> Result<(), FormatError> {
        self.native.close(file_only).await?;
        self.legacy.close(file_only).await?;
        if !file_only {
            self.active = None;
        }
        Ok(())
    }

    async fn reopen_file(&mut self) -> Result<(), FormatError> {
        self.opened_mut()?.reopen_file().await
    }

    fn current_file(&self) -> Option<&str> {
        self.active
            .and_then(|_| self.active_reader().current_file())
    }

    fn options(&self) -> ReaderOptions {
        self.native.options()
    }

    fn set_options(&mut self, options: ReaderOptions) -> Result<(), FormatError> {
        self.native.set_options(options.clone())?;
        self.legacy.set_options(options)
    }

    fn set_metadata_store(&mut self, store: Box<dyn MetadataStore>) -> Result<(), FormatError> {
        self.legacy.set_metadata_store(store.clone_store())?;
        self.native.set_metadata_store(store)
    }

    fn core(&self) -> Result<&ReaderCore, FormatError> {
        self.opened()?.core()
    }

    fn set_series(&mut self, series: usize) -> Result<(), FormatError> {
        self.opened_mut()?.set_series(series)
    }

    fn set_core_index(&mut self, core_index: usize) -> Result<(), FormatError> {
        self.opened_mut()?.set_core_index(core_index)
    }

    fn set_resolution(&mut self, resolution: usize) -> Result<(), FormatError> {
        self.opened_mut()?.set_resolution(resolution)
    }

    async fn open_bytes_into(
        &mut self,
        plane: usize,
        buf: &mut [u8],
        region: Region,
    ) -> Result<(), FormatError> {
        self.opened_mut()?.open_bytes_into(plane, buf, region).await
    }

    fn lookup_table(&self) -> Result<Option<LookupTable>, FormatError> {
        self.opened()?.lookup_table()
    }

    fn series_used_files(&self, no_pixels: bool) -> Result<Vec<String>, FormatError> {
        self.opened()?.series_used_files(no_pixels)
    }

    fn used_files(&self, no_pixels: bool) -> Result<Vec<String>, FormatError> {
        self.opened()?.used_files(no_pixels)
    }
}

impl std::fmt::Debug for DelegateReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DelegateReader")
            .field("identifier", &self.identifier)
            .field("prefer_legacy", &self.prefer_legacy)
            .field("active", &self.active)
            .finish()
    }
}
