use async_trait::async_trait;
use serde::Serialize;
use tracing::trace;

use super::ReaderHandle;
use crate::error::FormatError;
use crate::meta::MetadataStore;
use crate::reader::{LookupTable, PlaneReader, ReaderCore, ReaderOptions, Region};

/// Planes and bytes served by a wrapper.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReadStats {
    pub planes: u64,
    pub bytes: u64,
}

/// A labelled pass-through layer that counts what it serves.
pub struct ReaderWrapper {
    label: String,
    inner: Box<ReaderHandle>,
    stats: ReadStats,
}

impl ReaderWrapper {
    pub const IDENTIFIER: &'static str = "formats.in.ReaderWrapper";

    pub fn new(label: impl Into<String>, inner: impl Into<ReaderHandle>) -> Self {
        Self {
            label: label.into(),
            inner: Box::new(inner.into()),
            stats: ReadStats::default(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn stats(&self) -> ReadStats {
        self.stats
    }

    pub fn inner(&self) -> &ReaderHandle {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut ReaderHandle {
        &mut self.inner
    }

    pub fn into_inner(self) -> ReaderHandle {
        *self.inner
    }

    pub fn duplicate(&self) -> Self {
        Self::new(self.label.clone(), self.inner.duplicate())
    }
}

#[async_trait]
impl PlaneReader for ReaderWrapper {
    fn format(&self) -> &str {
        self.inner.format()
    }

    fn suffixes(&self) -> Vec<&'static str> {
        self.inner.suffixes()
    }

    async fn is_this_type(&self, name: &str, allow_open: bool) -> bool {
        self.inner.is_this_type(name, allow_open).await
    }

    async fn is_this_type_bytes(&self, bytes: &[u8]) -> bool {
        self.inner.is_this_type_bytes(bytes).await
    }

    async fn set_id(&mut self, id: &str) -> Result<(), FormatError> {
        self.inner.set_id(id).await
    }

    async fn close(&mut self, file_only: bool) -> Result<(), FormatError> {
        self.inner.close(file_only).await
    }

    async fn reopen_file(&mut self) -> Result<(), FormatError> {
        self.inner.reopen_file().await
    }

    fn current_file(&self) -> Option<&str> {
        self.inner.current_file()
    }

    fn options(&self) -> ReaderOptions {
        self.inner.options()
    }

    fn set_options(&mut self, options: ReaderOptions) -> Result<(), FormatError> {
        self.inner.set_options(options)
    }

    fn set_metadata_store(&mut self, store: Box<dyn MetadataStore>) -> Result<(), FormatError> {
        self.inner.set_metadata_store(store)
    }

    fn core(&self) -> Result<&ReaderCore, FormatError> {
        self.inner.core()
    }

    fn set_series(&mut self, series: usize) -> Result<(), FormatError> {
        self.inner.set_series(series)
    }

    fn set_core_index(&mut self, core_index: usize) -> Result<(), FormatError> {
        self.inner.set_core_index(core_index)
    }

    fn set_resolution(&mut self, resolution: usize) -> Result<(), FormatError> {
        self.inner.set_resolution(resolution)
    }

    async fn open_bytes_into(
        &mut self,
        plane: usize,
        buf: &mut [u8],
        region: Region,
    ) -> Result<(), FormatError> {
        self.inner.open_bytes_into(plane, buf, region).await?;
        let bytes = self.inner.core()?.plane_size(region.width, region.height)?;
        self.stats.planes += 1;
        self.stats.bytes += bytes as u64;
        trace!(
            label = %self.label,
            plane,
            x = region.x,
            y = region.y,
            width = region.width,
            height = region.height,
            bytes,
            "Served plane"
        );
        Ok(())
    }

    fn lookup_table(&self) -> Result<Option<LookupTable>, FormatError> {
        self.inner.lookup_table()
    }

    fn series_used_files(&self, no_pixels: bool) -> Result<Vec<String>, FormatError> {
        self.inner.series_used_files(no_pixels)
    }

    fn used_files(&self, no_pixels: bool) -> Result<Vec<String>, FormatError> {
        self.inner.used_files(no_pixels)
    }
}

impl std::fmt::Debug for ReaderWrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReaderWrapper")
            .field("label", &self.label)
            .field("stats", &self.stats)
            .field("inner", &self.inner)
            .finish()
    }
}
