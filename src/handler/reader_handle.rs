use async_trait::async_trait;
use tracing::warn;

use super::{DelegateReader, ImageReader, ReaderWrapper};
use crate::error::FormatError;
use crate::meta::MetadataStore;
use crate::reader::{FormatReader, LookupTable, PlaneReader, ReaderCore, ReaderOptions, Region};

/// Any reader: a concrete format reader or one of the composition layers
/// around one.
///
/// The set of layers is closed, so composition is a tree of this enum rather
/// than an open chain of trait objects. Every variant implements
/// [`PlaneReader`]; the handle forwards to whichever it holds.
pub enum ReaderHandle {
    Direct(FormatReader),
    Fallback(DelegateReader),
    Wrapped(ReaderWrapper),
    Dispatch(ImageReader),
}

impl ReaderHandle {
    fn as_reader(&self) -> &dyn PlaneReader {
        match self {
            ReaderHandle::Direct(r) => r,
            ReaderHandle::Fallback(r) => r,
            ReaderHandle::Wrapped(r) => r,
            ReaderHandle::Dispatch(r) => r,
        }
    }

    fn as_reader_mut(&mut self) -> &mut dyn PlaneReader {
        match self {
            ReaderHandle::Direct(r) => r,
            ReaderHandle::Fallback(r) => r,
            ReaderHandle::Wrapped(r) => r,
            ReaderHandle::Dispatch(r) => r,
        }
    }

    /// Catalog identifier of this layer.
    pub fn identifier(&self) -> &str {
        match self {
            ReaderHandle::Direct(r) => r.identifier(),
            ReaderHandle::Fallback(r) => r.identifier(),
            ReaderHandle::Wrapped(_) => ReaderWrapper::IDENTIFIER,
            ReaderHandle::Dispatch(_) => ImageReader::IDENTIFIER,
        }
    }

    /// The layer directly below this one, following the active delegate or
    /// the selected reader.
    fn next_layer(&self) -> Option<&ReaderHandle> {
        match self {
            ReaderHandle::Direct(_) => None,
            ReaderHandle::Fallback(r) => Some(r.active_reader()),
            ReaderHandle::Wrapped(r) => Some(r.inner()),
            ReaderHandle::Dispatch(r) => r.current_reader(),
        }
    }

    fn next_layer_mut(&mut self) -> Option<&mut ReaderHandle> {
        match self {
            ReaderHandle::Direct(_) => None,
            ReaderHandle::Fallback(r) => Some(r.active_reader_mut()),
            ReaderHandle::Wrapped(r) => Some(r.inner_mut()),
            ReaderHandle::Dispatch(r) => r.current_reader_mut(),
        }
    }

    /// Walk down the chain to the first layer with `identifier`.
    pub fn unwrap(&self, identifier: &str) -> Option<&ReaderHandle> {
        let mut layer = self;
        loop {
            if layer.identifier() == identifier {
                return Some(layer);
            }
            layer = layer.next_layer()?;
        }
    }

    pub fn unwrap_mut(&mut self, identifier: &str) -> Option<&mut ReaderHandle> {
        if self.identifier() == identifier {
            return Some(self);
        }
        self.next_layer_mut()?.unwrap_mut(identifier)
    }

    /// The concrete format reader at the bottom of the chain.
    pub fn format_reader(&self) -> Option<&FormatReader> {
        match self {
            ReaderHandle::Direct(r) => Some(r),
            other => other.next_layer()?.format_reader(),
        }
    }

    /// An unopened chain of the same shape with the same options.
    pub fn duplicate(&self) -> ReaderHandle {
        let mut fresh = match self {
            ReaderHandle::Direct(r) => ReaderHandle::Direct(r.duplicate()),
            ReaderHandle::Fallback(r) => ReaderHandle::Fallback(r.duplicate()),
            ReaderHandle::Wrapped(r) => ReaderHandle::Wrapped(r.duplicate()),
            ReaderHandle::Dispatch(r) => ReaderHandle::Dispatch(r.duplicate()),
        };
        if let Err(e) = fresh.set_options(self.options()) {
            warn!(identifier = self.identifier(), error = %e, "Could not copy reader options");
        }
        fresh
    }
}

impl From<FormatReader> for ReaderHandle {
    fn from(reader: FormatReader) -> Self {
        ReaderHandle::Direct(reader)
    }
}

impl From<DelegateReader> for ReaderHandle {
    fn from(reader: DelegateReader) -> Self {
        ReaderHandle::Fallback(reader)
    }
}

impl From<ReaderWrapper> for ReaderHandle {
    fn from(reader: ReaderWrapper) -> Self {
        ReaderHandle::Wrapped(reader)
    }
}

impl From<ImageReader> for ReaderHandle {
    fn from(reader: ImageReader) -> Self {
        ReaderHandle::Dispatch(reader)
    }
}

#[async_trait]
impl PlaneReader for ReaderHandle {
    fn format(&self) -> &str {
        self.as_reader().format()
    }

    fn suffixes(&self) -> Vec<&'static str> {
        self.as_reader().suffixes()
    }

    async fn is_this_type(&self, name: &str, allow_open: bool) -> bool {
        self.as_reader().is_this_type(name, allow_open).await
    }

    async fn is_this_type_bytes(&self, bytes: &[u8]) -> bool {
        self.as_reader().is_this_type_bytes(bytes).await
    }

    async fn set_id(&mut self, id: &str) -> Result<(), FormatError> {
        self.as_reader_mut().set_id(id).await
    }

    async fn close(&mut self, file_only: bool) -> Result<(), FormatError> {
        self.as_reader_mut().close(file_only).await
    }

    async fn reopen_file(&mut self) -> Result<(), FormatError> {
        self.as_reader_mut().reopen_file().await
    }

    fn current_file(&self) -> Option<&str> {
        self.as_reader().current_file()
    }

    fn options(&self) -> ReaderOptions {
        self.as_reader().options()
    }

    fn set_options(&mut self, options: ReaderOptions) -> Result<(), FormatError> {
        self.as_reader_mut().set_options(options)
    }

    fn set_metadata_store(&mut self, store: Box<dyn MetadataStore>) -> Result<(), FormatError> {
        self.as_reader_mut().set_metadata_store(store)
    }

    fn core(&self) -> Result<&ReaderCore, FormatError> {
        self.as_reader().core()
    }

    fn set_series(&mut self, series: usize) -> Result<(), FormatError> {
        self.as_reader_mut().set_series(series)
    }

    fn set_core_index(&mut self, core_index: usize) -> Result<(), FormatError> {
        self.as_reader_mut().set_core_index(core_index)
    }

    fn set_resolution(&mut self, resolution: usize) -> Result<(), FormatError> {
        self.as_reader_mut().set_resolution(resolution)
    }

    async fn open_bytes_into(
        &mut self,
        plane: usize,
        buf: &mut [u8],
        region: Region,
    ) -> Result<(), FormatError> {
        self.as_reader_mut().open_bytes_into(plane, buf, region).await
    }

    fn lookup_table(&self) -> Result<Option<LookupTable>, FormatError> {
        self.as_reader().lookup_table()
    }

    fn series_used_files(&self, no_pixels: bool) -> Result<Vec<String>, FormatError> {
        self.as_reader().series_used_files(no_pixels)
    }

    fn used_files(&self, no_pixels: bool) -> Result<Vec<String>, FormatError> {
        self.as_reader().used_files(no_pixels)
    }
}

impl std::fmt::Debug for ReaderHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReaderHandle::Direct(r) => f.debug_tuple("Direct").field(r).finish(),
            ReaderHandle::Fallback(r) => f.debug_tuple("Fallback").field(r).finish(),
            ReaderHandle::Wrapped(r) => f.debug_tuple("Wrapped").field(r).finish(),
            ReaderHandle::Dispatch(r) => f.debug_tuple("Dispatch").field(r).finish(),
        }
    }
}
