use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use super::{ImageWriter, WriterWrapper};
use crate::error::FormatError;
use crate::meta::{MetadataStore, PixelType};
use crate::reader::Region;
use crate::writer::{FormatWriter, PlaneWriter, WriterCore, WriterOptions};

/// Any writer: a concrete format writer or a composition layer around one.
pub enum WriterHandle {
    Direct(FormatWriter),
    Wrapped(WriterWrapper),
    Dispatch(ImageWriter),
}

impl WriterHandle {
    fn as_writer(&self) -> &dyn PlaneWriter {
        match self {
            WriterHandle::Direct(w) => w,
            WriterHandle::Wrapped(w) => w,
            WriterHandle::Dispatch(w) => w,
        }
    }

    fn as_writer_mut(&mut self) -> &mut dyn PlaneWriter {
        match self {
            WriterHandle::Direct(w) => w,
            WriterHandle::Wrapped(w) => w,
            WriterHandle::Dispatch(w) => w,
        }
    }

    pub fn identifier(&self) -> &str {
        match self {
            WriterHandle::Direct(w) => w.identifier(),
            WriterHandle::Wrapped(_) => WriterWrapper::IDENTIFIER,
            WriterHandle::Dispatch(_) => ImageWriter::IDENTIFIER,
        }
    }

    fn next_layer(&self) -> Option<&WriterHandle> {
        match self {
            WriterHandle::Direct(_) => None,
            WriterHandle::Wrapped(w) => Some(w.inner()),
            WriterHandle::Dispatch(w) => w.current_writer(),
        }
    }

    /// Walk down the chain to the first layer with `identifier`.
    pub fn unwrap(&self, identifier: &str) -> Option<&WriterHandle> {
        let mut layer = self;
        loop {
            if layer.identifier() == identifier {
                return Some(layer);
            }
            layer = layer.next_layer()?;
        }
    }

    /// An unopened chain of the same shape with the same options.
    pub fn duplicate(&self) -> WriterHandle {
        let mut fresh = match self {
            WriterHandle::Direct(w) => WriterHandle::Direct(w.duplicate()),
            WriterHandle::Wrapped(w) => WriterHandle::Wrapped(w.duplicate()),
            WriterHandle::Dispatch(w) => WriterHandle::Dispatch(w.duplicate()),
        };
        if let Err(e) = fresh.set_options(self.options()) {
            warn!(identifier = self.identifier(), error = %e, "Could not copy writer options");
        }
        fresh
    }
}

impl From<FormatWriter> for WriterHandle {
    fn from(writer: FormatWriter) -> Self {
        WriterHandle::Direct(writer)
    }
}

impl From<WriterWrapper> for WriterHandle {
    fn from(writer: WriterWrapper) -> Self {
        WriterHandle::Wrapped(writer)
    }
}

impl From<ImageWriter> for WriterHandle {
    fn from(writer: ImageWriter) -> Self {
        WriterHandle::Dispatch(writer)
    }
}

#[async_trait]
impl PlaneWriter for WriterHandle {
    fn format(&self) -> &str {
        self.as_writer().format()
    }

    fn suffixes(&self) -> Vec<&'static str> {
        self.as_writer().suffixes()
    }

    fn compression_types(&self) -> Vec<&'static str> {
        self.as_writer().compression_types()
    }

    fn pixel_types(&self, compression: &str) -> Vec<PixelType> {
        self.as_writer().pixel_types(compression)
    }

    fn can_do_stacks(&self) -> bool {
        self.as_writer().can_do_stacks()
    }

    fn core(&self) -> Result<&WriterCore, FormatError> {
        self.as_writer().core()
    }

    fn set_metadata_retrieve(&mut self, retrieve: Arc<dyn MetadataStore>) {
        self.as_writer_mut().set_metadata_retrieve(retrieve)
    }

    fn options(&self) -> WriterOptions {
        self.as_writer().options()
    }

    fn set_options(&mut self, options: WriterOptions) -> Result<(), FormatError> {
        self.as_writer_mut().set_options(options)
    }

    async fn set_id(&mut self, id: &str) -> Result<(), FormatError> {
        self.as_writer_mut().set_id(id).await
    }

    async fn close(&mut self) -> Result<(), FormatError> {
        self.as_writer_mut().close().await
    }

    fn set_series(&mut self, series: usize) -> Result<(), FormatError> {
        self.as_writer_mut().set_series(series)
    }

    async fn save_bytes(&mut self, plane: usize, buf: &[u8], region: Region) -> Result<(), FormatError> {
        self.as_writer_mut().save_bytes(plane, buf, region).await
    }
}

impl std::fmt::Debug for WriterHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WriterHandle::Direct(w) => f.debug_tuple("Direct").field(w).finish(),
            WriterHandle::Wrapped(w) => f.debug_tuple("Wrapped").field(w).finish(),
            WriterHandle::Dispatch(w) => f.debug_tuple("Dispatch").field(w).finish(),
        }
    }
}
