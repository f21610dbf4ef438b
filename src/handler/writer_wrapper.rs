use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::trace;

use super::WriterHandle;
use crate::error::FormatError;
use crate::meta::{MetadataStore, PixelType};
use crate::reader::Region;
use crate::writer::{PlaneWriter, WriterCore, WriterOptions};

/// Planes and bytes stored through a wrapper.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WriteStats {
    pub planes: u64,
    pub bytes: u64,
}

/// A labelled pass-through writer layer that counts what it stores.
pub struct WriterWrapper {
    label: String,
    inner: Box<WriterHandle>,
    stats: WriteStats,
}

impl WriterWrapper {
    pub const IDENTIFIER: &'static str = "formats.out.WriterWrapper";

    pub fn new(label: impl Into<String>, inner: impl Into<WriterHandle>) -> Self {
        Self {
            label: label.into(),
            inner: Box::new(inner.into()),
            stats: WriteStats::default(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn stats(&self) -> WriteStats {
        self.stats
    }

    pub fn inner(&self) -> &WriterHandle {
        &self.inner
    }

    pub fn duplicate(&self) -> Self {
        Self::new(self.label.clone(), self.inner.duplicate())
    }
}

#[async_trait]
impl PlaneWriter for WriterWrapper {
    fn format(&self) -> &str {
        self.inner.format()
    }

    fn suffixes(&self) -> Vec<&'static str> {
        self.inner.suffixes()
    }

    fn compression_types(&self) -> Vec<&'static str> {
        self.inner.compression_types()
    }

    fn pixel_types(&self, compression: &str) -> Vec<PixelType> {
        self.inner.pixel_types(compression)
    }

    fn can_do_stacks(&self) -> bool {
        self.inner.can_do_stacks()
    }

    fn core(&self) -> Result<&WriterCore, FormatError> {
        self.inner.core()
    }

    fn set_metadata_retrieve(&mut self, retrieve: Arc<dyn MetadataStore>) {
        self.inner.set_metadata_retrieve(retrieve)
    }

    fn options(&self) -> WriterOptions {
        self.inner.options()
    }

    fn set_options(&mut self, options: WriterOptions) -> Result<(), FormatError> {
        self.inner.set_options(options)
    }

    async fn set_id(&mut self, id: &str) -> Result<(), FormatError> {
        self.inner.set_id(id).await
    }

    async fn close(&mut self) -> Result<(), FormatError> {
        self.inner.close().await
    }

    fn set_series(&mut self, series: usize) -> Result<(), FormatError> {
        self.inner.set_series(series)
    }

    async fn save_bytes(&mut self, plane: usize, buf: &[u8], region: Region) -> Result<(), FormatError> {
        self.inner.save_bytes(plane, buf, region).await?;
        self.stats.planes += 1;
        self.stats.bytes += buf.len() as u64;
        trace!(
            label = %self.label,
            plane,
            x = region.x,
            y = region.y,
            width = region.width,
            height = region.height,
            bytes = buf.len(),
            "Stored plane"
        );
        Ok(())
    }
}

impl std::fmt::Debug for WriterWrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriterWrapper")
            .field("label", &self.label)
            .field("stats", &self.stats)
            .field("inner", &self.inner)
            .finish()
    }
}
