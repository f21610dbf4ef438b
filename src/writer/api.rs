use std::sync::Arc;

use async_trait::async_trait;

use super::{WriterCore, WriterOptions};
use crate::error::FormatError;
use crate::meta::{MetadataStore, PixelType};
use crate::reader::{check_suffix, Region};

/// The public writer contract, implemented by [`FormatWriter`](super::FormatWriter)
/// and the writer composition layers.
#[async_trait]
pub trait PlaneWriter: Send + Sync {
    fn format(&self) -> &str;

    fn suffixes(&self) -> Vec<&'static str>;

    fn compression_types(&self) -> Vec<&'static str>;

    fn pixel_types(&self, compression: &str) -> Vec<PixelType>;

    fn can_do_stacks(&self) -> bool;

    /// State of the writer that holds the open output.
    fn core(&self) -> Result<&WriterCore, FormatError>;

    fn set_metadata_retrieve(&mut self, retrieve: Arc<dyn MetadataStore>);

    fn options(&self) -> WriterOptions;

    /// Replace the options. The compression must be one this writer declares.
    fn set_options(&mut self, options: WriterOptions) -> Result<(), FormatError>;

    /// Open `id` for writing. A no-op when `id` is already open.
    async fn set_id(&mut self, id: &str) -> Result<(), FormatError>;

    /// Finalize and close the output.
    async fn close(&mut self) -> Result<(), FormatError>;

    fn set_series(&mut self, series: usize) -> Result<(), FormatError>;

    /// Store `region` of `plane` in the current series.
    async fn save_bytes(&mut self, plane: usize, buf: &[u8], region: Region) -> Result<(), FormatError>;

    // =========================================================================
    // Provided
    // =========================================================================

    fn is_this_type(&self, name: &str) -> bool {
        check_suffix(name, &self.suffixes())
    }

    /// Store a whole plane.
    async fn save_plane(&mut self, plane: usize, buf: &[u8]) -> Result<(), FormatError> {
        let geometry = self.core()?.geometry()?;
        self.save_bytes(plane, buf, Region::full(geometry.size_x, geometry.size_y))
            .await
    }

    /// Compression in effect: the configured one, or the first declared.
    fn compression(&self) -> Option<String> {
        self.options().compression.or_else(|| {
            self.compression_types()
                .first()
                .map(|c| c.to_string())
        })
    }

    fn is_supported_type(&self, pixel_type: PixelType) -> bool {
        self.compression()
            .is_some_and(|c| self.pixel_types(&c).contains(&pixel_type))
    }

    fn current_file(&self) -> Option<&str> {
        self.core().ok()?.current_file()
    }

    fn series(&self) -> usize {
        self.core().map(WriterCore::series).unwrap_or(0)
    }

    fn metadata_retrieve(&self) -> Option<Arc<dyn MetadataStore>> {
        self.core().ok()?.metadata_retrieve()
    }

    fn is_plane_written(&self, series: usize, plane: usize) -> bool {
        self.core()
            .is_ok_and(|core| core.is_plane_written(series, plane))
    }
}
