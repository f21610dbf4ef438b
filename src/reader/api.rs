use async_trait::async_trait;
use bytes::Bytes;

use super::{LookupTable, ReaderCore, ReaderOptions, Region};
use crate::dimension::{Axis, DimensionOrder, Modulo, ModuloCoords, Zct};
use crate::error::FormatError;
use crate::meta::{CoreMetadata, MetadataStore, MetadataTable, MetadataValue, PixelType};

/// The public reader contract.
///
/// Implemented by a single-format [`FormatReader`](super::FormatReader) and by
/// every composition layer built around one. Layers only implement the state
/// changing operations; the structural accessors are provided and delegate
/// through [`PlaneReader::core`] to the reader that holds the file.
#[async_trait]
pub trait PlaneReader: Send + Sync {
    // =========================================================================
    // Identity and type detection
    // =========================================================================

    /// Format name of the reader that handles (or would handle) the file.
    fn format(&self) -> &str;

    fn suffixes(&self) -> Vec<&'static str>;

    /// Whether `name` is a file of this type. With `allow_open` the file may
    /// be opened and sniffed.
    async fn is_this_type(&self, name: &str, allow_open: bool) -> bool;

    /// Whether a file starting with `bytes` is of this type.
    async fn is_this_type_bytes(&self, bytes: &[u8]) -> bool;

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Open `id` and parse its metadata. A no-op when `id` is already open.
    async fn set_id(&mut self, id: &str) -> Result<(), FormatError>;

    /// Close the file. With `file_only` the parsed metadata stays available
    /// and [`reopen_file`](Self::reopen_file) restores pixel access.
    async fn close(&mut self, file_only: bool) -> Result<(), FormatError>;

    async fn reopen_file(&mut self) -> Result<(), FormatError>;

    fn current_file(&self) -> Option<&str>;

    // =========================================================================
    // Configuration
    // =========================================================================

    fn options(&self) -> ReaderOptions;

    /// Replace the options. Fails with `InvalidState` while a file is open.
    fn set_options(&mut self, options: ReaderOptions) -> Result<(), FormatError>;

    /// Replace the metadata store. Fails with `InvalidState` while a file is open.
    fn set_metadata_store(&mut self, store: Box<dyn MetadataStore>) -> Result<(), FormatError>;

    // =========================================================================
    // State and pixels
    // =========================================================================

    /// State of the reader that holds the open file.
    fn core(&self) -> Result<&ReaderCore, FormatError>;

    fn set_series(&mut self, series: usize) -> Result<(), FormatError>;

    fn set_core_index(&mut self, core_index: usize) -> Result<(), FormatError>;

    fn set_resolution(&mut self, resolution: usize) -> Result<(), FormatError>;

    /// Read `region` of `plane` in the current series into `buf`.
    async fn open_bytes_into(
        &mut self,
        plane: usize,
        buf: &mut [u8],
        region: Region,
    ) -> Result<(), FormatError>;

    fn lookup_table(&self) -> Result<Option<LookupTable>, FormatError>;

    /// Files needed to read the current series.
    fn series_used_files(&self, no_pixels: bool) -> Result<Vec<String>, FormatError>;

    /// Files needed to read the whole dataset, without duplicates.
    fn used_files(&self, no_pixels: bool) -> Result<Vec<String>, FormatError>;

    // =========================================================================
    // Provided
    // =========================================================================

    /// Read `region` of `plane` into a new buffer.
    async fn open_bytes(&mut self, plane: usize, region: Region) -> Result<Bytes, FormatError> {
        let core = self.core()?;
        core.check_region(plane, region)?;
        let size = core.plane_size(region.width, region.height)?;
        let mut buf = vec![0u8; size];
        self.open_bytes_into(plane, &mut buf, region).await?;
        Ok(Bytes::from(buf))
    }

    /// Read the whole of `plane`.
    async fn open_plane(&mut self, plane: usize) -> Result<Bytes, FormatError> {
        let core = self.core()?;
        let region = Region::full(core.size_x()?, core.size_y()?);
        self.open_bytes(plane, region).await
    }

    fn is_open(&self) -> bool {
        self.current_file().is_some()
    }

    fn metadata_store(&self) -> Result<&dyn MetadataStore, FormatError> {
        Ok(self.core()?.store())
    }

    fn current_core(&self) -> Result<&CoreMetadata, FormatError> {
        self.core()?.current_core()
    }

    fn core_metadata_list(&self) -> Result<Vec<CoreMetadata>, FormatError> {
        Ok(self.core()?.core_list().flatten())
    }

    fn series_count(&self) -> Result<usize, FormatError> {
        self.core()?.series_count()
    }

    fn series(&self) -> Result<usize, FormatError> {
        self.core()?.series()
    }

    fn core_index(&self) -> Result<usize, FormatError> {
        self.core()?.core_index()
    }

    fn resolution_count(&self) -> Result<usize, FormatError> {
        self.core()?.resolution_count()
    }

    fn resolution(&self) -> Result<usize, FormatError> {
        self.core()?.resolution()
    }

    fn series_to_core_index(&self, series: usize) -> Result<usize, FormatError> {
        self.core()?.series_to_core_index(series)
    }

    fn core_index_to_series(&self, core_index: usize) -> Result<usize, FormatError> {
        self.core()?.core_index_to_series(core_index)
    }

    fn size_x(&self) -> Result<usize, FormatError> {
        self.core()?.size_x()
    }

    fn size_y(&self) -> Result<usize, FormatError> {
        self.core()?.size_y()
    }

    fn size_z(&self) -> Result<usize, FormatError> {
        self.core()?.size_z()
    }

    fn size_c(&self) -> Result<usize, FormatError> {
        self.core()?.size_c()
    }

    fn size_t(&self) -> Result<usize, FormatError> {
        self.core()?.size_t()
    }

    fn image_count(&self) -> Result<usize, FormatError> {
        self.core()?.image_count()
    }

    fn pixel_type(&self) -> Result<PixelType, FormatError> {
        self.core()?.pixel_type()
    }

    fn bits_per_pixel(&self) -> Result<u32, FormatError> {
        self.core()?.bits_per_pixel()
    }

    fn dimension_order(&self) -> Result<DimensionOrder, FormatError> {
        self.core()?.dimension_order()
    }

    fn effective_size_c(&self) -> Result<usize, FormatError> {
        self.core()?.effective_size_c()
    }

    fn rgb_channel_count(&self) -> Result<usize, FormatError> {
        self.core()?.rgb_channel_count()
    }

    fn is_rgb(&self) -> Result<bool, FormatError> {
        self.core()?.is_rgb()
    }

    fn is_interleaved(&self) -> Result<bool, FormatError> {
        self.core()?.is_interleaved()
    }

    fn is_little_endian(&self) -> Result<bool, FormatError> {
        self.core()?.is_little_endian()
    }

    fn is_indexed(&self) -> Result<bool, FormatError> {
        self.core()?.is_indexed()
    }

    fn is_false_color(&self) -> Result<bool, FormatError> {
        self.core()?.is_false_color()
    }

    fn is_order_certain(&self) -> Result<bool, FormatError> {
        self.core()?.is_order_certain()
    }

    fn is_thumbnail_series(&self) -> Result<bool, FormatError> {
        self.core()?.is_thumbnail_series()
    }

    fn is_metadata_complete(&self) -> Result<bool, FormatError> {
        self.core()?.is_metadata_complete()
    }

    fn modulo(&self, axis: Axis) -> Result<Modulo, FormatError> {
        self.core()?.modulo(axis)
    }

    fn thumb_size_x(&self) -> Result<usize, FormatError> {
        self.core()?.thumb_size_x()
    }

    fn thumb_size_y(&self) -> Result<usize, FormatError> {
        self.core()?.thumb_size_y()
    }

    fn optimal_tile_width(&self) -> Result<usize, FormatError> {
        self.core()?.optimal_tile_width()
    }

    fn optimal_tile_height(&self) -> Result<usize, FormatError> {
        self.core()?.optimal_tile_height()
    }

    fn index(&self, z: usize, c: usize, t: usize) -> Result<usize, FormatError> {
        self.core()?.index(z, c, t)
    }

    fn zct_coords(&self, plane: usize) -> Result<Zct, FormatError> {
        self.core()?.zct_coords(plane)
    }

    fn index_modulo(&self, effective: Zct, modulo: Zct) -> Result<usize, FormatError> {
        self.core()?.index_modulo(effective, modulo)
    }

    fn zct_modulo_coords(&self, plane: usize) -> Result<ModuloCoords, FormatError> {
        self.core()?.zct_modulo_coords(plane)
    }

    fn global_metadata(&self) -> Result<&MetadataTable, FormatError> {
        Ok(self.core()?.global_metadata())
    }

    fn series_metadata(&self) -> Result<&MetadataTable, FormatError> {
        self.core()?.series_metadata()
    }

    fn metadata_value(&self, key: &str) -> Result<Option<&MetadataValue>, FormatError> {
        Ok(self.core()?.metadata_value(key))
    }

    fn series_metadata_value(&self, key: &str) -> Result<Option<&MetadataValue>, FormatError> {
        Ok(self.core()?.series_metadata_value(key))
    }
}
