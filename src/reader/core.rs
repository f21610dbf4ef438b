//! Shared reader state.
//!
//! [`ReaderCore`] holds everything a reader knows about the open file: the
//! current id, the input stream, the metadata tables, the core metadata of
//! every (series, resolution) pair and the cursor into that list. The cursor
//! is a single core index; the series and resolution numbers are derived from
//! it according to the flattening option.

use std::path::Path;

use tracing::{debug, warn};

use super::options::{MetadataLevel, ReaderOptions};
use crate::dimension::{self, Axis, DimensionOrder, Modulo, ModuloCoords, Zct};
use crate::error::{FormatError, IoError};
use crate::io::RandomAccessStream;
use crate::meta::{
    fields, filter_entry, flatten_table, populate_pixels, CoreMetadata, CoreMetadataList,
    DummyMetadata, MetadataStore, MetadataTable, MetadataValue, PixelType,
};

/// Upper bound on the bytes of one optimal tile.
const OPTIMAL_TILE_BYTES: usize = 1024 * 1024;

/// Whether two ids name the same file: equal as given or after
/// canonicalization.
pub(crate) fn same_file(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// File name component of an id, used as the default image name.
fn display_name(id: &str) -> String {
    Path::new(id)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| id.to_string())
}

pub struct ReaderCore {
    format: &'static str,
    current_id: Option<String>,
    stream: Option<RandomAccessStream>,
    global_metadata: MetadataTable,
    core: CoreMetadataList,
    core_index: usize,
    options: ReaderOptions,
    store: Box<dyn MetadataStore>,
}

impl ReaderCore {
    pub fn new(format: &'static str) -> Self {
        Self {
            format,
            current_id: None,
            stream: None,
            global_metadata: MetadataTable::new(),
            core: CoreMetadataList::new(),
            core_index: 0,
            options: ReaderOptions::default(),
            store: Box::new(DummyMetadata),
        }
    }

    /// A closed core with `options` preset.
    pub fn with_options(format: &'static str, options: ReaderOptions) -> Self {
        Self {
            options,
            ..Self::new(format)
        }
    }

    pub fn format(&self) -> &'static str {
        self.format
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    pub fn current_file(&self) -> Option<&str> {
        self.current_id.as_deref()
    }

    pub fn is_open(&self) -> bool {
        self.current_id.is_some()
    }

    /// Whether `id` names the file that is already open.
    pub fn is_current(&self, id: &str) -> bool {
        self.current_id
            .as_deref()
            .is_some_and(|current| same_file(current, id))
    }

    fn require_open(&self, operation: &'static str) -> Result<(), FormatError> {
        if self.is_open() {
            Ok(())
        } else {
            Err(FormatError::NotInitialized { operation })
        }
    }

    fn require_closed(&self) -> Result<(), FormatError> {
        match &self.current_id {
            Some(current) => Err(FormatError::InvalidState {
                current: current.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Reset to a blank open state on `id`, ready for a plugin to parse.
    pub(crate) fn begin_init(&mut self, id: &str) {
        debug!(format = self.format, id, "Initializing reader");
        self.current_id = Some(id.to_string());
        self.core_index = 0;
        self.stream = None;
        self.global_metadata.clear();
        self.core = CoreMetadataList::single(CoreMetadata {
            order_certain: true,
            ..CoreMetadata::default()
        });
        self.store.create_root();
    }

    /// Validate what the plugin parsed and publish it to the metadata store.
    pub(crate) fn finish_init(&mut self) -> Result<(), FormatError> {
        if self.core.is_empty() {
            return Err(FormatError::size_mismatch("series count", 1, 0));
        }
        for core in self.core.iter() {
            core.validate()?;
        }
        for core in self.core.iter_mut() {
            repair_modulo(core);
        }
        self.core_index = 0;

        let id = self.current_id.clone().unwrap_or_default();
        if self.options.original_metadata_populated {
            self.merge_original_metadata();
        }
        populate_pixels(
            self.store.as_mut(),
            &self.core,
            self.options.flattened_resolutions,
            &display_name(&id),
        );
        self.annotate_modulo();

        if self.options.validate {
            if let Err(reason) = self.store.validate() {
                warn!(format = self.format, id = %id, %reason, "Metadata store failed validation");
            }
        }

        debug!(
            format = self.format,
            id = %id,
            series = self.series_count().unwrap_or(0),
            "Reader initialized"
        );
        Ok(())
    }

    /// Forget the open file. With `file_only` the parsed state is kept and only
    /// the stream is released.
    pub(crate) fn close(&mut self, file_only: bool) {
        self.stream = None;
        if !file_only {
            self.current_id = None;
            self.core_index = 0;
            self.global_metadata.clear();
            self.core = CoreMetadataList::new();
        }
    }

    /// Reopen the stream on the current file after `close(true)`.
    pub async fn reopen_stream(&mut self) -> Result<(), FormatError> {
        let id = self
            .current_id
            .clone()
            .ok_or(FormatError::NotInitialized { operation: "reopen" })?;
        let little_endian = self.core.get_flat(0).map(|c| c.little_endian).unwrap_or(false);
        let mut stream = RandomAccessStream::open(&id).await?;
        stream.order(little_endian);
        self.stream = Some(stream);
        Ok(())
    }

    // =========================================================================
    // Stream
    // =========================================================================

    /// Open the input stream on `id` and make it current.
    pub async fn open_stream(&mut self, id: &str) -> Result<&mut RandomAccessStream, FormatError> {
        let stream = RandomAccessStream::open(id).await?;
        Ok(self.stream.insert(stream))
    }

    pub fn set_stream(&mut self, stream: RandomAccessStream) {
        self.stream = Some(stream);
    }

    pub fn has_stream(&self) -> bool {
        self.stream.is_some()
    }

    pub fn stream_mut(&mut self) -> Result<&mut RandomAccessStream, FormatError> {
        let id = self.current_id.clone().unwrap_or_default();
        self.stream
            .as_mut()
            .ok_or(FormatError::Io(IoError::Closed(id)))
    }

    // =========================================================================
    // Options and metadata store
    // =========================================================================

    pub fn options(&self) -> &ReaderOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: ReaderOptions) -> Result<(), FormatError> {
        self.require_closed()?;
        self.options = options;
        Ok(())
    }

    pub fn store(&self) -> &dyn MetadataStore {
        self.store.as_ref()
    }

    pub fn store_mut(&mut self) -> &mut dyn MetadataStore {
        self.store.as_mut()
    }

    pub fn set_metadata_store(&mut self, store: Box<dyn MetadataStore>) -> Result<(), FormatError> {
        self.require_closed()?;
        self.store = store;
        Ok(())
    }

    // =========================================================================
    // Core metadata list
    // =========================================================================

    pub fn core_list(&self) -> &CoreMetadataList {
        &self.core
    }

    /// Mutable access for plugins building the series layout during parsing.
    pub fn core_list_mut(&mut self) -> &mut CoreMetadataList {
        &mut self.core
    }

    pub fn set_core_list(&mut self, list: CoreMetadataList) {
        self.core = list;
        self.core_index = 0;
    }

    /// Core metadata at the cursor.
    pub fn current_core(&self) -> Result<&CoreMetadata, FormatError> {
        self.require_open("core metadata")?;
        self.core.get_flat(self.core_index)
    }

    pub fn current_core_mut(&mut self) -> Result<&mut CoreMetadata, FormatError> {
        self.require_open("core metadata")?;
        self.core.get_flat_mut(self.core_index)
    }

    // =========================================================================
    // Cursor
    // =========================================================================

    fn flattened(&self) -> bool {
        self.options.flattened_resolutions
    }

    pub fn core_index(&self) -> Result<usize, FormatError> {
        self.require_open("core index")?;
        Ok(self.core_index)
    }

    pub fn series_count(&self) -> Result<usize, FormatError> {
        self.require_open("series count")?;
        Ok(if self.flattened() {
            self.core.flattened_size()
        } else {
            self.core.series_count()
        })
    }

    pub fn series(&self) -> Result<usize, FormatError> {
        self.require_open("series")?;
        self.core_index_to_series(self.core_index)
    }

    pub fn resolution_count(&self) -> Result<usize, FormatError> {
        self.require_open("resolution count")?;
        if self.flattened() {
            return Ok(1);
        }
        let (series, _) = self.core.flattened_indexes(self.core_index)?;
        Ok(self.core.size(series))
    }

    pub fn resolution(&self) -> Result<usize, FormatError> {
        self.require_open("resolution")?;
        if self.flattened() {
            return Ok(0);
        }
        Ok(self.core.flattened_indexes(self.core_index)?.1)
    }

    /// Core index of the full-resolution entry of `series`.
    pub fn series_to_core_index(&self, series: usize) -> Result<usize, FormatError> {
        self.require_open("series to core index")?;
        if self.flattened() {
            if series >= self.core.flattened_size() {
                return Err(FormatError::invalid_index(
                    "series",
                    series,
                    self.core.flattened_size(),
                ));
            }
            Ok(series)
        } else {
            self.core.flattened_index(series, 0)
        }
    }

    pub fn core_index_to_series(&self, core_index: usize) -> Result<usize, FormatError> {
        self.require_open("core index to series")?;
        if self.flattened() {
            if core_index >= self.core.flattened_size() {
                return Err(FormatError::invalid_index(
                    "core",
                    core_index,
                    self.core.flattened_size(),
                ));
            }
            Ok(core_index)
        } else {
            Ok(self.core.flattened_indexes(core_index)?.0)
        }
    }

    /// Move to the full-resolution entry of `series`.
    pub fn set_series(&mut self, series: usize) -> Result<(), FormatError> {
        let count = self.series_count()?;
        if series >= count {
            return Err(FormatError::invalid_index("series", series, count));
        }
        self.core_index = self.series_to_core_index(series)?;
        Ok(())
    }

    pub fn set_core_index(&mut self, core_index: usize) -> Result<(), FormatError> {
        self.require_open("set core index")?;
        let size = self.core.flattened_size();
        if core_index >= size {
            return Err(FormatError::invalid_index("core", core_index, size));
        }
        self.core_index = core_index;
        Ok(())
    }

    /// Move to `resolution` within the current series.
    pub fn set_resolution(&mut self, resolution: usize) -> Result<(), FormatError> {
        let count = self.resolution_count()?;
        if resolution >= count {
            return Err(FormatError::invalid_index("resolution", resolution, count));
        }
        if !self.flattened() {
            let series = self.series()?;
            self.core_index = self.core.flattened_index(series, resolution)?;
        }
        Ok(())
    }

    // =========================================================================
    // Metadata tables
    // =========================================================================

    fn prepare_entry(&self, key: &str, value: MetadataValue) -> Option<(String, MetadataValue)> {
        if self.options.metadata_level == MetadataLevel::Minimum {
            return None;
        }
        if self.options.filters_entries() {
            filter_entry(key, &value)
        } else {
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), value))
        }
    }

    fn put(table: &mut MetadataTable, key: String, value: MetadataValue, append: bool) {
        if !append {
            table.insert(key, value);
            return;
        }
        match table.remove(&key) {
            Some(MetadataValue::List(mut items)) => {
                items.push(value);
                table.insert(key, MetadataValue::List(items));
            }
            Some(previous) => {
                table.insert(key, MetadataValue::List(vec![previous, value]));
            }
            None => {
                table.insert(key, MetadataValue::List(vec![value]));
            }
        }
    }

    pub fn add_global_meta(&mut self, key: &str, value: impl Into<MetadataValue>) {
        if let Some((key, value)) = self.prepare_entry(key, value.into()) {
            Self::put(&mut self.global_metadata, key, value, false);
        }
    }

    /// Append `value` to the list stored under `key`.
    pub fn add_global_meta_list(&mut self, key: &str, value: impl Into<MetadataValue>) {
        if let Some((key, value)) = self.prepare_entry(key, value.into()) {
            Self::put(&mut self.global_metadata, key, value, true);
        }
    }

    /// Add an entry to the table of the core metadata at the cursor.
    pub fn add_series_meta(&mut self, key: &str, value: impl Into<MetadataValue>) {
        self.add_series_entry(key, value.into(), false);
    }

    pub fn add_series_meta_list(&mut self, key: &str, value: impl Into<MetadataValue>) {
        self.add_series_entry(key, value.into(), true);
    }

    fn add_series_entry(&mut self, key: &str, value: MetadataValue, append: bool) {
        let Some((key, value)) = self.prepare_entry(key, value) else {
            return;
        };
        if let Ok(core) = self.core.get_flat_mut(self.core_index) {
            Self::put(&mut core.series_metadata, key, value, append);
        }
    }

    pub fn global_metadata(&self) -> &MetadataTable {
        &self.global_metadata
    }

    pub fn series_metadata(&self) -> Result<&MetadataTable, FormatError> {
        Ok(&self.current_core()?.series_metadata)
    }

    pub fn metadata_value(&self, key: &str) -> Option<&MetadataValue> {
        self.global_metadata.get(key)
    }

    pub fn series_metadata_value(&self, key: &str) -> Option<&MetadataValue> {
        self.current_core().ok()?.series_metadata.get(key)
    }

    /// Merge global and per-series tables into the store's original metadata.
    ///
    /// Series entries are prefixed with the image name the plugin recorded,
    /// or `Series N` when it recorded none.
    fn merge_original_metadata(&mut self) {
        let mut merged = self.global_metadata.clone();
        let series_count = self.series_count().unwrap_or(0);
        for series in 0..series_count {
            let name = self
                .store
                .field(series, fields::IMAGE_NAME)
                .and_then(|v| v.as_str().map(str::to_string))
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| format!("Series {}", series));
            let Ok(core_index) = self.series_to_core_index(series) else {
                continue;
            };
            if let Ok(core) = self.core.get_flat(core_index) {
                for (key, value) in &core.series_metadata {
                    merged.insert(format!("{} {}", name, key), value.clone());
                }
            }
        }
        for (key, value) in flatten_table(&merged) {
            self.store.set_original_metadata(&key, value);
        }
    }

    fn annotate_modulo(&mut self) {
        let series_count = self.series_count().unwrap_or(0);
        for series in 0..series_count {
            let Ok(core_index) = self.series_to_core_index(series) else {
                continue;
            };
            let Ok(core) = self.core.get_flat(core_index) else {
                continue;
            };
            for (field, modulo) in [
                (fields::MODULO_Z, &core.modulo_z),
                (fields::MODULO_C, &core.modulo_c),
                (fields::MODULO_T, &core.modulo_t),
            ] {
                if modulo.is_split() {
                    self.store.set_field(series, field, modulo.annotation().into());
                }
            }
        }
    }

    // =========================================================================
    // Accessors for the current core metadata
    // =========================================================================

    pub fn size_x(&self) -> Result<usize, FormatError> {
        Ok(self.current_core()?.size_x)
    }

    pub fn size_y(&self) -> Result<usize, FormatError> {
        Ok(self.current_core()?.size_y)
    }

    pub fn size_z(&self) -> Result<usize, FormatError> {
        Ok(self.current_core()?.size_z)
    }

    pub fn size_c(&self) -> Result<usize, FormatError> {
        Ok(self.current_core()?.size_c)
    }

    pub fn size_t(&self) -> Result<usize, FormatError> {
        Ok(self.current_core()?.size_t)
    }

    pub fn image_count(&self) -> Result<usize, FormatError> {
        Ok(self.current_core()?.image_count)
    }

    pub fn pixel_type(&self) -> Result<PixelType, FormatError> {
        Ok(self.current_core()?.pixel_type)
    }

    pub fn bits_per_pixel(&self) -> Result<u32, FormatError> {
        Ok(self.current_core()?.significant_bits())
    }

    pub fn dimension_order(&self) -> Result<DimensionOrder, FormatError> {
        Ok(self.current_core()?.dimension_order)
    }

    pub fn effective_size_c(&self) -> Result<usize, FormatError> {
        Ok(self.current_core()?.effective_size_c())
    }

    pub fn rgb_channel_count(&self) -> Result<usize, FormatError> {
        Ok(self.current_core()?.rgb_channel_count())
    }

    pub fn is_rgb(&self) -> Result<bool, FormatError> {
        Ok(self.current_core()?.rgb)
    }

    pub fn is_interleaved(&self) -> Result<bool, FormatError> {
        Ok(self.current_core()?.interleaved)
    }

    pub fn is_little_endian(&self) -> Result<bool, FormatError> {
        Ok(self.current_core()?.little_endian)
    }

    pub fn is_indexed(&self) -> Result<bool, FormatError> {
        Ok(self.current_core()?.indexed)
    }

    pub fn is_false_color(&self) -> Result<bool, FormatError> {
        Ok(self.current_core()?.false_color)
    }

    pub fn is_order_certain(&self) -> Result<bool, FormatError> {
        Ok(self.current_core()?.order_certain)
    }

    pub fn is_thumbnail_series(&self) -> Result<bool, FormatError> {
        Ok(self.current_core()?.thumbnail)
    }

    pub fn is_metadata_complete(&self) -> Result<bool, FormatError> {
        Ok(self.current_core()?.metadata_complete)
    }

    pub fn modulo(&self, axis: Axis) -> Result<Modulo, FormatError> {
        let core = self.current_core()?;
        core.modulo(axis)
            .cloned()
            .ok_or_else(|| FormatError::unsupported(format!("no modulo along {}", axis)))
    }

    pub fn thumb_size_x(&self) -> Result<usize, FormatError> {
        Ok(self.current_core()?.thumb_width())
    }

    pub fn thumb_size_y(&self) -> Result<usize, FormatError> {
        Ok(self.current_core()?.thumb_height())
    }

    /// Preferred tile width: whole rows.
    pub fn optimal_tile_width(&self) -> Result<usize, FormatError> {
        Ok(self.current_core()?.size_x)
    }

    /// Preferred tile height: as many rows as fit in one megabyte.
    pub fn optimal_tile_height(&self) -> Result<usize, FormatError> {
        let core = self.current_core()?;
        let row_bytes = core.plane_size(core.size_x, 1)?.max(1);
        Ok((OPTIMAL_TILE_BYTES / row_bytes).clamp(1, core.size_y.max(1)))
    }

    /// Bytes in a `width` x `height` region of one plane.
    pub fn plane_size(&self, width: usize, height: usize) -> Result<usize, FormatError> {
        self.current_core()?.plane_size(width, height)
    }

    pub fn index(&self, z: usize, c: usize, t: usize) -> Result<usize, FormatError> {
        let core = self.current_core()?;
        dimension::index(
            core.dimension_order,
            core.plane_sizes(),
            core.image_count,
            Zct::new(z, c, t),
        )
    }

    pub fn zct_coords(&self, plane: usize) -> Result<Zct, FormatError> {
        let core = self.current_core()?;
        dimension::coords(
            core.dimension_order,
            core.plane_sizes(),
            core.image_count,
            plane,
        )
    }

    pub fn index_modulo(&self, effective: Zct, modulo: Zct) -> Result<usize, FormatError> {
        let core = self.current_core()?;
        dimension::index_modulo(
            core.dimension_order,
            core.plane_sizes(),
            core.modulo_lengths(),
            core.image_count,
            effective,
            modulo,
        )
    }

    pub fn zct_modulo_coords(&self, plane: usize) -> Result<ModuloCoords, FormatError> {
        let core = self.current_core()?;
        dimension::coords_modulo(
            core.dimension_order,
            core.plane_sizes(),
            core.modulo_lengths(),
            core.image_count,
            plane,
        )
    }
}

/// Reset modulo annotations that are empty or whose length does not divide
/// the parent size.
fn repair_modulo(core: &mut CoreMetadata) {
    let sizes = core.plane_sizes();
    for (axis, size, modulo) in [
        (Axis::Z, sizes.z, &mut core.modulo_z),
        (Axis::C, sizes.c, &mut core.modulo_c),
        (Axis::T, sizes.t, &mut core.modulo_t),
    ] {
        let length = modulo.length();
        if length == 0 || (length > 1 && size % length != 0) {
            warn!(
                axis = %axis,
                length,
                size,
                "Modulo length is zero or does not divide the dimension size; ignoring it"
            );
            modulo.reset();
        }
    }
}

impl std::fmt::Debug for ReaderCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReaderCore")
            .field("format", &self.format)
            .field("current_id", &self.current_id)
            .field("core_index", &self.core_index)
            .field("series", &self.core.resolution_counts())
            .finish()
    }
}
