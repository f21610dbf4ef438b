//! The metadata-store collaborator.
//!
//! Readers push normalized pixel geometry into a [`MetadataStore`] once a file
//! is parsed; writers read the same fields back (as a shared, read-only
//! "retrieve") to learn what they are about to write. The core only relies on
//! the setter/getter contract keyed by series index and field name; schema
//! knowledge beyond the field names below stays outside the crate.

use serde::{Deserialize, Serialize};

use super::core_metadata::checked_size;
use super::{
    filter_entry, sanitize, CoreMetadata, CoreMetadataList, MetadataTable, MetadataValue, PixelType,
};
use crate::dimension::DimensionOrder;
use crate::error::FormatError;

/// Field names written by [`populate_pixels`] and read by writers.
pub mod fields {
    pub const IMAGE_NAME: &str = "Image.Name";
    pub const SIZE_X: &str = "Pixels.SizeX";
    pub const SIZE_Y: &str = "Pixels.SizeY";
    pub const SIZE_Z: &str = "Pixels.SizeZ";
    pub const SIZE_C: &str = "Pixels.SizeC";
    pub const SIZE_T: &str = "Pixels.SizeT";
    pub const PIXEL_TYPE: &str = "Pixels.Type";
    pub const DIMENSION_ORDER: &str = "Pixels.DimensionOrder";
    pub const BIG_ENDIAN: &str = "Pixels.BigEndian";
    pub const INTERLEAVED: &str = "Pixels.Interleaved";
    pub const SIGNIFICANT_BITS: &str = "Pixels.SignificantBits";
    pub const RESOLUTION_COUNT: &str = "Pixels.ResolutionCount";
    pub const SAMPLES_PER_PIXEL: &str = "Channel.SamplesPerPixel";
    pub const MODULO_Z: &str = "Annotation.ModuloAlongZ";
    pub const MODULO_C: &str = "Annotation.ModuloAlongC";
    pub const MODULO_T: &str = "Annotation.ModuloAlongT";

    /// Field name for a pyramid level other than the full resolution.
    pub fn resolution_field(resolution: usize, field: &str) -> String {
        format!("Resolution[{}].{}", resolution, field)
    }
}

// =============================================================================
// MetadataStore Trait
// =============================================================================

/// Setter/getter contract for normalized metadata.
pub trait MetadataStore: Send + Sync {
    /// Discard all content and start a fresh document.
    fn create_root(&mut self);

    /// Record `value` for `field` of `series`.
    fn set_field(&mut self, series: usize, field: &str, value: MetadataValue);

    /// Read back a field, if recorded.
    fn field(&self, series: usize, field: &str) -> Option<MetadataValue>;

    /// Number of series with at least one field.
    fn series_count(&self) -> usize;

    /// Record a key/value pair of the file's original (unnormalized) metadata.
    fn set_original_metadata(&mut self, key: &str, value: MetadataValue);

    /// Read back an original metadata entry. Stores that discard them return `None`.
    fn original_metadata_value(&self, _key: &str) -> Option<MetadataValue> {
        None
    }

    /// Structural validation against the store's schema.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }

    /// Independent copy of this store, used to hand a populated store to a writer.
    fn clone_store(&self) -> Box<dyn MetadataStore>;
}

// =============================================================================
// DummyMetadata
// =============================================================================

/// A store that records nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct DummyMetadata;

impl MetadataStore for DummyMetadata {
    fn create_root(&mut self) {}

    fn set_field(&mut self, _series: usize, _field: &str, _value: MetadataValue) {}

    fn field(&self, _series: usize, _field: &str) -> Option<MetadataValue> {
        None
    }

    fn series_count(&self) -> usize {
        0
    }

    fn set_original_metadata(&mut self, _key: &str, _value: MetadataValue) {}

    fn clone_store(&self) -> Box<dyn MetadataStore> {
        Box::new(*self)
    }
}

// =============================================================================
// MemoryMetadataStore
// =============================================================================

/// An in-memory store, serializable to JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryMetadataStore {
    series: Vec<MetadataTable>,
    original_metadata: MetadataTable,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store describing one series with the geometry of `core`.
    pub fn describing(core: &CoreMetadata) -> Self {
        let mut store = Self::new();
        populate_series_pixels(&mut store, 0, core);
        store
    }

    pub fn series_fields(&self, series: usize) -> Option<&MetadataTable> {
        self.series.get(series)
    }

    pub fn original_metadata(&self) -> &MetadataTable {
        &self.original_metadata
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl MetadataStore for MemoryMetadataStore {
    fn create_root(&mut self) {
        self.series.clear();
        self.original_metadata.clear();
    }

    fn set_field(&mut self, series: usize, field: &str, value: MetadataValue) {
        if self.series.len() <= series {
            self.series.resize_with(series + 1, MetadataTable::new);
        }
        self.series[series].insert(field.to_string(), value);
    }

    fn field(&self, series: usize, field: &str) -> Option<MetadataValue> {
        self.series.get(series)?.get(field).cloned()
    }

    fn series_count(&self) -> usize {
        self.series.len()
    }

    fn set_original_metadata(&mut self, key: &str, value: MetadataValue) {
        self.original_metadata.insert(key.to_string(), value);
    }

    fn original_metadata_value(&self, key: &str) -> Option<MetadataValue> {
        self.original_metadata.get(key).cloned()
    }

    fn validate(&self) -> Result<(), String> {
        let mut problems = Vec::new();
        for series in 0..self.series.len() {
            if let Err(e) = PixelsGeometry::from_store(self, series) {
                problems.push(e.to_string());
            }
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems.join("; "))
        }
    }

    fn clone_store(&self) -> Box<dyn MetadataStore> {
        Box::new(self.clone())
    }
}

// =============================================================================
// FilterMetadata
// =============================================================================

/// Decorator that sanitizes text before it reaches the wrapped store.
///
/// With filtering on, text field values lose markup characters and original
/// metadata goes through the same rules as the reader's own tables.
#[derive(Debug, Clone)]
pub struct FilterMetadata<S> {
    inner: S,
    filter: bool,
}

impl<S: MetadataStore> FilterMetadata<S> {
    pub fn new(inner: S, filter: bool) -> Self {
        Self { inner, filter }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: MetadataStore + Clone + 'static> MetadataStore for FilterMetadata<S> {
    fn create_root(&mut self) {
        self.inner.create_root();
    }

    fn set_field(&mut self, series: usize, field: &str, value: MetadataValue) {
        let value = match value {
            MetadataValue::Text(text) if self.filter => MetadataValue::Text(sanitize(&text)),
            other => other,
        };
        self.inner.set_field(series, field, value);
    }

    fn field(&self, series: usize, field: &str) -> Option<MetadataValue> {
        self.inner.field(series, field)
    }

    fn series_count(&self) -> usize {
        self.inner.series_count()
    }

    fn set_original_metadata(&mut self, key: &str, value: MetadataValue) {
        if !self.filter {
            self.inner.set_original_metadata(key, value);
        } else if let Some((key, value)) = filter_entry(key, &value) {
            self.inner.set_original_metadata(&key, value);
        }
    }

    fn original_metadata_value(&self, key: &str) -> Option<MetadataValue> {
        self.inner.original_metadata_value(key)
    }

    fn validate(&self) -> Result<(), String> {
        self.inner.validate()
    }

    fn clone_store(&self) -> Box<dyn MetadataStore> {
        Box::new(self.clone())
    }
}

// =============================================================================
// Pixel population
// =============================================================================

/// Write the pixel geometry of `core` as the fields of `series`.
pub fn populate_series_pixels(store: &mut dyn MetadataStore, series: usize, core: &CoreMetadata) {
    store.set_field(series, fields::SIZE_X, core.size_x.into());
    store.set_field(series, fields::SIZE_Y, core.size_y.into());
    store.set_field(series, fields::SIZE_Z, core.size_z.into());
    store.set_field(series, fields::SIZE_C, core.size_c.into());
    store.set_field(series, fields::SIZE_T, core.size_t.into());
    store.set_field(series, fields::PIXEL_TYPE, core.pixel_type.name().into());
    store.set_field(
        series,
        fields::DIMENSION_ORDER,
        core.dimension_order.to_string().into(),
    );
    store.set_field(series, fields::BIG_ENDIAN, (!core.little_endian).into());
    store.set_field(series, fields::INTERLEAVED, core.interleaved.into());
    store.set_field(series, fields::SIGNIFICANT_BITS, core.significant_bits().into());
    store.set_field(
        series,
        fields::SAMPLES_PER_PIXEL,
        core.rgb_channel_count().into(),
    );
}

/// Write pixel geometry for every series of `list`.
///
/// In flattened mode every entry is its own series; otherwise each series
/// records its full resolution plus the sizes of the lower levels. Series
/// without an image name get `default_name` (suffixed with the series number
/// when there is more than one).
pub fn populate_pixels(
    store: &mut dyn MetadataStore,
    list: &CoreMetadataList,
    flattened: bool,
    default_name: &str,
) {
    let mut series_entries: Vec<Vec<&CoreMetadata>> = Vec::new();
    if flattened {
        series_entries.extend(list.iter().map(|core| vec![core]));
    } else {
        for series in 0..list.series_count() {
            series_entries.push((0..list.size(series)).filter_map(|r| list.get(series, r)).collect());
        }
    }

    let total = series_entries.len();
    for (series, levels) in series_entries.iter().enumerate() {
        let Some(full) = levels.first() else {
            continue;
        };
        populate_series_pixels(store, series, full);

        if store.field(series, fields::IMAGE_NAME).is_none() {
            let name = if total > 1 {
                format!("{} #{}", default_name, series + 1)
            } else {
                default_name.to_string()
            };
            store.set_field(series, fields::IMAGE_NAME, name.into());
        }

        store.set_field(series, fields::RESOLUTION_COUNT, levels.len().into());
        for (resolution, level) in levels.iter().enumerate().skip(1) {
            store.set_field(
                series,
                &fields::resolution_field(resolution, fields::SIZE_X),
                level.size_x.into(),
            );
            store.set_field(
                series,
                &fields::resolution_field(resolution, fields::SIZE_Y),
                level.size_y.into(),
            );
        }
    }
}

// =============================================================================
// PixelsGeometry
// =============================================================================

/// Pixel geometry of one series, read back from a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelsGeometry {
    pub size_x: usize,
    pub size_y: usize,
    pub size_z: usize,
    pub size_c: usize,
    pub size_t: usize,
    pub pixel_type: PixelType,
    pub dimension_order: DimensionOrder,
    pub little_endian: bool,
    pub interleaved: bool,
    pub samples_per_pixel: usize,
}

impl PixelsGeometry {
    /// Read the geometry of `series`; every size field is required.
    pub fn from_store(store: &dyn MetadataStore, series: usize) -> Result<Self, FormatError> {
        let size = |field: &'static str| -> Result<usize, FormatError> {
            store
                .field(series, field)
                .and_then(|v| v.as_usize())
                .filter(|v| *v > 0)
                .ok_or(FormatError::MissingMetadata { series, field })
        };

        let pixel_type: PixelType = store
            .field(series, fields::PIXEL_TYPE)
            .and_then(|v| v.as_str().map(str::to_string))
            .ok_or(FormatError::MissingMetadata {
                series,
                field: fields::PIXEL_TYPE,
            })?
            .parse()?;

        let dimension_order: DimensionOrder = match store.field(series, fields::DIMENSION_ORDER) {
            Some(value) => value
                .as_str()
                .ok_or(FormatError::MissingMetadata {
                    series,
                    field: fields::DIMENSION_ORDER,
                })?
                .parse()?,
            None => DimensionOrder::XYZCT,
        };

        let flag = |field: &str| store.field(series, field).and_then(|v| v.as_bool());

        Ok(Self {
            size_x: size(fields::SIZE_X)?,
            size_y: size(fields::SIZE_Y)?,
            size_z: size(fields::SIZE_Z)?,
            size_c: size(fields::SIZE_C)?,
            size_t: size(fields::SIZE_T)?,
            pixel_type,
            dimension_order,
            little_endian: !flag(fields::BIG_ENDIAN).unwrap_or(true),
            interleaved: flag(fields::INTERLEAVED).unwrap_or(false),
            samples_per_pixel: store
                .field(series, fields::SAMPLES_PER_PIXEL)
                .and_then(|v| v.as_usize())
                .filter(|v| *v > 0)
                .unwrap_or(1),
        })
    }

    /// Planes in the series: `size_z * (size_c / samples) * size_t`.
    pub fn image_count(&self) -> usize {
        self.size_z * self.effective_size_c() * self.size_t
    }

    pub fn effective_size_c(&self) -> usize {
        self.size_c / self.samples_per_pixel.max(1)
    }

    /// Bytes in a `width` x `height` region of one plane.
    pub fn plane_size(&self, width: usize, height: usize) -> Result<usize, FormatError> {
        checked_size(&[
            width,
            height,
            self.samples_per_pixel,
            self.pixel_type.bytes_per_pixel(),
        ])
    }
}
