//! Structural metadata: pixel types, per-(series, resolution) core metadata,
//! the two-level resolution container, metadata tables and the metadata-store
//! collaborator.

mod core_metadata;
mod pixel_type;
mod resolution;
mod store;
mod value;

pub(crate) use core_metadata::checked_size;
pub use core_metadata::{CoreMetadata, THUMBNAIL_DIMENSION};
pub use pixel_type::PixelType;
pub use resolution::CoreMetadataList;
pub use store::{
    fields, populate_pixels, populate_series_pixels, DummyMetadata, FilterMetadata,
    MemoryMetadataStore, MetadataStore, PixelsGeometry,
};
pub use value::{
    filter_entry, flatten_table, sanitize, MetadataTable, MetadataValue, MAX_FILTERED_LENGTH,
};
