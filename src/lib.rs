//! # Bioimage Formats
//!
//! Format-agnostic reading and writing of multi-dimensional, multi-resolution
//! microscopy images.
//!
//! Every file is addressed the same way whatever its format: a file holds one
//! or more series, each series one or more pyramid levels, each level a stack
//! of 2D planes indexed by (Z, C, T), and any rectangle of a plane can be read
//! without decoding the rest.
//!
//! ## Features
//!
//! - **One reader contract**: [`PlaneReader`] exposes geometry, plane index
//!   math, metadata tables and tiled pixel reads for every format
//! - **Composable handlers**: a suffix-and-content dispatcher, a
//!   native-with-fallback delegate and a statistics wrapper, all readers
//!   themselves
//! - **Plugin lists**: ordered, text-configured registries of readers and
//!   writers resolved against a catalog of known plugins
//! - **Writers**: the mirror contract [`PlaneWriter`], fed from a metadata
//!   retrieve and written tile by tile
//!
//! ## Architecture
//!
//! - [`io`] - Positional reads with block caching, cursor streams, outputs
//! - [`dimension`] - Dimension orders, modulo axes, plane index math
//! - [`meta`] - Pixel types, core metadata, metadata tables and stores
//! - [`reader`] / [`writer`] - The contracts and their shared state machines
//! - [`handler`] - Dispatch, delegation and wrapping
//! - [`registry`] - Plugin catalogs and plugin lists
//! - [`mod@format`] - Built-in plugins
//! - [`tools`] - Conversion, summaries and format listings
//! - [`config`] - CLI types
//!
//! ## Example
//!
//! ```rust,no_run
//! use bioimage_formats::{ImageReader, PlaneReader, Region};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), bioimage_formats::FormatError> {
//!     let mut reader = ImageReader::with_defaults()?;
//!     reader.set_id("sample&sizeZ=3&sizeC=2.fake").await?;
//!
//!     let plane = reader.index(1, 0, 0)?;
//!     let tile = reader.open_bytes(plane, Region::new(0, 0, 64, 64)).await?;
//!     println!("{} bytes from {}", tile.len(), reader.format());
//!
//!     reader.close(false).await
//! }
//! ```

pub mod config;
pub mod dimension;
pub mod error;
pub mod format;
pub mod handler;
pub mod io;
pub mod meta;
pub mod reader;
pub mod registry;
pub mod tools;
pub mod writer;

// Re-export commonly used types
pub use config::{Cli, Command, ConvertConfig, FormatsConfig, InfoConfig, RegistryArgs};
pub use dimension::{Axis, DimensionOrder, Modulo, ModuloCoords, Zct};
pub use error::{FormatError, IoError, RegistryError};
pub use format::{
    builtin_reader_catalog, builtin_writer_catalog, default_reader_list, default_writer_list,
    FakeReader, FakeSpec, PlainPnmReader, PnmReader, PnmWriter, ReaderCatalog, WriterCatalog,
};
pub use handler::{
    DelegateReader, ImageReader, ImageWriter, ReadStats, ReaderHandle, ReaderWrapper, WriteStats,
    WriterHandle, WriterWrapper,
};
pub use io::{
    BlockCache, FileRangeReader, MemoryRangeReader, RandomAccessOutput, RandomAccessStream,
    RangeReader,
};
pub use meta::{
    CoreMetadata, CoreMetadataList, DummyMetadata, FilterMetadata, MemoryMetadataStore,
    MetadataStore, MetadataTable, MetadataValue, PixelType,
};
pub use reader::{
    FormatReader, LookupTable, MetadataLevel, PlaneReader, ReaderCore, ReaderOptions,
    ReaderPlugin, Region,
};
pub use registry::{PluginCatalog, PluginList, Strictness};
pub use tools::{
    convert, list_formats, summarize, ConvertStats, FormatListing, ImageSummary, SeriesSummary,
};
pub use writer::{FormatWriter, PlaneWriter, WriterCore, WriterOptions, WriterPlugin};
