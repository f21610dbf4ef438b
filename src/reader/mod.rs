//! The reader contract.
//!
//! A [`FormatReader`] pairs the shared [`ReaderCore`] state machine with a
//! format [`ReaderPlugin`]. Everything that reads pixels, including the
//! composition layers in [`crate::handler`], implements [`PlaneReader`].

mod api;
mod core;
mod format_reader;
mod options;
mod plane;
mod plugin;

pub use self::core::ReaderCore;
pub(crate) use self::core::same_file;
pub use api::PlaneReader;
pub use format_reader::{FormatReader, SNIFF_BLOCK_SIZE};
pub use options::{MetadataLevel, ReaderOptions};
pub use plane::{read_region, PlaneLayout, Region};
pub use plugin::{check_suffix, LookupTable, ReaderPlugin, COMPRESSION_SUFFIXES};
