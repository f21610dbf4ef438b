//! Whole-file operations built on the reader and writer interfaces.

mod convert;
mod formats;
mod info;

pub use convert::{convert, ConvertStats};
pub use formats::{list_formats, FormatListing, ReaderEntry, WriterEntry};
pub use info::{summarize, ImageSummary, LevelSummary, SeriesSummary};
