//! Built-in format plugins.
//!
//! - [`FakeReader`]: synthetic images described by their file name
//! - [`PnmReader`] / [`PlainPnmReader`]: binary and plain-text any-maps,
//!   composed into one delegate-with-fallback reader
//! - [`PnmWriter`]: binary any-maps
//!
//! [`builtin_reader_catalog`] and [`builtin_writer_catalog`] map the
//! identifiers used in plugin lists to these implementations.

mod fake;
mod plain_pnm;
mod pnm;
mod pnm_writer;

pub use fake::{FakeReader, FakeSpec, BOX_SIZE};
pub use plain_pnm::PlainPnmReader;
pub use pnm::{parse_header, PnmHeader, PnmKind, PnmReader, MAX_HEADER_BYTES};
pub use pnm_writer::PnmWriter;

use crate::error::FormatError;
use crate::handler::{DelegateReader, ImageReader, ImageWriter, ReaderHandle, WriterHandle};
use crate::reader::FormatReader;
use crate::registry::{PluginCatalog, PluginList, Strictness, DEFAULT_READERS, DEFAULT_WRITERS};
use crate::writer::FormatWriter;

pub type ReaderCatalog = PluginCatalog<ReaderHandle>;
pub type WriterCatalog = PluginCatalog<WriterHandle>;

/// The any-map reader: binary files natively, plain-text ones through the
/// legacy decoder.
pub fn pnm_reader() -> DelegateReader {
    DelegateReader::new(
        PnmReader::IDENTIFIER,
        FormatReader::new(PnmReader::new()),
        FormatReader::new(PlainPnmReader::new()),
    )
}

/// Every reader this crate ships, by identifier.
pub fn builtin_reader_catalog() -> ReaderCatalog {
    let mut catalog = ReaderCatalog::new();
    catalog
        .register(FakeReader::IDENTIFIER, || {
            ReaderHandle::from(FormatReader::new(FakeReader::new()))
        })
        .register(PnmReader::IDENTIFIER, || ReaderHandle::from(pnm_reader()))
        .register(PlainPnmReader::IDENTIFIER, || {
            ReaderHandle::from(FormatReader::new(PlainPnmReader::new()))
        });
    catalog
}

/// Every writer this crate ships, by identifier.
pub fn builtin_writer_catalog() -> WriterCatalog {
    let mut catalog = WriterCatalog::new();
    catalog.register(PnmWriter::IDENTIFIER, || {
        WriterHandle::from(FormatWriter::new(PnmWriter::new()))
    });
    catalog
}

/// The built-in reader list resolved against the built-in catalog.
pub fn default_reader_list(strictness: Strictness) -> Result<PluginList<ReaderHandle>, FormatError> {
    Ok(PluginList::parse(
        DEFAULT_READERS,
        &builtin_reader_catalog(),
        strictness,
    )?)
}

/// The built-in writer list resolved against the built-in catalog.
pub fn default_writer_list(strictness: Strictness) -> Result<PluginList<WriterHandle>, FormatError> {
    Ok(PluginList::parse(
        DEFAULT_WRITERS,
        &builtin_writer_catalog(),
        strictness,
    )?)
}

impl ImageReader {
    /// A reader facade over the built-in reader list.
    pub fn with_defaults() -> Result<Self, FormatError> {
        Ok(Self::from_list(&default_reader_list(Strictness::Lenient)?))
    }
}

impl ImageWriter {
    /// A writer facade over the built-in writer list.
    pub fn with_defaults() -> Result<Self, FormatError> {
        Ok(Self::from_list(&default_writer_list(Strictness::Lenient)?))
    }
}
