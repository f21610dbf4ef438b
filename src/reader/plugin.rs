use async_trait::async_trait;

use super::{ReaderCore, Region};
use crate::error::{FormatError, IoError};
use crate::io::RandomAccessStream;

/// Suffixes of whole-file compression wrappers accepted after a format suffix.
pub const COMPRESSION_SUFFIXES: [&str; 2] = ["bz2", "gz"];

/// A color lookup table, one row per output channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupTable {
    Bits8(Vec<Vec<u8>>),
    Bits16(Vec<Vec<u16>>),
}

/// Whether `name` ends in one of `suffixes` (case-insensitive).
///
/// A trailing compression suffix is tolerated, so `cells.pgm.gz` matches
/// `pgm`.
pub fn check_suffix(name: &str, suffixes: &[&str]) -> bool {
    let lower = name.to_lowercase();
    suffixes.iter().any(|suffix| {
        let dotted = format!(".{}", suffix.to_lowercase());
        lower.ends_with(&dotted)
            || COMPRESSION_SUFFIXES
                .iter()
                .any(|c| lower.ends_with(&format!("{}.{}", dotted, c)))
    })
}

/// The format-specific half of a reader.
///
/// [`FormatReader`](super::FormatReader) owns the generic state machine and
/// calls into the plugin for type detection, header parsing and pixel reads.
/// Plugins write everything they learn into the [`ReaderCore`] they are handed.
#[async_trait]
pub trait ReaderPlugin: Send + Sync {
    /// Catalog identifier, e.g. `formats.in.PnmReader`.
    fn identifier(&self) -> &'static str;

    /// Human-readable format name.
    fn format(&self) -> &'static str;

    /// File suffixes (without the dot).
    fn suffixes(&self) -> &'static [&'static str];

    /// A name without a matching suffix is never this type.
    fn suffix_necessary(&self) -> bool {
        true
    }

    /// A name with a matching suffix is always this type.
    fn suffix_sufficient(&self) -> bool {
        true
    }

    /// Content sniffing over the start of a stream.
    async fn is_this_type_stream(&self, _stream: &mut RandomAccessStream) -> Result<bool, IoError> {
        Ok(false)
    }

    /// Parse the file header and populate `core`.
    ///
    /// On entry `core` is open on `id` with a single core metadata entry whose
    /// order is certain; the plugin opens its own stream when it needs one.
    async fn init_file(&mut self, core: &mut ReaderCore, id: &str) -> Result<(), FormatError>;

    /// Fill `buf` with `region` of `plane` in the current series.
    ///
    /// Parameters have been validated against the current core metadata.
    async fn open_bytes(
        &mut self,
        core: &mut ReaderCore,
        plane: usize,
        buf: &mut [u8],
        region: Region,
    ) -> Result<(), FormatError>;

    /// Reacquire the stream released by `close(true)`.
    async fn reopen_file(&mut self, core: &mut ReaderCore) -> Result<(), FormatError> {
        core.reopen_stream().await
    }

    /// Files needed to read `series`.
    fn series_used_files(&self, core: &ReaderCore, _series: usize, no_pixels: bool) -> Vec<String> {
        match core.current_file() {
            Some(id) if !no_pixels => vec![id.to_string()],
            _ => Vec::new(),
        }
    }

    fn lookup_table(&self, _core: &ReaderCore) -> Option<LookupTable> {
        None
    }

    /// Release plugin-held state. `file_only` keeps what parsing produced.
    fn close(&mut self, _file_only: bool) {}

    /// A new, unopened instance of the same plugin.
    fn fresh(&self) -> Box<dyn ReaderPlugin>;
}
