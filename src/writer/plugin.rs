use async_trait::async_trait;

use super::WriterCore;
use crate::error::FormatError;
use crate::meta::PixelType;
use crate::reader::Region;

/// Compression name for writers that store raw samples.
pub const UNCOMPRESSED: &str = "Uncompressed";

/// The format-specific half of a writer.
///
/// [`FormatWriter`](super::FormatWriter) validates every request against the
/// metadata retrieve before calling [`save_bytes`](Self::save_bytes).
#[async_trait]
pub trait WriterPlugin: Send + Sync {
    fn identifier(&self) -> &'static str;

    fn format(&self) -> &'static str;

    fn suffixes(&self) -> &'static [&'static str];

    fn compression_types(&self) -> &'static [&'static str] {
        &[UNCOMPRESSED]
    }

    /// Pixel types storable under `compression`.
    fn pixel_types(&self, _compression: &str) -> Vec<PixelType> {
        PixelType::ALL.to_vec()
    }

    /// Whether more than one plane per series can be stored.
    fn can_do_stacks(&self) -> bool {
        false
    }

    /// Called once the output is open.
    async fn init(&mut self, _core: &mut WriterCore) -> Result<(), FormatError> {
        Ok(())
    }

    /// Store `region` of `plane` in the current series. `buf` holds exactly
    /// the region, laid out as the writer options say.
    async fn save_bytes(
        &mut self,
        core: &mut WriterCore,
        plane: usize,
        buf: &[u8],
        region: Region,
    ) -> Result<(), FormatError>;

    /// Finalize the output before it is flushed and closed.
    async fn close(&mut self, _core: &mut WriterCore) -> Result<(), FormatError> {
        Ok(())
    }

    fn fresh(&self) -> Box<dyn WriterPlugin>;
}
