use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;

use super::{
    read_u16_be, read_u16_le, read_u32_be, read_u32_le, BlockCache, FileRangeReader,
    MemoryRangeReader, RangeReader,
};
use crate::error::IoError;

/// A seekable input stream with a configurable byte order.
///
/// This is the handle a reader owns while a file is open. It keeps a cursor
/// over a [`RangeReader`]; every read is positional underneath, so seeking is
/// free and tile reads can jump between rows.
#[derive(Clone)]
pub struct RandomAccessStream {
    reader: Arc<dyn RangeReader>,
    position: u64,
    little_endian: bool,
}

impl RandomAccessStream {
    /// Open a local file, wrapped in a block cache.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, IoError> {
        let file = FileRangeReader::open(path).await?;
        Ok(Self::from_reader(Arc::new(BlockCache::new(file))))
    }

    /// Stream over an arbitrary range reader.
    pub fn from_reader(reader: Arc<dyn RangeReader>) -> Self {
        Self {
            reader,
            position: 0,
            little_endian: false,
        }
    }

    /// Stream over bytes held in memory.
    pub fn from_bytes(data: impl Into<Bytes>, identifier: impl Into<String>) -> Self {
        Self::from_reader(Arc::new(MemoryRangeReader::new(data, identifier)))
    }

    pub fn identifier(&self) -> &str {
        self.reader.identifier()
    }

    pub fn length(&self) -> u64 {
        self.reader.size()
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    /// Bytes left between the cursor and the end of the stream.
    pub fn remaining(&self) -> u64 {
        self.length().saturating_sub(self.position)
    }

    /// Set the byte order used by the typed reads.
    pub fn order(&mut self, little_endian: bool) {
        self.little_endian = little_endian;
    }

    pub fn is_little_endian(&self) -> bool {
        self.little_endian
    }

    /// Move the cursor to an absolute offset.
    ///
    /// Seeking past the end is allowed; the next read fails instead.
    pub fn seek(&mut self, position: u64) {
        self.position = position;
    }

    /// Advance the cursor by `n` bytes.
    pub fn skip_bytes(&mut self, n: u64) {
        self.position = self.position.saturating_add(n);
    }

    /// Fill `buf` from the current position and advance past it.
    pub async fn read_into(&mut self, buf: &mut [u8]) -> Result<(), IoError> {
        if buf.is_empty() {
            return Ok(());
        }
        let data = self.reader.read_exact_at(self.position, buf.len()).await?;
        buf.copy_from_slice(&data);
        self.position += buf.len() as u64;
        Ok(())
    }

    /// Read `len` bytes from the current position.
    pub async fn read_bytes(&mut self, len: usize) -> Result<Bytes, IoError> {
        let data = self.reader.read_exact_at(self.position, len).await?;
        self.position += len as u64;
        Ok(data)
    }

    /// Read up to `len` bytes without failing at end of stream.
    pub async fn read_at_most(&mut self, len: usize) -> Result<Bytes, IoError> {
        let len = len.min(self.remaining() as usize);
        self.read_bytes(len).await
    }

    pub async fn read_u8(&mut self) -> Result<u8, IoError> {
        let data = self.read_bytes(1).await?;
        Ok(data[0])
    }

    pub async fn read_u16(&mut self) -> Result<u16, IoError> {
        let data = self.read_bytes(2).await?;
        Ok(if self.little_endian {
            read_u16_le(&data)
        } else {
            read_u16_be(&data)
        })
    }

    pub async fn read_u32(&mut self) -> Result<u32, IoError> {
        let data = self.read_bytes(4).await?;
        Ok(if self.little_endian {
            read_u32_le(&data)
        } else {
            read_u32_be(&data)
        })
    }

    /// Read `len` bytes and decode them as Latin-1 text.
    pub async fn read_string(&mut self, len: usize) -> Result<String, IoError> {
        let data = self.read_bytes(len).await?;
        Ok(data.iter().map(|&b| b as char).collect())
    }
}

impl std::fmt::Debug for RandomAccessStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RandomAccessStream")
            .field("identifier", &self.identifier())
            .field("position", &self.position)
            .field("length", &self.length())
            .field("little_endian", &self.little_endian)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(data: &[u8]) -> RandomAccessStream {
        RandomAccessStream::from_bytes(data.to_vec(), "mem://stream")
    }

    #[tokio::test]
    async fn test_typed_reads_follow_byte_order() {
        let mut s = stream(&[0x01, 0x02, 0x01, 0x02, 0x00, 0x00, 0x00, 0x07]);

        assert_eq!(s.read_u16().await.unwrap(), 0x0102);
        s.order(true);
        assert_eq!(s.read_u16().await.unwrap(), 0x0201);
        s.order(false);
        assert_eq!(s.read_u32().await.unwrap(), 7);
        assert_eq!(s.remaining(), 0);
    }

    #[tokio::test]
    async fn test_seek_skip_and_read_into() {
        let mut s = stream(b"abcdefgh");
        s.seek(2);
        s.skip_bytes(1);
        let mut buf = [0u8; 3];
        s.read_into(&mut buf).await.unwrap();
        assert_eq!(&buf, b"def");
        assert_eq!(s.position(), 6);
    }

    #[tokio::test]
    async fn test_read_past_end_fails_without_moving() {
        let mut s = stream(b"ab");
        s.seek(1);
        assert!(s.read_bytes(4).await.is_err());
        assert_eq!(s.position(), 1);
    }

    #[tokio::test]
    async fn test_read_at_most_clamps() {
        let mut s = stream(b"P5\n");
        let head = s.read_at_most(512).await.unwrap();
        assert_eq!(&head[..], b"P5\n");
    }

    #[tokio::test]
    async fn test_read_string() {
        let mut s = stream(b"P6 rest");
        assert_eq!(s.read_string(2).await.unwrap(), "P6");
    }
}
