use std::io::SeekFrom;
use std::path::Path;

use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};

use crate::error::IoError;

/// A seekable output file owned by a writer while it is open.
///
/// Writers place tiles at computed offsets, so writes are positional; the file
/// grows as needed and any gap is zero-filled by the filesystem.
pub struct RandomAccessOutput {
    file: File,
    identifier: String,
    position: u64,
    length: u64,
    little_endian: bool,
}

impl RandomAccessOutput {
    /// Create (or truncate) `path` for writing.
    pub async fn create(path: impl AsRef<Path>) -> Result<Self, IoError> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .await?;

        Ok(Self {
            file,
            identifier: path.display().to_string(),
            position: 0,
            length: 0,
            little_endian: false,
        })
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    /// Highest offset written so far.
    pub fn length(&self) -> u64 {
        self.length
    }

    pub fn order(&mut self, little_endian: bool) {
        self.little_endian = little_endian;
    }

    pub fn is_little_endian(&self) -> bool {
        self.little_endian
    }

    pub async fn seek(&mut self, position: u64) -> Result<(), IoError> {
        self.file.seek(SeekFrom::Start(position)).await?;
        self.position = position;
        Ok(())
    }

    /// Write `data` at the current position and advance past it.
    pub async fn write_all(&mut self, data: &[u8]) -> Result<(), IoError> {
        self.file.write_all(data).await?;
        self.position += data.len() as u64;
        self.length = self.length.max(self.position);
        Ok(())
    }

    /// Seek to `offset` and write `data` there.
    pub async fn write_at(&mut self, offset: u64, data: &[u8]) -> Result<(), IoError> {
        self.seek(offset).await?;
        self.write_all(data).await
    }

    pub async fn write_u16(&mut self, value: u16) -> Result<(), IoError> {
        let bytes = if self.little_endian {
            value.to_le_bytes()
        } else {
            value.to_be_bytes()
        };
        self.write_all(&bytes).await
    }

    /// Extend the file with zeros up to `length` bytes.
    pub async fn set_length(&mut self, length: u64) -> Result<(), IoError> {
        if length > self.length {
            self.file.set_len(length).await?;
            self.length = length;
        }
        Ok(())
    }

    /// Flush buffered data and sync the file to disk.
    pub async fn close(mut self) -> Result<(), IoError> {
        self.file.flush().await?;
        self.file.sync_all().await?;
        Ok(())
    }
}

impl std::fmt::Debug for RandomAccessOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RandomAccessOutput")
            .field("identifier", &self.identifier)
            .field("position", &self.position)
            .field("length", &self.length)
            .finish()
    }
}
