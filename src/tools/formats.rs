//! Listing of the plugins behind a reader and a writer facade.

use std::fmt;

use serde::Serialize;

use crate::handler::{ImageReader, ImageWriter};
use crate::meta::PixelType;
use crate::reader::PlaneReader;
use crate::writer::PlaneWriter;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReaderEntry {
    pub identifier: String,
    pub format: String,
    pub suffixes: Vec<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriterEntry {
    pub identifier: String,
    pub format: String,
    pub suffixes: Vec<&'static str>,
    pub compression_types: Vec<&'static str>,
    /// Pixel types accepted with the first compression type
    pub pixel_types: Vec<PixelType>,
    pub stacks: bool,
}

/// Registered readers and writers, in dispatch order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormatListing {
    pub readers: Vec<ReaderEntry>,
    pub writers: Vec<WriterEntry>,
}

/// Describe every plugin of `reader` and `writer`.
pub fn list_formats(reader: &ImageReader, writer: &ImageWriter) -> FormatListing {
    let readers = reader
        .readers()
        .iter()
        .map(|handle| ReaderEntry {
            identifier: handle.identifier().to_string(),
            format: handle.format().to_string(),
            suffixes: handle.suffixes(),
        })
        .collect();

    let writers = writer
        .writers()
        .iter()
        .map(|handle| {
            let compression_types = handle.compression_types();
            let pixel_types = compression_types
                .first()
                .map(|compression| handle.pixel_types(compression))
                .unwrap_or_default();
            WriterEntry {
                identifier: handle.identifier().to_string(),
                format: handle.format().to_string(),
                suffixes: handle.suffixes(),
                compression_types,
                pixel_types,
                stacks: handle.can_do_stacks(),
            }
        })
        .collect();

    FormatListing { readers, writers }
}

impl fmt::Display for FormatListing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Readers:")?;
        for entry in &self.readers {
            writeln!(
                f,
                "  {} [{}] ({})",
                entry.format,
                entry.suffixes.join(", "),
                entry.identifier
            )?;
        }

        writeln!(f)?;
        writeln!(f, "Writers:")?;
        for entry in &self.writers {
            let pixel_types: Vec<String> = entry.pixel_types.iter().map(|p| p.to_string()).collect();
            writeln!(
                f,
                "  {} [{}] ({})",
                entry.format,
                entry.suffixes.join(", "),
                entry.identifier
            )?;
            writeln!(
                f,
                "    compression: {}; pixel types: {}; stacks: {}",
                entry.compression_types.join(", "),
                pixel_types.join(", "),
                entry.stacks
            )?;
        }
        Ok(())
    }
}
