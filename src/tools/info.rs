//! Serializable description of an open image, as printed by `info`.

use std::fmt;

use serde::Serialize;

use crate::error::FormatError;
use crate::meta::{flatten_table, CoreMetadata, MetadataTable};
use crate::reader::PlaneReader;

/// One pyramid level of a series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LevelSummary {
    pub resolution: usize,
    pub size_x: usize,
    pub size_y: usize,
}

/// One series of an image.
#[derive(Debug, Clone, Serialize)]
pub struct SeriesSummary {
    pub series: usize,
    pub core: CoreMetadata,
    pub effective_size_c: usize,
    pub thumb_size_x: usize,
    pub thumb_size_y: usize,
    pub levels: Vec<LevelSummary>,
    pub used_files: Vec<String>,
}

/// An open image: format, files, metadata tables and every series.
#[derive(Debug, Clone, Serialize)]
pub struct ImageSummary {
    pub id: String,
    pub format: String,
    pub series_count: usize,
    pub used_files: Vec<String>,
    pub global_metadata: MetadataTable,
    pub series: Vec<SeriesSummary>,
}

async fn series_summary<R>(reader: &mut R, series: usize) -> Result<SeriesSummary, FormatError>
where
    R: PlaneReader + ?Sized,
{
    reader.set_series(series)?;
    let mut levels = Vec::new();
    for resolution in 0..reader.resolution_count()? {
        reader.set_resolution(resolution)?;
        levels.push(LevelSummary {
            resolution,
            size_x: reader.size_x()?,
            size_y: reader.size_y()?,
        });
    }
    reader.set_resolution(0)?;

    Ok(SeriesSummary {
        series,
        core: reader.current_core()?.clone(),
        effective_size_c: reader.effective_size_c()?,
        thumb_size_x: reader.thumb_size_x()?,
        thumb_size_y: reader.thumb_size_y()?,
        levels,
        used_files: reader.series_used_files(false)?,
    })
}

/// Summarize the image open in `reader`, or only `series` when given.
pub async fn summarize<R>(reader: &mut R, only_series: Option<usize>) -> Result<ImageSummary, FormatError>
where
    R: PlaneReader + ?Sized,
{
    let id = reader
        .current_file()
        .ok_or(FormatError::NotInitialized { operation: "summarize" })?
        .to_string();
    let series_count = reader.series_count()?;
    let wanted: Vec<usize> = match only_series {
        Some(series) if series >= series_count => {
            return Err(FormatError::invalid_index("series", series, series_count));
        }
        Some(series) => vec![series],
        None => (0..series_count).collect(),
    };

    let mut series = Vec::with_capacity(wanted.len());
    for index in wanted {
        series.push(series_summary(reader, index).await?);
    }
    reader.set_series(0)?;

    Ok(ImageSummary {
        id,
        format: reader.format().to_string(),
        series_count,
        used_files: reader.used_files(false)?,
        global_metadata: reader.global_metadata()?.clone(),
        series,
    })
}

fn write_table(f: &mut fmt::Formatter<'_>, table: &MetadataTable) -> fmt::Result {
    for (key, value) in flatten_table(table) {
        writeln!(f, "  {}: {}", key, value)?;
    }
    Ok(())
}

impl fmt::Display for ImageSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "File: {}", self.id)?;
        writeln!(f, "Format: {}", self.format)?;
        writeln!(f, "Series count: {}", self.series_count)?;
        writeln!(f, "Used files: {}", self.used_files.join(", "))?;

        for s in &self.series {
            let core = &s.core;
            let endianness = if core.little_endian {
                "intel (little)"
            } else {
                "motorola (big)"
            };
            let certainty = if core.order_certain { "certain" } else { "uncertain" };

            writeln!(f)?;
            writeln!(f, "Series #{}:", s.series)?;
            writeln!(f, "  Image count = {}", core.image_count)?;
            writeln!(f, "  RGB = {} ({})", core.rgb, core.rgb_channel_count())?;
            writeln!(f, "  Interleaved = {}", core.interleaved)?;
            writeln!(f, "  Indexed = {} (false color = {})", core.indexed, core.false_color)?;
            writeln!(f, "  Width = {}", core.size_x)?;
            writeln!(f, "  Height = {}", core.size_y)?;
            writeln!(f, "  SizeZ = {}", core.size_z)?;
            writeln!(f, "  SizeC = {} (effective {})", core.size_c, s.effective_size_c)?;
            writeln!(f, "  SizeT = {}", core.size_t)?;
            writeln!(f, "  Thumbnail size = {} x {}", s.thumb_size_x, s.thumb_size_y)?;
            writeln!(f, "  Endianness = {}", endianness)?;
            writeln!(f, "  Dimension order = {} ({})", core.dimension_order, certainty)?;
            writeln!(f, "  Pixel type = {}", core.pixel_type)?;
            writeln!(f, "  Valid bits per pixel = {}", core.significant_bits())?;
            writeln!(f, "  Metadata complete = {}", core.metadata_complete)?;
            writeln!(f, "  Thumbnail series = {}", core.thumbnail)?;
            if s.levels.len() > 1 {
                writeln!(f, "  Resolutions = {}", s.levels.len())?;
                for level in &s.levels {
                    writeln!(f, "    {}: {} x {}", level.resolution, level.size_x, level.size_y)?;
                }
            }
            if !core.series_metadata.is_empty() {
                writeln!(f, "  Series metadata:")?;
                write_table(f, &core.series_metadata)?;
            }
        }

        if !self.global_metadata.is_empty() {
            writeln!(f)?;
            writeln!(f, "Global metadata:")?;
            write_table(f, &self.global_metadata)?;
        }
        Ok(())
    }
}
