//! Format conversion: copy every plane of every series from a reader to a
//! writer, tile by tile.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::FormatError;
use crate::meta::{MemoryMetadataStore, MetadataStore};
use crate::reader::{PlaneReader, Region};
use crate::writer::PlaneWriter;

/// What a conversion copied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConvertStats {
    pub series: usize,
    pub planes: usize,
    pub tiles: usize,
    pub bytes: u64,
}

/// Convert `input` to `output`.
///
/// The reader is opened with an in-memory metadata store, which then becomes
/// the writer's retrieve. Writers that store a single plane per file receive
/// only the first plane of the first series.
pub async fn convert<R, W>(
    reader: &mut R,
    writer: &mut W,
    input: &str,
    output: &str,
) -> Result<ConvertStats, FormatError>
where
    R: PlaneReader + ?Sized,
    W: PlaneWriter + ?Sized,
{
    reader.close(false).await?;
    reader.set_metadata_store(Box::new(MemoryMetadataStore::new()))?;
    reader.set_id(input).await?;

    let result = copy_planes(reader, writer, output).await;
    let closed = writer.close().await;
    reader.close(false).await?;
    let stats = result?;
    closed?;

    info!(
        input,
        output,
        series = stats.series,
        planes = stats.planes,
        bytes = stats.bytes,
        "Conversion complete"
    );
    Ok(stats)
}

async fn copy_planes<R, W>(
    reader: &mut R,
    writer: &mut W,
    output: &str,
) -> Result<ConvertStats, FormatError>
where
    R: PlaneReader + ?Sized,
    W: PlaneWriter + ?Sized,
{
    let retrieve: Arc<dyn MetadataStore> = Arc::from(reader.metadata_store()?.clone_store());
    writer.set_metadata_retrieve(retrieve);
    let options = writer
        .options()
        .with_interleaved(reader.is_interleaved()?);
    writer.set_options(options)?;
    writer.set_id(output).await?;

    let mut series_count = reader.series_count()?;
    let stacks = writer.can_do_stacks();
    if !stacks && (series_count > 1 || reader.image_count()? > 1) {
        warn!(
            output,
            format = writer.format(),
            "Writer stores a single plane per file; only the first plane is converted"
        );
        series_count = 1;
    }

    let mut stats = ConvertStats::default();
    for series in 0..series_count {
        reader.set_series(series)?;
        writer.set_series(series)?;

        let (size_x, size_y) = (reader.size_x()?, reader.size_y()?);
        let tile_width = reader.optimal_tile_width()?;
        let tile_height = reader.optimal_tile_height()?;
        let planes = if stacks { reader.image_count()? } else { 1 };
        debug!(series, planes, tile_width, tile_height, "Converting series");

        for plane in 0..planes {
            for region in Region::tiles(size_x, size_y, tile_width, tile_height) {
                let tile = reader.open_bytes(plane, region).await?;
                writer.save_bytes(plane, &tile, region).await?;
                stats.tiles += 1;
                stats.bytes += tile.len() as u64;
            }
            stats.planes += 1;
        }
        stats.series += 1;
    }
    Ok(stats)
}
