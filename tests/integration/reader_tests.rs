//! Reader behavior through the dispatching facade.
//!
//! Tests verify:
//! - Tiles stitched together equal the whole plane
//! - Series, resolution and core index stay consistent in both addressing modes
//! - Plane index math round-trips through the reader
//! - Settings are rejected while a file is open
//! - Wrappers count what they serve and duplicates keep their configuration

use bioimage_formats::error::FormatError;
use bioimage_formats::{
    ImageReader, PlaneReader, ReaderHandle, ReaderOptions, ReaderWrapper, Region, Zct,
};

/// Copy `tile` into its place in a full interleaved raster.
fn stitch(full: &mut [u8], tile: &[u8], region: Region, size_x: usize, pixel_bytes: usize) {
    let row_bytes = region.width * pixel_bytes;
    for row in 0..region.height {
        let dst = ((region.y + row) * size_x + region.x) * pixel_bytes;
        full[dst..dst + row_bytes].copy_from_slice(&tile[row * row_bytes..(row + 1) * row_bytes]);
    }
}

async fn assert_tiles_match_plane(id: &str, tile_width: usize, tile_height: usize) {
    let mut reader = ImageReader::with_defaults().unwrap();
    reader.set_id(id).await.unwrap();

    let (size_x, size_y) = (reader.size_x().unwrap(), reader.size_y().unwrap());
    let pixel_bytes =
        reader.rgb_channel_count().unwrap() * reader.pixel_type().unwrap().bytes_per_pixel();

    for plane in 0..reader.image_count().unwrap() {
        let whole = reader.open_plane(plane).await.unwrap();
        let mut stitched = vec![0u8; whole.len()];
        for region in Region::tiles(size_x, size_y, tile_width, tile_height) {
            let tile = reader.open_bytes(plane, region).await.unwrap();
            assert_eq!(tile.len(), region.width * region.height * pixel_bytes);
            stitch(&mut stitched, &tile, region, size_x, pixel_bytes);
        }
        assert_eq!(&stitched[..], &whole[..], "plane {} of {}", plane, id);
    }
}

// =============================================================================
// Tiled Reads
// =============================================================================

#[tokio::test]
async fn test_gray_tiles_match_plane() {
    assert_tiles_match_plane("gray&sizeX=37&sizeY=23&sizeZ=2.fake", 10, 7).await;
}

#[tokio::test]
async fn test_interleaved_rgb_tiles_match_plane() {
    assert_tiles_match_plane(
        "rgb&sizeX=33&sizeY=17&sizeC=3&rgb=3&interleaved=true.fake",
        8,
        5,
    )
    .await;
}

#[tokio::test]
async fn test_sixteen_bit_tiles_match_plane() {
    assert_tiles_match_plane(
        "deep&sizeX=21&sizeY=19&pixelType=uint16&little=false&sizeT=2.fake",
        16,
        16,
    )
    .await;
}

#[tokio::test]
async fn test_out_of_bounds_requests_fail() {
    let mut reader = ImageReader::with_defaults().unwrap();
    reader.set_id("bounds&sizeX=16&sizeY=16.fake").await.unwrap();

    let err = reader.open_bytes(0, Region::new(10, 10, 8, 8)).await.unwrap_err();
    assert!(matches!(err, FormatError::InvalidTile { .. }));

    // Regions whose far edge does not fit in a usize
    let err = reader
        .open_bytes(0, Region::new(usize::MAX, 0, 1, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, FormatError::InvalidTile { .. }));
    let err = reader
        .open_bytes(0, Region::new(0, usize::MAX, 1, 2))
        .await
        .unwrap_err();
    assert!(matches!(err, FormatError::InvalidTile { .. }));

    let err = reader.open_bytes(1, Region::new(0, 0, 4, 4)).await.unwrap_err();
    assert!(matches!(err, FormatError::InvalidIndex { .. }));

    let mut small = vec![0u8; 3];
    let err = reader
        .open_bytes_into(0, &mut small, Region::new(0, 0, 2, 2))
        .await
        .unwrap_err();
    assert!(matches!(err, FormatError::SizeMismatch { .. }));
}

#[tokio::test]
async fn test_oversized_region_rejected_before_allocation() {
    let mut reader = ImageReader::with_defaults().unwrap();
    reader
        .set_id("deep&sizeX=8&sizeY=8&pixelType=uint16.fake")
        .await
        .unwrap();

    let huge = usize::MAX / 4;
    let err = reader
        .open_bytes(0, Region::new(0, 0, huge, huge))
        .await
        .unwrap_err();
    assert!(matches!(err, FormatError::InvalidTile { .. }));

    // Bad plane indexes are reported before the region is sized
    let err = reader
        .open_bytes(5, Region::new(0, 0, huge, huge))
        .await
        .unwrap_err();
    assert!(matches!(err, FormatError::InvalidIndex { .. }));
}

// =============================================================================
// Series / Resolution Cursor
// =============================================================================

const PYRAMID: &str = "pyr&sizeX=512&sizeY=256&series=2&resolutions=3.fake";

#[tokio::test]
async fn test_nested_cursor_consistency() {
    let mut reader = ImageReader::with_defaults().unwrap();
    reader
        .set_options(ReaderOptions::default().with_flattened_resolutions(false))
        .unwrap();
    reader.set_id(PYRAMID).await.unwrap();

    assert_eq!(reader.series_count().unwrap(), 2);
    assert_eq!(reader.resolution_count().unwrap(), 3);

    reader.set_series(1).unwrap();
    assert_eq!(reader.core_index().unwrap(), 3);
    assert_eq!(reader.series_to_core_index(1).unwrap(), 3);

    reader.set_resolution(2).unwrap();
    assert_eq!(reader.series().unwrap(), 1);
    assert_eq!(reader.resolution().unwrap(), 2);
    assert_eq!(reader.core_index().unwrap(), 5);
    assert_eq!(reader.size_x().unwrap(), 128);
    assert_eq!(reader.size_y().unwrap(), 64);

    // Changing series goes back to full resolution
    reader.set_series(0).unwrap();
    assert_eq!(reader.resolution().unwrap(), 0);
    assert_eq!(reader.size_x().unwrap(), 512);

    reader.set_core_index(4).unwrap();
    assert_eq!(reader.series().unwrap(), 1);
    assert_eq!(reader.resolution().unwrap(), 1);
    assert_eq!(reader.core_index_to_series(4).unwrap(), 1);

    assert!(matches!(
        reader.set_resolution(3),
        Err(FormatError::InvalidIndex { .. })
    ));
    assert!(matches!(
        reader.set_core_index(6),
        Err(FormatError::InvalidIndex { .. })
    ));
}

#[tokio::test]
async fn test_flattened_cursor_consistency() {
    let mut reader = ImageReader::with_defaults().unwrap();
    reader.set_id(PYRAMID).await.unwrap();

    assert_eq!(reader.series_count().unwrap(), 6);
    assert_eq!(reader.resolution_count().unwrap(), 1);

    reader.set_series(4).unwrap();
    assert_eq!(reader.core_index().unwrap(), 4);
    assert_eq!(reader.resolution().unwrap(), 0);
    assert_eq!(reader.size_x().unwrap(), 256);
    assert!(reader.set_resolution(1).is_err());
}

#[tokio::test]
async fn test_plane_index_round_trip() {
    let mut reader = ImageReader::with_defaults().unwrap();
    reader
        .set_id("idx&sizeZ=3&sizeC=2&sizeT=4&dimOrder=XYCTZ.fake")
        .await
        .unwrap();

    let count = reader.image_count().unwrap();
    assert_eq!(count, 24);
    for plane in 0..count {
        let zct = reader.zct_coords(plane).unwrap();
        assert_eq!(reader.index(zct.z, zct.c, zct.t).unwrap(), plane);
    }
    // C varies fastest in XYCTZ
    assert_eq!(reader.zct_coords(1).unwrap(), Zct::new(0, 1, 0));
    assert!(reader.index(3, 0, 0).is_err());
}

// =============================================================================
// Open-File Rules
// =============================================================================

#[tokio::test]
async fn test_settings_locked_while_open() {
    let mut reader = ImageReader::with_defaults().unwrap();
    reader.set_id("locked.fake").await.unwrap();

    let err = reader.set_options(ReaderOptions::default()).unwrap_err();
    assert!(matches!(err, FormatError::InvalidState { .. }));

    reader.close(false).await.unwrap();
    assert!(reader.set_options(ReaderOptions::default()).is_ok());
}

#[tokio::test]
async fn test_close_file_only_keeps_metadata() {
    let mut reader = ImageReader::with_defaults().unwrap();
    reader.set_id("keep&sizeX=40.fake").await.unwrap();

    reader.close(true).await.unwrap();
    assert_eq!(reader.size_x().unwrap(), 40);
    reader.reopen_file().await.unwrap();
    assert_eq!(reader.open_plane(0).await.unwrap().len(), 40 * 512);
}

// =============================================================================
// Wrappers and Duplicates
// =============================================================================

#[tokio::test]
async fn test_wrapper_counts_served_planes() {
    let inner = ImageReader::with_defaults().unwrap();
    let mut wrapper = ReaderWrapper::new("audit", inner);
    wrapper.set_id("stats&sizeX=10&sizeY=10.fake").await.unwrap();

    wrapper.open_plane(0).await.unwrap();
    wrapper.open_bytes(0, Region::new(0, 0, 5, 2)).await.unwrap();

    let stats = wrapper.stats();
    assert_eq!(stats.planes, 2);
    assert_eq!(stats.bytes, 100 + 10);
    assert_eq!(wrapper.label(), "audit");
    assert_eq!(wrapper.format(), "Simulated data");
}

#[tokio::test]
async fn test_unwrap_reaches_the_format_reader() {
    let mut handle = ReaderHandle::from(ReaderWrapper::new(
        "outer",
        ImageReader::with_defaults().unwrap(),
    ));
    handle.set_id("chain.fake").await.unwrap();

    let found = handle.unwrap("formats.in.FakeReader").unwrap();
    assert_eq!(found.format(), "Simulated data");
    assert!(handle.unwrap("formats.in.PnmReader").is_none());
    assert_eq!(
        handle.format_reader().map(|r| r.identifier()),
        Some("formats.in.FakeReader")
    );
}

#[tokio::test]
async fn test_duplicate_preserves_options() {
    let mut reader = ImageReader::with_defaults().unwrap();
    let options = ReaderOptions::default()
        .with_flattened_resolutions(false)
        .with_metadata_filtered(true);
    reader.set_options(options.clone()).unwrap();
    reader.set_id(PYRAMID).await.unwrap();

    let mut copy = reader.duplicate();
    assert!(copy.current_file().is_none());
    assert_eq!(copy.options(), options);

    copy.set_id(PYRAMID).await.unwrap();
    assert_eq!(copy.series_count().unwrap(), 2);
    assert_eq!(reader.series_count().unwrap(), 2);
}
