//! Writer integration tests.
//!
//! Tests verify:
//! - The writer facade picks a writer by output suffix
//! - Written any-maps decode with an independent decoder
//! - Tiles land at the right offsets and planar input is interleaved
//! - Unsupported geometry and missing metadata are reported

use std::sync::Arc;

use bioimage_formats::error::FormatError;
use bioimage_formats::{
    CoreMetadata, ImageWriter, MemoryMetadataStore, MetadataStore, PixelType, PlaneWriter,
    Region, WriterOptions, WriterWrapper,
};
use tempfile::TempDir;

use super::test_utils::{output_path, sample};

fn retrieve(
    size_x: usize,
    size_y: usize,
    size_c: usize,
    pixel_type: PixelType,
) -> Arc<dyn MetadataStore> {
    let core = CoreMetadata {
        size_x,
        size_y,
        size_c,
        rgb: size_c > 1,
        pixel_type,
        ..CoreMetadata::default()
    };
    Arc::new(MemoryMetadataStore::describing(&core))
}

async fn open_writer(path: &str, retrieve: Arc<dyn MetadataStore>) -> ImageWriter {
    let mut writer = ImageWriter::with_defaults().unwrap();
    writer.set_metadata_retrieve(retrieve);
    writer.set_id(path).await.unwrap();
    writer
}

// =============================================================================
// Writer Selection
// =============================================================================

#[tokio::test]
async fn test_writer_selected_by_suffix() {
    let dir = TempDir::new().unwrap();
    let mut writer = ImageWriter::with_defaults().unwrap();
    writer.set_metadata_retrieve(retrieve(4, 4, 1, PixelType::Uint8));

    writer.set_id(&output_path(&dir, "out.PGM")).await.unwrap();
    assert_eq!(writer.format(), "Portable Any Map");
    assert_eq!(
        writer.current_writer().map(|w| w.identifier().to_string()),
        Some("formats.out.PnmWriter".to_string())
    );
    writer.close().await.unwrap();

    let err = writer.set_id(&output_path(&dir, "out.tiff")).await.unwrap_err();
    assert!(matches!(err, FormatError::UnrecognizedFormat { .. }));
}

#[tokio::test]
async fn test_same_file_by_another_path_is_not_reopened() {
    let dir = TempDir::new().unwrap();
    let path = output_path(&dir, "same.pgm");
    let alias = format!("{}/./same.pgm", dir.path().display());
    let mut writer = open_writer(&path, retrieve(4, 4, 1, PixelType::Uint8)).await;

    writer.save_bytes(0, &[1u8; 8], Region::new(0, 0, 4, 2)).await.unwrap();
    writer.set_id(&alias).await.unwrap();
    assert_eq!(writer.current_file(), Some(path.as_str()));
    assert!(writer.is_plane_written(0, 0));

    writer.save_bytes(0, &[2u8; 8], Region::new(0, 2, 4, 2)).await.unwrap();
    writer.close().await.unwrap();

    let decoded = image::open(&path).unwrap().to_luma8().into_raw();
    assert_eq!(&decoded[..8], &[1u8; 8]);
    assert_eq!(&decoded[8..], &[2u8; 8]);
}

// =============================================================================
// Decoded Output
// =============================================================================

#[tokio::test]
async fn test_graymap_decodes_independently() {
    let dir = TempDir::new().unwrap();
    let path = output_path(&dir, "gray.pgm");
    let (w, h) = (11, 7);
    let pixels: Vec<u8> = (0..w * h).map(sample).collect();

    let mut writer = open_writer(&path, retrieve(w, h, 1, PixelType::Uint8)).await;
    writer.save_plane(0, &pixels).await.unwrap();
    writer.close().await.unwrap();

    let decoded = image::open(&path).unwrap().to_luma8();
    assert_eq!(decoded.dimensions(), (w as u32, h as u32));
    assert_eq!(decoded.into_raw(), pixels);
}

#[tokio::test]
async fn test_tiles_land_at_their_offsets() {
    let dir = TempDir::new().unwrap();
    let path = output_path(&dir, "tiled.pgm");
    let (w, h) = (10, 6);
    let pixels: Vec<u8> = (0..w * h).map(sample).collect();

    let mut writer = open_writer(&path, retrieve(w, h, 1, PixelType::Uint8)).await;
    // Bottom-right tile first; order must not matter
    for region in Region::tiles(w, h, 4, 4).into_iter().rev() {
        let mut tile = Vec::with_capacity(region.width * region.height);
        for row in region.y..region.y + region.height {
            let start = row * w + region.x;
            tile.extend_from_slice(&pixels[start..start + region.width]);
        }
        writer.save_bytes(0, &tile, region).await.unwrap();
    }
    writer.close().await.unwrap();

    let decoded = image::open(&path).unwrap().to_luma8();
    assert_eq!(decoded.into_raw(), pixels);
}

#[tokio::test]
async fn test_planar_rgb_is_interleaved_on_disk() {
    let dir = TempDir::new().unwrap();
    let path = output_path(&dir, "color.ppm");
    let (w, h) = (3, 2);
    // Planar input: all red, then all green, then all blue
    let planar: Vec<u8> = (0..w * h * 3).map(|i| i as u8).collect();

    let mut writer = open_writer(&path, retrieve(w, h, 3, PixelType::Uint8)).await;
    writer.save_plane(0, &planar).await.unwrap();
    writer.close().await.unwrap();

    let decoded = image::open(&path).unwrap().to_rgb8();
    let first = decoded.get_pixel(0, 0).0;
    let last = decoded.get_pixel(2, 1).0;
    assert_eq!(first, [0, 6, 12]);
    assert_eq!(last, [5, 11, 17]);
}

#[tokio::test]
async fn test_interleaved_rgb_is_copied() {
    let dir = TempDir::new().unwrap();
    let path = output_path(&dir, "packed.ppm");
    let (w, h) = (4, 3);
    let packed: Vec<u8> = (0..w * h * 3).map(sample).collect();

    let mut writer = ImageWriter::with_defaults().unwrap();
    writer.set_metadata_retrieve(retrieve(w, h, 3, PixelType::Uint8));
    writer
        .set_options(WriterOptions::default().with_interleaved(true))
        .unwrap();
    writer.set_id(&path).await.unwrap();
    writer.save_plane(0, &packed).await.unwrap();
    writer.close().await.unwrap();

    assert_eq!(image::open(&path).unwrap().to_rgb8().into_raw(), packed);
}

#[tokio::test]
async fn test_little_endian_samples_are_stored_big_endian() {
    let dir = TempDir::new().unwrap();
    let path = output_path(&dir, "deep.pgm");
    let values: Vec<u16> = (0..12).map(|i| i * 5000 + 1).collect();
    let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();

    let core = CoreMetadata {
        size_x: 4,
        size_y: 3,
        pixel_type: PixelType::Uint16,
        little_endian: true,
        ..CoreMetadata::default()
    };
    let mut writer = open_writer(&path, Arc::new(MemoryMetadataStore::describing(&core))).await;
    writer.save_plane(0, &bytes).await.unwrap();
    writer.close().await.unwrap();

    let raw = std::fs::read(&path).unwrap();
    assert!(raw.starts_with(b"P5\n4 3\n65535\n"));
    let decoded = image::open(&path).unwrap().to_luma16();
    assert_eq!(decoded.into_raw(), values);
}

// =============================================================================
// Rejection
// =============================================================================

#[tokio::test]
async fn test_unsupported_pixel_type_rejected() {
    let dir = TempDir::new().unwrap();
    let path = output_path(&dir, "float.pgm");
    let mut writer = open_writer(&path, retrieve(2, 2, 1, PixelType::Float)).await;

    assert!(!writer.is_supported_type(PixelType::Float));
    let err = writer.save_plane(0, &[0u8; 16]).await.unwrap_err();
    assert!(matches!(err, FormatError::Unsupported { .. }));
}

#[tokio::test]
async fn test_single_plane_writer_rejects_stacks() {
    let dir = TempDir::new().unwrap();
    let path = output_path(&dir, "stack.pgm");
    let core = CoreMetadata {
        size_x: 2,
        size_y: 2,
        size_z: 3,
        image_count: 3,
        ..CoreMetadata::default()
    };
    let mut writer = open_writer(&path, Arc::new(MemoryMetadataStore::describing(&core))).await;

    assert!(!writer.can_do_stacks());
    writer.save_plane(0, &[1, 2, 3, 4]).await.unwrap();
    let err = writer.save_plane(1, &[1, 2, 3, 4]).await.unwrap_err();
    assert!(matches!(err, FormatError::Unsupported { .. }));
}

#[tokio::test]
async fn test_overflowing_tile_rejected() {
    let dir = TempDir::new().unwrap();
    let path = output_path(&dir, "edge.pgm");
    let mut writer = open_writer(&path, retrieve(4, 4, 1, PixelType::Uint8)).await;

    let err = writer
        .save_bytes(0, &[0u8; 1], Region::new(usize::MAX, 0, 1, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, FormatError::InvalidTile { .. }));
    let err = writer
        .save_bytes(0, &[0u8; 4], Region::new(0, 3, 2, usize::MAX))
        .await
        .unwrap_err();
    assert!(matches!(err, FormatError::InvalidTile { .. }));
}

#[tokio::test]
async fn test_missing_retrieve_fields_reported() {
    let dir = TempDir::new().unwrap();
    let path = output_path(&dir, "empty.pgm");
    let mut writer = open_writer(&path, Arc::new(MemoryMetadataStore::new())).await;

    let err = writer.save_plane(0, &[0u8; 4]).await.unwrap_err();
    assert!(matches!(err, FormatError::MissingMetadata { .. }));
}

#[tokio::test]
async fn test_unknown_compression_rejected() {
    let mut writer = ImageWriter::with_defaults().unwrap();
    let dir = TempDir::new().unwrap();
    writer.set_metadata_retrieve(retrieve(2, 2, 1, PixelType::Uint8));
    writer.set_id(&output_path(&dir, "c.pgm")).await.unwrap();

    let err = writer
        .set_options(WriterOptions::default().with_compression("JPEG"))
        .unwrap_err();
    assert!(matches!(err, FormatError::Unsupported { .. }));
}

// =============================================================================
// Wrapper
// =============================================================================

#[tokio::test]
async fn test_writer_wrapper_counts_saved_bytes() {
    let dir = TempDir::new().unwrap();
    let path = output_path(&dir, "wrapped.pgm");
    let mut wrapper = WriterWrapper::new("audit", ImageWriter::with_defaults().unwrap());
    wrapper.set_metadata_retrieve(retrieve(6, 4, 1, PixelType::Uint8));
    wrapper.set_id(&path).await.unwrap();

    wrapper.save_bytes(0, &[7u8; 12], Region::new(0, 0, 6, 2)).await.unwrap();
    wrapper.save_bytes(0, &[9u8; 12], Region::new(0, 2, 6, 2)).await.unwrap();
    wrapper.close().await.unwrap();

    let stats = wrapper.stats();
    assert_eq!(stats.planes, 2);
    assert_eq!(stats.bytes, 24);

    let decoded = image::open(&path).unwrap().to_luma8().into_raw();
    assert_eq!(&decoded[..12], &[7u8; 12]);
    assert_eq!(&decoded[12..], &[9u8; 12]);
}
