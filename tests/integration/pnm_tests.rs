//! Any-map integration tests.
//!
//! Tests verify:
//! - Binary graymaps and pixmaps are read natively, whole or tiled
//! - 16-bit samples keep their big-endian byte order
//! - Plain-text files fall back to the legacy decoder
//! - Truncated and foreign files are rejected

use bioimage_formats::error::FormatError;
use bioimage_formats::{ImageReader, PixelType, PlaneReader, ReaderHandle, Region};

use super::test_utils::{
    binary_pgm, binary_pgm16, binary_ppm, path_of, plain_pgm, sample, temp_file,
};

fn using_legacy(reader: &ImageReader) -> bool {
    match reader.current_reader() {
        Some(ReaderHandle::Fallback(delegate)) => delegate.using_legacy(),
        other => panic!(
            "expected the any-map delegate, got {:?}",
            other.map(|r| r.identifier())
        ),
    }
}

// =============================================================================
// Binary Files
// =============================================================================

#[tokio::test]
async fn test_binary_graymap() {
    let file = temp_file(&binary_pgm(13, 9), "pgm");
    let mut reader = ImageReader::with_defaults().unwrap();
    reader.set_id(&path_of(&file)).await.unwrap();

    assert_eq!(reader.format(), "Portable Any Map");
    assert!(!using_legacy(&reader));
    assert_eq!(reader.size_x().unwrap(), 13);
    assert_eq!(reader.size_y().unwrap(), 9);
    assert_eq!(reader.image_count().unwrap(), 1);
    assert_eq!(reader.pixel_type().unwrap(), PixelType::Uint8);
    assert!(!reader.is_rgb().unwrap());

    let plane = reader.open_plane(0).await.unwrap();
    let expected: Vec<u8> = (0..13 * 9).map(sample).collect();
    assert_eq!(&plane[..], &expected[..]);

    let tile = reader.open_bytes(0, Region::new(4, 2, 3, 2)).await.unwrap();
    let expected_tile: Vec<u8> = [30, 31, 32, 43, 44, 45].into_iter().map(sample).collect();
    assert_eq!(&tile[..], &expected_tile[..]);
}

#[tokio::test]
async fn test_binary_pixmap_is_interleaved_rgb() {
    let data = binary_ppm(5, 4);
    let header_len = data.len() - 5 * 4 * 3;
    let file = temp_file(&data, "ppm");
    let mut reader = ImageReader::with_defaults().unwrap();
    reader.set_id(&path_of(&file)).await.unwrap();

    assert!(reader.is_rgb().unwrap());
    assert!(reader.is_interleaved().unwrap());
    assert_eq!(reader.size_c().unwrap(), 3);
    assert_eq!(reader.rgb_channel_count().unwrap(), 3);
    assert_eq!(reader.image_count().unwrap(), 1);

    let plane = reader.open_plane(0).await.unwrap();
    assert_eq!(&plane[..], &data[header_len..]);
}

#[tokio::test]
async fn test_sixteen_bit_graymap_stays_big_endian() {
    let data = binary_pgm16(6, 3);
    let header_len = data.len() - 6 * 3 * 2;
    let file = temp_file(&data, "pgm");
    let mut reader = ImageReader::with_defaults().unwrap();
    reader.set_id(&path_of(&file)).await.unwrap();

    assert_eq!(reader.pixel_type().unwrap(), PixelType::Uint16);
    assert!(!reader.is_little_endian().unwrap());
    let plane = reader.open_plane(0).await.unwrap();
    assert_eq!(&plane[..], &data[header_len..]);
    assert_eq!(u16::from_be_bytes([plane[2], plane[3]]), 300);
}

#[tokio::test]
async fn test_header_is_recorded_as_metadata() {
    let file = temp_file(&binary_pgm(4, 4), "pgm");
    let mut reader = ImageReader::with_defaults().unwrap();
    reader.set_id(&path_of(&file)).await.unwrap();

    let magic = reader.metadata_value("Magic").unwrap().map(|v| v.to_string());
    assert_eq!(magic.as_deref(), Some("P5"));
    assert_eq!(reader.used_files(false).unwrap(), vec![path_of(&file)]);
}

// =============================================================================
// Plain Files (Legacy Fallback)
// =============================================================================

#[tokio::test]
async fn test_plain_graymap_uses_fallback() {
    let file = temp_file(&plain_pgm(7, 5), "pgm");
    let mut reader = ImageReader::with_defaults().unwrap();
    reader.set_id(&path_of(&file)).await.unwrap();

    assert!(using_legacy(&reader));
    assert_eq!(reader.size_x().unwrap(), 7);
    assert_eq!(reader.size_y().unwrap(), 5);

    let plane = reader.open_plane(0).await.unwrap();
    let expected: Vec<u8> = (0..7 * 5).map(sample).collect();
    assert_eq!(&plane[..], &expected[..]);

    let tile = reader.open_bytes(0, Region::new(1, 1, 2, 2)).await.unwrap();
    assert_eq!(&tile[..], &[sample(8), sample(9), sample(15), sample(16)]);
}

#[tokio::test]
async fn test_plain_and_binary_decode_identically() {
    let plain = temp_file(&plain_pgm(9, 6), "pgm");
    let binary = temp_file(&binary_pgm(9, 6), "pgm");
    let mut reader = ImageReader::with_defaults().unwrap();

    reader.set_id(&path_of(&plain)).await.unwrap();
    let from_plain = reader.open_plane(0).await.unwrap();
    reader.set_id(&path_of(&binary)).await.unwrap();
    assert!(!using_legacy(&reader));
    let from_binary = reader.open_plane(0).await.unwrap();

    assert_eq!(from_plain, from_binary);
}

#[tokio::test]
async fn test_plain_reopen_after_file_close() {
    let file = temp_file(&plain_pgm(3, 3), "pgm");
    let mut reader = ImageReader::with_defaults().unwrap();
    reader.set_id(&path_of(&file)).await.unwrap();
    let before = reader.open_plane(0).await.unwrap();

    reader.close(true).await.unwrap();
    reader.reopen_file().await.unwrap();
    assert_eq!(reader.open_plane(0).await.unwrap(), before);
}

// =============================================================================
// Rejection
// =============================================================================

#[tokio::test]
async fn test_truncated_file_fails_both_delegates() {
    let mut data = binary_pgm(10, 10);
    data.truncate(data.len() - 20);
    let file = temp_file(&data, "pgm");
    let mut reader = ImageReader::with_defaults().unwrap();

    let err = reader.set_id(&path_of(&file)).await.unwrap_err();
    match err {
        FormatError::DelegateFailed { preferred, .. } => {
            assert!(matches!(*preferred, FormatError::Malformed { .. }));
        }
        other => panic!("expected DelegateFailed, got {}", other),
    }
    assert!(reader.current_file().is_none());
}

#[tokio::test]
async fn test_unaddressable_header_is_malformed() {
    let file = temp_file(b"P6\n4294967295 4294967295\n65535\n", "ppm");
    let mut reader = ImageReader::with_defaults().unwrap();

    let err = reader.set_id(&path_of(&file)).await.unwrap_err();
    match err {
        FormatError::DelegateFailed { preferred, fallback } => {
            assert!(matches!(*preferred, FormatError::Malformed { .. }));
            assert!(matches!(*fallback, FormatError::Malformed { .. }));
        }
        other => panic!("expected DelegateFailed, got {}", other),
    }
    assert!(reader.current_file().is_none());
}

#[tokio::test]
async fn test_foreign_content_with_pnm_suffix_is_unrecognized() {
    let file = temp_file(b"GIF89a not an any-map", "pgm");
    let mut reader = ImageReader::with_defaults().unwrap();

    assert!(!reader.is_this_type(&path_of(&file), true).await);
    let err = reader.set_id(&path_of(&file)).await.unwrap_err();
    assert!(matches!(err, FormatError::UnrecognizedFormat { .. }));
}

#[tokio::test]
async fn test_content_sniffing_from_bytes() {
    let reader = ImageReader::with_defaults().unwrap();
    assert!(reader.is_this_type_bytes(&binary_pgm(2, 2)).await);
    assert!(reader.is_this_type_bytes(&plain_pgm(2, 2)).await);
    assert!(!reader.is_this_type_bytes(b"P7\n").await);
}
