//! Conversion and summary integration tests.
//!
//! Tests verify:
//! - Converting to an any-map reproduces the source plane
//! - Planar color sources come out interleaved
//! - Stacks are cut to their first plane for single-plane writers
//! - Summaries describe every series and level, as text and JSON

use bioimage_formats::error::FormatError;
use bioimage_formats::{
    convert, summarize, ImageReader, ImageWriter, PlaneReader, ReaderOptions,
};
use tempfile::TempDir;

use super::test_utils::{binary_pgm16, output_path, path_of, plain_pgm, sample, temp_file};

async fn first_plane(id: &str) -> Vec<u8> {
    let mut reader = ImageReader::with_defaults().unwrap();
    reader.set_id(id).await.unwrap();
    reader.open_plane(0).await.unwrap().to_vec()
}

// =============================================================================
// Conversion
// =============================================================================

#[tokio::test]
async fn test_convert_synthetic_gray_image() {
    let dir = TempDir::new().unwrap();
    let output = output_path(&dir, "gray.pgm");
    let input = "gray&sizeX=70&sizeY=45.fake";

    let mut reader = ImageReader::with_defaults().unwrap();
    let mut writer = ImageWriter::with_defaults().unwrap();
    let stats = convert(&mut reader, &mut writer, input, &output).await.unwrap();

    assert_eq!(stats.series, 1);
    assert_eq!(stats.planes, 1);
    assert_eq!(stats.bytes, 70 * 45);
    assert!(reader.current_file().is_none());

    let decoded = image::open(&output).unwrap().to_luma8();
    assert_eq!(decoded.dimensions(), (70, 45));
    assert_eq!(decoded.into_raw(), first_plane(input).await);
}

#[tokio::test]
async fn test_convert_planar_color_to_pixmap() {
    let dir = TempDir::new().unwrap();
    let output = output_path(&dir, "color.ppm");
    let input = "color&sizeX=12&sizeY=9&sizeC=3&rgb=3.fake";

    let mut reader = ImageReader::with_defaults().unwrap();
    let mut writer = ImageWriter::with_defaults().unwrap();
    convert(&mut reader, &mut writer, input, &output).await.unwrap();

    let planar = first_plane(input).await;
    let plane_len = 12 * 9;
    let expected: Vec<u8> = (0..plane_len)
        .flat_map(|i| [planar[i], planar[plane_len + i], planar[2 * plane_len + i]])
        .collect();
    assert_eq!(image::open(&output).unwrap().to_rgb8().into_raw(), expected);
}

#[tokio::test]
async fn test_convert_stack_keeps_first_plane() {
    let dir = TempDir::new().unwrap();
    let output = output_path(&dir, "stack.pgm");
    let input = "stack&sizeX=16&sizeY=16&sizeZ=4&series=2.fake";

    let mut reader = ImageReader::with_defaults().unwrap();
    let mut writer = ImageWriter::with_defaults().unwrap();
    let stats = convert(&mut reader, &mut writer, input, &output).await.unwrap();

    assert_eq!(stats.series, 1);
    assert_eq!(stats.planes, 1);
    assert_eq!(
        image::open(&output).unwrap().to_luma8().into_raw(),
        first_plane(input).await
    );
}

#[tokio::test]
async fn test_convert_plain_to_binary() {
    let dir = TempDir::new().unwrap();
    let input = temp_file(&plain_pgm(8, 5), "pgm");
    let output = output_path(&dir, "binary.pgm");

    let mut reader = ImageReader::with_defaults().unwrap();
    let mut writer = ImageWriter::with_defaults().unwrap();
    convert(&mut reader, &mut writer, &path_of(&input), &output)
        .await
        .unwrap();

    let written = std::fs::read(&output).unwrap();
    assert!(written.starts_with(b"P5\n8 5\n255\n"));
    let expected: Vec<u8> = (0..8 * 5).map(sample).collect();
    assert_eq!(&written[written.len() - 40..], &expected[..]);
}

#[tokio::test]
async fn test_convert_sixteen_bit_round_trip() {
    let dir = TempDir::new().unwrap();
    let data = binary_pgm16(5, 4);
    let input = temp_file(&data, "pgm");
    let output = output_path(&dir, "copy.pgm");

    let mut reader = ImageReader::with_defaults().unwrap();
    let mut writer = ImageWriter::with_defaults().unwrap();
    convert(&mut reader, &mut writer, &path_of(&input), &output)
        .await
        .unwrap();

    assert_eq!(std::fs::read(&output).unwrap(), data);
}

#[tokio::test]
async fn test_convert_unknown_output_suffix() {
    let dir = TempDir::new().unwrap();
    let mut reader = ImageReader::with_defaults().unwrap();
    let mut writer = ImageWriter::with_defaults().unwrap();

    let err = convert(&mut reader, &mut writer, "x.fake", &output_path(&dir, "x.bmp"))
        .await
        .unwrap_err();
    assert!(matches!(err, FormatError::UnrecognizedFormat { .. }));
    assert!(reader.current_file().is_none());
}

// =============================================================================
// Summaries
// =============================================================================

#[tokio::test]
async fn test_summary_of_nested_pyramid() {
    let mut reader = ImageReader::with_defaults().unwrap();
    reader
        .set_options(ReaderOptions::default().with_flattened_resolutions(false))
        .unwrap();
    reader
        .set_id("pyr&sizeX=256&sizeY=128&series=2&resolutions=3&sizeZ=2.fake")
        .await
        .unwrap();

    let summary = summarize(&mut reader, None).await.unwrap();
    assert_eq!(summary.format, "Simulated data");
    assert_eq!(summary.series_count, 2);
    assert_eq!(summary.series.len(), 2);

    let levels: Vec<(usize, usize)> = summary.series[1]
        .levels
        .iter()
        .map(|l| (l.size_x, l.size_y))
        .collect();
    assert_eq!(levels, vec![(256, 128), (128, 64), (64, 32)]);
    assert_eq!(summary.series[0].core.image_count, 2);
    assert_eq!(summary.series[0].thumb_size_x, 128);
    assert_eq!(summary.series[0].thumb_size_y, 64);

    // The cursor is left on the first series
    assert_eq!(reader.series().unwrap(), 0);

    let text = summary.to_string();
    assert!(text.contains("Series #1:"));
    assert!(text.contains("Resolutions = 3"));

    let json: serde_json::Value = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["series_count"], 2);
    assert_eq!(json["series"][1]["levels"][2]["size_x"], 64);
}

#[tokio::test]
async fn test_summary_of_one_series() {
    let mut reader = ImageReader::with_defaults().unwrap();
    reader.set_id("one&series=3.fake").await.unwrap();

    let summary = summarize(&mut reader, Some(2)).await.unwrap();
    assert_eq!(summary.series.len(), 1);
    assert_eq!(summary.series[0].series, 2);

    let err = summarize(&mut reader, Some(3)).await.unwrap_err();
    assert!(matches!(err, FormatError::InvalidIndex { .. }));
}

#[tokio::test]
async fn test_summary_requires_open_file() {
    let mut reader = ImageReader::with_defaults().unwrap();
    let err = summarize(&mut reader, None).await.unwrap_err();
    assert!(matches!(err, FormatError::NotInitialized { .. }));
}
