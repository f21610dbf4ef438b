//! Reader dispatch integration tests.
//!
//! Tests verify:
//! - Readers are probed in plugin list order and the first claim wins
//! - Reopening the same path neither re-probes nor re-parses
//! - Unrecognized and partially transferred files are rejected

use bioimage_formats::error::FormatError;
use bioimage_formats::{ImageReader, PlaneReader, PluginList, Strictness};

use super::test_utils::{mock_catalog, path_of, temp_file, CountingPlugin};

const LIST: &str = "\
test.in.A   # never claims
test.in.B
test.in.C
";

fn mock_plugins() -> [CountingPlugin; 3] {
    [
        CountingPlugin::new("test.in.A", "Mock A", false),
        CountingPlugin::new("test.in.B", "Mock B", true),
        CountingPlugin::new("test.in.C", "Mock C", true),
    ]
}

fn mock_reader(plugins: &[CountingPlugin]) -> ImageReader {
    let list = PluginList::parse(LIST, &mock_catalog(plugins), Strictness::Strict).unwrap();
    ImageReader::from_list(&list)
}

// =============================================================================
// Selection
// =============================================================================

#[tokio::test]
async fn test_first_claiming_reader_is_selected() {
    let plugins = mock_plugins();
    let mut reader = mock_reader(&plugins);
    let file = temp_file(b"mock data", "dat");
    let path = path_of(&file);

    reader.set_id(&path).await.unwrap();

    assert_eq!(reader.format(), "Mock B");
    assert_eq!(reader.current_reader().unwrap().identifier(), "test.in.B");
    assert_eq!(plugins[0].counts().probes(), 1);
    assert_eq!(plugins[1].counts().probes(), 1);
    assert_eq!(plugins[2].counts().probes(), 0, "readers after the match are not probed");
    assert_eq!(plugins[1].counts().inits(), 1);
    assert_eq!(plugins[2].counts().inits(), 0);
}

#[tokio::test]
async fn test_get_format_matches_selection() {
    let plugins = mock_plugins();
    let mut reader = mock_reader(&plugins);
    let file = temp_file(b"mock data", "dat");

    assert_eq!(reader.get_format(&path_of(&file)).await.unwrap(), "Mock B");
    assert_eq!(plugins[1].counts().inits(), 0, "format lookup does not open the file");
}

#[tokio::test]
async fn test_same_path_is_not_probed_again() {
    let plugins = mock_plugins();
    let mut reader = mock_reader(&plugins);
    let file = temp_file(b"mock data", "dat");
    let path = path_of(&file);

    reader.set_id(&path).await.unwrap();
    reader.set_id(&path).await.unwrap();
    reader.get_handler(&path).await.unwrap();

    assert_eq!(plugins[0].counts().probes(), 1);
    assert_eq!(plugins[1].counts().probes(), 1);
    assert_eq!(plugins[1].counts().inits(), 1);
}

#[tokio::test]
async fn test_close_forgets_the_probed_path() {
    let plugins = mock_plugins();
    let mut reader = mock_reader(&plugins);
    let file = temp_file(b"mock data", "dat");
    let path = path_of(&file);

    reader.set_id(&path).await.unwrap();
    reader.close(false).await.unwrap();
    assert!(reader.current_file().is_none());

    reader.set_id(&path).await.unwrap();
    assert_eq!(plugins[1].counts().probes(), 2);
    assert_eq!(plugins[1].counts().inits(), 2);
}

#[tokio::test]
async fn test_dispatched_reads_reach_selected_reader() {
    let plugins = mock_plugins();
    let mut reader = mock_reader(&plugins);
    let file = temp_file(b"mock data", "dat");
    reader.set_id(&path_of(&file)).await.unwrap();

    assert_eq!(reader.size_x().unwrap(), CountingPlugin::WIDTH);
    assert_eq!(reader.image_count().unwrap(), 2);
    let plane = reader.open_plane(1).await.unwrap();
    assert_eq!(plane.len(), CountingPlugin::WIDTH * CountingPlugin::HEIGHT);
    assert!(plane.iter().all(|&b| b == 1));
    assert_eq!(
        reader.metadata_value("Mock").unwrap().map(|v| v.to_string()),
        Some("test.in.B".to_string())
    );
}

// =============================================================================
// Rejection
// =============================================================================

#[tokio::test]
async fn test_wrong_suffix_is_unrecognized_without_probing() {
    let plugins = mock_plugins();
    let mut reader = mock_reader(&plugins);
    let file = temp_file(b"mock data", "txt");

    let err = reader.set_id(&path_of(&file)).await.unwrap_err();
    assert!(matches!(err, FormatError::UnrecognizedFormat { .. }));
    assert!(plugins.iter().all(|p| p.counts().probes() == 0));
}

#[tokio::test]
async fn test_partial_files_are_rejected() {
    let plugins = mock_plugins();
    let mut reader = mock_reader(&plugins);
    let file = temp_file(b"mock data", "dat.filepart");
    let path = path_of(&file);

    assert!(!reader.is_this_type(&path, true).await);
    let err = reader.set_id(&path).await.unwrap_err();
    assert!(matches!(err, FormatError::UnrecognizedFormat { .. }));
}

#[tokio::test]
async fn test_content_checks_need_permission_to_open() {
    let plugins = mock_plugins();
    let mut reader = mock_reader(&plugins);
    reader.set_allow_open_files(false);
    let file = temp_file(b"mock data", "dat");

    let err = reader.set_id(&path_of(&file)).await.unwrap_err();
    assert!(matches!(err, FormatError::UnrecognizedFormat { .. }));
    assert!(plugins.iter().all(|p| p.counts().probes() == 0));
}

#[tokio::test]
async fn test_accessors_before_set_id_fail() {
    let plugins = mock_plugins();
    let reader = mock_reader(&plugins);

    assert!(matches!(
        reader.size_x(),
        Err(FormatError::NotInitialized { .. })
    ));
    assert_eq!(reader.suffixes(), vec!["dat"]);
}

// =============================================================================
// Duplication
// =============================================================================

#[tokio::test]
async fn test_duplicate_keeps_order_and_settings() {
    let plugins = mock_plugins();
    let mut reader = mock_reader(&plugins);
    reader.set_allow_open_files(false);
    let file = temp_file(b"mock data", "dat");
    let _ = reader.set_id(&path_of(&file)).await;

    let copy = reader.duplicate();
    assert!(!copy.allow_open_files());
    assert!(copy.current_file().is_none());
    let identifiers: Vec<&str> = copy.readers().iter().map(|r| r.identifier()).collect();
    assert_eq!(identifiers, vec!["test.in.A", "test.in.B", "test.in.C"]);
}
