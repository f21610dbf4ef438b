//! Plugin list integration tests.
//!
//! Tests verify:
//! - Lists load from files and keep their order in the reader facade
//! - Strict lists reject unknown identifiers; lenient ones drop them
//! - External entries and malformed lines do not stop a list from loading

use bioimage_formats::error::RegistryError;
use bioimage_formats::{
    builtin_reader_catalog, builtin_writer_catalog, ImageReader, ImageWriter, PlaneReader,
    PluginList, ReaderHandle, Strictness, WriterHandle,
};

use super::test_utils::{binary_pgm, path_of, temp_file};

#[tokio::test]
async fn test_list_loaded_from_file() {
    let file = temp_file(
        b"# custom order\nformats.in.PnmReader\nformats.in.FakeReader[tiles=64]\n",
        "txt",
    );
    let list: PluginList<ReaderHandle> =
        PluginList::load(file.path(), &builtin_reader_catalog(), Strictness::Strict)
            .await
            .unwrap();

    assert_eq!(
        list.identifiers().collect::<Vec<_>>(),
        vec!["formats.in.PnmReader", "formats.in.FakeReader"]
    );
    assert_eq!(list.option("formats.in.FakeReader.tiles"), Some("64"));

    let reader = ImageReader::from_list(&list);
    let order: Vec<&str> = reader.readers().iter().map(|r| r.identifier()).collect();
    assert_eq!(order, vec!["formats.in.PnmReader", "formats.in.FakeReader"]);
}

#[tokio::test]
async fn test_missing_list_file_is_an_io_error() {
    let result: Result<PluginList<ReaderHandle>, _> = PluginList::load(
        "/nonexistent/readers.txt",
        &builtin_reader_catalog(),
        Strictness::Lenient,
    )
    .await;
    assert!(matches!(result, Err(RegistryError::Io(_))));
}

#[test]
fn test_strict_list_rejects_unknown_identifier() {
    let text = "formats.in.FakeReader\nformats.in.NoSuchReader\n";
    let result: Result<PluginList<ReaderHandle>, _> =
        PluginList::parse(text, &builtin_reader_catalog(), Strictness::Strict);

    match result {
        Err(RegistryError::UnresolvedPlugin { identifier }) => {
            assert_eq!(identifier, "formats.in.NoSuchReader");
        }
        other => panic!("expected UnresolvedPlugin, got {:?}", other.map(|l| l.len())),
    }
}

#[test]
fn test_lenient_list_drops_unknown_identifier() {
    let text = "formats.in.NoSuchReader\nformats.in.FakeReader\n";
    let list: PluginList<ReaderHandle> =
        PluginList::parse(text, &builtin_reader_catalog(), Strictness::Lenient).unwrap();

    assert_eq!(list.identifiers().collect::<Vec<_>>(), vec!["formats.in.FakeReader"]);
    assert!(matches!(
        list.diagnostics(),
        [RegistryError::UnresolvedPlugin { .. }]
    ));
}

#[test]
fn test_external_entries_are_skipped_even_when_strict() {
    let text = "formats.in.Elsewhere[type=external]\nformats.in.PnmReader\n";
    let list: PluginList<ReaderHandle> =
        PluginList::parse(text, &builtin_reader_catalog(), Strictness::Strict).unwrap();

    assert_eq!(list.len(), 1);
    assert!(list.diagnostics().is_empty());
}

#[test]
fn test_malformed_lines_are_skipped() {
    let text = "formats.in.FakeReader[tiles\n[x=1]\nformats.in.PnmReader\n";
    let list: PluginList<ReaderHandle> =
        PluginList::parse(text, &builtin_reader_catalog(), Strictness::Strict).unwrap();

    assert_eq!(list.identifiers().collect::<Vec<_>>(), vec!["formats.in.PnmReader"]);
    assert_eq!(list.diagnostics().len(), 2);
    assert!(list
        .diagnostics()
        .iter()
        .all(|d| matches!(d, RegistryError::ConfigParse { .. })));
}

#[test]
fn test_reader_catalog_cannot_build_writers() {
    let result: Result<PluginList<WriterHandle>, _> = PluginList::parse(
        "formats.in.FakeReader\n",
        &builtin_writer_catalog(),
        Strictness::Strict,
    );
    assert!(result.is_err());
}

#[tokio::test]
async fn test_prepended_list_takes_priority() {
    let catalog = builtin_reader_catalog();
    let mut list: PluginList<ReaderHandle> =
        PluginList::parse("formats.in.PnmReader\n", &catalog, Strictness::Strict).unwrap();
    let plain: PluginList<ReaderHandle> =
        PluginList::parse("formats.in.PlainPnmReader\n", &catalog, Strictness::Strict).unwrap();
    list.prepend(&plain);

    // The plain-only reader now sees binary files first and refuses them
    let file = temp_file(&binary_pgm(4, 4), "pgm");
    let mut reader = ImageReader::from_list(&list);
    assert!(reader.set_id(&path_of(&file)).await.is_err());
    assert_eq!(
        reader.current_reader().map(|r| r.identifier().to_string()),
        Some("formats.in.PlainPnmReader".to_string())
    );
}

#[test]
fn test_default_writer_facade() {
    let writer = ImageWriter::with_defaults().unwrap();
    assert_eq!(writer.writers().len(), 1);
    assert!(writer.writer("formats.out.PnmWriter").is_some());
}
