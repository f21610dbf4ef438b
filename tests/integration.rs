//! Integration tests for bioimage-formats.
//!
//! These tests verify end-to-end functionality including:
//! - Reader selection through ordered plugin lists
//! - Tiled reads, series and resolution addressing on synthetic images
//! - Any-map reading with the plain-text fallback
//! - Any-map writing checked against an independent decoder
//! - Plugin list files, conversion and image summaries

mod integration {
    pub mod test_utils;

    pub mod dispatch_tests;
    pub mod pnm_tests;
    pub mod reader_tests;
    pub mod registry_tests;
    pub mod tools_tests;
    pub mod writer_tests;
}
