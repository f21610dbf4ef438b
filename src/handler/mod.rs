//! Reader and writer composition.
//!
//! Layers nest as a tree of [`ReaderHandle`] / [`WriterHandle`] values:
//!
//! ```text
//! ImageReader (Dispatch)
//!   ├── FormatReader (Direct)              formats.in.FakeReader
//!   └── DelegateReader (Fallback)          formats.in.PnmReader
//!         ├── FormatReader                 native binary PNM
//!         └── FormatReader                 legacy plain PNM
//! ```
//!
//! Every layer implements the same reader (or writer) trait, so callers do not
//! care how deep the chain is.

mod delegate;
mod dispatch;
mod image_writer;
mod reader_handle;
mod wrapper;
mod writer_handle;
mod writer_wrapper;

pub use delegate::DelegateReader;
pub use dispatch::ImageReader;
pub use image_writer::ImageWriter;
pub use reader_handle::ReaderHandle;
pub use wrapper::{ReadStats, ReaderWrapper};
pub use writer_handle::WriterHandle;
pub use writer_wrapper::{WriteStats, WriterWrapper};
