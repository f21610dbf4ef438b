//! The writer contract: [`FormatWriter`] pairs the shared [`WriterCore`] with
//! a format [`WriterPlugin`]; writers and writer layers implement
//! [`PlaneWriter`].

mod api;
mod core;
mod format_writer;
mod plugin;

pub use self::core::{WriterCore, WriterOptions, DEFAULT_FRAMES_PER_SECOND};
pub use api::PlaneWriter;
pub use format_writer::FormatWriter;
pub use plugin::{WriterPlugin, UNCOMPRESSED};
