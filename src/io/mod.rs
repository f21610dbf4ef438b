//! Byte-level I/O shared by every reader and writer.
//!
//! - [`RangeReader`] is the positional read abstraction; [`FileRangeReader`]
//!   and [`MemoryRangeReader`] implement it for local files and buffers.
//! - [`BlockCache`] amortizes the many small reads header parsing and row-wise
//!   tile reads produce.
//! - [`RandomAccessStream`] and [`RandomAccessOutput`] are the cursor-based
//!   handles a reader or writer owns while a file is open.

mod block_cache;
mod file_reader;
mod output;
mod range_reader;
mod stream;

pub use block_cache::{BlockCache, DEFAULT_BLOCK_SIZE, DEFAULT_CACHE_CAPACITY};
pub use file_reader::FileRangeReader;
pub use output::RandomAccessOutput;
pub use range_reader::{
    pack_bytes, read_u16_be, read_u16_le, read_u32_be, read_u32_le, MemoryRangeReader,
    RangeReader,
};
pub use stream::RandomAccessStream;
