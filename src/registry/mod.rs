//! Plugin registration: a catalog of known identifiers and ordered plugin
//! lists parsed from text.

mod catalog;
mod plugin_list;

pub use catalog::{Factory, PluginCatalog};
pub use plugin_list::{PluginList, Strictness};

/// The built-in reader list.
pub const DEFAULT_READERS: &str = include_str!("readers.txt");

/// The built-in writer list.
pub const DEFAULT_WRITERS: &str = include_str!("writers.txt");
