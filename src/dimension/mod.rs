//! Dimension orders, modulo sub-axes and plane index math.

mod indexer;
mod modulo;
mod order;

pub use indexer::{
    coords, coords_modulo, index, index_modulo, position_to_raster, raster_length,
    raster_to_position, reordered_index, ModuloCoords,
};
pub use modulo::{modulo_type, Modulo};
pub use order::{Axis, DimensionOrder, Zct};
