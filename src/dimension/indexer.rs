//! Rasterization between (Z, C, T) coordinates and linear plane indices.
//!
//! A dimension order such as `XYZCT` lists the plane axes from fastest to
//! slowest varying after the leading `XY`. The plane index is the mixed-radix
//! number whose digits are the coordinates in that order:
//!
//! ```text
//! index = v0 + v1 * len0 + v2 * len0 * len1
//! ```
//!
//! All functions validate their inputs and fail instead of clamping.

use serde::{Deserialize, Serialize};

use super::{Axis, DimensionOrder, Zct};
use crate::error::FormatError;

/// Effective and modulo coordinates of a plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ModuloCoords {
    /// Coordinates along the parent axes, divided by the modulo lengths
    pub effective: Zct,
    /// Position along each modulo sub-axis
    pub modulo: Zct,
}

// =============================================================================
// Validation
// =============================================================================

fn check_sizes(sizes: Zct, image_count: usize) -> Result<(), FormatError> {
    for (name, size) in [("sizeZ", sizes.z), ("sizeC", sizes.c), ("sizeT", sizes.t)] {
        if size == 0 {
            return Err(FormatError::size_mismatch(
                format!("{} (must be positive)", name),
                1,
                0,
            ));
        }
    }
    if image_count == 0 {
        return Err(FormatError::size_mismatch(
            "image count (must be positive)",
            1,
            0,
        ));
    }
    if image_count != sizes.product() {
        return Err(FormatError::size_mismatch(
            format!(
                "image count vs Z, C and T dimensions ({}, {}, {})",
                sizes.z, sizes.c, sizes.t
            ),
            sizes.product(),
            image_count,
        ));
    }
    Ok(())
}

fn check_coord(kind: &'static str, value: usize, size: usize) -> Result<(), FormatError> {
    if value >= size {
        return Err(FormatError::invalid_index(kind, value, size));
    }
    Ok(())
}

/// Lengths of the three plane axes in rasterization order.
fn radix(order: DimensionOrder, sizes: Zct) -> [usize; 3] {
    order.plane_axes().map(|axis| sizes.get(axis).unwrap_or(1))
}

// =============================================================================
// Plane index <-> (Z, C, T)
// =============================================================================

/// Linear plane index of `(z, c, t)`.
///
/// # Example
///
/// ```
/// use bioimage_formats::dimension::{index, DimensionOrder, Zct};
///
/// let i = index(DimensionOrder::XYZCT, Zct::new(2, 3, 1), 6, Zct::new(1, 2, 0)).unwrap();
/// assert_eq!(i, 5);
/// ```
pub fn index(
    order: DimensionOrder,
    sizes: Zct,
    image_count: usize,
    coords: Zct,
) -> Result<usize, FormatError> {
    check_sizes(sizes, image_count)?;
    check_coord("Z", coords.z, sizes.z)?;
    check_coord("C", coords.c, sizes.c)?;
    check_coord("T", coords.t, sizes.t)?;

    let [len0, len1, _] = radix(order, sizes);
    let [v0, v1, v2] = order
        .plane_axes()
        .map(|axis| coords.get(axis).unwrap_or(0));

    Ok(v0 + v1 * len0 + v2 * len0 * len1)
}

/// Inverse of [`index`]: the `(z, c, t)` coordinates of plane `index`.
pub fn coords(
    order: DimensionOrder,
    sizes: Zct,
    image_count: usize,
    index: usize,
) -> Result<Zct, FormatError> {
    check_sizes(sizes, image_count)?;
    check_coord("plane", index, image_count)?;

    let [len0, len1, _] = radix(order, sizes);
    let digits = [index % len0, index / len0 % len1, index / len0 / len1];

    let mut zct = Zct::default();
    for (axis, value) in order.plane_axes().into_iter().zip(digits) {
        match axis {
            Axis::Z => zct.z = value,
            Axis::C => zct.c = value,
            Axis::T => zct.t = value,
            Axis::X | Axis::Y => {}
        }
    }
    Ok(zct)
}

// =============================================================================
// Modulo-aware variants
// =============================================================================

/// Plane index from effective coordinates plus positions along modulo sub-axes.
///
/// `sizes` are the real (unsplit) sizes and `modulo_lengths` the modulo
/// lengths along Z, C and T. Each real coordinate is
/// `effective * modulo_length + modulo`.
pub fn index_modulo(
    order: DimensionOrder,
    sizes: Zct,
    modulo_lengths: Zct,
    image_count: usize,
    effective: Zct,
    modulo: Zct,
) -> Result<usize, FormatError> {
    check_modulo_lengths(sizes, modulo_lengths)?;
    check_coord("modulo Z", modulo.z, modulo_lengths.z)?;
    check_coord("modulo C", modulo.c, modulo_lengths.c)?;
    check_coord("modulo T", modulo.t, modulo_lengths.t)?;

    let real = Zct::new(
        effective.z * modulo_lengths.z + modulo.z,
        effective.c * modulo_lengths.c + modulo.c,
        effective.t * modulo_lengths.t + modulo.t,
    );
    index(order, sizes, image_count, real)
}

/// Inverse of [`index_modulo`].
pub fn coords_modulo(
    order: DimensionOrder,
    sizes: Zct,
    modulo_lengths: Zct,
    image_count: usize,
    index: usize,
) -> Result<ModuloCoords, FormatError> {
    check_modulo_lengths(sizes, modulo_lengths)?;
    let real = coords(order, sizes, image_count, index)?;

    Ok(ModuloCoords {
        effective: Zct::new(
            real.z / modulo_lengths.z,
            real.c / modulo_lengths.c,
            real.t / modulo_lengths.t,
        ),
        modulo: Zct::new(
            real.z % modulo_lengths.z,
            real.c % modulo_lengths.c,
            real.t % modulo_lengths.t,
        ),
    })
}

fn check_modulo_lengths(sizes: Zct, modulo_lengths: Zct) -> Result<(), FormatError> {
    for (name, size, length) in [
        ("modulo Z length", sizes.z, modulo_lengths.z),
        ("modulo C length", sizes.c, modulo_lengths.c),
        ("modulo T length", sizes.t, modulo_lengths.t),
    ] {
        if length == 0 || size % length != 0 {
            return Err(FormatError::size_mismatch(
                format!("{} (must divide {})", name, size),
                size,
                length,
            ));
        }
    }
    Ok(())
}

// =============================================================================
// Reordering and N-dimensional rasters
// =============================================================================

/// Map a plane index expressed in `new_order` to the index of the same plane
/// in `original_order`.
pub fn reordered_index(
    original_order: DimensionOrder,
    new_order: DimensionOrder,
    sizes: Zct,
    image_count: usize,
    new_index: usize,
) -> Result<usize, FormatError> {
    let zct = coords(new_order, sizes, image_count, new_index)?;
    index(original_order, sizes, image_count, zct)
}

/// Raster offset of `position` within an N-dimensional block of `lengths`,
/// with the first axis varying fastest.
pub fn position_to_raster(lengths: &[usize], position: &[usize]) -> Result<usize, FormatError> {
    if lengths.len() != position.len() {
        return Err(FormatError::size_mismatch(
            "raster position rank",
            lengths.len(),
            position.len(),
        ));
    }

    let mut offset = 1;
    let mut raster = 0;
    for (&length, &pos) in lengths.iter().zip(position) {
        check_coord("raster position", pos, length)?;
        raster += offset * pos;
        offset *= length;
    }
    Ok(raster)
}

/// Inverse of [`position_to_raster`].
pub fn raster_to_position(lengths: &[usize], raster: usize) -> Result<Vec<usize>, FormatError> {
    let total = raster_length(lengths);
    check_coord("raster", raster, total)?;

    let mut remaining = raster;
    let mut position = Vec::with_capacity(lengths.len());
    for &length in lengths {
        position.push(remaining % length);
        remaining /= length;
    }
    Ok(position)
}

/// Number of elements in an N-dimensional block.
pub fn raster_length(lengths: &[usize]) -> usize {
    lengths.iter().product()
}
