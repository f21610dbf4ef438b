use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FormatError;

/// One of the five image axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
    C,
    T,
}

impl Axis {
    pub fn symbol(self) -> char {
        match self {
            Axis::X => 'X',
            Axis::Y => 'Y',
            Axis::Z => 'Z',
            Axis::C => 'C',
            Axis::T => 'T',
        }
    }

    fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            'X' => Some(Axis::X),
            'Y' => Some(Axis::Y),
            'Z' => Some(Axis::Z),
            'C' => Some(Axis::C),
            'T' => Some(Axis::T),
            _ => None,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// A triple of Z, C and T values: either sizes or coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Zct {
    pub z: usize,
    pub c: usize,
    pub t: usize,
}

impl Zct {
    pub const fn new(z: usize, c: usize, t: usize) -> Self {
        Self { z, c, t }
    }

    /// Value along one of the three plane axes; X and Y have none.
    pub fn get(&self, axis: Axis) -> Option<usize> {
        match axis {
            Axis::Z => Some(self.z),
            Axis::C => Some(self.c),
            Axis::T => Some(self.t),
            Axis::X | Axis::Y => None,
        }
    }

    pub fn product(&self) -> usize {
        self.z * self.c * self.t
    }
}

/// A validated dimension order: a permutation of XYZCT starting with XY or YX.
///
/// The three plane axes after the first two positions are rasterized with the
/// third position varying fastest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DimensionOrder([Axis; 5]);

impl DimensionOrder {
    pub const XYZCT: DimensionOrder =
        DimensionOrder([Axis::X, Axis::Y, Axis::Z, Axis::C, Axis::T]);
    pub const XYZTC: DimensionOrder =
        DimensionOrder([Axis::X, Axis::Y, Axis::Z, Axis::T, Axis::C]);
    pub const XYCZT: DimensionOrder =
        DimensionOrder([Axis::X, Axis::Y, Axis::C, Axis::Z, Axis::T]);
    pub const XYCTZ: DimensionOrder =
        DimensionOrder([Axis::X, Axis::Y, Axis::C, Axis::T, Axis::Z]);
    pub const XYTZC: DimensionOrder =
        DimensionOrder([Axis::X, Axis::Y, Axis::T, Axis::Z, Axis::C]);
    pub const XYTCZ: DimensionOrder =
        DimensionOrder([Axis::X, Axis::Y, Axis::T, Axis::C, Axis::Z]);

    /// Every valid order: the six plane-axis permutations after XY and after YX.
    pub fn all() -> Vec<DimensionOrder> {
        let tails = [
            Self::XYZCT,
            Self::XYZTC,
            Self::XYCZT,
            Self::XYCTZ,
            Self::XYTZC,
            Self::XYTCZ,
        ];
        let mut orders = tails.to_vec();
        orders.extend(tails.iter().map(|o| {
            let mut axes = o.0;
            axes.swap(0, 1);
            DimensionOrder(axes)
        }));
        orders
    }

    pub fn axes(&self) -> [Axis; 5] {
        self.0
    }

    /// The three plane axes, fastest-varying first.
    pub fn plane_axes(&self) -> [Axis; 3] {
        [self.0[2], self.0[3], self.0[4]]
    }

    /// Position (0..3) of a plane axis among the plane axes.
    pub fn plane_position(&self, axis: Axis) -> Option<usize> {
        self.plane_axes().iter().position(|a| *a == axis)
    }
}

impl Default for DimensionOrder {
    fn default() -> Self {
        Self::XYZCT
    }
}

impl FromStr for DimensionOrder {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| FormatError::InvalidDimensionOrder {
            order: s.to_string(),
            reason: reason.to_string(),
        };

        if s.len() != 5 {
            return Err(invalid("must have exactly 5 symbols"));
        }
        if !(s.starts_with("XY") || s.starts_with("YX")) {
            return Err(invalid("must begin with XY or YX"));
        }

        let mut axes = [Axis::X; 5];
        for (i, symbol) in s.chars().enumerate() {
            axes[i] = Axis::from_symbol(symbol).ok_or_else(|| invalid("unknown axis symbol"))?;
        }

        for axis in [Axis::Z, Axis::C, Axis::T] {
            let count = axes[2..].iter().filter(|a| **a == axis).count();
            if count != 1 {
                return Err(invalid(&format!("{} must appear exactly once", axis)));
            }
        }

        Ok(DimensionOrder(axes))
    }
}

impl fmt::Display for DimensionOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for axis in self.0 {
            write!(f, "{}", axis)?;
        }
        Ok(())
    }
}

impl TryFrom<String> for DimensionOrder {
    type Error = FormatError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DimensionOrder> for String {
    fn from(order: DimensionOrder) -> Self {
        order.to_string()
    }
}
