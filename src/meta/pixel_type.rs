use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FormatError;

/// Sample type of a pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelType {
    Int8,
    #[default]
    Uint8,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Float,
    Double,
}

impl PixelType {
    pub const ALL: [PixelType; 8] = [
        PixelType::Int8,
        PixelType::Uint8,
        PixelType::Int16,
        PixelType::Uint16,
        PixelType::Int32,
        PixelType::Uint32,
        PixelType::Float,
        PixelType::Double,
    ];

    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelType::Int8 | PixelType::Uint8 => 1,
            PixelType::Int16 | PixelType::Uint16 => 2,
            PixelType::Int32 | PixelType::Uint32 | PixelType::Float => 4,
            PixelType::Double => 8,
        }
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            PixelType::Int8
                | PixelType::Int16
                | PixelType::Int32
                | PixelType::Float
                | PixelType::Double
        )
    }

    pub fn is_floating_point(self) -> bool {
        matches!(self, PixelType::Float | PixelType::Double)
    }

    /// Pixel type from a sample width and its signedness/float flags.
    pub fn from_bytes(bytes: usize, signed: bool, floating: bool) -> Result<Self, FormatError> {
        let pixel_type = match (bytes, signed, floating) {
            (1, true, false) => PixelType::Int8,
            (1, false, false) => PixelType::Uint8,
            (2, true, false) => PixelType::Int16,
            (2, false, false) => PixelType::Uint16,
            (4, true, false) => PixelType::Int32,
            (4, false, false) => PixelType::Uint32,
            (4, _, true) => PixelType::Float,
            (8, _, true) => PixelType::Double,
            _ => {
                return Err(FormatError::unsupported(format!(
                    "no pixel type with {} bytes (signed={}, floating={})",
                    bytes, signed, floating
                )))
            }
        };
        Ok(pixel_type)
    }

    /// Smallest and largest representable value, for the integer types.
    ///
    /// Floating-point types report the `f32` range.
    pub fn default_min_max(self) -> (i64, i64) {
        match self {
            PixelType::Int8 => (i8::MIN as i64, i8::MAX as i64),
            PixelType::Uint8 => (0, u8::MAX as i64),
            PixelType::Int16 => (i16::MIN as i64, i16::MAX as i64),
            PixelType::Uint16 => (0, u16::MAX as i64),
            PixelType::Int32 => (i32::MIN as i64, i32::MAX as i64),
            PixelType::Uint32 => (0, u32::MAX as i64),
            PixelType::Float | PixelType::Double => (f32::MIN as i64, f32::MAX as i64),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PixelType::Int8 => "int8",
            PixelType::Uint8 => "uint8",
            PixelType::Int16 => "int16",
            PixelType::Uint16 => "uint16",
            PixelType::Int32 => "int32",
            PixelType::Uint32 => "uint32",
            PixelType::Float => "float",
            PixelType::Double => "double",
        }
    }
}

impl fmt::Display for PixelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PixelType {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        PixelType::ALL
            .into_iter()
            .find(|t| t.name() == lower)
            .ok_or_else(|| FormatError::unsupported(format!("unknown pixel type '{}'", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_per_pixel() {
        assert_eq!(PixelType::Uint8.bytes_per_pixel(), 1);
        assert_eq!(PixelType::Int16.bytes_per_pixel(), 2);
        assert_eq!(PixelType::Float.bytes_per_pixel(), 4);
        assert_eq!(PixelType::Double.bytes_per_pixel(), 8);
    }

    #[test]
    fn test_from_bytes_matches_flags() {
        for t in PixelType::ALL {
            let back =
                PixelType::from_bytes(t.bytes_per_pixel(), t.is_signed(), t.is_floating_point())
                    .unwrap();
            assert_eq!(back, t);
        }
        assert!(PixelType::from_bytes(3, false, false).is_err());
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("uint16".parse::<PixelType>().unwrap(), PixelType::Uint16);
        assert_eq!("FLOAT".parse::<PixelType>().unwrap(), PixelType::Float);
        assert!("uint12".parse::<PixelType>().is_err());
    }

    #[test]
    fn test_default_min_max() {
        assert_eq!(PixelType::Uint8.default_min_max(), (0, 255));
        assert_eq!(PixelType::Int16.default_min_max(), (-32768, 32767));
    }

    #[test]
    fn test_serde_lowercase() {
        assert_eq!(serde_json::to_string(&PixelType::Uint16).unwrap(), "\"uint16\"");
    }
}
