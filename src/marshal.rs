//! Textual value marshaling across the bridge.
//!
//! The engine's variable protocol is string-based: every value crosses the
//! boundary as text. `ToAhk` encodes a host value into that text form and
//! `FromAhk` parses it back into a caller-declared type. Parsing never
//! coerces: text that does not parse (including the empty text a missing
//! variable reads as) fails with [`AhkError::Conversion`], keeping "absent"
//! and "malformed" distinguishable from a silently wrong number.

use crate::error::{AhkError, AhkResult};
use std::fmt;

/// Host value that can be written to the engine as text.
///
/// Blanket-implemented for anything `Display`, mirroring the engine's own
/// "everything is text" convention.
pub trait ToAhk {
    /// Encode the value in the engine's textual form.
    fn to_ahk(&self) -> String;
}

impl<T: fmt::Display + ?Sized> ToAhk for T {
    fn to_ahk(&self) -> String {
        self.to_string()
    }
}

/// Host type that can be parsed from the engine's textual form.
pub trait FromAhk: Sized {
    /// Parse engine text, failing with [`AhkError::Conversion`] on
    /// malformed (or empty-where-numeric) input.
    fn from_ahk(text: &str) -> AhkResult<Self>;
}

impl FromAhk for String {
    fn from_ahk(text: &str) -> AhkResult<Self> {
        Ok(text.to_string())
    }
}

macro_rules! from_ahk_via_fromstr {
    ($($ty:ty),+) => {
        $(impl FromAhk for $ty {
            fn from_ahk(text: &str) -> AhkResult<Self> {
                text.trim().parse().map_err(|_| AhkError::Conversion {
                    value: text.to_string(),
                    target: stringify!($ty),
                })
            }
        })+
    };
}

from_ahk_via_fromstr!(i32, i64, u32, u64, f32, f64);

impl FromAhk for bool {
    // The engine reports booleans as "1"/"0".
    fn from_ahk(text: &str) -> AhkResult<Self> {
        match text.trim() {
            "1" => Ok(true),
            "0" | "" => Ok(false),
            other => Err(AhkError::Conversion {
                value: other.to_string(),
                target: "bool",
            }),
        }
    }
}

/// An RGB color in the engine's `0xRRGGBB` textual form.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Color {
    /// Red component.
    pub r: u8,
    /// Green component.
    pub g: u8,
    /// Blue component.
    pub b: u8,
}

impl Color {
    /// Build a color from its components.
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Fractional distance to another color: the Manhattan distance over
    /// the three channels, normalized into `0.0..=1.0`.
    pub fn distance(&self, other: &Color) -> f64 {
        let d = self.r.abs_diff(other.r) as u32
            + self.g.abs_diff(other.g) as u32
            + self.b.abs_diff(other.b) as u32;
        d as f64 / 765.0
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl FromAhk for Color {
    fn from_ahk(text: &str) -> AhkResult<Self> {
        let digits = text
            .trim()
            .strip_prefix("0x")
            .or_else(|| text.trim().strip_prefix("0X"))
            .unwrap_or_else(|| text.trim());
        let packed = u32::from_str_radix(digits, 16).map_err(|_| AhkError::Conversion {
            value: text.to_string(),
            target: "Color",
        })?;
        if packed > 0xFF_FF_FF {
            return Err(AhkError::Conversion {
                value: text.to_string(),
                target: "Color",
            });
        }
        Ok(Self {
            r: (packed >> 16) as u8,
            g: (packed >> 8) as u8,
            b: packed as u8,
        })
    }
}
