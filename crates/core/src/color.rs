//! Color types and conversion functions.
//!
//! Source images arrive as 8-bit RGBA ([`Rgba8`]). Classification and
//! particle styling work in HSL ([`Hsla`]) with hue in whole degrees and
//! saturation/lightness in hundredths, matching the rounding the pixel
//! heuristics were tuned against. Rendering converts back to RGBA.

use crate::error::SwayError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// 8-bit RGBA color.
///
/// Serializes as a hex string: `"#rrggbb"` when opaque, `"#rrggbbaa"` otherwise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

/// HSL color with alpha.
///
/// `h` is in degrees [0, 360]; `s`, `l`, and `a` are in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsla {
    pub h: f64,
    pub s: f64,
    pub l: f64,
    pub a: f64,
}

impl Rgba8 {
    pub const TRANSPARENT: Rgba8 = Rgba8::new(0, 0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn is_opaque(self) -> bool {
        self.a == 255
    }

    /// True when RGB channels match, ignoring alpha.
    pub fn same_rgb(self, other: Rgba8) -> bool {
        self.r == other.r && self.g == other.g && self.b == other.b
    }

    /// Parses `#rgb`, `#rgba`, `#rrggbb`, or `#rrggbbaa` (hash optional,
    /// case insensitive). Missing alpha means opaque.
    pub fn from_hex(hex: &str) -> Result<Rgba8, SwayError> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        let expanded: String = match digits.len() {
            3 | 4 => digits.chars().flat_map(|c| [c, c]).collect(),
            6 | 8 => digits.to_owned(),
            n => {
                return Err(SwayError::InvalidColor(format!(
                    "expected 3, 4, 6 or 8 hex digits, got {n}"
                )))
            }
        };
        let channel = |i: usize| {
            expanded
                .get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| SwayError::InvalidColor(format!("invalid hex color '{hex}'")))
        };
        let a = if expanded.len() == 8 { channel(6)? } else { 255 };
        Ok(Rgba8::new(channel(0)?, channel(2)?, channel(4)?, a))
    }

    pub fn to_hex(self) -> String {
        if self.is_opaque() {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }

    /// Converts to HSL with hue rounded to whole degrees and saturation and
    /// lightness rounded to hundredths.
    pub fn to_hsla(self) -> Hsla {
        let r = self.r as f64 / 255.0;
        let g = self.g as f64 / 255.0;
        let b = self.b as f64 / 255.0;

        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let diff = max - min;
        let sum = max + min;

        let hue = if diff == 0.0 {
            0.0
        } else if max == r {
            (60.0 * (g - b) / diff + 360.0) % 360.0
        } else if max == g {
            60.0 * (b - r) / diff + 120.0
        } else {
            60.0 * (r - g) / diff + 240.0
        };

        let lum = 0.5 * sum;
        let sat = if lum == 0.0 {
            0.0
        } else if lum == 1.0 {
            1.0
        } else if lum <= 0.5 {
            diff / sum
        } else {
            diff / (2.0 - sum)
        };

        Hsla {
            h: hue.round(),
            s: (sat * 100.0).round() / 100.0,
            l: (lum * 100.0).round() / 100.0,
            a: self.a as f64 / 255.0,
        }
    }
}

impl Serialize for Rgba8 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Rgba8 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Rgba8::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

impl Hsla {
    pub const fn new(h: f64, s: f64, l: f64, a: f64) -> Self {
        Self { h, s, l, a }
    }

    /// Converts to 8-bit RGBA, clamping every channel into range.
    pub fn to_rgba8(self) -> Rgba8 {
        let h = self.h.rem_euclid(360.0);
        let s = self.s.clamp(0.0, 1.0);
        let l = self.l.clamp(0.0, 1.0);

        let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
        let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
        let m = l - c / 2.0;
        let (r, g, b) = match (h / 60.0) as u32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };
        let to_u8 = |v: f64| ((v + m).clamp(0.0, 1.0) * 255.0).round() as u8;
        Rgba8::new(
            to_u8(r),
            to_u8(g),
            to_u8(b),
            (self.a.clamp(0.0, 1.0) * 255.0).round() as u8,
        )
    }
}

/// Composites `src` over `dst` with straight (non-premultiplied) alpha.
pub fn blend_over(dst: Rgba8, src: Rgba8) -> Rgba8 {
    if src.a == 255 {
        return src;
    }
    if src.a == 0 {
        return dst;
    }
    let sa = src.a as f64 / 255.0;
    let da = dst.a as f64 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    let mix = |s: u8, d: u8| {
        let v = (s as f64 * sa + d as f64 * da * (1.0 - sa)) / out_a;
        v.round().clamp(0.0, 255.0) as u8
    };
    Rgba8::new(
        mix(src.r, dst.r),
        mix(src.g, dst.g),
        mix(src.b, dst.b),
        (out_a * 255.0).round() as u8,
    )
}
