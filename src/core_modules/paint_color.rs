use crate::core_modules::pixel::pixel::Pixel;
use crate::error::{PipelineError, Result};
use std::fmt;
use std::str::FromStr;

/// The color a user wants on the wall, with its HSL form derived once.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaintColor {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    /// Hue in [0, 1].
    pub hue: f64,
    pub saturation: f64,
    pub lightness: f64,
}

impl PaintColor {
    pub fn from_rgb(red: u8, green: u8, blue: u8) -> Self {
        let (hue, saturation, lightness) = Pixel::new(red, green, blue, 255).hsl();
        Self {
            red,
            green,
            blue,
            hue,
            saturation,
            lightness,
        }
    }

    /// Parses `RRGGBB` or `#RRGGBB`, case-insensitive.
    pub fn from_hex(code: &str) -> Result<Self> {
        let invalid = || PipelineError::InvalidColor(code.to_string());
        let digits = code.trim().strip_prefix('#').unwrap_or(code.trim());
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16).map_err(|_| invalid())
        };
        Ok(Self::from_rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }

    pub fn rgb(&self) -> [f64; 3] {
        [self.red as f64, self.green as f64, self.blue as f64]
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.red, self.green, self.blue)
    }
}

impl FromStr for PaintColor {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl fmt::Display for PaintColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn parses_with_and_without_hash() {
        let a = PaintColor::from_hex("#2244AA").unwrap();
        let b = PaintColor::from_hex("2244aa").unwrap();
        assert_eq!(a, b);
        assert_eq!((a.red, a.green, a.blue), (0x22, 0x44, 0xAA));
        assert_eq!(a.to_hex(), "#2244AA");
    }

    #[test]
    fn rejects_malformed_codes() {
        for code in ["", "#", "#12345", "#1234567", "zzzzzz", "#12 456", "+12345"] {
            assert!(
                matches!(PaintColor::from_hex(code), Err(PipelineError::InvalidColor(_))),
                "{code:?} should be rejected"
            );
        }
    }

    #[test]
    fn derives_hsl() {
        let red: PaintColor = "#FF0000".parse().unwrap();
        assert_abs_diff_eq!(red.hue, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(red.saturation, 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(red.lightness, 0.5, epsilon = 1e-9);
    }
}
