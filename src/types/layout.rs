//! Width specification for ad containers
//!
//! Numbers follow the banner convention: `0` or `1` mean "fill the container",
//! values in `(0, 1)` are a fraction of the measured container and anything
//! larger is pixels. Strings accept `"auto"`, `"N%"`, `"Npx"` and bare `"N"`;
//! the last two are pixels whatever their value.

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

use crate::{Error, Result};

/// Smallest width ever requested from the ad server
pub const MIN_AD_WIDTH: u32 = 200;

const INVALID_WIDTH: &str =
    "Must be a number, a percentage like \"10%\", a pixel value like \"500px\", or \"auto\"";

/// How the width of an ad container is determined
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum WidthSpec {
    /// Measure the container and use its width
    #[default]
    Auto,
    /// Fraction of the measured container width, in `(0, 1]`
    Fraction(f64),
    /// Fixed width in pixels
    Pixels(f64),
}

impl WidthSpec {
    /// Interpret a numeric width
    pub fn from_number(width: f64) -> Result<Self> {
        if !width.is_finite() || width < 0.0 {
            return Err(Error::validation_with_value(
                "width",
                "Must be a non-negative number",
                width,
            ));
        }

        Ok(if width == 0.0 || width == 1.0 {
            Self::Auto
        } else if width < 1.0 {
            Self::Fraction(width)
        } else {
            Self::Pixels(width)
        })
    }

    /// Interpret a string width
    pub fn parse(width: &str) -> Result<Self> {
        let trimmed = width.trim();
        if trimmed.is_empty() || trimmed == "auto" {
            return Ok(Self::Auto);
        }

        if let Some(percent) = trimmed.strip_suffix('%') {
            let value: f64 = percent.trim().parse().map_err(|_| {
                Error::validation_with_value("width", "Percentage must be numeric", width)
            })?;
            if !(value > 0.0 && value <= 100.0) {
                return Err(Error::validation_with_value(
                    "width",
                    "Percentage must be between 0 and 100",
                    width,
                ));
            }
            return Ok(Self::Fraction(value / 100.0));
        }

        let pixels = trimmed.strip_suffix("px").unwrap_or(trimmed).trim();
        let value: f64 = pixels
            .parse()
            .map_err(|_| Error::validation_with_value("width", INVALID_WIDTH, width))?;
        if !value.is_finite() || value <= 0.0 {
            return Err(Error::validation_with_value(
                "width",
                "Pixel width must be positive",
                width,
            ));
        }
        // Explicit strings are always pixels
        Ok(Self::Pixels(value))
    }

    /// Whether the container must be measured before the width is known
    pub fn needs_measurement(&self) -> bool {
        !matches!(self, Self::Pixels(_))
    }

    /// Width to request, or `None` while a required measurement is missing
    pub fn resolve(&self, measured: Option<f64>) -> Option<u32> {
        let raw = match *self {
            Self::Auto => measured?,
            Self::Fraction(fraction) => measured? * fraction,
            Self::Pixels(pixels) => pixels,
        };
        Some((raw.round().max(0.0) as u32).max(MIN_AD_WIDTH))
    }
}

impl fmt::Display for WidthSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => f.write_str("auto"),
            Self::Fraction(fraction) => write!(f, "{}%", fraction * 100.0),
            Self::Pixels(pixels) => write!(f, "{}px", pixels),
        }
    }
}

impl Serialize for WidthSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for WidthSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct WidthVisitor;

        impl Visitor<'_> for WidthVisitor {
            type Value = WidthSpec;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a number, \"auto\", \"N%\" or \"Npx\"")
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<WidthSpec, E> {
                WidthSpec::from_number(v).map_err(E::custom)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<WidthSpec, E> {
                self.visit_f64(v as f64)
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<WidthSpec, E> {
                self.visit_f64(v as f64)
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<WidthSpec, E> {
                WidthSpec::parse(v).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(WidthVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0.0, WidthSpec::Auto)]
    #[case(1.0, WidthSpec::Auto)]
    #[case(0.5, WidthSpec::Fraction(0.5))]
    #[case(320.0, WidthSpec::Pixels(320.0))]
    fn test_from_number(#[case] input: f64, #[case] expected: WidthSpec) {
        assert_eq!(WidthSpec::from_number(input).unwrap(), expected);
    }

    #[rstest]
    #[case("auto", WidthSpec::Auto)]
    #[case("", WidthSpec::Auto)]
    #[case("50%", WidthSpec::Fraction(0.5))]
    #[case("100%", WidthSpec::Fraction(1.0))]
    #[case("500px", WidthSpec::Pixels(500.0))]
    #[case("500", WidthSpec::Pixels(500.0))]
    #[case("0.5px", WidthSpec::Pixels(0.5))]
    #[case("1px", WidthSpec::Pixels(1.0))]
    #[case("1", WidthSpec::Pixels(1.0))]
    fn test_parse(#[case] input: &str, #[case] expected: WidthSpec) {
        assert_eq!(WidthSpec::parse(input).unwrap(), expected);
    }

    #[rstest]
    #[case("0%")]
    #[case("150%")]
    #[case("-20px")]
    #[case("0px")]
    #[case("wide")]
    fn test_parse_rejects(#[case] input: &str) {
        let err = WidthSpec::parse(input).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_negative_number_rejected() {
        assert!(WidthSpec::from_number(-1.0).is_err());
    }

    #[test]
    fn test_resolve_auto_waits_for_measurement() {
        assert_eq!(WidthSpec::Auto.resolve(None), None);
        assert_eq!(WidthSpec::Auto.resolve(Some(640.4)), Some(640));
        assert_eq!(WidthSpec::Auto.resolve(Some(120.0)), Some(MIN_AD_WIDTH));
    }

    #[test]
    fn test_resolve_fraction() {
        let spec = WidthSpec::Fraction(0.5);
        assert!(spec.needs_measurement());
        assert_eq!(spec.resolve(None), None);
        assert_eq!(spec.resolve(Some(801.0)), Some(401));
        assert_eq!(spec.resolve(Some(300.0)), Some(MIN_AD_WIDTH));
    }

    #[test]
    fn test_resolve_pixels_ignores_measurement() {
        let spec = WidthSpec::Pixels(150.0);
        assert!(!spec.needs_measurement());
        assert_eq!(spec.resolve(None), Some(MIN_AD_WIDTH));
        assert_eq!(WidthSpec::Pixels(320.6).resolve(None), Some(321));
    }

    #[test]
    fn test_small_pixel_strings_resolve_without_measurement() {
        for input in ["0.5px", "1px", "1"] {
            let spec = WidthSpec::parse(input).unwrap();
            assert!(!spec.needs_measurement());
            assert_eq!(spec.resolve(None), Some(MIN_AD_WIDTH));
            assert_eq!(spec.resolve(Some(800.0)), Some(MIN_AD_WIDTH));
        }
    }

    #[test]
    fn test_deserialize_number_and_string() {
        let spec: WidthSpec = serde_json::from_str("0.25").unwrap();
        assert_eq!(spec, WidthSpec::Fraction(0.25));
        let spec: WidthSpec = serde_json::from_str("\"75%\"").unwrap();
        assert_eq!(spec, WidthSpec::Fraction(0.75));
        assert!(serde_json::from_str::<WidthSpec>("true").is_err());
    }
}
