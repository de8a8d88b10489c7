//! Exact decimal numbers
//!
//! An [`ExactDecimal`] keeps a numeric literal as the text it was written
//! with, so `16000.50` stays `16000.50` across every text sink. Conversions
//! that can lose information (to `f64`, to fixed-point) are explicit methods.

use crate::error::{Error, Result};
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// JSON number grammar: optional minus, integer part, optional fraction and exponent
static NUMBER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-?(0|[1-9][0-9]*)(\.[0-9]+)?([eE][+-]?[0-9]+)?$").unwrap()
});

/// Largest precision a 128-bit fixed-point value can hold
pub const MAX_DECIMAL_PRECISION: u8 = 38;

/// A decimal number retained in its original textual form
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExactDecimal(String);

impl ExactDecimal {
    /// Parse a numeric literal, keeping its digits verbatim
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        NUMBER_REGEX
            .is_match(text)
            .then(|| Self(text.to_string()))
    }

    /// The canonical string form (the literal as written)
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the literal has a fraction or an exponent
    pub fn is_fractional(&self) -> bool {
        self.0.contains(['.', 'e', 'E'])
    }

    /// Approximate value as a binary float
    ///
    /// This is the only lossy conversion on the type. Callers use it only
    /// when a sink explicitly asks for approximate numeric output.
    pub fn to_f64(&self) -> Option<f64> {
        self.0.parse::<f64>().ok().filter(|v| v.is_finite())
    }

    /// Unscaled 128-bit value for DECIMAL(precision, scale)
    ///
    /// Fails with [`Error::PrecisionLoss`] when the value has more fractional
    /// digits than `scale` (non-zero digits would be dropped) or more
    /// significant digits than `precision`. Nothing is ever rounded.
    pub fn to_fixed_point(&self, precision: u8, scale: i8) -> Result<i128> {
        let loss = || Error::PrecisionLoss {
            value: self.0.clone(),
            precision,
            scale,
        };

        let parts = DecimalParts::split(&self.0);
        let significant = parts.digits.trim_start_matches('0');
        if significant.is_empty() {
            return Ok(0);
        }

        // value = significant * 10^exponent, target = value * 10^scale
        let shift = parts.exponent.saturating_add(i64::from(scale));
        let unscaled = if shift >= 0 {
            if significant.len() as i64 + shift > i64::from(precision) {
                return Err(loss());
            }
            let mut digits = significant.to_string();
            digits.extend(std::iter::repeat('0').take(shift as usize));
            digits
        } else {
            let drop = shift.unsigned_abs() as usize;
            if drop >= significant.len() {
                // every significant digit would be cut off
                return Err(loss());
            }
            let (kept, dropped) = significant.split_at(significant.len() - drop);
            if dropped.bytes().any(|b| b != b'0') {
                return Err(loss());
            }
            let kept = kept.trim_start_matches('0');
            if kept.len() > usize::from(precision) {
                return Err(loss());
            }
            kept.to_string()
        };

        if unscaled.len() > usize::from(MAX_DECIMAL_PRECISION) {
            return Err(loss());
        }

        let magnitude: i128 = if unscaled.is_empty() {
            0
        } else {
            unscaled.parse().map_err(|_| loss())?
        };
        Ok(if parts.negative { -magnitude } else { magnitude })
    }
}

impl fmt::Display for ExactDecimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ExactDecimal {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| Error::decode(0, s, "not a decimal number"))
    }
}

impl From<i64> for ExactDecimal {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

/// Sign, digit string and power-of-ten exponent of a validated literal
struct DecimalParts<'a> {
    negative: bool,
    digits: std::borrow::Cow<'a, str>,
    exponent: i64,
}

impl<'a> DecimalParts<'a> {
    fn split(text: &'a str) -> Self {
        let (negative, unsigned) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text),
        };

        let (mantissa, exp) = match unsigned.find(['e', 'E']) {
            Some(pos) => {
                let raw = &unsigned[pos + 1..];
                // out-of-range exponents saturate; they can never fit a DECIMAL anyway
                let exp = raw.parse::<i64>().unwrap_or(if raw.starts_with('-') {
                    i64::MIN / 4
                } else {
                    i64::MAX / 4
                });
                (&unsigned[..pos], exp)
            }
            None => (unsigned, 0),
        };

        match mantissa.split_once('.') {
            Some((int, frac)) => Self {
                negative,
                digits: format!("{int}{frac}").into(),
                exponent: exp.saturating_sub(frac.len() as i64),
            },
            None => Self {
                negative,
                digits: mantissa.into(),
                exponent: exp,
            },
        }
    }
}
