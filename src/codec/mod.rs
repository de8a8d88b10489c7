//! Precision-preserving value codec
//!
//! # Overview
//!
//! Every numeric literal is classified when it is tokenized: integers that
//! fit in `i64` become [`Value::Integer`], everything else (fractions,
//! exponents, oversized integers) becomes an [`ExactDecimal`] that keeps the
//! literal text. Text sinks write that text back unchanged; binary columnar
//! sinks go through an explicit [`DecimalPolicy`].

mod decimal;
mod scalar;
mod value;

pub use decimal::{ExactDecimal, MAX_DECIMAL_PRECISION};
pub use scalar::{
    decode_record, decode_scalar, encode_scalar, raw_excerpt, record_from_json, DecimalPolicy,
    TargetFormat,
};
pub use value::{Record, Value};
