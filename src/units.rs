//! Decimal display conversions.
//!
//! Presentation-only: the authoritative path works in smallest-unit `u128`
//! throughout, and these conversions use integer string arithmetic so a
//! displayed value can never feed a rounded number back into a comparison.

use std::{
    error::Error,
    fmt,
};

pub const TOKEN_DECIMALS: u32 = 18;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseUnitsError {
    input: String,
}

impl fmt::Display for ParseUnitsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid decimal amount: {:?}", self.input)
    }
}

impl Error for ParseUnitsError {}

/// Parses a non-negative decimal string into smallest units. Fractions
/// beyond `decimals` digits are rejected, never silently truncated.
pub fn parse_units(input: &str, decimals: u32) -> Result<u128, ParseUnitsError> {
    let error = || ParseUnitsError {
        input: input.to_string(),
    };
    let trimmed = input.trim();
    let (whole, fraction) = match trimmed.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (trimmed, ""),
    };
    if whole.is_empty() && fraction.is_empty() {
        return Err(error());
    }
    if !whole.bytes().all(|byte| byte.is_ascii_digit())
        || !fraction.bytes().all(|byte| byte.is_ascii_digit())
    {
        return Err(error());
    }
    if fraction.len() > decimals as usize {
        return Err(error());
    }

    let base = 10u128.pow(decimals);
    let whole: u128 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| error())?
    };
    let fraction_scale = 10u128.pow(decimals - fraction.len() as u32);
    let fraction: u128 = if fraction.is_empty() {
        0
    } else {
        fraction.parse().map_err(|_| error())?
    };
    whole
        .checked_mul(base)
        .and_then(|scaled| scaled.checked_add(fraction * fraction_scale))
        .ok_or_else(error)
}

/// Formats smallest units as a decimal string, trailing zeros trimmed.
pub fn format_units(value: u128, decimals: u32) -> String {
    let base = 10u128.pow(decimals);
    let whole = value / base;
    let fraction = value % base;
    if fraction == 0 {
        return whole.to_string();
    }
    let fraction = format!("{fraction:0>width$}", width = decimals as usize);
    format!("{whole}.{}", fraction.trim_end_matches('0'))
}
