//! Amount codec
//!
//! Converts between human decimal amounts and integer smallest-unit amounts
//! for a token with 0..=18 decimals. The integer side is always `u64`, the
//! width of every amount field in the instruction payloads this crate
//! encodes, so the safe domain is `0..=u64::MAX` smallest units.
//!
//! Parsing is exact: decimal text is split into integer and fraction digits
//! and combined with checked integer arithmetic. Floating point is only ever
//! produced for display ([`TokenAmount::ui_amount`]).

use serde::Serialize;

use crate::tx_builder::errors::TransactionBuilderError;

/// Highest supported token precision
pub const MAX_DECIMALS: u8 = 18;

// Larger exponents can never fit in 20 integer digits
const MAX_EXPONENT: i64 = 64;

fn check_decimals(decimals: u8) -> Result<(), TransactionBuilderError> {
    if decimals > MAX_DECIMALS {
        return Err(TransactionBuilderError::InvalidDecimals(decimals));
    }
    Ok(())
}

/// Largest human amount that converts to a `u64` at `decimals`, as exact text
pub fn max_safe_amount(decimals: u8) -> Result<String, TransactionBuilderError> {
    to_decimal_string(u64::MAX as u128, decimals)
}

/// Convert decimal text to smallest units, flooring any sub-unit remainder
///
/// Accepts plain (`"12.5"`, `".5"`, `"+3"`) and exponent (`"1e-3"`) forms.
///
/// # Errors
///
/// - `InvalidAmount` for empty, negative, non-finite or non-numeric input
/// - `InvalidDecimals` when `decimals > 18`
/// - `Overflow` when the amount exceeds [`max_safe_amount`]
pub fn to_raw_units(amount: &str, decimals: u8) -> Result<u64, TransactionBuilderError> {
    check_decimals(decimals)?;

    let input = amount.trim();
    let (negative, unsigned) = match input.as_bytes().first() {
        Some(b'-') => (true, &input[1..]),
        Some(b'+') => (false, &input[1..]),
        _ => (false, input),
    };

    let lowered = unsigned.to_ascii_lowercase();
    if matches!(lowered.as_str(), "nan" | "inf" | "infinity") {
        return Err(TransactionBuilderError::invalid_amount(input, "not finite"));
    }

    let (int_digits, frac_digits) = split_decimal(unsigned)
        .ok_or_else(|| TransactionBuilderError::invalid_amount(input, "not a number"))?;

    let is_zero = int_digits.bytes().all(|b| b == b'0') && frac_digits.bytes().all(|b| b == b'0');
    if negative && !is_zero {
        return Err(TransactionBuilderError::invalid_amount(input, "negative"));
    }

    let overflow = || -> Result<TransactionBuilderError, TransactionBuilderError> {
        Ok(TransactionBuilderError::Overflow {
            amount: input.to_string(),
            max: max_safe_amount(decimals)?,
            decimals,
        })
    };

    let int_trimmed = int_digits.trim_start_matches('0');
    // u64::MAX has 20 digits; anything longer cannot fit before scaling
    if int_trimmed.len() > 20 {
        return Err(overflow()?);
    }
    let int_value: u128 = if int_trimmed.is_empty() {
        0
    } else {
        int_trimmed
            .parse()
            .map_err(|_| TransactionBuilderError::invalid_amount(input, "not a number"))?
    };

    // Floor: only the first `decimals` fraction digits count
    let mut frac_value: u128 = 0;
    for i in 0..decimals as usize {
        let digit = frac_digits.as_bytes().get(i).map_or(0, |b| (b - b'0') as u128);
        frac_value = frac_value * 10 + digit;
    }

    let raw = int_value
        .checked_mul(10u128.pow(decimals as u32))
        .and_then(|scaled| scaled.checked_add(frac_value));

    match raw {
        Some(raw) if raw <= u64::MAX as u128 => Ok(raw as u64),
        _ => Err(overflow()?),
    }
}

/// Convert a floating point amount to smallest units
///
/// The float is rendered through its shortest round-trip decimal text and
/// then parsed exactly by [`to_raw_units`], so `1.9999999999` at 9 decimals
/// floors to `1999999999`.
pub fn to_raw_units_f64(amount: f64, decimals: u8) -> Result<u64, TransactionBuilderError> {
    if !amount.is_finite() {
        return Err(TransactionBuilderError::invalid_amount(
            amount.to_string(),
            "not finite",
        ));
    }
    if amount < 0.0 {
        return Err(TransactionBuilderError::invalid_amount(
            amount.to_string(),
            "negative",
        ));
    }
    to_raw_units(&amount.to_string(), decimals)
}

/// Render smallest units as exact decimal text
///
/// Trailing fractional zeros are trimmed; an all-zero fraction yields the
/// bare integer part.
pub fn to_decimal_string(raw: u128, decimals: u8) -> Result<String, TransactionBuilderError> {
    check_decimals(decimals)?;
    if decimals == 0 {
        return Ok(raw.to_string());
    }

    let divisor = 10u128.pow(decimals as u32);
    let whole = raw / divisor;
    let frac = raw % divisor;
    if frac == 0 {
        return Ok(whole.to_string());
    }

    let padded = format!("{:0width$}", frac, width = decimals as usize);
    Ok(format!("{}.{}", whole, padded.trim_end_matches('0')))
}

/// Split unsigned decimal text into (integer digits, fraction digits),
/// applying any exponent. Returns `None` for anything that is not a number.
fn split_decimal(text: &str) -> Option<(String, String)> {
    let (mantissa, exponent) = match text.find(['e', 'E']) {
        Some(pos) => {
            let exp: i64 = text[pos + 1..].parse().ok()?;
            (&text[..pos], exp)
        }
        None => (text, 0),
    };

    let (int_part, frac_part) = match mantissa.split_once('.') {
        Some((int_part, frac_part)) => (int_part, frac_part),
        None => (mantissa, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if !int_part.bytes().all(|b| b.is_ascii_digit()) || !frac_part.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    if exponent == 0 {
        return Some((int_part.to_string(), frac_part.to_string()));
    }

    let joined = format!("{}{}", int_part, frac_part);
    let digits = joined.trim_start_matches('0');
    if digits.is_empty() {
        return Some(("0".to_string(), String::new()));
    }

    // Point position relative to the first significant digit. Past the
    // clamp the value either overflows or floors to zero for any precision.
    let leading_zeros = (joined.len() - digits.len()) as i64;
    let point = (int_part.len() as i64 - leading_zeros)
        .saturating_add(exponent)
        .clamp(-MAX_EXPONENT, MAX_EXPONENT + digits.len() as i64);
    if point <= 0 {
        let zeros = "0".repeat((-point) as usize);
        Some((String::new(), format!("{}{}", zeros, digits)))
    } else if point as usize >= digits.len() {
        let zeros = "0".repeat(point as usize - digits.len());
        Some((format!("{}{}", digits, zeros), String::new()))
    } else {
        let (int_digits, frac_digits) = digits.split_at(point as usize);
        Some((int_digits.to_string(), frac_digits.to_string()))
    }
}

/// An amount held in both representations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TokenAmount {
    /// Smallest units; the only value written into instructions
    pub raw: u64,
    /// Token precision
    pub decimals: u8,
}

impl TokenAmount {
    /// Parse a human amount for a token with `decimals`
    pub fn from_ui(amount: &str, decimals: u8) -> Result<Self, TransactionBuilderError> {
        Ok(Self {
            raw: to_raw_units(amount, decimals)?,
            decimals,
        })
    }

    /// Human amount, display only
    pub fn ui_amount(&self) -> f64 {
        self.raw as f64 / 10f64.powi(self.decimals as i32)
    }

    /// Exact decimal text
    pub fn to_decimal_string(&self) -> String {
        // decimals was validated when the amount was built
        to_decimal_string(self.raw as u128, self.decimals).unwrap_or_else(|_| self.raw.to_string())
    }
}
