//! Utility functions for identifiers and money parsing

use crate::error::NegotiationError;
use bech32::Bech32m;
use uuid7::uuid7;

// construct a unique record id then encode using bech32
pub fn new_prefixed_id(hrp: &str) -> anyhow::Result<String> {
    let hrp = bech32::Hrp::parse(hrp)?;
    let encode = bech32::encode::<Bech32m>(hrp, uuid7().as_bytes())?;
    Ok(encode)
}

/// Resolve a user-supplied money figure to a strictly positive integer.
///
/// Offers arrive from forms, so the raw string may carry a currency symbol,
/// thousands separators or a zero-penny suffix ("£310,000.00"). Anything that
/// does not resolve to a whole positive number is a validation error.
pub fn parse_amount(raw: &str) -> Result<u64, NegotiationError> {
    let trimmed = raw.trim();

    let (integral, fraction) = match trimmed.split_once('.') {
        Some((lhs, rhs)) => (lhs, Some(rhs)),
        None => (trimmed, None),
    };

    // "310000.00" is fine, "310000.50" is not a whole amount
    if let Some(fraction) = fraction {
        if fraction.is_empty() || !fraction.chars().all(|c| c == '0') {
            return Err(NegotiationError::Validation(format!(
                "amount `{trimmed}` is not a whole number"
            )));
        }
    }

    let digits: String = integral
        .chars()
        .filter(|c| !matches!(c, '£' | '$' | '€' | ',' | '_' | ' '))
        .collect();

    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(NegotiationError::Validation(format!(
            "amount `{trimmed}` is not a number"
        )));
    }

    let value: u64 = digits
        .parse()
        .map_err(|_| NegotiationError::Validation(format!("amount `{trimmed}` is out of range")))?;

    if value == 0 {
        return Err(NegotiationError::Validation(
            "amount must be greater than zero".into(),
        ));
    }

    Ok(value)
}
