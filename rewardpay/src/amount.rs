//! Human-readable token amounts.
//!
//! Payment amounts arrive as decimal strings in token units (`"100.50"`) and
//! are converted to the token's smallest unit before any contract call.

use std::str::FromStr;

use alloy_primitives::U256;
use rust_decimal::Decimal;

/// Errors produced while converting a decimal string into token units.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    /// The input is not a decimal number.
    #[error("invalid amount {0:?}")]
    Invalid(String),
    /// The amount is zero or negative.
    #[error("amount must be greater than zero, got {0}")]
    NotPositive(String),
    /// The amount has more fractional digits than the token supports.
    #[error("amount {amount} has more than {decimals} fractional digits")]
    TooPrecise {
        /// The offending amount.
        amount: String,
        /// Token decimals.
        decimals: u8,
    },
    /// The scaled amount does not fit into 256 bits.
    #[error("amount {0} overflows")]
    Overflow(String),
}

/// Parses a human-readable decimal amount into the token's smallest unit.
///
/// `parse_token_amount("100.50", 6)` yields `100_500_000`.
///
/// # Errors
///
/// Returns [`AmountError`] if the text is not a positive decimal that fits
/// the token's precision.
pub fn parse_token_amount(text: &str, decimals: u8) -> Result<U256, AmountError> {
    let trimmed = text.trim();
    let value = Decimal::from_str(trimmed)
        .map_err(|_| AmountError::Invalid(trimmed.to_owned()))?
        .normalize();
    if value.is_zero() || value.is_sign_negative() {
        return Err(AmountError::NotPositive(trimmed.to_owned()));
    }
    let scale = value.scale();
    if scale > u32::from(decimals) {
        return Err(AmountError::TooPrecise {
            amount: trimmed.to_owned(),
            decimals,
        });
    }
    let mantissa =
        u128::try_from(value.mantissa()).map_err(|_| AmountError::Invalid(trimmed.to_owned()))?;
    let factor = U256::from(10u8)
        .checked_pow(U256::from(u32::from(decimals) - scale))
        .ok_or_else(|| AmountError::Overflow(trimmed.to_owned()))?;
    U256::from(mantissa)
        .checked_mul(factor)
        .ok_or_else(|| AmountError::Overflow(trimmed.to_owned()))
}

/// Formats a raw token amount with the given decimals, trimming trailing zeros.
#[must_use]
pub fn format_token_amount(value: U256, decimals: u8) -> String {
    let digits = value.to_string();
    let decimals = usize::from(decimals);
    if decimals == 0 {
        return digits;
    }
    let padded = format!("{digits:0>width$}", width = decimals + 1);
    let (whole, fraction) = padded.split_at(padded.len() - decimals);
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        whole.to_owned()
    } else {
        format!("{whole}.{fraction}")
    }
}

/// Converts an amount between two decimal precisions.
///
/// Scaling down truncates; scaling up returns `None` on overflow.
#[must_use]
pub fn rescale(value: U256, from_decimals: u8, to_decimals: u8) -> Option<U256> {
    use std::cmp::Ordering;
    match from_decimals.cmp(&to_decimals) {
        Ordering::Equal => Some(value),
        Ordering::Less => {
            let factor = U256::from(10u8).checked_pow(U256::from(to_decimals - from_decimals))?;
            value.checked_mul(factor)
        }
        Ordering::Greater => {
            let factor = U256::from(10u8).checked_pow(U256::from(from_decimals - to_decimals))?;
            Some(value / factor)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_whole_and_fractional() {
        assert_eq!(
            parse_token_amount("100", 6).unwrap(),
            U256::from(100_000_000u64)
        );
        assert_eq!(
            parse_token_amount("100.50", 6).unwrap(),
            U256::from(100_500_000u64)
        );
        assert_eq!(parse_token_amount(" 0.000001 ", 6).unwrap(), U256::from(1u8));
    }

    #[test]
    fn test_parse_rejects_zero_and_negative() {
        assert!(matches!(
            parse_token_amount("0", 6),
            Err(AmountError::NotPositive(_))
        ));
        assert!(matches!(
            parse_token_amount("0.000", 6),
            Err(AmountError::NotPositive(_))
        ));
        assert!(matches!(
            parse_token_amount("-5", 6),
            Err(AmountError::NotPositive(_))
        ));
    }

    #[test]
    fn test_parse_rejects_garbage_and_excess_precision() {
        assert!(matches!(
            parse_token_amount("ten", 6),
            Err(AmountError::Invalid(_))
        ));
        assert!(matches!(
            parse_token_amount("", 6),
            Err(AmountError::Invalid(_))
        ));
        assert_eq!(
            parse_token_amount("1.0000001", 6),
            Err(AmountError::TooPrecise {
                amount: "1.0000001".to_owned(),
                decimals: 6
            })
        );
        // trailing zeros beyond the precision are harmless
        assert!(parse_token_amount("1.50000000", 6).is_ok());
    }

    #[test]
    fn test_format_token_amount() {
        assert_eq!(format_token_amount(U256::from(100_500_000u64), 6), "100.5");
        assert_eq!(format_token_amount(U256::from(1u8), 6), "0.000001");
        assert_eq!(format_token_amount(U256::from(42_000_000u64), 6), "42");
        assert_eq!(format_token_amount(U256::from(7u8), 0), "7");
    }

    #[test]
    fn test_rescale() {
        let v = U256::from(1_500_000u64);
        assert_eq!(rescale(v, 6, 6), Some(v));
        assert_eq!(
            rescale(v, 6, 18),
            Some(U256::from(1_500_000_000_000_000_000u128))
        );
        assert_eq!(rescale(U256::from(1_999_999u64), 6, 0), Some(U256::from(1u8)));
    }
}
