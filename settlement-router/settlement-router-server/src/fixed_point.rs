//! Fixed-point arithmetic over token amounts of differing decimal precision

use std::str::FromStr;

use alloy_primitives::{utils::format_units, I256, U256};
use bigdecimal::BigDecimal;
use num_bigint::{BigInt, Sign};

use crate::error::SettlementError;

// -------------
// | Constants |
// -------------

/// The number of implied decimals in an invoice's minor-unit amount
pub const MINOR_UNIT_DECIMALS: u8 = 2;
/// The denominator of a basis-point fraction
pub const BPS_DENOMINATOR: u64 = 10_000;

// -----------
// | Helpers |
// -----------

/// `10^exp` as a U256
pub fn pow10(exp: u8) -> U256 {
    U256::from(10u64).pow(U256::from(exp))
}

/// Scale an invoice minor-unit amount to a token's decimal precision
pub fn scale_minor_units(amount_in_minor: U256, decimals: u8) -> U256 {
    if decimals >= MINOR_UNIT_DECIMALS {
        amount_in_minor * pow10(decimals - MINOR_UNIT_DECIMALS)
    } else {
        amount_in_minor / pow10(MINOR_UNIT_DECIMALS - decimals)
    }
}

/// Apply a slippage allowance to an input amount
///
/// Returns the slippage-inclusive amount and the allowance itself, i.e.
/// `(A + floor(A * bps / 10000), floor(A * bps / 10000))`
pub fn apply_slippage(amount: U256, slippage_bps: u32) -> (U256, U256) {
    let denominator = U256::from(BPS_DENOMINATOR);
    let with_slippage = amount * (denominator + U256::from(slippage_bps)) / denominator;
    (with_slippage, with_slippage - amount)
}

/// Convert an unsigned amount to a signed one, saturating at `I256::MAX`
pub fn to_signed(value: U256) -> I256 {
    I256::try_from(value).unwrap_or(I256::MAX)
}

/// Render a unit amount as a decimal string in whole tokens
pub fn units_to_decimal(amount: U256, decimals: u8) -> Result<String, SettlementError> {
    format_units(amount, decimals).map_err(SettlementError::parse)
}

/// Parse a decimal string in whole tokens into a unit amount, truncating any
/// precision beyond the token's decimals
pub fn decimal_to_units(amount: &str, decimals: u8) -> Result<U256, SettlementError> {
    let decimal = BigDecimal::from_str(amount.trim()).map_err(SettlementError::parse)?;
    let scale = BigDecimal::new(BigInt::from(1u8), -i64::from(decimals));
    let (units, _) = (decimal * scale).with_scale(0).into_bigint_and_scale();
    bigint_to_u256(&units)
}

/// Convert a non-negative `BigInt` into a U256
fn bigint_to_u256(value: &BigInt) -> Result<U256, SettlementError> {
    let (sign, bytes) = value.to_bytes_be();
    if sign == Sign::Minus {
        return Err(SettlementError::parse(format!("negative amount: {value}")));
    }

    U256::try_from_be_slice(&bytes)
        .ok_or_else(|| SettlementError::parse(format!("amount overflows U256: {value}")))
}

/// Render a fixed-point integer rounded (half up) to a number of significant
/// figures, trimming trailing zeros down to a single fractional digit
pub fn round_fixed_point(value: U256, decimal_digits: u8, significant_figures: u32) -> String {
    if value.is_zero() {
        return "0.00".to_string();
    }

    let num_digits = value.to_string().len() as u32;
    let rounded = if num_digits > significant_figures {
        let unit = U256::from(10u64).pow(U256::from(num_digits - significant_figures));
        let (quotient, remainder) = value.div_rem(unit);
        let quotient =
            if remainder * U256::from(2u8) >= unit { quotient + U256::from(1u8) } else { quotient };
        quotient * unit
    } else {
        value
    };

    if decimal_digits == 0 {
        return rounded.to_string();
    }

    let (integer, fraction) = rounded.div_rem(pow10(decimal_digits));
    let fraction = format!("{:0>width$}", fraction.to_string(), width = decimal_digits as usize);
    let trimmed = fraction.trim_end_matches('0');
    let fraction = if trimmed.is_empty() { &fraction[..1] } else { trimmed };

    format!("{integer}.{fraction}")
}

#[cfg(test)]
mod tests {
    use rand::{thread_rng, Rng};

    use super::*;

    /// Test scaling invoice minor units to token precision
    #[test]
    fn test_scale_minor_units() {
        let one_dollar = U256::from(100u64);
        assert_eq!(scale_minor_units(one_dollar, 6), U256::from(1_000_000u64));
        assert_eq!(scale_minor_units(one_dollar, 18), pow10(18));
        assert_eq!(scale_minor_units(one_dollar, 2), one_dollar);
        assert_eq!(scale_minor_units(one_dollar, 0), U256::from(1u64));
    }

    /// Test the slippage law over random amounts and tolerances
    #[test]
    fn test_slippage_law() {
        let mut rng = thread_rng();
        for _ in 0..100 {
            let amount = U256::from(rng.gen::<u128>());
            let bps: u32 = rng.gen_range(0..=1_000);

            let (with_slippage, slippage) = apply_slippage(amount, bps);
            let expected = amount * U256::from(bps) / U256::from(BPS_DENOMINATOR);
            assert_eq!(slippage, expected);
            assert_eq!(with_slippage, amount + expected);
        }
    }

    /// Test rounding a fixed-point value to significant figures
    #[test]
    fn test_round_fixed_point() {
        let cases: [(u128, u8, u32, &str); 6] = [
            (1007358934656766650, 18, 6, "1.00736"),
            (26767, 6, 2, "0.027"),
            (10000, 2, 2, "100.0"),
            (1, 2, 2, "0.01"),
            (0, 2, 2, "0.00"),
            (1, 6, 2, "0.000001"),
        ];

        for (value, decimals, sig_figs, expected) in cases {
            assert_eq!(round_fixed_point(U256::from(value), decimals, sig_figs), expected);
        }
    }

    /// Test parsing decimal strings with excess precision
    #[test]
    fn test_decimal_to_units_truncates() {
        assert_eq!(decimal_to_units("1.5", 6).unwrap(), U256::from(1_500_000u64));
        assert_eq!(decimal_to_units("0.0000019", 6).unwrap(), U256::from(1u64));
        assert_eq!(decimal_to_units("1000", 0).unwrap(), U256::from(1000u64));
        assert!(decimal_to_units("-1", 6).is_err());
        assert!(decimal_to_units("abc", 6).is_err());
    }
}
