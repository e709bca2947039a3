//! Token unit conversion and percentage display
//!
//! Every quantity stays in base units as an arbitrary-precision integer
//! until one of the formatting helpers turns it into a display string.

use std::fmt;

use num_bigint::{BigInt, BigUint, Sign};
use num_traits::Zero;
use serde::{Serialize, Serializer};

use crate::error::{GovernanceError, Result};

/// Decimal places of an ERC20 token such as DXD
pub const DEFAULT_DECIMALS: u32 = 18;

/// Reputation is always an 18-decimal token
pub const REPUTATION_DECIMALS: u32 = 18;

/// `10^decimals` as a big integer
pub fn scale(decimals: u32) -> BigUint {
    BigUint::from(10u32).pow(decimals)
}

/// `numerator / denominator`, rounding halves away from zero.
fn div_round_half_up(numerator: &BigUint, denominator: &BigUint) -> BigUint {
    (numerator * 2u32 + denominator) / (denominator * 2u32)
}

fn hundredths_to_string(hundredths: &BigUint) -> String {
    let hundred = BigUint::from(100u32);
    let whole = hundredths / &hundred;
    let frac = hundredths % &hundred;
    format!("{}.{:0>2}", whole, frac.to_string())
}

/// Display an amount in token denomination, rounded half-up to 2 places.
///
/// Display only: callers must keep accounting in base units.
pub fn from_base_units(amount: &BigUint, decimals: u32) -> String {
    let hundredths = div_round_half_up(&(amount * 100u32), &scale(decimals));
    hundredths_to_string(&hundredths)
}

/// Signed variant of [`from_base_units`]
pub fn from_signed_base_units(amount: &BigInt, decimals: u32) -> String {
    let magnitude = from_base_units(amount.magnitude(), decimals);
    match amount.sign() {
        Sign::Minus if magnitude != "0.00" => format!("-{}", magnitude),
        _ => magnitude,
    }
}

/// Full-precision conversion to token denomination ("1.5", "0", "42").
pub fn format_units(amount: &BigUint, decimals: u32) -> String {
    let unit = scale(decimals);
    let whole = amount / &unit;
    let frac = amount % &unit;
    if frac.is_zero() {
        return whole.to_string();
    }
    let digits = format!("{:0>width$}", frac.to_string(), width = decimals as usize);
    format!("{}.{}", whole, digits.trim_end_matches('0'))
}

/// Parse a user-entered decimal amount ("-2.5") into signed base units.
pub fn parse_units(input: &str, decimals: u32) -> Result<BigInt> {
    let trimmed = input.trim();
    let (negative, body) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };

    let (whole, frac) = match body.split_once('.') {
        Some((whole, frac)) => (whole, frac),
        None => (body, ""),
    };

    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if (whole.is_empty() && frac.is_empty()) || !all_digits(whole) || !all_digits(frac) {
        return Err(GovernanceError::InvalidAmount(input.to_string()));
    }
    if frac.len() > decimals as usize {
        return Err(GovernanceError::InvalidAmount(format!(
            "{} has more than {} decimal places",
            input, decimals
        )));
    }

    let digits = format!("{}{:0<width$}", whole, frac, width = decimals as usize);
    let magnitude = BigUint::parse_bytes(digits.as_bytes(), 10).unwrap_or_default();
    let sign = if negative { Sign::Minus } else { Sign::Plus };
    Ok(BigInt::from_biguint(sign, magnitude))
}

/// Parse a chain integer: decimal, or hex with a `0x` prefix.
pub fn parse_integer(value: &str) -> Option<BigUint> {
    let value = value.trim();
    match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) if !hex.is_empty() => BigUint::parse_bytes(hex.as_bytes(), 16),
        Some(_) => None,
        None => BigUint::parse_bytes(value.as_bytes(), 10),
    }
}

/// How a ratio is reduced to hundredths of a percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    /// Truncate; sums of parts never exceed the sum of their inputs.
    Down,
    HalfUp,
}

/// A percentage held as an exact count of hundredths ("12.34" %).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Percentage {
    hundredths: BigUint,
}

impl Percentage {
    pub fn zero() -> Self {
        Self {
            hundredths: BigUint::zero(),
        }
    }

    /// `part / total * 100`. Returns `None` when `total` is zero.
    pub fn of(part: &BigUint, total: &BigUint, rounding: Rounding) -> Option<Self> {
        if total.is_zero() {
            return None;
        }
        let scaled = part * 10_000u32;
        let hundredths = match rounding {
            Rounding::Down => scaled / total,
            Rounding::HalfUp => div_round_half_up(&scaled, total),
        };
        Some(Self { hundredths })
    }

    pub fn hundredths(&self) -> &BigUint {
        &self.hundredths
    }
}

impl std::ops::Add for &Percentage {
    type Output = Percentage;

    fn add(self, other: &Percentage) -> Percentage {
        Percentage {
            hundredths: &self.hundredths + &other.hundredths,
        }
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hundredths_to_string(&self.hundredths))
    }
}

impl Serialize for Percentage {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Serde adapter: base-unit amounts as decimal strings.
///
/// Accepts JSON numbers, decimal strings and `0x` hex strings on input.
pub mod amount {
    use std::fmt;

    use num_bigint::BigUint;
    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigUint, D::Error> {
        deserializer.deserialize_any(AmountVisitor)
    }

    struct AmountVisitor;

    impl<'de> Visitor<'de> for AmountVisitor {
        type Value = BigUint;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a non-negative integer, decimal string or 0x-prefixed hex string")
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<BigUint, E> {
            Ok(BigUint::from(value))
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<BigUint, E> {
            u64::try_from(value)
                .map(BigUint::from)
                .map_err(|_| E::custom(format!("negative amount: {}", value)))
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<BigUint, E> {
            super::parse_integer(value).ok_or_else(|| E::custom(format!("invalid amount: {}", value)))
        }
    }
}

/// Serde adapter for sequences of base-unit amounts.
pub mod amounts {
    use num_bigint::BigUint;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    struct Item(#[serde(with = "super::amount")] BigUint);

    pub fn serialize<S: Serializer>(values: &[BigUint], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(values.iter().map(|value| value.to_string()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<BigUint>, D::Error> {
        let items = Vec::<Item>::deserialize(deserializer)?;
        Ok(items.into_iter().map(|item| item.0).collect())
    }
}

/// Serialize a signed base-unit amount as a decimal string.
pub fn serialize_signed<S: Serializer>(
    value: &BigInt,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wei(value: &str) -> BigUint {
        parse_integer(value).unwrap()
    }

    #[test]
    fn test_from_base_units_rounds_half_up() {
        assert_eq!(from_base_units(&wei("1500000000000000000"), 18), "1.50");
        assert_eq!(from_base_units(&wei("1005000000000000000"), 18), "1.01");
        assert_eq!(from_base_units(&wei("1004999999999999999"), 18), "1.00");
        assert_eq!(from_base_units(&BigUint::zero(), 18), "0.00");
        assert_eq!(from_base_units(&wei("7"), 0), "7.00");
    }

    #[test]
    fn test_signed_display() {
        let negative = BigInt::from(-2_500_000_000_000_000_000i128);
        assert_eq!(from_signed_base_units(&negative, 18), "-2.50");
        assert_eq!(from_signed_base_units(&BigInt::from(-1), 18), "0.00");
    }

    #[test]
    fn test_format_units_full_precision() {
        assert_eq!(format_units(&wei("1500000000000000000"), 18), "1.5");
        assert_eq!(format_units(&wei("1"), 18), "0.000000000000000001");
        assert_eq!(format_units(&wei("3000000000000000000"), 18), "3");
        assert_eq!(format_units(&BigUint::zero(), 18), "0");
    }

    #[test]
    fn test_parse_units() {
        assert_eq!(
            parse_units("2.5", 18).unwrap(),
            BigInt::from(2_500_000_000_000_000_000i128)
        );
        assert_eq!(parse_units("-1", 2).unwrap(), BigInt::from(-100));
        assert_eq!(parse_units(".5", 1).unwrap(), BigInt::from(5));
        assert!(parse_units("1.234", 2).is_err());
        assert!(parse_units("abc", 18).is_err());
        assert!(parse_units("", 18).is_err());
        assert!(parse_units("-", 18).is_err());
    }

    #[test]
    fn test_parse_integer_hex_and_decimal() {
        assert_eq!(parse_integer("0x10"), Some(BigUint::from(16u32)));
        assert_eq!(parse_integer("42"), Some(BigUint::from(42u32)));
        assert_eq!(parse_integer("0x"), None);
        assert_eq!(parse_integer("-1"), None);
    }

    #[test]
    fn test_percentage_rounding() {
        let total = BigUint::from(3u32);
        let one = BigUint::from(1u32);
        let two = BigUint::from(2u32);

        let down = Percentage::of(&two, &total, Rounding::Down).unwrap();
        let up = Percentage::of(&two, &total, Rounding::HalfUp).unwrap();
        assert_eq!(down.to_string(), "66.66");
        assert_eq!(up.to_string(), "66.67");
        assert_eq!(
            Percentage::of(&one, &total, Rounding::HalfUp).unwrap().to_string(),
            "33.33"
        );
        assert!(Percentage::of(&one, &BigUint::zero(), Rounding::Down).is_none());
    }

    #[test]
    fn test_amount_serde_accepts_numbers_and_strings() {
        #[derive(serde::Deserialize, serde::Serialize)]
        struct Wrapper {
            #[serde(with = "amount")]
            value: BigUint,
        }

        let from_number: Wrapper = serde_json::from_str(r#"{"value": 12}"#).unwrap();
        let from_string: Wrapper =
            serde_json::from_str(r#"{"value": "1000000000000000000000000"}"#).unwrap();
        let from_hex: Wrapper = serde_json::from_str(r#"{"value": "0xff"}"#).unwrap();

        assert_eq!(from_number.value, BigUint::from(12u32));
        assert_eq!(from_string.value, wei("1000000000000000000000000"));
        assert_eq!(from_hex.value, BigUint::from(255u32));
        assert_eq!(
            serde_json::to_string(&from_number).unwrap(),
            r#"{"value":"12"}"#
        );
        assert!(serde_json::from_str::<Wrapper>(r#"{"value": -3}"#).is_err());
    }
}
