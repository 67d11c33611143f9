//! Prices are stored as whole cents.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

pub fn from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

/// Converts an already validated price (two fraction digits at most).
pub fn to_cents(price: Decimal) -> i64 {
    scaled(price, Decimal::round)
}

/// Largest cent amount that is still `<= bound`.
pub fn floor_cents(bound: Decimal) -> i64 {
    scaled(bound, Decimal::floor)
}

/// Smallest cent amount that is still `>= bound`.
pub fn ceil_cents(bound: Decimal) -> i64 {
    scaled(bound, Decimal::ceil)
}

fn scaled(value: Decimal, snap: fn(&Decimal) -> Decimal) -> i64 {
    match value.checked_mul(Decimal::ONE_HUNDRED) {
        Some(cents) => snap(&cents).to_i64().unwrap_or(saturate(value)),
        None => saturate(value),
    }
}

fn saturate(value: Decimal) -> i64 {
    if value.is_sign_negative() { i64::MIN } else { i64::MAX }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn cents_roundtrip_keeps_two_digits() {
        assert_eq!(to_cents(dec("10.50")), 1050);
        assert_eq!(from_cents(1050).to_string(), "10.50");
        assert_eq!(to_cents(dec("7")), 700);
    }

    #[test]
    fn bounds_snap_toward_the_inside_of_the_range() {
        assert_eq!(floor_cents(dec("10.005")), 1000);
        assert_eq!(ceil_cents(dec("10.005")), 1001);
        assert_eq!(floor_cents(dec("10.00")), 1000);
        assert_eq!(ceil_cents(dec("10.00")), 1000);
    }

    #[test]
    fn huge_bounds_saturate() {
        assert_eq!(floor_cents(Decimal::MAX), i64::MAX);
        assert_eq!(ceil_cents(dec("100000000000000000000")), i64::MAX);
    }
}
