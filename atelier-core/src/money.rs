use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Convert a whole-unit amount to minor currency units (cents for USD).
/// Truncates anything below the minor unit. Returns `None` if the amount
/// does not fit in an `i64`, which only happens for absurd totals.
pub fn to_minor_units(amount: Decimal) -> Option<i64> {
    (amount * Decimal::ONE_HUNDRED).trunc().to_i64()
}
