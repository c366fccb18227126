use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

/// Balances and differences below this are treated as settled.
pub const TOLERANCE: Decimal = dec!(0.01);

/// Largest accepted expense amount. Group totals stay far from
/// `Decimal::MAX`, so balance and summary folds cannot overflow.
pub const MAX_AMOUNT: Decimal = dec!(1000000000000);

pub fn round_to_2_decimals(n: Decimal) -> Decimal {
    n.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

pub fn is_negligible(n: Decimal) -> bool {
    n.abs() < TOLERANCE
}
