// Tax module - PIT-38 crypto revenue, cost and carry-forward per calendar year

pub mod annual;
pub mod classifier;
pub mod engine;

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

pub use annual::compute_tax_year;
pub use classifier::{is_deductible_cost, is_taxable_disposal};
pub use engine::{replay, TaxEngine};

/// Flat rate on crypto income
pub const TAX_RATE: Decimal = dec!(0.19);

/// Round a final figure to grosze
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
