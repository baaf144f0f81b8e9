use rust_decimal::Decimal;
use tracing::debug;

use super::classifier::{is_deductible_cost, is_taxable_disposal};
use super::{round_money, TAX_RATE};
use crate::models::{TaxYear, Transaction};

/// Compute one year's figures from its resolved transactions.
///
/// Returns the year (rounded for display) and the unrounded carry-forward,
/// which is what the next year must inherit.
///
/// Every amount field is rounded from its own unrounded value. The rounded
/// `total_costs` can therefore differ by one grosz from the rounded
/// `current_year_costs + previous_years_costs`.
pub fn compute_tax_year(
    year: i32,
    transactions: Vec<Transaction>,
    carry_in: Decimal,
) -> (TaxYear, Decimal) {
    let disposals: Vec<Transaction> = transactions
        .iter()
        .filter(|tx| is_taxable_disposal(tx))
        .cloned()
        .collect();
    let acquisitions: Vec<Transaction> = transactions
        .iter()
        .filter(|tx| is_deductible_cost(tx))
        .cloned()
        .collect();

    let revenue: Decimal = disposals
        .iter()
        .map(|tx| tx.pln_amount.unwrap_or_default())
        .sum();
    let current_year_costs: Decimal = acquisitions
        .iter()
        .map(|tx| tx.pln_amount.unwrap_or_default() + tx.pln_fee.unwrap_or_default())
        .sum();

    let total_costs = current_year_costs + carry_in;
    // No loss is ever recognized; only the unused cost survives
    let income = (revenue - total_costs).max(Decimal::ZERO);
    let carry_out = (total_costs - revenue).max(Decimal::ZERO);
    let tax_due = income * TAX_RATE;

    debug!(
        "{}: revenue {} costs {} (+{} inherited) income {} carry {}",
        year, revenue, current_year_costs, carry_in, income, carry_out
    );

    let tax_year = TaxYear {
        year,
        revenue: round_money(revenue),
        current_year_costs: round_money(current_year_costs),
        previous_years_costs: round_money(carry_in),
        total_costs: round_money(total_costs),
        income: round_money(income),
        tax_due: round_money(tax_due),
        carry_forward_costs: round_money(carry_out),
        disposals,
        acquisitions,
        transactions,
    };
    (tax_year, carry_out)
}
