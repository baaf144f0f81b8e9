//! Multi-year PIT-38 computation over imported batches.
//!
//! The engine converts every transaction to PLN (exactly once; transactions
//! that already carry a rate keep it), partitions them by calendar year and
//! threads the unrounded carry-forward from each year into the next.

use chrono::{DateTime, Datelike, Utc};
use itertools::Itertools;
use rust_decimal::Decimal;
use tracing::{debug, info};

use super::annual::compute_tax_year;
use crate::models::{ParsedBatch, TaxCalculation, TaxTotals, TaxYear, Transaction};
use crate::pricing::{RateResolver, RateSource};
use crate::ui::progress::ProgressEvent;

pub struct TaxEngine<S> {
    resolver: RateResolver<S>,
}

impl<S: RateSource> TaxEngine<S> {
    pub fn new(resolver: RateResolver<S>) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &RateResolver<S> {
        &self.resolver
    }

    /// Compute every year present in `batches`
    pub async fn calculate(
        &self,
        batches: Vec<ParsedBatch>,
        carry_forward: Decimal,
        name: &str,
    ) -> TaxCalculation {
        self.calculate_with_progress(batches, carry_forward, name, |_| {})
            .await
    }

    /// Version with progress callback for UI updates
    pub async fn calculate_with_progress<F>(
        &self,
        batches: Vec<ParsedBatch>,
        carry_forward: Decimal,
        name: &str,
        mut progress: F,
    ) -> TaxCalculation
    where
        F: FnMut(&ProgressEvent),
    {
        let mut transactions = combined_transactions(&batches);
        info!(
            "Calculating {} transactions from {} file(s)",
            transactions.len(),
            batches.len()
        );

        let total = transactions.len();
        progress(&ProgressEvent::transient(format!(
            "Converting {} transactions to PLN",
            total
        )));
        for (done, tx) in transactions.iter_mut().enumerate() {
            if !tx.is_resolved() {
                self.resolve_transaction(tx).await;
            }
            progress(&ProgressEvent::Resolving {
                done: done + 1,
                total,
            });
        }

        let years = compute_years(transactions, carry_forward, &mut progress);
        let created_at = Utc::now();
        TaxCalculation {
            id: calculation_id(name, created_at),
            name: name.to_string(),
            created_at,
            updated_at: created_at,
            incoming_carry_forward: carry_forward,
            totals: TaxTotals::from_years(&years),
            years,
            batches,
        }
    }

    async fn resolve_transaction(&self, tx: &mut Transaction) {
        let date = tx.date_time.date();

        let rate = self.resolver.resolve(&tx.currency, date).await;
        tx.pln_amount = Some(tx.amount * rate.rate);
        tx.rate = Some(rate);

        if let Some(fee) = tx.fee {
            let fee_currency = tx.fee_currency.as_deref().unwrap_or(&tx.currency);
            let fee_rate = self.resolver.resolve(fee_currency, date).await;
            tx.pln_fee = Some(fee * fee_rate.rate);
            tx.fee_rate = Some(fee_rate);
        }
    }
}

/// Recompute a stored calculation from the rates already attached to it.
///
/// No rate source is consulted, so the result depends only on `previous`.
pub fn replay(previous: &TaxCalculation) -> TaxCalculation {
    let transactions: Vec<Transaction> = previous
        .years
        .iter()
        .flat_map(|y| y.transactions.iter().cloned())
        .collect();

    let years = compute_years(transactions, previous.incoming_carry_forward, &mut |_| {});
    TaxCalculation {
        id: previous.id.clone(),
        name: previous.name.clone(),
        created_at: previous.created_at,
        updated_at: previous.updated_at,
        incoming_carry_forward: previous.incoming_carry_forward,
        totals: TaxTotals::from_years(&years),
        years,
        batches: previous.batches.clone(),
    }
}

/// All batch transactions, stably sorted by date-time
fn combined_transactions(batches: &[ParsedBatch]) -> Vec<Transaction> {
    let mut transactions: Vec<Transaction> = batches
        .iter()
        .flat_map(|b| b.transactions.iter().cloned())
        .collect();
    transactions.sort_by_key(|tx| tx.date_time);
    transactions
}

fn compute_years<F>(
    mut transactions: Vec<Transaction>,
    carry_forward: Decimal,
    progress: &mut F,
) -> Vec<TaxYear>
where
    F: FnMut(&ProgressEvent),
{
    transactions.sort_by_key(|tx| tx.date_time);

    let mut years = Vec::new();
    let mut carry = carry_forward;
    let by_year = transactions.into_iter().chunk_by(|tx| tx.date_time.year());
    for (year, group) in &by_year {
        let (tax_year, carry_out) = compute_tax_year(year, group.collect(), carry);
        debug!("{}: carry-forward {} -> {}", year, carry, carry_out);
        progress(&ProgressEvent::persistent(format!(
            "{}: income {} PLN, tax {} PLN",
            year, tax_year.income, tax_year.tax_due
        )));
        carry = carry_out;
        years.push(tax_year);
    }
    years
}

fn calculation_id(name: &str, created_at: DateTime<Utc>) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(name.as_bytes());
    hasher.update(created_at.to_rfc3339().as_bytes());
    let hex = hasher.finalize().to_hex();
    hex.as_str()[..16].to_string()
}
