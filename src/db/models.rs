use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// One row of the history listing (the payload is not decoded)
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CalculationSummary {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Sum of tax due over all years
    pub tax_due: Decimal,
}
