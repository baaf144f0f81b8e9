use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

use crate::importers::ExchangeFormat;
use crate::pricing::{RateOrigin, ResolvedRate};

/// Local currency every amount is converted to
pub const LOCAL_CURRENCY: &str = "PLN";

/// Semantic kind of a canonical transaction
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TransactionKind {
    Acquisition,     // Crypto bought for fiat
    Disposal,        // Crypto sold for fiat
    CryptoExchange,  // Crypto-to-crypto swap (not taxable)
    Fee,
    TransferIn,
    TransferOut,
    PaymentDisposal, // Paying for goods/services with crypto
    StakingReward,
    Airdrop,
    Unrecognized,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Acquisition => "ACQUISITION",
            TransactionKind::Disposal => "DISPOSAL",
            TransactionKind::CryptoExchange => "CRYPTO_EXCHANGE",
            TransactionKind::Fee => "FEE",
            TransactionKind::TransferIn => "TRANSFER_IN",
            TransactionKind::TransferOut => "TRANSFER_OUT",
            TransactionKind::PaymentDisposal => "PAYMENT_DISPOSAL",
            TransactionKind::StakingReward => "STAKING_REWARD",
            TransactionKind::Airdrop => "AIRDROP",
            TransactionKind::Unrecognized => "UNRECOGNIZED",
        }
    }
}

impl FromStr for TransactionKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ACQUISITION" | "BUY" => Ok(TransactionKind::Acquisition),
            "DISPOSAL" | "SELL" => Ok(TransactionKind::Disposal),
            "CRYPTO_EXCHANGE" | "CONVERT" | "SWAP" => Ok(TransactionKind::CryptoExchange),
            "FEE" => Ok(TransactionKind::Fee),
            "TRANSFER_IN" => Ok(TransactionKind::TransferIn),
            "TRANSFER_OUT" => Ok(TransactionKind::TransferOut),
            "PAYMENT_DISPOSAL" | "PAYMENT" => Ok(TransactionKind::PaymentDisposal),
            "STAKING_REWARD" | "STAKING" => Ok(TransactionKind::StakingReward),
            "AIRDROP" => Ok(TransactionKind::Airdrop),
            "UNRECOGNIZED" => Ok(TransactionKind::Unrecognized),
            _ => Err(()),
        }
    }
}

/// Canonical, exchange-agnostic transaction.
///
/// Quantities and amounts are non-negative magnitudes; direction lives in
/// `kind`. The `pln_*` and `*rate` fields are filled by the tax engine, never
/// by a parser.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub id: String,
    pub date_time: NaiveDateTime,
    pub kind: TransactionKind,
    pub symbol: String,
    pub quantity: Decimal,
    pub amount: Decimal,
    pub currency: String,
    pub fee: Option<Decimal>,
    pub fee_currency: Option<String>,
    pub exchange: Option<String>,
    pub note: Option<String>,
    pub pln_amount: Option<Decimal>,
    pub pln_fee: Option<Decimal>,
    pub rate: Option<ResolvedRate>,
    pub fee_rate: Option<ResolvedRate>,
}

impl Transaction {
    pub fn new(
        id: impl Into<String>,
        date_time: NaiveDateTime,
        kind: TransactionKind,
        symbol: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            date_time,
            kind,
            symbol: symbol.into(),
            quantity: Decimal::ZERO,
            amount: Decimal::ZERO,
            currency: LOCAL_CURRENCY.to_string(),
            fee: None,
            fee_currency: None,
            exchange: None,
            note: None,
            pln_amount: None,
            pln_fee: None,
            rate: None,
            fee_rate: None,
        }
    }

    /// True once the engine attached a rate for the amount (and the fee, if any)
    pub fn is_resolved(&self) -> bool {
        self.pln_amount.is_some() && (self.fee.is_none() || self.pln_fee.is_some())
    }

    /// True when the amount or fee was converted with a built-in approximate rate
    pub fn used_fallback_rate(&self) -> bool {
        [&self.rate, &self.fee_rate]
            .into_iter()
            .flatten()
            .any(|r| r.origin == RateOrigin::Fallback)
    }
}

/// Declared kind of an input file
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FileKind {
    Csv,
    Sheet,
    Unsupported,
}

impl FileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Csv => "CSV",
            FileKind::Sheet => "SHEET",
            FileKind::Unsupported => "UNSUPPORTED",
        }
    }

    /// Decide the kind from the file extension
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        let extension = path
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        match extension.as_deref() {
            Some("csv" | "txt") => FileKind::Csv,
            Some("xlsx" | "xlsm" | "xls" | "xlsb" | "ods") => FileKind::Sheet,
            _ => FileKind::Unsupported,
        }
    }
}

/// Result of ingesting one input file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParsedBatch {
    pub file_name: String,
    pub file_kind: FileKind,
    pub format: Option<ExchangeFormat>,
    pub transactions: Vec<Transaction>,
    pub warnings: Vec<String>,
}

/// Tax figures for one calendar year
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaxYear {
    pub year: i32,
    pub revenue: Decimal,
    pub current_year_costs: Decimal,
    pub previous_years_costs: Decimal,
    pub total_costs: Decimal,
    pub income: Decimal,
    pub tax_due: Decimal,
    pub carry_forward_costs: Decimal,
    pub disposals: Vec<Transaction>,
    pub acquisitions: Vec<Transaction>,
    /// Every transaction dated in this year, including ones that count for nothing
    pub transactions: Vec<Transaction>,
}

/// Grand totals across all years
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TaxTotals {
    pub revenue: Decimal,
    pub current_year_costs: Decimal,
    pub previous_years_costs: Decimal,
    pub total_costs: Decimal,
    pub income: Decimal,
    pub tax_due: Decimal,
    pub carry_forward_costs: Decimal,
}

impl TaxTotals {
    pub fn from_years(years: &[TaxYear]) -> Self {
        years.iter().fold(TaxTotals::default(), |mut acc, y| {
            acc.revenue += y.revenue;
            acc.current_year_costs += y.current_year_costs;
            acc.previous_years_costs += y.previous_years_costs;
            acc.total_costs += y.total_costs;
            acc.income += y.income;
            acc.tax_due += y.tax_due;
            acc.carry_forward_costs += y.carry_forward_costs;
            acc
        })
    }
}

/// Complete result of one engine run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaxCalculation {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub incoming_carry_forward: Decimal,
    pub years: Vec<TaxYear>,
    pub batches: Vec<ParsedBatch>,
    pub totals: TaxTotals,
}

impl TaxCalculation {
    /// Number of transactions converted with at least one approximate rate
    pub fn fallback_rate_count(&self) -> usize {
        self.years
            .iter()
            .flat_map(|y| y.transactions.iter())
            .filter(|tx| tx.used_fallback_rate())
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.batches.iter().map(|b| b.warnings.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_kind_from_path() {
        assert_eq!(FileKind::from_path("binance.CSV"), FileKind::Csv);
        assert_eq!(FileKind::from_path("export.xlsx"), FileKind::Sheet);
        assert_eq!(FileKind::from_path("statement.pdf"), FileKind::Unsupported);
        assert_eq!(FileKind::from_path("no_extension"), FileKind::Unsupported);
    }

    #[test]
    fn test_transaction_kind_round_trips_through_str() {
        for kind in [
            TransactionKind::Acquisition,
            TransactionKind::CryptoExchange,
            TransactionKind::PaymentDisposal,
            TransactionKind::Unrecognized,
        ] {
            assert_eq!(TransactionKind::from_str(kind.as_str()), Ok(kind));
        }
        assert!(TransactionKind::from_str("nonsense").is_err());
    }
}
