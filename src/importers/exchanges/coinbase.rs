use super::{kind_from_operation, RowRef};
use crate::error::RowError;
use crate::importers::fields::{
    cell, decimal_or_zero, normalize_header, required_date_time, required_text, HeaderIndex,
};
use crate::models::{Transaction, TransactionKind, LOCAL_CURRENCY};

const EXCHANGE: &str = "Coinbase";

/// Parse a Coinbase transaction report row.
///
/// Columns: ID, Timestamp, Transaction Type, Asset, Quantity Transacted,
/// Spot Price Currency, Spot Price at Transaction, Subtotal,
/// Total (inclusive of fees and/or spread), Fees and/or Spread, Notes.
pub fn parse_row(
    row: &RowRef<'_>,
    headers: &HeaderIndex,
) -> Result<Option<Transaction>, RowError> {
    let cells = row.cells;
    let date_time = required_date_time(cells, headers.find("timestamp"))?;
    let asset = required_text(cells, headers.find("asset"), "asset")?.to_uppercase();
    let tx_type = cell(cells, headers.find("transaction type")).unwrap_or("");

    let quantity = decimal_or_zero(cells, headers.find("quantity transacted"), "quantity");
    let currency = cell(
        cells,
        headers.find_any(&["spot price currency", "price currency"]),
    )
    .map(|c| c.to_uppercase())
    .unwrap_or_else(|| LOCAL_CURRENCY.to_string());

    let subtotal = decimal_or_zero(cells, headers.find("subtotal"), "subtotal");
    let total = decimal_or_zero(
        cells,
        headers.find("total (inclusive of fees and/or spread)"),
        "total",
    );
    let spot = decimal_or_zero(
        cells,
        headers.find_any(&["spot price at transaction", "price at transaction"]),
        "spot price",
    );
    let amount = [subtotal, total, quantity * spot]
        .into_iter()
        .find(|v| !v.is_zero())
        .unwrap_or_default();
    let fee = decimal_or_zero(cells, headers.find("fees and/or spread"), "fee");

    let kind = coinbase_kind(tx_type, !quantity.is_sign_negative());
    let mut tx = Transaction::new(row.id(), date_time, kind, asset);
    tx.quantity = quantity.abs();
    tx.amount = amount.abs();
    tx.currency = currency.clone();
    if !fee.is_zero() {
        tx.fee = Some(fee.abs());
        tx.fee_currency = Some(currency);
    }
    tx.exchange = Some(EXCHANGE.to_string());
    tx.note = cell(cells, headers.find("notes"))
        .or(Some(tx_type).filter(|t| !t.is_empty()))
        .map(|s| s.to_string());
    Ok(Some(tx))
}

fn coinbase_kind(tx_type: &str, positive: bool) -> TransactionKind {
    let normalized = normalize_header(tx_type);
    match normalized.as_str() {
        "buy" | "advanced trade buy" | "advance trade buy" => TransactionKind::Acquisition,
        "sell" | "advanced trade sell" | "advance trade sell" => TransactionKind::Disposal,
        "convert" => TransactionKind::CryptoExchange,
        "send" => TransactionKind::TransferOut,
        "receive" => TransactionKind::TransferIn,
        "rewards income" | "staking income" | "inflation reward" => TransactionKind::StakingReward,
        "learning reward" | "coinbase earn" => TransactionKind::Airdrop,
        _ => kind_from_operation(tx_type, positive),
    }
}
