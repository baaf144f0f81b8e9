//! Fallback parser for layouts no exchange-specific strategy recognizes.
//!
//! Each field is located independently by the first header (in header order)
//! whose normalized name belongs to that field's synonym set. Only the date
//! is required; everything else degrades to zero or "UNKNOWN".

use super::{kind_from_operation, RowRef};
use crate::error::RowError;
use crate::importers::fields::{cell, decimal_or_zero, required_date_time, HeaderIndex};
use crate::models::{Transaction, LOCAL_CURRENCY};

pub const DATE_SYNONYMS: &[&str] = &[
    "date",
    "datetime",
    "date time",
    "time",
    "timestamp",
    "utc_time",
    "date(utc)",
    "created at",
    "data",
    "data operacji",
    "data transakcji",
    "czas",
];

pub const TYPE_SYNONYMS: &[&str] = &[
    "type",
    "transaction type",
    "operation",
    "side",
    "kind",
    "action",
    "rodzaj",
    "typ",
    "operacja",
];

pub const QUANTITY_SYNONYMS: &[&str] = &[
    "quantity",
    "amount",
    "qty",
    "volume",
    "size",
    "executed",
    "change",
    "ilosc",
    "liczba",
];

pub const SYMBOL_SYNONYMS: &[&str] = &[
    "asset",
    "coin",
    "symbol",
    "currency",
    "cryptocurrency",
    "crypto",
    "token",
    "market",
    "pair",
    "kryptowaluta",
    "waluta",
    "rynek",
];

pub const TOTAL_SYNONYMS: &[&str] = &[
    "total",
    "value",
    "subtotal",
    "cost",
    "proceeds",
    "wartosc",
    "kwota",
    "suma",
];

pub const PRICE_SYNONYMS: &[&str] = &["price", "unit price", "rate", "cena", "kurs"];

pub const FEE_SYNONYMS: &[&str] = &["fee", "fees", "commission", "prowizja", "oplata"];

pub const FIAT_SYNONYMS: &[&str] = &[
    "currency",
    "waluta",
    "fiat currency",
    "quote currency",
    "price currency",
    "spot price currency",
    "waluta rozliczenia",
];

pub const NOTE_SYNONYMS: &[&str] = &["note", "notes", "remark", "description", "opis", "uwagi"];

const UNKNOWN_SYMBOL: &str = "UNKNOWN";

pub fn parse_row(
    row: &RowRef<'_>,
    headers: &HeaderIndex,
) -> Result<Option<Transaction>, RowError> {
    let cells = row.cells;
    let date_time = required_date_time(cells, headers.first_in(DATE_SYNONYMS))?;

    let (symbol_idx, fiat_idx) = symbol_and_fiat_columns(headers);
    let symbol = cell(cells, symbol_idx)
        .map(|s| s.to_uppercase())
        .unwrap_or_else(|| UNKNOWN_SYMBOL.to_string());
    let operation = cell(cells, headers.first_in(TYPE_SYNONYMS)).unwrap_or("");
    let quantity = decimal_or_zero(cells, headers.first_in(QUANTITY_SYNONYMS), "quantity");

    let amount = match headers.first_in(TOTAL_SYNONYMS) {
        Some(idx) => decimal_or_zero(cells, Some(idx), "total"),
        None => quantity * decimal_or_zero(cells, headers.first_in(PRICE_SYNONYMS), "price"),
    };
    let currency = cell(cells, fiat_idx)
        .map(|c| c.to_uppercase())
        .unwrap_or_else(|| LOCAL_CURRENCY.to_string());
    let fee = decimal_or_zero(cells, headers.first_in(FEE_SYNONYMS), "fee");

    let kind = kind_from_operation(operation, !quantity.is_sign_negative());
    let mut tx = Transaction::new(row.id(), date_time, kind, symbol);
    tx.quantity = quantity.abs();
    tx.amount = amount.abs();
    tx.currency = currency.clone();
    if !fee.is_zero() {
        tx.fee = Some(fee.abs());
        tx.fee_currency = Some(currency);
    }
    tx.note = cell(cells, headers.first_in(NOTE_SYNONYMS))
        .or(Some(operation).filter(|op| !op.is_empty()))
        .map(|s| s.to_string());
    Ok(Some(tx))
}

/// Asset and fiat columns. "Currency" and "Waluta" name the fiat of the
/// amounts when another column names the asset, and the asset otherwise.
fn symbol_and_fiat_columns(headers: &HeaderIndex) -> (Option<usize>, Option<usize>) {
    let fiat = headers.first_in(FIAT_SYNONYMS);
    let symbol_columns: Vec<usize> = headers.positions_in(SYMBOL_SYNONYMS).collect();
    match symbol_columns.iter().copied().find(|&i| Some(i) != fiat) {
        Some(symbol) => (Some(symbol), fiat),
        None => match fiat {
            Some(i) if symbol_columns.contains(&i) => (Some(i), None),
            _ => (None, fiat),
        },
    }
}
