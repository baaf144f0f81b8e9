use rust_decimal::Decimal;
use tracing::debug;

use super::{fiat_leg_kind, kind_from_operation, RowRef};
use crate::error::RowError;
use crate::importers::fields::{
    cell, decimal_or_zero, parse_amount_with_unit, required_date_time, required_text, HeaderIndex,
};
use crate::models::{Transaction, TransactionKind, LOCAL_CURRENCY};
use crate::pricing::is_fiat_currency;

const EXCHANGE: &str = "Binance";

/// Quote assets Binance lists, longest first so "USDT" wins over "USD"
const QUOTE_ASSETS: &[&str] = &[
    "FDUSD", "USDT", "USDC", "BUSD", "TUSD", "EURI", "PLN", "EUR", "USD", "GBP", "TRY", "BRL",
    "UAH", "RON", "CZK", "JPY", "BTC", "ETH", "BNB", "DAI", "XRP", "TRX", "DOGE",
];

/// Parse a Binance "Transaction History" row.
///
/// Columns: User_ID, UTC_Time, Account, Operation, Coin, Change, Remark.
/// A fiat coin row carries its own value; a crypto row only moves quantity.
pub fn parse_ledger_row(
    row: &RowRef<'_>,
    headers: &HeaderIndex,
) -> Result<Option<Transaction>, RowError> {
    let cells = row.cells;
    let date_time = required_date_time(cells, headers.find("utc_time"))?;
    let coin = required_text(cells, headers.find("coin"), "coin")?.to_uppercase();
    let operation = cell(cells, headers.find("operation")).unwrap_or("");
    let change = decimal_or_zero(cells, headers.find("change"), "change");

    let note = cell(cells, headers.find("remark"))
        .or(Some(operation).filter(|op| !op.is_empty()))
        .map(|s| s.to_string());

    let mut tx = if is_fiat_currency(&coin) {
        let kind = fiat_leg_kind(operation, change);
        let mut tx = Transaction::new(row.id(), date_time, kind, coin.clone());
        tx.amount = change.abs();
        tx.currency = coin;
        tx
    } else {
        let kind = kind_from_operation(operation, !change.is_sign_negative());
        Transaction::new(row.id(), date_time, kind, coin)
    };

    tx.quantity = change.abs();
    tx.exchange = Some(EXCHANGE.to_string());
    tx.note = note;
    Ok(Some(tx))
}

/// Parse a Binance spot "Trade History" row.
///
/// Legacy layout: Date(UTC), Market, Type, Price, Amount, Total, Fee, Fee Coin.
/// Current layout: Date(UTC), Pair, Side, Price, Executed, Amount, Fee, where
/// quantities carry their unit ("0.5BTC").
pub fn parse_trade_row(
    row: &RowRef<'_>,
    headers: &HeaderIndex,
) -> Result<Option<Transaction>, RowError> {
    let cells = row.cells;
    let date_time = required_date_time(cells, headers.find("date(utc)"))?;
    let pair = required_text(cells, headers.find_any(&["pair", "market"]), "pair")?
        .to_uppercase();
    let (base, quote) = split_pair(&pair);
    let side = cell(cells, headers.find_any(&["side", "type"])).unwrap_or("");
    let current_layout = headers.has("executed");

    let (quantity, total, fee, fee_currency) = if current_layout {
        let (quantity, _) = unit_amount(cells, headers.find("executed"), "executed");
        let (total, _) = unit_amount(cells, headers.find("amount"), "amount");
        let (fee, fee_unit) = unit_amount(cells, headers.find("fee"), "fee");
        (quantity, total, fee, fee_unit)
    } else {
        let quantity = decimal_or_zero(cells, headers.find("amount"), "amount");
        let mut total = decimal_or_zero(cells, headers.find("total"), "total");
        if total.is_zero() {
            total = quantity * decimal_or_zero(cells, headers.find("price"), "price");
        }
        let fee = decimal_or_zero(cells, headers.find("fee"), "fee");
        let fee_coin = cell(cells, headers.find("fee coin")).map(|c| c.to_uppercase());
        (quantity, total, fee, fee_coin)
    };

    let fiat_quote = is_fiat_currency(&quote);
    let kind = if !fiat_quote {
        TransactionKind::CryptoExchange
    } else if side.eq_ignore_ascii_case("buy") {
        TransactionKind::Acquisition
    } else if side.eq_ignore_ascii_case("sell") {
        TransactionKind::Disposal
    } else {
        kind_from_operation(side, true)
    };

    let mut tx = Transaction::new(row.id(), date_time, kind, base.clone());
    tx.quantity = quantity.abs();
    if fiat_quote {
        tx.amount = total.abs();
        tx.currency = quote.clone();
    } else {
        tx.currency = LOCAL_CURRENCY.to_string();
        tx.note = Some(format!(
            "{} {} {} for {} {}",
            side.to_uppercase(),
            quantity.abs(),
            base,
            total.abs(),
            quote
        ));
    }
    if !fee.is_zero() {
        tx.fee = Some(fee.abs());
        tx.fee_currency = Some(fee_currency.unwrap_or_else(|| quote.clone()));
    }
    tx.exchange = Some(EXCHANGE.to_string());
    if tx.note.is_none() && !side.is_empty() {
        tx.note = Some(format!("{} {}", side.to_uppercase(), pair));
    }
    Ok(Some(tx))
}

fn unit_amount(
    cells: &[String],
    idx: Option<usize>,
    field: &'static str,
) -> (Decimal, Option<String>) {
    match cell(cells, idx) {
        Some(text) => parse_amount_with_unit(text, field).unwrap_or_else(|e| {
            debug!("Defaulting to zero: {}", e);
            (Decimal::ZERO, None)
        }),
        None => (Decimal::ZERO, None),
    }
}

/// Split a market symbol into base and quote ("BTCPLN" -> BTC, PLN)
pub fn split_pair(pair: &str) -> (String, String) {
    if let Some((base, quote)) = pair.split_once(|c: char| matches!(c, '/' | '-' | '_')) {
        return (base.to_string(), quote.to_string());
    }
    QUOTE_ASSETS
        .iter()
        .find(|q| pair.len() > q.len() && pair.ends_with(*q))
        .map(|q| (pair[..pair.len() - q.len()].to_string(), q.to_string()))
        .unwrap_or_else(|| (pair.to_string(), LOCAL_CURRENCY.to_string()))
}
