use tracing::info;

use super::exchanges::ExchangeFormat;
use super::fields::HeaderIndex;

/// Signature columns per layout, checked in priority order.
///
/// Each set is small but unique to one exchange's export; adding an exchange
/// means adding one entry here and one parser.
const SIGNATURES: &[(ExchangeFormat, fn(&HeaderIndex) -> bool)] = &[
    (ExchangeFormat::BinanceLedger, is_binance_ledger),
    (ExchangeFormat::BinanceTrades, is_binance_trades),
    (ExchangeFormat::KrakenLedger, is_kraken_ledger),
    (ExchangeFormat::Coinbase, is_coinbase),
];

fn is_binance_ledger(h: &HeaderIndex) -> bool {
    h.has_all(&["utc_time", "operation", "coin", "change"])
}

fn is_binance_trades(h: &HeaderIndex) -> bool {
    h.has_all(&["date(utc)", "price"]) && (h.has("pair") || h.has("market"))
}

fn is_kraken_ledger(h: &HeaderIndex) -> bool {
    h.has_all(&["txid", "refid", "asset", "amount"])
}

fn is_coinbase(h: &HeaderIndex) -> bool {
    h.has_all(&["timestamp", "transaction type", "asset", "quantity transacted"])
}

/// Pick the row parser for a file from its header row.
///
/// Never fails: a header nobody recognizes gets the generic parser.
pub fn detect_format(headers: &[String]) -> ExchangeFormat {
    let index = HeaderIndex::new(headers);
    detect_format_indexed(&index)
}

pub(crate) fn detect_format_indexed(index: &HeaderIndex) -> ExchangeFormat {
    let format = SIGNATURES
        .iter()
        .find(|(_, matches)| matches(index))
        .map(|(format, _)| *format)
        .unwrap_or(ExchangeFormat::Generic);

    info!("Detected {} layout", format.as_str());
    format
}
