use tracing::debug;

use super::{fiat_leg_kind, kind_from_operation, RowRef};
use crate::error::RowError;
use crate::importers::fields::{cell, decimal_or_zero, required_date_time, required_text, HeaderIndex};
use crate::models::{Transaction, TransactionKind};
use crate::pricing::is_fiat_currency;

const EXCHANGE: &str = "Kraken";

/// Parse a Kraken ledger row.
///
/// Columns: txid, refid, time, type, subtype, aclass, asset, amount, fee,
/// balance. Every trade shows up as two rows sharing a refid; the fiat leg
/// carries the value, the crypto leg is recorded as an exchange of assets.
pub fn parse_row(
    row: &RowRef<'_>,
    headers: &HeaderIndex,
) -> Result<Option<Transaction>, RowError> {
    let cells = row.cells;

    // Rows without a txid are pending entries Kraken repeats once settled
    if cell(cells, headers.find("txid")).is_none() {
        debug!("Skipping unsettled Kraken row {}", row.number);
        return Ok(None);
    }

    let date_time = required_date_time(cells, headers.find("time"))?;
    let asset = normalize_asset(required_text(cells, headers.find("asset"), "asset")?);
    let entry_type = cell(cells, headers.find("type")).unwrap_or("");
    let subtype = cell(cells, headers.find("subtype")).unwrap_or("");
    let amount = decimal_or_zero(cells, headers.find("amount"), "amount");
    let fee = decimal_or_zero(cells, headers.find("fee"), "fee");

    let mut tx = if is_fiat_currency(&asset) {
        let kind = fiat_leg_kind(entry_type, amount);
        let mut tx = Transaction::new(row.id(), date_time, kind, asset.clone());
        tx.amount = amount.abs();
        tx.currency = asset.clone();
        tx
    } else {
        let kind = crypto_kind(entry_type, subtype, !amount.is_sign_negative());
        Transaction::new(row.id(), date_time, kind, asset.clone())
    };

    tx.quantity = amount.abs();
    if !fee.is_zero() {
        tx.fee = Some(fee.abs());
        tx.fee_currency = Some(asset);
    }
    tx.exchange = Some(EXCHANGE.to_string());

    let refid = cell(cells, headers.find("refid"));
    tx.note = Some(match (subtype.is_empty(), refid) {
        (true, Some(r)) => format!("{} {}", entry_type, r),
        (false, Some(r)) => format!("{}/{} {}", entry_type, subtype, r),
        (_, None) => entry_type.to_string(),
    });
    Ok(Some(tx))
}

fn crypto_kind(entry_type: &str, subtype: &str, positive: bool) -> TransactionKind {
    match entry_type.to_ascii_lowercase().as_str() {
        "trade" | "spend" | "receive" => TransactionKind::CryptoExchange,
        "deposit" => TransactionKind::TransferIn,
        "withdrawal" => TransactionKind::TransferOut,
        "staking" | "earn" | "dividend" => TransactionKind::StakingReward,
        "transfer" if subtype.eq_ignore_ascii_case("airdrop") => TransactionKind::Airdrop,
        other => kind_from_operation(other, positive),
    }
}

/// Kraken's legacy X/Z-prefixed asset codes and their common tickers
const LEGACY_ASSETS: &[(&str, &str)] = &[
    ("XXBT", "BTC"),
    ("XBT", "BTC"),
    ("XXDG", "DOGE"),
    ("XDG", "DOGE"),
    ("XETH", "ETH"),
    ("XETC", "ETC"),
    ("XLTC", "LTC"),
    ("XMLN", "MLN"),
    ("XREP", "REP"),
    ("XXLM", "XLM"),
    ("XXMR", "XMR"),
    ("XXRP", "XRP"),
    ("XZEC", "ZEC"),
    ("ZEUR", "EUR"),
    ("ZUSD", "USD"),
    ("ZGBP", "GBP"),
    ("ZCAD", "CAD"),
    ("ZJPY", "JPY"),
    ("ZAUD", "AUD"),
];

/// Map Kraken's asset codes to common tickers ("XXBT" -> "BTC", "DOT.S" -> "DOT")
pub fn normalize_asset(asset: &str) -> String {
    let upper = asset.trim().to_uppercase();
    let base = upper.split('.').next().unwrap_or(upper.as_str());

    LEGACY_ASSETS
        .iter()
        .find(|(code, _)| *code == base)
        .map_or(base, |(_, ticker)| *ticker)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn headers() -> HeaderIndex {
        HeaderIndex::new(&strings(&[
            "txid", "refid", "time", "type", "subtype", "aclass", "asset", "amount", "fee",
            "balance",
        ]))
    }

    fn parse(cells: &[&str]) -> Result<Option<Transaction>, RowError> {
        let cells = strings(cells);
        let row = RowRef {
            file_name: "ledgers.csv",
            number: 2,
            cells: &cells,
        };
        parse_row(&row, &headers())
    }

    #[test]
    fn test_normalize_asset() {
        assert_eq!(normalize_asset("XXBT"), "BTC");
        assert_eq!(normalize_asset("ZEUR"), "EUR");
        assert_eq!(normalize_asset("XETH"), "ETH");
        assert_eq!(normalize_asset("DOT.S"), "DOT");
        assert_eq!(normalize_asset("USDT"), "USDT");
        assert_eq!(normalize_asset("PLN"), "PLN");
        assert_eq!(normalize_asset("XXDG"), "DOGE");
    }

    #[test]
    fn test_modern_four_letter_tickers_are_kept() {
        assert_eq!(normalize_asset("ZETA"), "ZETA");
        assert_eq!(normalize_asset("XCAD"), "XCAD");
        assert_eq!(normalize_asset("ZRX"), "ZRX");
        assert_eq!(normalize_asset("zeta"), "ZETA");
    }

    #[test]
    fn test_fiat_trade_leg_sale_proceeds() {
        let tx = parse(&[
            "L1", "T1", "2024-06-01 12:00:00", "trade", "", "currency", "ZEUR", "500.00", "1.30",
            "500.00",
        ])
        .unwrap()
        .unwrap();
        assert_eq!(tx.kind, TransactionKind::Disposal);
        assert_eq!(tx.amount, dec!(500.00));
        assert_eq!(tx.currency, "EUR");
        assert_eq!(tx.fee, Some(dec!(1.30)));
        assert_eq!(tx.note.as_deref(), Some("trade T1"));
    }

    #[test]
    fn test_crypto_trade_leg_is_exchange() {
        let tx = parse(&[
            "L2", "T1", "2024-06-01 12:00:00", "trade", "", "currency", "XXBT", "-0.01", "0",
            "0.5",
        ])
        .unwrap()
        .unwrap();
        assert_eq!(tx.kind, TransactionKind::CryptoExchange);
        assert_eq!(tx.symbol, "BTC");
        assert_eq!(tx.quantity, dec!(0.01));
        assert_eq!(tx.amount, Decimal::ZERO);
        assert_eq!(tx.fee, None);
    }

    #[test]
    fn test_staking_and_pending_rows() {
        let tx = parse(&[
            "L3", "S1", "2024-06-02 00:00:00", "staking", "", "currency", "DOT.S", "0.1", "0",
            "10.1",
        ])
        .unwrap()
        .unwrap();
        assert_eq!(tx.kind, TransactionKind::StakingReward);

        let pending = parse(&[
            "", "S2", "2024-06-02 00:00:00", "deposit", "", "currency", "XXBT", "1", "0", "",
        ])
        .unwrap();
        assert!(pending.is_none());
    }
}
