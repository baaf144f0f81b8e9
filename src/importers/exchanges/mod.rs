// Exchange row parsers - one strategy per export layout plus a generic fallback

pub mod binance;
pub mod coinbase;
pub mod generic;
pub mod kraken;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::fields::{normalize_header, HeaderIndex};
use crate::error::RowError;
use crate::models::{Transaction, TransactionKind};

/// Export layouts the importer understands
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ExchangeFormat {
    /// Binance "Transaction History" (UTC_Time, Operation, Coin, Change)
    BinanceLedger,
    /// Binance spot "Trade History" (Date(UTC), Pair/Market, Side/Type, ...)
    BinanceTrades,
    /// Kraken ledger export (txid, refid, time, type, asset, amount, fee)
    KrakenLedger,
    /// Coinbase transaction report
    Coinbase,
    /// Column-name guessing for anything else
    Generic,
}

impl ExchangeFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExchangeFormat::BinanceLedger => "BINANCE_LEDGER",
            ExchangeFormat::BinanceTrades => "BINANCE_TRADES",
            ExchangeFormat::KrakenLedger => "KRAKEN_LEDGER",
            ExchangeFormat::Coinbase => "COINBASE",
            ExchangeFormat::Generic => "GENERIC",
        }
    }

    /// Exchange label stamped on produced transactions
    pub fn exchange_name(&self) -> Option<&'static str> {
        match self {
            ExchangeFormat::BinanceLedger | ExchangeFormat::BinanceTrades => Some("Binance"),
            ExchangeFormat::KrakenLedger => Some("Kraken"),
            ExchangeFormat::Coinbase => Some("Coinbase"),
            ExchangeFormat::Generic => None,
        }
    }

    /// Convert one raw row into at most one canonical transaction.
    ///
    /// `Ok(None)` means the row carries nothing to record (e.g. a pending
    /// ledger entry); `Err` means the row is malformed and must be reported.
    pub fn parse_row(
        &self,
        row: &RowRef<'_>,
        headers: &HeaderIndex,
    ) -> Result<Option<Transaction>, RowError> {
        match self {
            ExchangeFormat::BinanceLedger => binance::parse_ledger_row(row, headers),
            ExchangeFormat::BinanceTrades => binance::parse_trade_row(row, headers),
            ExchangeFormat::KrakenLedger => kraken::parse_row(row, headers),
            ExchangeFormat::Coinbase => coinbase::parse_row(row, headers),
            ExchangeFormat::Generic => generic::parse_row(row, headers),
        }
    }
}

/// One data row and where it came from
#[derive(Debug, Clone, Copy)]
pub struct RowRef<'a> {
    pub file_name: &'a str,
    /// 1-based row number in the file (the header is row 1)
    pub number: usize,
    pub cells: &'a [String],
}

impl RowRef<'_> {
    pub fn id(&self) -> String {
        super::fields::row_id(self.file_name, self.number, self.cells)
    }
}

/// Map an exchange's operation wording to a kind.
///
/// `positive` is the sign of the signed balance change; it only matters for
/// operations whose direction is ambiguous (buy/deposit, transfer).
pub fn kind_from_operation(operation: &str, positive: bool) -> TransactionKind {
    let op = normalize_header(operation);
    let has = |words: &[&str]| words.iter().any(|w| op.contains(w));

    if has(&["fee", "prowizja", "oplata"]) {
        TransactionKind::Fee
    } else if has(&["staking", "reward", "earn", "interest", "savings", "nagroda"]) {
        TransactionKind::StakingReward
    } else if has(&["airdrop", "distribution"]) {
        TransactionKind::Airdrop
    } else if has(&["convert", "swap", "exchange", "wymiana"]) {
        TransactionKind::CryptoExchange
    } else if has(&["payment", "card", "platnosc"]) {
        TransactionKind::PaymentDisposal
    } else if has(&["transfer", "przelew"]) {
        if positive {
            TransactionKind::TransferIn
        } else {
            TransactionKind::TransferOut
        }
    } else if has(&["buy", "deposit", "kupno", "zakup", "wplata"]) {
        if positive {
            TransactionKind::Acquisition
        } else {
            TransactionKind::Disposal
        }
    } else if has(&["sell", "sold", "withdraw", "sprzedaz", "wyplata"]) {
        TransactionKind::Disposal
    } else {
        TransactionKind::Unrecognized
    }
}

/// Kind of a fiat-currency leg of a trade.
///
/// On a fiat leg the money flow decides direction: fiat leaving the account
/// paid for crypto (acquisition), fiat arriving is sale proceeds (disposal).
/// Moving fiat in or out of the exchange is only a transfer.
pub fn fiat_leg_kind(operation: &str, change: Decimal) -> TransactionKind {
    let op = normalize_header(operation);
    let has = |words: &[&str]| words.iter().any(|w| op.contains(w));

    if has(&["fee", "prowizja", "oplata"]) {
        TransactionKind::Fee
    } else if has(&["deposit", "wplata"]) {
        TransactionKind::TransferIn
    } else if has(&["withdraw", "wyplata"]) {
        TransactionKind::TransferOut
    } else if has(&["transfer", "przelew"]) {
        if change.is_sign_negative() {
            TransactionKind::TransferOut
        } else {
            TransactionKind::TransferIn
        }
    } else if change.is_sign_negative() {
        TransactionKind::Acquisition
    } else {
        TransactionKind::Disposal
    }
}
