// Import module - exchange CSV/spreadsheet exports into canonical transactions

pub mod csv_reader;
pub mod excel_reader;
pub mod exchanges;
pub mod fields;
mod file_detector;

use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::error::ImportError;
use crate::models::{FileKind, ParsedBatch};
use exchanges::RowRef;
use fields::HeaderIndex;

pub use exchanges::ExchangeFormat;
pub use file_detector::detect_format;

/// Inputs larger than this are rejected before parsing
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Table row paired with its 1-based row number in the source file
pub type NumberedRow = (usize, Vec<String>);

pub const UNSUPPORTED_FORMAT_WARNING: &str = "Unsupported file format. Scanned documents and PDF \
     statements cannot be read; export the transaction history from your exchange as CSV or \
     XLSX and import that file instead.";

/// Parse one file's content into a batch.
///
/// Only an oversized or unreadable file is an error. Malformed rows become
/// `"Row <n>: <cause>"` warnings and parsing continues with the next row.
pub fn ingest(
    file_name: &str,
    kind: FileKind,
    content: &[u8],
    max_bytes: u64,
) -> Result<ParsedBatch, ImportError> {
    let size = content.len() as u64;
    if size > max_bytes {
        return Err(ImportError::FileTooLarge {
            size,
            limit: max_bytes,
        });
    }

    info!("Importing {} ({}, {} bytes)", file_name, kind.as_str(), size);

    let table = match kind {
        FileKind::Csv => csv_reader::read_csv_table(content)?,
        FileKind::Sheet => excel_reader::read_first_sheet(content)?,
        FileKind::Unsupported => {
            warn!("Unsupported file kind for {}", file_name);
            return Ok(ParsedBatch {
                file_name: file_name.to_string(),
                file_kind: kind,
                format: None,
                transactions: Vec::new(),
                warnings: vec![UNSUPPORTED_FORMAT_WARNING.to_string()],
            });
        }
    };

    let mut rows = table.into_iter();
    let Some((_, header_row)) = rows.next() else {
        return Ok(ParsedBatch {
            file_name: file_name.to_string(),
            file_kind: kind,
            format: None,
            transactions: Vec::new(),
            warnings: vec!["File contains no rows".to_string()],
        });
    };

    let headers = HeaderIndex::new(&header_row);
    let format = file_detector::detect_format_indexed(&headers);

    let mut transactions = Vec::new();
    let mut warnings = Vec::new();
    let mut skipped = 0;

    for (number, cells) in rows {
        if cells.iter().all(|c| c.trim().is_empty()) {
            continue;
        }

        let row = RowRef {
            file_name,
            number,
            cells: &cells,
        };

        match format.parse_row(&row, &headers) {
            Ok(Some(tx)) => transactions.push(tx),
            Ok(None) => skipped += 1,
            Err(e) => {
                warn!("{}: row {} dropped: {}", file_name, number, e);
                warnings.push(format!("Row {}: {}", number, e));
            }
        }
    }

    debug!("{} rows produced nothing to record", skipped);
    info!(
        "Imported {} transactions from {} ({} warnings)",
        transactions.len(),
        file_name,
        warnings.len()
    );

    Ok(ParsedBatch {
        file_name: file_name.to_string(),
        file_kind: kind,
        format: Some(format),
        transactions,
        warnings,
    })
}

/// Read a file from disk and ingest it, deciding its kind from the extension
pub fn ingest_path<P: AsRef<Path>>(path: P, max_bytes: u64) -> Result<ParsedBatch> {
    let path = path.as_ref();
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string();

    let size = std::fs::metadata(path)
        .map_err(ImportError::Io)
        .with_context(|| format!("Failed to stat {}", path.display()))?
        .len();
    if size > max_bytes {
        return Err(ImportError::FileTooLarge {
            size,
            limit: max_bytes,
        }
        .into());
    }

    let kind = FileKind::from_path(path);
    let content = match kind {
        // Never read bytes we will not parse
        FileKind::Unsupported => Vec::new(),
        _ => std::fs::read(path)
            .map_err(ImportError::Io)
            .with_context(|| format!("Failed to read {}", path.display()))?,
    };

    let batch = ingest(&file_name, kind, &content, max_bytes)
        .with_context(|| format!("Failed to import {}", path.display()))?;
    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransactionKind;
    use rust_decimal_macros::dec;

    const BINANCE: &str = "User_ID,UTC_Time,Account,Operation,Coin,Change,Remark\n\
        1,2024-01-05 10:00:00,Spot,Buy,BTC,0.01,\n\
        1,2024-01-05 10:00:00,Spot,Buy,PLN,-1500,\n\
        1,not-a-date,Spot,Sell,BTC,-0.01,\n\
        ,,,,,,\n\
        1,2024-02-05 10:00:00,Spot,Sell,PLN,1800,\n";

    #[test]
    fn test_bad_row_becomes_warning() {
        let batch = ingest("binance.csv", FileKind::Csv, BINANCE.as_bytes(), DEFAULT_MAX_FILE_SIZE)
            .unwrap();
        assert_eq!(batch.format, Some(ExchangeFormat::BinanceLedger));
        assert_eq!(batch.transactions.len(), 3);
        assert_eq!(batch.warnings, vec!["Row 4: invalid date: 'not-a-date'"]);

        let fiat_buy = &batch.transactions[1];
        assert_eq!(fiat_buy.kind, TransactionKind::Acquisition);
        assert_eq!(fiat_buy.amount, dec!(1500));
    }

    #[test]
    fn test_warning_names_file_line_after_blank_line() {
        let content = "Date,Type,Asset,Quantity,Total\n\
            2024-01-10,buy,BTC,1,100000\n\
            \n\
            bad-date,sell,BTC,1,150000\n";
        let batch =
            ingest("gaps.csv", FileKind::Csv, content.as_bytes(), DEFAULT_MAX_FILE_SIZE).unwrap();
        assert_eq!(batch.transactions.len(), 1);
        assert_eq!(batch.warnings, vec!["Row 4: invalid date: 'bad-date'"]);
    }

    #[test]
    fn test_size_limit_rejects_before_parsing() {
        let err = ingest("big.csv", FileKind::Csv, BINANCE.as_bytes(), 16).unwrap_err();
        assert!(matches!(err, ImportError::FileTooLarge { limit: 16, .. }));
    }

    #[test]
    fn test_unsupported_kind_gets_guidance() {
        let batch = ingest("scan.pdf", FileKind::Unsupported, b"%PDF-1.4", DEFAULT_MAX_FILE_SIZE)
            .unwrap();
        assert!(batch.transactions.is_empty());
        assert_eq!(batch.format, None);
        assert_eq!(batch.warnings, vec![UNSUPPORTED_FORMAT_WARNING]);
    }

    #[test]
    fn test_empty_file_is_warning_not_error() {
        let batch = ingest("empty.csv", FileKind::Csv, b"", DEFAULT_MAX_FILE_SIZE).unwrap();
        assert!(batch.transactions.is_empty());
        assert_eq!(batch.warnings.len(), 1);
    }

    #[test]
    fn test_row_ids_are_unique_per_row() {
        let batch = ingest("binance.csv", FileKind::Csv, BINANCE.as_bytes(), DEFAULT_MAX_FILE_SIZE)
            .unwrap();
        let mut ids: Vec<_> = batch.transactions.iter().map(|t| t.id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), batch.transactions.len());
    }
}
