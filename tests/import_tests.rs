use anyhow::Result;
use kryptopit::error::ImportError;
use kryptopit::importers::{self, ExchangeFormat, DEFAULT_MAX_FILE_SIZE, UNSUPPORTED_FORMAT_WARNING};
use kryptopit::models::{FileKind, ParsedBatch, TransactionKind};
use rust_decimal_macros::dec;
use chrono::NaiveDate;
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};
use tempfile::TempDir;

fn import(name: &str) -> Result<ParsedBatch> {
    importers::ingest_path(format!("tests/data/{}", name), DEFAULT_MAX_FILE_SIZE)
}

fn kinds(batch: &ParsedBatch) -> Vec<TransactionKind> {
    batch.transactions.iter().map(|tx| tx.kind).collect()
}

#[test]
fn test_binance_ledger_fiat_legs_carry_value() -> Result<()> {
    let batch = import("binance_ledger.csv")?;

    assert_eq!(batch.format, Some(ExchangeFormat::BinanceLedger));
    assert!(batch.warnings.is_empty());
    assert_eq!(
        kinds(&batch),
        vec![
            TransactionKind::TransferIn,
            TransactionKind::Acquisition,
            TransactionKind::Acquisition,
            TransactionKind::Fee,
            TransactionKind::Disposal,
            TransactionKind::Disposal,
            TransactionKind::StakingReward,
        ]
    );

    let payment = &batch.transactions[2];
    assert_eq!(payment.symbol, "PLN");
    assert_eq!(payment.amount, dec!(3600));
    assert_eq!(payment.currency, "PLN");

    // Crypto legs only move quantity
    let crypto_leg = &batch.transactions[1];
    assert_eq!(crypto_leg.quantity, dec!(0.02));
    assert_eq!(crypto_leg.amount, dec!(0));

    let proceeds = &batch.transactions[5];
    assert_eq!(proceeds.amount, dec!(4800));
    assert!(batch
        .transactions
        .iter()
        .all(|tx| tx.exchange.as_deref() == Some("Binance")));
    Ok(())
}

#[test]
fn test_binance_trade_history_with_units() -> Result<()> {
    let batch = import("binance_trades.csv")?;

    assert_eq!(batch.format, Some(ExchangeFormat::BinanceTrades));
    assert_eq!(
        kinds(&batch),
        vec![
            TransactionKind::Acquisition,
            TransactionKind::Disposal,
            TransactionKind::CryptoExchange,
        ]
    );

    let buy = &batch.transactions[0];
    assert_eq!(buy.symbol, "BTC");
    assert_eq!(buy.quantity, dec!(0.01));
    assert_eq!(buy.amount, dec!(1800));
    assert_eq!(buy.fee, Some(dec!(0.00001)));
    assert_eq!(buy.fee_currency.as_deref(), Some("BTC"));

    let sell = &batch.transactions[1];
    assert_eq!(sell.amount, dec!(2500));
    assert_eq!(sell.fee_currency.as_deref(), Some("PLN"));

    let swap = &batch.transactions[2];
    assert_eq!(swap.symbol, "ETH");
    assert_eq!(swap.amount, dec!(0));
    Ok(())
}

#[test]
fn test_kraken_ledger_skips_pending_rows() -> Result<()> {
    let batch = import("kraken_ledgers.csv")?;

    assert_eq!(batch.format, Some(ExchangeFormat::KrakenLedger));
    assert_eq!(batch.transactions.len(), 5);
    assert!(batch.warnings.is_empty());
    assert_eq!(
        kinds(&batch),
        vec![
            TransactionKind::TransferIn,
            TransactionKind::Acquisition,
            TransactionKind::CryptoExchange,
            TransactionKind::CryptoExchange,
            TransactionKind::Disposal,
        ]
    );

    let buy = &batch.transactions[1];
    assert_eq!(buy.currency, "EUR");
    assert_eq!(buy.amount, dec!(800));
    assert_eq!(buy.fee, Some(dec!(1.28)));

    let btc_leg = &batch.transactions[2];
    assert_eq!(btc_leg.symbol, "BTC");
    assert_eq!(btc_leg.quantity, dec!(0.015));
    Ok(())
}

#[test]
fn test_coinbase_report() -> Result<()> {
    let batch = import("coinbase_report.csv")?;

    assert_eq!(batch.format, Some(ExchangeFormat::Coinbase));
    assert_eq!(
        kinds(&batch),
        vec![
            TransactionKind::Acquisition,
            TransactionKind::StakingReward,
            TransactionKind::Disposal,
        ]
    );

    let sell = &batch.transactions[2];
    assert_eq!(sell.quantity, dec!(0.5));
    assert_eq!(sell.amount, dec!(5500.00));
    assert_eq!(sell.fee, Some(dec!(55.00)));
    assert_eq!(sell.note.as_deref(), Some("Sold 0.5 ETH for 5445.00 PLN"));
    Ok(())
}

#[test]
fn test_generic_polish_semicolon_file() -> Result<()> {
    let batch = import("generic_pl.csv")?;

    assert_eq!(batch.format, Some(ExchangeFormat::Generic));
    assert_eq!(
        kinds(&batch),
        vec![
            TransactionKind::Acquisition,
            TransactionKind::Disposal,
            TransactionKind::Disposal,
        ]
    );
    assert_eq!(batch.transactions[0].amount, dec!(100000.00));
    assert_eq!(batch.transactions[1].quantity, dec!(0.5));
    assert_eq!(batch.transactions[0].fee, None);
    Ok(())
}

#[test]
fn test_unparseable_date_drops_only_that_row() -> Result<()> {
    let batch = import("bad_date.csv")?;

    assert_eq!(batch.transactions.len(), 2);
    assert_eq!(batch.warnings, vec!["Row 3: invalid date: '31/31/2024'"]);
    assert_eq!(batch.transactions[1].amount, dec!(80000));
    Ok(())
}

#[test]
fn test_spreadsheet_matches_csv() -> Result<()> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    let rows = [
        ["Date", "Type", "Asset", "Quantity", "Total"],
        ["2024-01-10 10:00:00", "buy", "BTC", "1", "100000"],
        ["2024-03-10 10:00:00", "sell", "BTC", "1", "150000"],
    ];
    for (r, row) in rows.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            sheet.write(r as u32, c as u16, *value)?;
        }
    }
    let buffer = workbook.save_to_buffer()?;

    let batch = importers::ingest("export.xlsx", FileKind::Sheet, &buffer, DEFAULT_MAX_FILE_SIZE)?;
    assert_eq!(batch.file_kind, FileKind::Sheet);
    assert_eq!(
        kinds(&batch),
        vec![TransactionKind::Acquisition, TransactionKind::Disposal]
    );
    assert_eq!(batch.transactions[1].amount, dec!(150000));
    Ok(())
}

#[test]
fn test_spreadsheet_numeric_and_date_cells() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("numbers.xlsx");

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.write(0, 0, "Date")?;
    sheet.write(0, 1, "Type")?;
    sheet.write(0, 2, "Asset")?;
    sheet.write(0, 3, "Quantity")?;
    sheet.write(0, 4, "Total")?;
    let date_format = Format::new().set_num_format("yyyy-mm-dd hh:mm:ss");
    let date = ExcelDateTime::parse_from_str("2024-02-01 10:30:00")?;
    sheet.write_datetime_with_format(1, 0, &date, &date_format)?;
    sheet.write(1, 1, "sell")?;
    sheet.write(1, 2, "ETH")?;
    sheet.write(1, 3, 0.25)?;
    sheet.write(1, 4, 2500)?;
    workbook.save(&path)?;

    let batch = importers::ingest_path(&path, DEFAULT_MAX_FILE_SIZE)?;
    assert!(batch.warnings.is_empty());
    assert_eq!(batch.transactions.len(), 1);
    let tx = &batch.transactions[0];
    assert_eq!(
        tx.date_time,
        NaiveDate::from_ymd_opt(2024, 2, 1)
            .and_then(|d| d.and_hms_opt(10, 30, 0))
            .expect("valid date")
    );
    assert_eq!(tx.kind, TransactionKind::Disposal);
    assert_eq!(tx.quantity, dec!(0.25));
    assert_eq!(tx.amount, dec!(2500));
    Ok(())
}

#[test]
fn test_spreadsheet_date_serial_beyond_excel_range_is_row_warning() -> Result<()> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    for (c, name) in ["Date", "Type", "Asset", "Total"].iter().enumerate() {
        sheet.write(0, c as u16, *name)?;
    }
    let date_format = Format::new().set_num_format("yyyy-mm-dd");
    sheet.write_number_with_format(1, 0, 1.0e300, &date_format)?;
    sheet.write(1, 1, "sell")?;
    sheet.write(1, 2, "BTC")?;
    sheet.write(1, 3, 1000)?;
    sheet.write(2, 0, "2024-05-02")?;
    sheet.write(2, 1, "sell")?;
    sheet.write(2, 2, "BTC")?;
    sheet.write(2, 3, 2000)?;
    let buffer = workbook.save_to_buffer()?;

    let batch = importers::ingest("dates.xlsx", FileKind::Sheet, &buffer, DEFAULT_MAX_FILE_SIZE)?;
    assert_eq!(batch.warnings, vec!["Row 2: missing date"]);
    assert_eq!(batch.transactions.len(), 1);
    assert_eq!(batch.transactions[0].amount, dec!(2000));
    Ok(())
}

#[test]
fn test_spreadsheet_blank_header_cell_keeps_columns_aligned() -> Result<()> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    // Column C has no header
    sheet.write(0, 0, "Date")?;
    sheet.write(0, 1, "Type")?;
    sheet.write(0, 3, "Asset")?;
    sheet.write(0, 4, "Quantity")?;
    sheet.write(0, 5, "Total")?;
    sheet.write(1, 0, "2024-04-02 08:00:00")?;
    sheet.write(1, 1, "buy")?;
    sheet.write(1, 2, "internal ref 17")?;
    sheet.write(1, 3, "SOL")?;
    sheet.write(1, 4, 12)?;
    sheet.write(1, 5, 6000)?;
    let buffer = workbook.save_to_buffer()?;

    let batch = importers::ingest("gap.xlsx", FileKind::Sheet, &buffer, DEFAULT_MAX_FILE_SIZE)?;
    assert_eq!(batch.format, Some(ExchangeFormat::Generic));
    assert_eq!(batch.transactions.len(), 1);
    let tx = &batch.transactions[0];
    assert_eq!(tx.kind, TransactionKind::Acquisition);
    assert_eq!(tx.symbol, "SOL");
    assert_eq!(tx.quantity, dec!(12));
    assert_eq!(tx.amount, dec!(6000));
    Ok(())
}

#[test]
fn test_spreadsheet_warnings_use_sheet_row_numbers() -> Result<()> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    // Table starts on sheet row 3, below two empty rows
    let rows = [
        ["Date", "Type", "Asset", "Total"],
        ["2024-01-10 10:00:00", "buy", "BTC", "100000"],
        ["not a date", "sell", "BTC", "150000"],
    ];
    for (r, row) in rows.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            sheet.write(r as u32 + 2, c as u16, *value)?;
        }
    }
    let buffer = workbook.save_to_buffer()?;

    let batch = importers::ingest("offset.xlsx", FileKind::Sheet, &buffer, DEFAULT_MAX_FILE_SIZE)?;
    assert_eq!(batch.transactions.len(), 1);
    assert_eq!(batch.warnings, vec!["Row 5: invalid date: 'not a date'"]);
    Ok(())
}

#[test]
fn test_pdf_gets_guidance_instead_of_error() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("statement.pdf");
    std::fs::write(&path, b"%PDF-1.7 binary garbage")?;

    let batch = importers::ingest_path(&path, DEFAULT_MAX_FILE_SIZE)?;
    assert_eq!(batch.file_kind, FileKind::Unsupported);
    assert!(batch.transactions.is_empty());
    assert_eq!(batch.warnings, vec![UNSUPPORTED_FORMAT_WARNING.to_string()]);
    Ok(())
}

#[test]
fn test_oversized_file_is_rejected() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("huge.csv");
    std::fs::write(&path, "Date,Type\n".repeat(100))?;

    let err = importers::ingest_path(&path, 64).unwrap_err();
    let cause = err
        .downcast_ref::<ImportError>()
        .expect("size error should be preserved");
    assert!(matches!(cause, ImportError::FileTooLarge { limit: 64, .. }));
    Ok(())
}

#[test]
fn test_missing_file_is_error() {
    let result = importers::ingest_path("tests/data/does_not_exist.csv", DEFAULT_MAX_FILE_SIZE);
    assert!(result.is_err());
}

#[test]
fn test_reimport_gives_same_ids() -> Result<()> {
    let first = import("kraken_ledgers.csv")?;
    let second = import("kraken_ledgers.csv")?;
    let ids = |b: &ParsedBatch| b.transactions.iter().map(|t| t.id.clone()).collect::<Vec<_>>();
    assert_eq!(ids(&first), ids(&second));
    Ok(())
}
