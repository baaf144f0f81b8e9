use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::io::Cursor;
use tracing::{debug, info};

use super::NumberedRow;
use crate::error::ImportError;

/// Serial of 10000-01-01, one past the last date Excel can hold
const EXCEL_SERIAL_LIMIT: f64 = 2_958_466.0;

/// Read the first sheet of a workbook into rows of strings.
///
/// The first used row is the header row; blank header cells become empty
/// strings so column positions stay aligned with the data rows. Row numbers
/// are the sheet's own 1-based numbers, not positions in the used range.
pub fn read_first_sheet(content: &[u8]) -> Result<Vec<NumberedRow>, ImportError> {
    let cursor = Cursor::new(content.to_vec());
    let mut workbook = open_workbook_auto_from_rs(cursor)
        .map_err(|e| ImportError::Spreadsheet(e.to_string()))?;

    let sheet_names = workbook.sheet_names();
    info!("Reading first of {} sheet(s): {:?}", sheet_names.len(), sheet_names.first());

    let range = match workbook.worksheet_range_at(0) {
        Some(range) => range.map_err(|e| ImportError::Spreadsheet(e.to_string()))?,
        None => return Ok(Vec::new()),
    };

    let first_row = range.start().map_or(0, |(row, _)| row as usize);
    let rows: Vec<NumberedRow> = range
        .rows()
        .enumerate()
        .map(|(i, row)| (first_row + i + 1, row.iter().map(cell_to_string).collect()))
        .collect();
    debug!("Read {} rows from sheet", rows.len());
    Ok(rows)
}

/// Render a cell the way the row parsers expect text
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => excel_serial_to_datetime(dt.as_f64())
            .map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
    }
}

/// Excel serial day number (1900 system) to a date-time; `None` outside Excel's range
fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !(0.0..EXCEL_SERIAL_LIMIT).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let days = serial.floor();
    let seconds = ((serial - days) * 86_400.0).round() as i64;
    epoch.checked_add_signed(Duration::try_days(days as i64)? + Duration::try_seconds(seconds)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excel_serial_to_datetime() {
        let dt = excel_serial_to_datetime(45306.5).unwrap();
        assert_eq!(
            dt,
            NaiveDate::from_ymd_opt(2024, 1, 14)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap()
        );
    }

    #[test]
    fn test_serial_outside_excel_range_is_none() {
        assert_eq!(excel_serial_to_datetime(1.0e300), None);
        assert_eq!(excel_serial_to_datetime(-1.0), None);
        assert_eq!(excel_serial_to_datetime(f64::NAN), None);
        assert_eq!(excel_serial_to_datetime(EXCEL_SERIAL_LIMIT), None);
        assert!(excel_serial_to_datetime(EXCEL_SERIAL_LIMIT - 1.0).is_some());
    }

    #[test]
    fn test_cell_to_string() {
        assert_eq!(cell_to_string(&Data::Empty), "");
        assert_eq!(cell_to_string(&Data::Float(0.1)), "0.1");
        assert_eq!(cell_to_string(&Data::Int(42)), "42");
        assert_eq!(cell_to_string(&Data::String(" BTC ".to_string())), "BTC");
    }

    #[test]
    fn test_garbage_is_spreadsheet_error() {
        let err = read_first_sheet(b"definitely not a workbook").unwrap_err();
        assert!(matches!(err, ImportError::Spreadsheet(_)));
    }
}
