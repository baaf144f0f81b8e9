//! Cell-level helpers shared by every row parser
//!
//! Exchange exports disagree on almost everything: header casing, Polish
//! diacritics, decimal separators, date layouts and unit suffixes. The
//! helpers here normalize those differences so the parsers only deal with
//! meaning.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::debug;
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

use crate::error::RowError;

/// Number at the start of a cell, optionally followed by a unit ("0.5BTC", "100.00 PLN")
static AMOUNT_WITH_UNIT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([-+]?[0-9][0-9\s.,']*(?:[eE][-+]?[0-9]+)?)\s*([A-Za-z][A-Za-z0-9]*)?\s*$")
        .expect("valid amount regex")
});

/// Numeric token inside an arbitrary cell ("€1,234.56", "zł 10,50")
static NUMBER_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[0-9][0-9\s\u{a0}\u{202f}.,']*(?:[eE][-+]?[0-9]+)?").expect("valid number regex")
});

const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y", "%d-%m-%Y", "%d/%m/%Y", "%Y/%m/%d"];

/// Lowercase, trim and strip diacritics ("Ilość" -> "ilosc")
pub fn normalize_header(name: &str) -> String {
    name.trim()
        .trim_start_matches('\u{feff}')
        .to_lowercase()
        .replace('ł', "l")
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalized header row with case-insensitive lookups
#[derive(Debug, Clone)]
pub struct HeaderIndex {
    names: Vec<String>,
}

impl HeaderIndex {
    pub fn new(headers: &[String]) -> Self {
        Self {
            names: headers.iter().map(|h| normalize_header(h)).collect(),
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Position of the column with exactly this (normalized) name
    pub fn find(&self, name: &str) -> Option<usize> {
        let wanted = normalize_header(name);
        self.names.iter().position(|h| *h == wanted)
    }

    /// First candidate name that exists, in candidate order
    pub fn find_any(&self, names: &[&str]) -> Option<usize> {
        names.iter().find_map(|n| self.find(n))
    }

    /// First column, in header order, whose name belongs to the synonym set
    pub fn first_in(&self, synonyms: &[&str]) -> Option<usize> {
        self.positions_in(synonyms).next()
    }

    /// Every column whose name belongs to the synonym set, in header order
    pub fn positions_in<'a>(&'a self, synonyms: &'a [&'a str]) -> impl Iterator<Item = usize> + 'a {
        self.names
            .iter()
            .enumerate()
            .filter(move |(_, h)| synonyms.iter().any(|s| normalize_header(s) == **h))
            .map(|(i, _)| i)
    }

    pub fn has(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    pub fn has_all(&self, names: &[&str]) -> bool {
        names.iter().all(|n| self.has(n))
    }
}

/// Trimmed, non-empty cell value
pub fn cell<'a>(row: &'a [String], idx: Option<usize>) -> Option<&'a str> {
    idx.and_then(|i| row.get(i))
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
}

/// Required date-time cell; missing or unparseable drops the row
pub fn required_date_time(
    row: &[String],
    idx: Option<usize>,
) -> Result<NaiveDateTime, RowError> {
    let text = cell(row, idx).ok_or(RowError::MissingField("date"))?;
    parse_date_time(text)
}

/// Required text cell (asset symbol, coin); missing drops the row
pub fn required_text<'a>(
    row: &'a [String],
    idx: Option<usize>,
    field: &'static str,
) -> Result<&'a str, RowError> {
    cell(row, idx).ok_or(RowError::MissingField(field))
}

/// Optional signed number; missing or unparseable cells count as zero
pub fn decimal_or_zero(row: &[String], idx: Option<usize>, field: &'static str) -> Decimal {
    match cell(row, idx) {
        Some(text) => parse_decimal(text, field).unwrap_or_else(|e| {
            debug!("Defaulting to zero: {}", e);
            Decimal::ZERO
        }),
        None => Decimal::ZERO,
    }
}

/// Parse date-times in the layouts exchanges actually emit
pub fn parse_date_time(text: &str) -> Result<NaiveDateTime, RowError> {
    let trimmed = text.trim();
    let cleaned = trimmed
        .strip_suffix(" UTC")
        .or_else(|| trimmed.strip_suffix(" GMT"))
        .unwrap_or(trimmed)
        .trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(cleaned) {
        return Ok(dt.naive_utc());
    }
    let without_z = cleaned.strip_suffix('Z').unwrap_or(cleaned);
    for format in DATE_TIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(without_z, format) {
            return Ok(dt);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(without_z, format) {
            if let Some(dt) = date.and_hms_opt(0, 0, 0) {
                return Ok(dt);
            }
        }
    }

    Err(RowError::InvalidDate(trimmed.to_string()))
}

/// Parse a signed decimal written with either separator convention.
///
/// "1 234,56", "1,234.56", "1234.56", "-€10.50" and "1e-8" all parse. A lone
/// comma is treated as the decimal separator.
pub fn parse_decimal(text: &str, field: &'static str) -> Result<Decimal, RowError> {
    let invalid = || RowError::InvalidNumber {
        field,
        value: text.trim().to_string(),
    };

    let token = NUMBER_TOKEN.find(text).ok_or_else(invalid)?;
    let prefix = &text[..token.start()];
    let negative = prefix.contains('-') || prefix.contains('(');

    let compact: String = token
        .as_str()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\'')
        .collect();
    let normalized = normalize_separators(&compact);

    let value = if normalized.contains(|c| c == 'e' || c == 'E') {
        Decimal::from_scientific(&normalized).map_err(|_| invalid())?
    } else {
        Decimal::from_str(&normalized).map_err(|_| invalid())?
    };

    Ok(if negative { -value } else { value })
}

fn normalize_separators(number: &str) -> String {
    let last_comma = number.rfind(',');
    let last_dot = number.rfind('.');
    match (last_comma, last_dot) {
        (Some(c), Some(d)) if c > d => number.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => number.replace(',', ""),
        (Some(_), None) if number.matches(',').count() > 1 => number.replace(',', ""),
        (Some(_), None) => number.replace(',', "."),
        _ => number.to_string(),
    }
}

/// Split "0.00150000BTC" into its value and unit
pub fn parse_amount_with_unit(
    text: &str,
    field: &'static str,
) -> Result<(Decimal, Option<String>), RowError> {
    let caps = AMOUNT_WITH_UNIT
        .captures(text)
        .ok_or_else(|| RowError::InvalidNumber {
            field,
            value: text.trim().to_string(),
        })?;
    let value = parse_decimal(&caps[1], field)?;
    let unit = caps.get(2).map(|m| m.as_str().to_uppercase());
    Ok((value, unit))
}

/// Stable identifier for a source row
pub fn row_id(file_name: &str, row_number: usize, cells: &[String]) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(file_name.as_bytes());
    hasher.update(&row_number.to_le_bytes());
    for c in cells {
        hasher.update(c.as_bytes());
        hasher.update(&[0x1f]);
    }
    let hex = hasher.finalize().to_hex();
    hex.as_str()[..16].to_string()
}
