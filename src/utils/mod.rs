//! Utility functions for formatting and common operations
//!
//! This module provides centralized formatting utilities for consistent
//! display of PLN amounts and decimal values throughout the application.

use rust_decimal::Decimal;

use crate::tax::round_money;

/// Currency symbol options for formatting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrencySymbol {
    /// Include " zł" suffix (Polish złoty)
    Pln,
    /// No currency symbol (for table cells, calculations display)
    None,
}

/// Core formatting function with full control over output.
///
/// Formats a Decimal value using Polish locale conventions:
/// - Thousands separator: ` ` (space)
/// - Decimal separator: `,` (comma)
///
/// Values are rounded to grosze (midpoint away from zero) first.
///
/// # Examples
/// ```
/// use kryptopit::utils::{format_pln_with_width, CurrencySymbol};
/// use rust_decimal_macros::dec;
///
/// assert_eq!(
///     format_pln_with_width(dec!(1234.56), 0, CurrencySymbol::Pln),
///     "1 234,56 zł"
/// );
///
/// assert_eq!(
///     format_pln_with_width(dec!(1234), 12, CurrencySymbol::None),
///     "    1 234,00"
/// );
/// ```
pub fn format_pln_with_width(value: Decimal, width: usize, symbol: CurrencySymbol) -> String {
    let rounded = round_money(value);
    let is_negative = rounded < Decimal::ZERO;

    let formatted = format!("{:.2}", rounded.abs());
    let (integer_part, decimal_part) = formatted.split_once('.').unwrap_or((formatted.as_str(), "00"));

    // Thousands separators, grouped from the right
    let digits: Vec<char> = integer_part.chars().collect();
    let mut with_separators = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            with_separators.push(' ');
        }
        with_separators.push(*c);
    }

    let sign = if is_negative { "-" } else { "" };
    let suffix = match symbol {
        CurrencySymbol::Pln => " zł",
        CurrencySymbol::None => "",
    };

    let result = format!("{}{},{}{}", sign, with_separators, decimal_part, suffix);

    // Right-align by characters ("ł" is two bytes)
    if width > 0 && result.chars().count() < width {
        format!("{:>width$}", result, width = width)
    } else {
        result
    }
}

// ============ Convenience functions ============

/// Format as złoty with symbol: "1 234,56 zł"
///
/// # Examples
/// ```
/// use kryptopit::utils::format_pln;
/// use rust_decimal_macros::dec;
///
/// assert_eq!(format_pln(dec!(1234.56)), "1 234,56 zł");
/// assert_eq!(format_pln(dec!(-500)), "-500,00 zł");
/// ```
pub fn format_pln(value: Decimal) -> String {
    format_pln_with_width(value, 0, CurrencySymbol::Pln)
}

/// Format number only (no symbol): "1 234,56"
pub fn format_decimal_pl(value: Decimal) -> String {
    format_pln_with_width(value, 0, CurrencySymbol::None)
}

/// Quantities keep their precision but drop trailing zeros: "0.5", "12"
pub fn format_quantity(value: Decimal) -> String {
    value.normalize().to_string()
}
