use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::models::LOCAL_CURRENCY;

/// Currencies published in NBP table A (average rates)
const NBP_TABLE_A: &[&str] = &[
    "THB", "USD", "AUD", "HKD", "CAD", "NZD", "SGD", "EUR", "HUF", "CHF", "GBP", "UAH", "JPY",
    "CZK", "DKK", "ISK", "NOK", "SEK", "RON", "BGN", "TRY", "ILS", "CLP", "PHP", "MXN", "ZAR",
    "BRL", "MYR", "IDR", "INR", "KRW", "CNY", "XDR",
];

/// Fiat currencies exchanges settle in that NBP does not publish in table A
const OTHER_FIAT: &[&str] = &["RUB", "ARS", "KZT", "NGN", "AED", "VND", "COP", "PEN"];

/// Approximate PLN value of one unit, used only when no quote can be fetched
const APPROXIMATE_RATES: &[(&str, Decimal)] = &[
    ("USD", dec!(4.00)),
    ("EUR", dec!(4.30)),
    ("GBP", dec!(5.00)),
    ("CHF", dec!(4.50)),
    ("CAD", dec!(2.90)),
    ("AUD", dec!(2.60)),
    ("NZD", dec!(2.40)),
    ("JPY", dec!(0.027)),
    ("CZK", dec!(0.17)),
    ("DKK", dec!(0.58)),
    ("NOK", dec!(0.37)),
    ("SEK", dec!(0.38)),
    ("HUF", dec!(0.011)),
    ("RON", dec!(0.87)),
    ("BGN", dec!(2.20)),
    ("UAH", dec!(0.10)),
    ("TRY", dec!(0.12)),
    ("CNY", dec!(0.55)),
    ("BRL", dec!(0.75)),
];

/// True for currencies the NBP API can be asked about
pub fn is_nbp_currency(code: &str) -> bool {
    NBP_TABLE_A.contains(&code)
}

/// True for government currencies (as opposed to crypto assets and stablecoins)
pub fn is_fiat_currency(code: &str) -> bool {
    let code = code.trim().to_uppercase();
    code == LOCAL_CURRENCY || is_nbp_currency(&code) || OTHER_FIAT.contains(&code.as_str())
}

pub fn approximate_rate(code: &str) -> Option<Decimal> {
    APPROXIMATE_RATES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, rate)| *rate)
}
