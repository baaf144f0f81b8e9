use chrono::{Datelike, NaiveDate, Weekday};

/// Last business day strictly before `date`.
///
/// Only weekends are skipped; a holiday is handled by the resolver widening
/// its query when the exact date has no published rate.
pub fn reference_date(date: NaiveDate) -> NaiveDate {
    let mut day = date.pred_opt().unwrap_or(date);
    while matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
        match day.pred_opt() {
            Some(prev) => day = prev,
            None => break,
        }
    }
    day
}
