//! Output formatting module for CLI display
//!
//! This module handles all terminal output formatting, separating
//! the concerns of data calculation from presentation.

use colored::Colorize;
use rust_decimal::Decimal;
use serde::Serialize;
use tabled::{
    settings::{object::Columns, Alignment, Style},
    Table, Tabled,
};

use kryptopit::db::CalculationSummary;
use kryptopit::models::{ParsedBatch, TaxCalculation};
use kryptopit::pricing::ResolvedRate;
use kryptopit::utils::{format_decimal_pl, format_pln, format_quantity};

/// Rows shown per file before the preview is cut
const PREVIEW_ROWS: usize = 20;

/// Serialize any result for `--json`
pub fn format_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!(r#"{{"error": "JSON serialization failed: {}"}}"#, e))
}

/// Format an imported file: header line, transaction preview, warnings
pub fn format_batch(batch: &ParsedBatch) -> String {
    let mut output = String::new();

    let layout = match batch.format {
        Some(format) => match format.exchange_name() {
            Some(exchange) => format!("{} ({})", format.as_str(), exchange),
            None => format.as_str().to_string(),
        },
        None => batch.file_kind.as_str().to_string(),
    };
    output.push_str(&format!(
        "\n{} {} [{}]: {} transactions\n",
        "✓".green().bold(),
        batch.file_name.bold(),
        layout,
        batch.transactions.len()
    ));

    if !batch.transactions.is_empty() {
        #[derive(Tabled)]
        struct TransactionRow {
            #[tabled(rename = "Date")]
            date: String,
            #[tabled(rename = "Kind")]
            kind: String,
            #[tabled(rename = "Symbol")]
            symbol: String,
            #[tabled(rename = "Quantity")]
            quantity: String,
            #[tabled(rename = "Amount")]
            amount: String,
            #[tabled(rename = "Fee")]
            fee: String,
        }

        let rows: Vec<TransactionRow> = batch
            .transactions
            .iter()
            .take(PREVIEW_ROWS)
            .map(|tx| TransactionRow {
                date: tx.date_time.format("%Y-%m-%d %H:%M").to_string(),
                kind: tx.kind.as_str().to_string(),
                symbol: tx.symbol.clone(),
                quantity: format_quantity(tx.quantity),
                amount: format!("{} {}", format_decimal_pl(tx.amount), tx.currency),
                fee: match (tx.fee, tx.fee_currency.as_deref()) {
                    (Some(fee), Some(currency)) => {
                        format!("{} {}", format_quantity(fee), currency)
                    }
                    (Some(fee), None) => format_quantity(fee),
                    _ => "-".to_string(),
                },
            })
            .collect();

        let mut table = Table::new(&rows);
        table.with(Style::modern());
        table.modify(Columns::new(3..), Alignment::right());
        output.push_str(&table.to_string());
        output.push('\n');

        if batch.transactions.len() > PREVIEW_ROWS {
            output.push_str(&format!(
                "... and {} more transactions\n",
                batch.transactions.len() - PREVIEW_ROWS
            ));
        }
    }

    for warning in &batch.warnings {
        output.push_str(&format!("{} {}\n", "⚠".yellow().bold(), warning.yellow()));
    }

    output
}

/// Per-year PIT-38 table with totals and rate/warning notes
pub fn format_calculation(calc: &TaxCalculation) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "\n{} {} ({})\n\n",
        "📊".cyan().bold(),
        calc.name.bold(),
        calc.id.bright_black()
    ));

    if calc.years.is_empty() {
        output.push_str(&format!(
            "{} No transactions to calculate\n",
            "ℹ".blue().bold()
        ));
        return output;
    }

    #[derive(Tabled)]
    struct YearRow {
        #[tabled(rename = "Year")]
        year: String,
        #[tabled(rename = "Revenue")]
        revenue: String,
        #[tabled(rename = "Costs")]
        current_year_costs: String,
        #[tabled(rename = "Prior Costs")]
        previous_years_costs: String,
        #[tabled(rename = "Total Costs")]
        total_costs: String,
        #[tabled(rename = "Income")]
        income: String,
        #[tabled(rename = "Tax (19%)")]
        tax_due: String,
        #[tabled(rename = "Carry Forward")]
        carry_forward_costs: String,
    }

    let mut rows: Vec<YearRow> = calc
        .years
        .iter()
        .map(|y| YearRow {
            year: y.year.to_string(),
            revenue: format_decimal_pl(y.revenue),
            current_year_costs: format_decimal_pl(y.current_year_costs),
            previous_years_costs: format_decimal_pl(y.previous_years_costs),
            total_costs: format_decimal_pl(y.total_costs),
            income: format_decimal_pl(y.income),
            tax_due: highlight_tax(y.tax_due),
            carry_forward_costs: format_decimal_pl(y.carry_forward_costs),
        })
        .collect();

    let t = &calc.totals;
    rows.push(YearRow {
        year: "Total".bold().to_string(),
        revenue: format_decimal_pl(t.revenue),
        current_year_costs: format_decimal_pl(t.current_year_costs),
        previous_years_costs: format_decimal_pl(t.previous_years_costs),
        total_costs: format_decimal_pl(t.total_costs),
        income: format_decimal_pl(t.income),
        tax_due: highlight_tax(t.tax_due),
        carry_forward_costs: format_decimal_pl(t.carry_forward_costs),
    });

    let mut table = Table::new(&rows);
    table.with(Style::modern());
    table.modify(Columns::new(1..), Alignment::right());
    output.push_str(&table.to_string());
    output.push('\n');

    if let Some(last) = calc.years.last() {
        output.push_str(&format!(
            "\n{:<28} {}\n",
            "Costs to carry into next year:".bold(),
            format_pln(last.carry_forward_costs)
        ));
    }

    let fallback = calc.fallback_rate_count();
    if fallback > 0 {
        output.push_str(&format!(
            "{} {} transaction(s) converted with approximate rates (NBP unavailable)\n",
            "⚠".yellow().bold(),
            fallback
        ));
    }
    let warnings = calc.warning_count();
    if warnings > 0 {
        output.push_str(&format!(
            "{} {} row(s) could not be imported; run `kryptopit import` to see them\n",
            "⚠".yellow().bold(),
            warnings
        ));
    }

    output
}

fn highlight_tax(value: Decimal) -> String {
    if value > Decimal::ZERO {
        format_decimal_pl(value).red().to_string()
    } else {
        format_decimal_pl(value).green().to_string()
    }
}

pub fn format_history(summaries: &[CalculationSummary]) -> String {
    if summaries.is_empty() {
        return format!(
            "{} No saved calculations\nSave one with: {} calculate <files> --save\n",
            "ℹ".blue().bold(),
            "kryptopit".bold()
        );
    }

    #[derive(Tabled)]
    struct HistoryRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Created")]
        created_at: String,
        #[tabled(rename = "Updated")]
        updated_at: String,
        #[tabled(rename = "Tax Due")]
        tax_due: String,
    }

    let rows: Vec<HistoryRow> = summaries
        .iter()
        .map(|s| HistoryRow {
            id: s.id.clone(),
            name: s.name.clone(),
            created_at: s.created_at.format("%Y-%m-%d %H:%M").to_string(),
            updated_at: s.updated_at.format("%Y-%m-%d %H:%M").to_string(),
            tax_due: format_pln(s.tax_due),
        })
        .collect();

    let mut table = Table::new(&rows);
    table.with(Style::modern());
    table.modify(Columns::new(4..), Alignment::right());
    format!("{}\n", table)
}

pub fn format_rate(rate: &ResolvedRate) -> String {
    let published = rate
        .effective_date
        .map(|d| d.to_string())
        .unwrap_or_else(|| "n/a".to_string());
    let origin = if rate.origin.is_approximate() {
        rate.origin.as_str().yellow().to_string()
    } else {
        rate.origin.as_str().green().to_string()
    };

    format!(
        "1 {} = {} PLN\n{:<16} {}\n{:<16} {}\n{:<16} {}\n",
        rate.currency.bold(),
        rate.rate,
        "Reference date:",
        rate.reference_date,
        "Published:",
        published,
        "Source:",
        origin
    )
}
