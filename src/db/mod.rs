// Database module - SQLite history of saved calculations

pub mod models;

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{debug, info};

use crate::models::TaxCalculation;
pub use models::CalculationSummary;

/// Get the default database path (~/.kryptopit/history.db)
pub fn get_default_db_path() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    let data_dir = PathBuf::from(home).join(".kryptopit");

    // Create directory if it doesn't exist
    std::fs::create_dir_all(&data_dir).context("Failed to create .kryptopit directory")?;

    Ok(data_dir.join("history.db"))
}

/// Open database connection
pub fn open_db(db_path: Option<PathBuf>) -> Result<Connection> {
    let path = match db_path {
        Some(path) => path,
        None => get_default_db_path()?,
    };
    let conn = Connection::open(&path)
        .with_context(|| format!("Failed to open database at {:?}", path))?;
    Ok(conn)
}

/// Initialize the database with schema
///
/// Safe to call on every start: the schema only creates what is missing.
pub fn init_database(db_path: Option<PathBuf>) -> Result<Connection> {
    let conn = open_db(db_path)?;
    conn.execute_batch(include_str!("schema.sql"))
        .context("Failed to execute schema")?;
    debug!("History database ready");
    Ok(conn)
}

/// Insert or replace a calculation.
///
/// Saving an id that already exists keeps its `created_at` and moves
/// `updated_at` to now (the passed value is updated to match).
pub fn save_calculation(conn: &Connection, calc: &mut TaxCalculation) -> Result<()> {
    let existing: Option<String> = conn
        .query_row(
            "SELECT created_at FROM calculations WHERE id = ?1",
            [&calc.id],
            |row| row.get(0),
        )
        .optional()?;

    if existing.is_some() {
        calc.updated_at = Utc::now();
    }

    let payload = serde_json::to_string(calc).context("Failed to serialize calculation")?;
    conn.execute(
        "INSERT INTO calculations (id, name, created_at, updated_at, tax_due, payload)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            updated_at = excluded.updated_at,
            tax_due = excluded.tax_due,
            payload = excluded.payload",
        params![
            calc.id,
            calc.name,
            calc.created_at,
            calc.updated_at,
            calc.totals.tax_due.to_string(),
            payload,
        ],
    )?;

    info!("Saved calculation {} ({})", calc.id, calc.name);
    Ok(())
}

/// All saved calculations, most recently updated first
pub fn list_calculations(conn: &Connection) -> Result<Vec<CalculationSummary>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, created_at, updated_at, tax_due
         FROM calculations
         ORDER BY updated_at DESC, id ASC",
    )?;

    let summaries = stmt
        .query_map([], |row| {
            Ok(CalculationSummary {
                id: row.get(0)?,
                name: row.get(1)?,
                created_at: row.get(2)?,
                updated_at: row.get(3)?,
                tax_due: get_decimal_value(row, 4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(summaries)
}

pub fn load_calculation(conn: &Connection, id: &str) -> Result<Option<TaxCalculation>> {
    let payload: Option<String> = conn
        .query_row(
            "SELECT payload FROM calculations WHERE id = ?1",
            [id],
            |row| row.get(0),
        )
        .optional()?;

    payload
        .map(|p| {
            serde_json::from_str(&p)
                .with_context(|| format!("Stored calculation {} is corrupted", id))
        })
        .transpose()
}

/// Returns false when nothing had that id
pub fn delete_calculation(conn: &Connection, id: &str) -> Result<bool> {
    let deleted = conn.execute("DELETE FROM calculations WHERE id = ?1", [id])?;
    if deleted > 0 {
        info!("Deleted calculation {}", id);
    }
    Ok(deleted > 0)
}

/// Helper to read a Decimal stored as TEXT
fn get_decimal_value(row: &rusqlite::Row, idx: usize) -> Result<Decimal, rusqlite::Error> {
    let text: String = row.get(idx)?;
    Decimal::from_str(&text).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}
