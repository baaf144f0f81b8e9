//! Kryptopit - Polish PIT-38 calculator for cryptocurrency gains
//!
//! This library imports transaction exports from crypto exchanges, converts
//! amounts to PLN with NBP reference rates, and computes yearly revenue,
//! costs, income, tax and carry-forward costs.

pub mod config;
pub mod db;
pub mod error;
pub mod importers;
pub mod models;
pub mod pricing;
pub mod tax;
pub mod ui;
pub mod utils;
