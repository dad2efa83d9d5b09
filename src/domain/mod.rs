//! Core domain types and logic.

pub mod aggregate;
pub mod config;
pub mod costs;
pub mod driver;
pub mod entry;
pub mod error;
pub mod indicators;
pub mod manage;
pub mod ohlcv;
pub mod state_machine;
pub mod stats;
pub mod trade;
pub mod universe;
