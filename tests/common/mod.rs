#![allow(dead_code)]

use chrono::NaiveDate;
use std::collections::HashMap;
use swingsim::domain::config::{CostConfig, EntryConfig, EntryType, ExitConfig, SimConfig};
use swingsim::domain::error::SwingsimError;
pub use swingsim::domain::ohlcv::OhlcvBar;
use swingsim::ports::data_port::DataPort;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<OhlcvBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, ticker: &str, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert(ticker.to_string(), bars);
        self
    }

    pub fn with_error(mut self, ticker: &str, reason: &str) -> Self {
        self.errors.insert(ticker.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_ohlcv(
        &self,
        ticker: &str,
        _start_date: NaiveDate,
        _end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, SwingsimError> {
        if let Some(reason) = self.errors.get(ticker) {
            return Err(SwingsimError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self.data.get(ticker).cloned().unwrap_or_default())
    }

    fn list_tickers(&self) -> Result<Vec<String>, SwingsimError> {
        Ok(self.data.keys().cloned().collect())
    }

    fn get_data_range(
        &self,
        ticker: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, SwingsimError> {
        if let Some(reason) = self.errors.get(ticker) {
            return Err(SwingsimError::Data {
                reason: reason.clone(),
            });
        }
        match self.data.get(ticker) {
            Some(bars) if !bars.is_empty() => {
                let min = bars.iter().map(|b| b.date).min().unwrap();
                let max = bars.iter().map(|b| b.date).max().unwrap();
                Ok(Some((min, max, bars.len())))
            }
            _ => Ok(None),
        }
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn make_bar(ticker: &str, day: i64, open: f64, high: f64, low: f64, close: f64) -> OhlcvBar {
    OhlcvBar {
        ticker: ticker.to_string(),
        date: date(2024, 1, 2) + chrono::Duration::days(day),
        open,
        high,
        low,
        close,
        volume: 1000,
    }
}

/// Flat bar: close at `level`, range one point either side.
pub fn flat_bar(ticker: &str, day: i64, level: f64) -> OhlcvBar {
    make_bar(ticker, day, level, level + 1.0, level - 1.0, level)
}

/// Ten flat bars at 100, a breakout on day 10, a fill bar, then a collapse
/// through the stop. With `small_sim_config` this produces exactly one
/// losing trade.
pub fn breakout_then_bust(ticker: &str) -> Vec<OhlcvBar> {
    let mut bars: Vec<OhlcvBar> = (0..10).map(|d| flat_bar(ticker, d, 100.0)).collect();
    bars.push(make_bar(ticker, 10, 100.0, 105.0, 99.5, 104.0));
    bars.push(make_bar(ticker, 11, 104.5, 105.0, 103.0, 104.0));
    bars.push(make_bar(ticker, 12, 104.0, 104.5, 90.0, 92.0));
    bars.push(flat_bar(ticker, 13, 92.0));
    bars
}

pub fn generate_flat_bars(ticker: &str, count: usize, level: f64) -> Vec<OhlcvBar> {
    (0..count as i64).map(|d| flat_bar(ticker, d, level)).collect()
}

/// Short lookbacks so small fixtures can trigger entries; zero costs.
pub fn small_sim_config() -> SimConfig {
    SimConfig {
        entry: EntryConfig {
            entry_type: EntryType::Breakout,
            breakout_lookback: 3,
            pullback_ma: 3,
            atr_window: 3,
            min_history: 5,
        },
        exit: ExitConfig::default(),
        costs: CostConfig {
            commission_pct: 0.0,
            slippage_bps: 0.0,
            fx_pct: 0.0,
        },
    }
}
