//! Ticker universe: list parsing and pre-run data checks.

use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::collections::HashSet;

#[derive(Debug, Clone, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in ticker list")]
    EmptyToken,

    #[error("duplicate ticker: {0}")]
    DuplicateTicker(String),
}

pub fn parse_tickers(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut seen = HashSet::new();
    let mut tickers = Vec::new();

    for token in input.split(',') {
        let ticker = token.trim().to_uppercase();
        if ticker.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        if !seen.insert(ticker.clone()) {
            return Err(UniverseError::DuplicateTicker(ticker));
        }
        tickers.push(ticker);
    }

    Ok(tickers)
}

/// Outcome of checking a universe against available data.
///
/// Dropped tickers are warnings, never errors: the check always returns,
/// and the caller decides what an empty surviving universe means. The
/// warnings are meant to travel with the run's result.
#[derive(Debug, Clone, Default)]
pub struct UniverseCheck {
    pub tickers: Vec<String>,
    pub warnings: Vec<String>,
}

/// Drops tickers that cannot support the configured strategy.
///
/// `min_bars` is the resolved `min_history` of the entry rules, so the
/// floor moves with the configuration rather than refusing series the
/// engine could in fact simulate. Fetch failures and empty or thin series
/// each leave one warning naming the ticker.
pub fn check_universe(
    data_port: &dyn DataPort,
    tickers: &[String],
    start_date: NaiveDate,
    end_date: NaiveDate,
    min_bars: usize,
) -> UniverseCheck {
    let mut check = UniverseCheck::default();

    for ticker in tickers {
        match data_port.fetch_ohlcv(ticker, start_date, end_date) {
            Err(e) => check.warnings.push(format!("{ticker}: skipped ({e})")),
            Ok(bars) if bars.is_empty() => check
                .warnings
                .push(format!("{ticker}: skipped, no data in range")),
            Ok(bars) if bars.len() < min_bars => check.warnings.push(format!(
                "{ticker}: skipped, only {} bars, minimum {min_bars} required",
                bars.len()
            )),
            Ok(_) => check.tickers.push(ticker.clone()),
        }
    }

    check
}
