//! Multi-ticker aggregation: parallel per-ticker runs, equity curves,
//! drawdown statistics.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::Serialize;

use crate::domain::config::SimConfig;
use crate::domain::driver::{run_ticker, TickerRun};
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::stats::{summarize, Summary};
use crate::domain::trade::Trade;

/// One day on a realized-R equity curve.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EquityCurvePoint {
    pub date: NaiveDate,
    /// R realized on this date (sum over trades exiting that day).
    pub r: f64,
    pub cum_r: f64,
}

/// Top-level backtest payload: trades, curves, summary, and the warnings
/// collected along the way. Always "partial success with explanation" — a
/// bad ticker contributes a warning, never an abort.
#[derive(Debug, Clone, Serialize)]
pub struct BacktestResult {
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityCurvePoint>,
    pub per_ticker_curves: BTreeMap<String, Vec<EquityCurvePoint>>,
    pub max_drawdown_r: f64,
    pub summary: Summary,
    pub warnings: Vec<String>,
}

/// Builds a realized-R equity curve from trades already sorted by exit
/// date. One point per distinct exit date; `cum_r` is the running sum.
pub fn build_equity_curve(trades: &[Trade]) -> Vec<EquityCurvePoint> {
    let mut curve: Vec<EquityCurvePoint> = Vec::new();
    let mut cum_r = 0.0;

    for trade in trades {
        cum_r += trade.r;
        match curve.last_mut() {
            Some(point) if point.date == trade.exit_date => {
                point.r += trade.r;
                point.cum_r = cum_r;
            }
            _ => curve.push(EquityCurvePoint {
                date: trade.exit_date,
                r: trade.r,
                cum_r,
            }),
        }
    }

    curve
}

/// Maximum peak-to-trough decline of cumulative R. Always ≤ 0; 0 for an
/// empty or monotonically rising curve.
pub fn max_drawdown_r(curve: &[EquityCurvePoint]) -> f64 {
    let mut peak = 0.0_f64;
    let mut max_dd = 0.0_f64;
    for point in curve {
        peak = peak.max(point.cum_r);
        max_dd = max_dd.min(point.cum_r - peak);
    }
    max_dd
}

/// Runs the single-ticker driver across a universe and aggregates.
///
/// Tickers are independent — no shared capital, no cross-ticker state — so
/// the runs are embarrassingly parallel; with `parallel` set they fan out
/// over rayon's thread pool. The combined trade list is sorted by exit date
/// (ticker and entry date break ties) before curve construction, so output
/// is deterministic regardless of completion order.
///
/// A `cancel` flag, when supplied, is checked before each ticker's run;
/// cancelled tickers are skipped with a warning rather than half-run.
pub fn run_many(
    data: &HashMap<String, Vec<OhlcvBar>>,
    tickers: &[String],
    config: &SimConfig,
    parallel: bool,
    cancel: Option<&AtomicBool>,
) -> BacktestResult {
    let run_one = |ticker: &String| -> TickerRun {
        if let Some(flag) = cancel {
            if flag.load(Ordering::Relaxed) {
                return TickerRun {
                    ticker: ticker.clone(),
                    trades: Vec::new(),
                    warnings: vec![format!("{ticker}: skipped, run cancelled")],
                };
            }
        }
        match data.get(ticker) {
            Some(bars) => run_ticker(bars, ticker, config),
            None => TickerRun {
                ticker: ticker.clone(),
                trades: Vec::new(),
                warnings: vec![format!("{ticker}: no data supplied")],
            },
        }
    };

    let runs: Vec<TickerRun> = if parallel {
        tickers.par_iter().map(run_one).collect()
    } else {
        tickers.iter().map(run_one).collect()
    };

    let mut trades: Vec<Trade> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();
    for run in runs {
        trades.extend(run.trades);
        warnings.extend(run.warnings);
    }

    trades.sort_by(|a, b| {
        (a.exit_date, &a.ticker, a.entry_date).cmp(&(b.exit_date, &b.ticker, b.entry_date))
    });

    let equity_curve = build_equity_curve(&trades);
    let max_dd = max_drawdown_r(&equity_curve);

    let mut per_ticker_curves: BTreeMap<String, Vec<EquityCurvePoint>> = BTreeMap::new();
    for ticker in tickers {
        let own: Vec<Trade> = trades
            .iter()
            .filter(|t| &t.ticker == ticker)
            .cloned()
            .collect();
        if !own.is_empty() {
            per_ticker_curves.insert(ticker.clone(), build_equity_curve(&own));
        }
    }

    let summary = summarize(&trades);

    BacktestResult {
        trades,
        equity_curve,
        per_ticker_curves,
        max_drawdown_r: max_dd,
        summary,
        warnings,
    }
}
