//! Closed-trade records, the primary output of the simulator.

use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitReason {
    TakeProfit,
    TrailStop,
    TimeExit,
    StopHit,
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ExitReason::TakeProfit => "TAKE_PROFIT",
            ExitReason::TrailStop => "TRAIL_STOP",
            ExitReason::TimeExit => "TIME_EXIT",
            ExitReason::StopHit => "STOP_HIT",
        };
        write!(f, "{s}")
    }
}

/// One closed trade. Created once at close, immutable thereafter.
///
/// `r` is the net R-multiple after costs, `r_gross` the pre-cost multiple,
/// and `r_cost` the cost expressed in R-units, so `r == r_gross - r_cost`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trade {
    pub ticker: String,
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    /// Initial stop at entry, before any breakeven/trailing raises.
    pub stop_price: f64,
    pub exit_date: NaiveDate,
    pub exit_price: f64,
    pub r: f64,
    pub r_gross: f64,
    pub r_cost: f64,
    pub exit_reason: ExitReason,
    pub holding_days: usize,
}
