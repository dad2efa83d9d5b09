//! Live stop management: applies the simulator's stop-raising rules to
//! open positions against the latest bar, suggesting actions instead of
//! closing trades.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::config::ManageConfig;
use crate::domain::indicators::calc_sma;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::state_machine::raise_stop;

/// An open position as loaded from the positions store. `initial_risk`
/// is the risk taken at entry and is never recomputed here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenPosition {
    pub ticker: String,
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub stop_price: f64,
    pub shares: f64,
    pub initial_risk: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionAction {
    NoAction,
    MoveStopUp,
    CloseStopHit,
    CloseTimeExit,
}

impl fmt::Display for PositionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PositionAction::NoAction => "NO_ACTION",
            PositionAction::MoveStopUp => "MOVE_STOP_UP",
            PositionAction::CloseStopHit => "CLOSE_STOP_HIT",
            PositionAction::CloseTimeExit => "CLOSE_TIME_EXIT",
        };
        write!(f, "{s}")
    }
}

/// One evaluation of one open position. The caller decides whether to act
/// on it; nothing here mutates the positions store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionUpdate {
    pub ticker: String,
    pub status: String,
    pub last: f64,
    pub entry: f64,
    pub stop_old: f64,
    pub stop_suggested: f64,
    pub shares: f64,
    pub r_now: f64,
    pub action: PositionAction,
    pub reason: String,
}

/// Evaluates one open position against its latest bar window.
///
/// The window must end at the most recent bar and carry enough history for
/// the trailing SMA; a short window simply yields no trailing raise. Close
/// conditions win over raises, and a computed stop below the current one is
/// clipped, so the suggested stop never decreases.
pub fn suggest(
    position: &OpenPosition,
    bars: &[OhlcvBar],
    config: &ManageConfig,
) -> Result<PositionUpdate, String> {
    let last = bars
        .last()
        .ok_or_else(|| format!("{}: no bars supplied", position.ticker))?;
    if !(position.initial_risk > 0.0) {
        return Err(format!(
            "{}: non-positive initial risk {}",
            position.ticker, position.initial_risk
        ));
    }

    let r_now = (last.close - position.entry_price) / position.initial_risk;
    let held_days = (last.date - position.entry_date).num_days();

    let update = |stop_suggested: f64, action: PositionAction, reason: String| PositionUpdate {
        ticker: position.ticker.clone(),
        status: match action {
            PositionAction::CloseStopHit | PositionAction::CloseTimeExit => "CLOSE".to_string(),
            _ => "OPEN".to_string(),
        },
        last: last.close,
        entry: position.entry_price,
        stop_old: position.stop_price,
        stop_suggested,
        shares: position.shares,
        r_now,
        action,
        reason,
    };

    if last.low <= position.stop_price {
        return Ok(update(
            position.stop_price,
            PositionAction::CloseStopHit,
            format!(
                "low {:.2} at or below stop {:.2}",
                last.low, position.stop_price
            ),
        ));
    }

    if held_days > config.max_holding_days as i64 {
        return Ok(update(
            position.stop_price,
            PositionAction::CloseTimeExit,
            format!(
                "held {held_days} days, limit {}",
                config.max_holding_days
            ),
        ));
    }

    let sma = calc_sma(bars, config.trail_sma)
        .last()
        .copied()
        .flatten();
    let suggested = raise_stop(
        position.stop_price,
        position.entry_price,
        r_now,
        sma,
        config.breakeven_at_r,
        config.trail_after_r,
        config.sma_buffer_pct,
    );

    if suggested > position.stop_price {
        Ok(update(
            suggested,
            PositionAction::MoveStopUp,
            format!(
                "raise stop {:.2} -> {:.2} at R {:.2}",
                position.stop_price, suggested, r_now
            ),
        ))
    } else {
        Ok(update(
            position.stop_price,
            PositionAction::NoAction,
            format!("no raise at R {:.2}", r_now),
        ))
    }
}
