//! Per-trade exit state machine: FLAT → ENTERED → {BREAKEVEN, TRAILING}* → CLOSED.
//!
//! One instance owns one open trade. The backtest driver advances it one bar
//! at a time; the live stop-suggestion engine reuses [`raise_stop`], the
//! same stop-raising rule, against today's bar.

use chrono::NaiveDate;

use crate::domain::config::{CostConfig, ExitConfig, ExitMode};
use crate::domain::costs::cost_in_r;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::trade::{ExitReason, Trade};

/// Stop-raising rule shared by the simulator and live position management.
///
/// Returns the new stop, never below `current_stop` ("stops only move up"):
/// - at `breakeven_at_r` of profit the stop rises to the entry price;
/// - at `trail_after_r` it additionally trails the SMA less a buffer.
pub fn raise_stop(
    current_stop: f64,
    entry_price: f64,
    r_now: f64,
    trail_sma: Option<f64>,
    breakeven_at_r: f64,
    trail_after_r: f64,
    sma_buffer_pct: f64,
) -> f64 {
    let mut stop = current_stop;
    if r_now >= breakeven_at_r {
        stop = stop.max(entry_price);
    }
    if r_now >= trail_after_r {
        if let Some(sma) = trail_sma {
            stop = stop.max(sma * (1.0 - sma_buffer_pct));
        }
    }
    stop
}

/// State machine for one open long trade.
///
/// R-multiples are always computed against the initial risk taken at entry,
/// never against the current (possibly raised) stop.
#[derive(Debug, Clone)]
pub struct TradeStateMachine {
    ticker: String,
    entry_date: NaiveDate,
    entry_price: f64,
    initial_stop: f64,
    current_stop: f64,
    initial_risk: f64,
    max_favorable_price: f64,
    days_held: usize,
    exit: ExitConfig,
    costs: CostConfig,
    warnings: Vec<String>,
    closed: bool,
}

impl TradeStateMachine {
    /// Opens a trade on its entry bar.
    ///
    /// The initial stop sits `k_atr` ATRs below the entry fill. A
    /// non-positive or non-finite ATR (or entry price) would produce a
    /// degenerate initial risk, so the trade is refused with a warning
    /// string rather than opened.
    pub fn open(
        ticker: &str,
        entry_date: NaiveDate,
        entry_price: f64,
        atr: f64,
        exit: &ExitConfig,
        costs: &CostConfig,
    ) -> Result<Self, String> {
        if !entry_price.is_finite() || entry_price <= 0.0 {
            return Err(format!(
                "{ticker}: refusing entry at non-positive price {entry_price}"
            ));
        }
        if !atr.is_finite() || atr <= 0.0 {
            return Err(format!(
                "{ticker}: refusing entry on {entry_date}, degenerate ATR {atr}"
            ));
        }

        let initial_stop = entry_price - exit.k_atr * atr;
        let initial_risk = entry_price - initial_stop;
        if !initial_risk.is_finite() || initial_risk <= 0.0 {
            return Err(format!(
                "{ticker}: refusing entry on {entry_date}, degenerate initial risk {initial_risk}"
            ));
        }

        Ok(TradeStateMachine {
            ticker: ticker.to_string(),
            entry_date,
            entry_price,
            initial_stop,
            current_stop: initial_stop,
            initial_risk,
            max_favorable_price: entry_price,
            days_held: 0,
            exit: exit.clone(),
            costs: costs.clone(),
            warnings: Vec::new(),
            closed: false,
        })
    }

    pub fn current_stop(&self) -> f64 {
        self.current_stop
    }

    pub fn initial_risk(&self) -> f64 {
        self.initial_risk
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Warnings accumulated while the trade was live (cost clamps).
    pub fn take_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }

    /// Advances the machine by one bar after the entry bar.
    ///
    /// Returns the finished [`Trade`] once an exit fires, `None` while the
    /// position stays open. Evaluation order per bar: take-profit target,
    /// stop raises (breakeven, then trail), stop hit, time exit.
    ///
    /// # Panics
    /// Panics if called after the trade closed — that is a driver bug, not
    /// bad market data.
    pub fn step(&mut self, bar: &OhlcvBar, trail_sma: Option<f64>) -> Option<Trade> {
        assert!(
            !self.closed,
            "TradeStateMachine::step called on a closed trade ({})",
            self.ticker
        );

        self.days_held += 1;
        self.max_favorable_price = self.max_favorable_price.max(bar.high);
        let r_now = (bar.close - self.entry_price) / self.initial_risk;

        if self.exit.exit_mode == ExitMode::TakeProfit && r_now >= self.exit.take_profit_r {
            // Fill at the price implied by the target R, not the close.
            let target_price = self.entry_price + self.exit.take_profit_r * self.initial_risk;
            return Some(self.close(bar.date, target_price, ExitReason::TakeProfit));
        }

        self.current_stop = raise_stop(
            self.current_stop,
            self.entry_price,
            r_now,
            trail_sma,
            self.exit.breakeven_at_r,
            self.exit.trail_after_r,
            self.exit.sma_buffer_pct,
        );

        if bar.low <= self.current_stop {
            // Worst-case fill at the stop level, never better.
            let reason = if self.current_stop > self.entry_price {
                ExitReason::TrailStop
            } else {
                ExitReason::StopHit
            };
            return Some(self.close(bar.date, self.current_stop, reason));
        }

        if self.days_held >= self.exit.max_holding_days {
            return Some(self.close(bar.date, bar.close, ExitReason::TimeExit));
        }

        None
    }

    /// Closes out at the given bar's close with a TIME_EXIT, used when the
    /// series ends while the trade is still open.
    pub fn force_close(&mut self, bar: &OhlcvBar) -> Trade {
        assert!(
            !self.closed,
            "TradeStateMachine::force_close called on a closed trade ({})",
            self.ticker
        );
        self.close(bar.date, bar.close, ExitReason::TimeExit)
    }

    fn close(&mut self, exit_date: NaiveDate, exit_price: f64, exit_reason: ExitReason) -> Trade {
        self.closed = true;

        let r_gross = match exit_reason {
            // Exact by construction, so TAKE_PROFIT trades report precisely
            // the configured target.
            ExitReason::TakeProfit => self.exit.take_profit_r,
            _ => (exit_price - self.entry_price) / self.initial_risk,
        };

        // Signal-level simulation: costs are linear in share count, so the
        // R-denominated cost is computed per share.
        let (r_cost, warning) =
            cost_in_r(self.entry_price, exit_price, 1.0, self.initial_risk, &self.costs);
        if let Some(w) = warning {
            self.warnings.push(format!("{}: {w}", self.ticker));
        }

        Trade {
            ticker: self.ticker.clone(),
            entry_date: self.entry_date,
            entry_price: self.entry_price,
            stop_price: self.initial_stop,
            exit_date,
            exit_price,
            r: r_gross - r_cost,
            r_gross,
            r_cost,
            exit_reason,
            holding_days: self.days_held,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_bar(day: u32, high: f64, low: f64, close: f64) -> OhlcvBar {
        OhlcvBar {
            ticker: "ACME".into(),
            date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            open: close,
            high,
            low,
            close,
            volume: 1000,
        }
    }

    fn entry_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn trailing_exit() -> ExitConfig {
        ExitConfig {
            exit_mode: ExitMode::TrailingStop,
            k_atr: 2.0,
            take_profit_r: 2.5,
            breakeven_at_r: 1.0,
            trail_after_r: 1.5,
            trail_sma: 20,
            sma_buffer_pct: 0.0,
            max_holding_days: 40,
        }
    }

    fn open_at_100() -> TradeStateMachine {
        // ATR 2, k_atr 2 → stop 96, risk 4
        TradeStateMachine::open(
            "ACME",
            entry_date(),
            100.0,
            2.0,
            &trailing_exit(),
            &CostConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn open_sets_initial_stop_from_atr() {
        let sm = open_at_100();
        assert!((sm.current_stop() - 96.0).abs() < f64::EPSILON);
        assert!((sm.initial_risk() - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn open_refuses_degenerate_atr() {
        for atr in [0.0, -1.0, f64::NAN] {
            let result = TradeStateMachine::open(
                "ACME",
                entry_date(),
                100.0,
                atr,
                &trailing_exit(),
                &CostConfig::default(),
            );
            assert!(result.is_err(), "ATR {atr} should refuse entry");
        }
    }

    #[test]
    fn breakeven_raise_then_stop_hit_at_entry() {
        // Entry 100, risk 4; close 108 is R=2 ≥ breakeven 1
        // → stop to 100. A later low of 99 touches the stop → exit at 100,
        // R=0, and the reason is a plain stop hit (the stop is not above
        // entry).
        let mut sm = open_at_100();

        assert!(sm.step(&make_bar(4, 108.5, 103.0, 108.0), None).is_none());
        assert!((sm.current_stop() - 100.0).abs() < f64::EPSILON);

        let trade = sm.step(&make_bar(5, 104.0, 99.0, 101.0), None).unwrap();
        assert_eq!(trade.exit_reason, ExitReason::StopHit);
        assert!((trade.exit_price - 100.0).abs() < f64::EPSILON);
        assert!((trade.r_gross - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn stop_never_decreases() {
        let mut sm = open_at_100();
        // Reach trailing threshold with a generous SMA
        sm.step(&make_bar(4, 112.0, 108.5, 110.0), Some(108.0));
        let raised = sm.current_stop();
        assert!((raised - 108.0).abs() < f64::EPSILON);

        // Lower SMA must not lower the stop
        sm.step(&make_bar(5, 112.0, 108.5, 110.0), Some(104.0));
        assert!(sm.current_stop() >= raised);
    }

    #[test]
    fn trail_stop_hit_above_entry_reports_trail_stop() {
        let mut sm = open_at_100();
        sm.step(&make_bar(4, 112.0, 108.5, 110.0), Some(108.0));
        // Low pierces the trailed stop at 108
        let trade = sm.step(&make_bar(5, 110.0, 107.0, 107.5), Some(108.0)).unwrap();
        assert_eq!(trade.exit_reason, ExitReason::TrailStop);
        assert!((trade.exit_price - 108.0).abs() < f64::EPSILON);
        assert!(trade.r_gross > 0.0);
    }

    #[test]
    fn stop_hit_fills_at_stop_not_at_low() {
        // Gap through the stop: fill stays at the stop level, never a
        // better price.
        let mut sm = open_at_100();
        let trade = sm.step(&make_bar(4, 97.0, 80.0, 85.0), None).unwrap();
        assert_eq!(trade.exit_reason, ExitReason::StopHit);
        assert!((trade.exit_price - 96.0).abs() < f64::EPSILON);
        assert!((trade.r_gross - (-1.0)).abs() < f64::EPSILON);
    }

    #[test]
    fn take_profit_fills_at_target_exactly() {
        let exit = ExitConfig {
            exit_mode: ExitMode::TakeProfit,
            ..trailing_exit()
        };
        let mut sm = TradeStateMachine::open(
            "ACME",
            entry_date(),
            100.0,
            2.0,
            &exit,
            &CostConfig::default(),
        )
        .unwrap();

        // Close 112 is R=3 ≥ target 2.5 → fill at 100 + 2.5*4 = 110
        let trade = sm.step(&make_bar(4, 113.0, 104.0, 112.0), None).unwrap();
        assert_eq!(trade.exit_reason, ExitReason::TakeProfit);
        assert!((trade.exit_price - 110.0).abs() < f64::EPSILON);
        assert!((trade.r_gross - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn time_exit_after_max_holding_days() {
        let exit = ExitConfig {
            max_holding_days: 5,
            ..trailing_exit()
        };
        let mut sm = TradeStateMachine::open(
            "ACME",
            entry_date(),
            100.0,
            2.0,
            &exit,
            &CostConfig::default(),
        )
        .unwrap();

        // Five quiet bars; the fifth closes the trade at its close
        for day in 2..=5 {
            assert!(sm.step(&make_bar(day, 101.0, 98.0, 100.5), None).is_none());
        }
        let trade = sm.step(&make_bar(6, 101.0, 98.0, 100.5), None).unwrap();
        assert_eq!(trade.exit_reason, ExitReason::TimeExit);
        assert_eq!(trade.holding_days, 5);
        assert!((trade.exit_price - 100.5).abs() < f64::EPSILON);
    }

    #[test]
    fn force_close_emits_time_exit_at_close() {
        let mut sm = open_at_100();
        sm.step(&make_bar(4, 103.0, 99.5, 102.0), None);
        let trade = sm.force_close(&make_bar(5, 103.0, 100.0, 102.5));
        assert_eq!(trade.exit_reason, ExitReason::TimeExit);
        assert!((trade.exit_price - 102.5).abs() < f64::EPSILON);
    }

    #[test]
    fn costs_subtract_from_gross_r() {
        let costs = CostConfig {
            commission_pct: 0.001,
            slippage_bps: 5.0,
            fx_pct: 0.0,
        };
        let mut sm = TradeStateMachine::open(
            "ACME",
            entry_date(),
            100.0,
            2.0,
            &trailing_exit(),
            &costs,
        )
        .unwrap();

        let trade = sm.step(&make_bar(4, 97.0, 80.0, 85.0), None).unwrap();
        assert!(trade.r_cost > 0.0);
        assert!((trade.r - (trade.r_gross - trade.r_cost)).abs() < 1e-12);
        assert!(trade.r < trade.r_gross);
    }

    #[test]
    #[should_panic(expected = "closed trade")]
    fn stepping_closed_machine_panics() {
        let mut sm = open_at_100();
        sm.step(&make_bar(4, 97.0, 80.0, 85.0), None).unwrap();
        sm.step(&make_bar(5, 97.0, 90.0, 95.0), None);
    }

    #[test]
    fn raise_stop_clips_below_current() {
        // Trailing level under the current stop is ignored
        let stop = raise_stop(100.0, 95.0, 2.0, Some(90.0), 1.0, 1.5, 0.0);
        assert!((stop - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn raise_stop_below_thresholds_is_identity() {
        let stop = raise_stop(96.0, 100.0, 0.5, Some(120.0), 1.0, 1.5, 0.0);
        assert!((stop - 96.0).abs() < f64::EPSILON);
    }
}
