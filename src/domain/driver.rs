//! Single-ticker backtest driver: bar-by-bar entry/exit walk.

use crate::domain::config::SimConfig;
use crate::domain::entry::{EntryEvaluator, EntryKind, EntrySignal};
use crate::domain::indicators::{calc_atr, calc_sma};
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::state_machine::TradeStateMachine;
use crate::domain::trade::Trade;

/// Result of simulating one ticker in isolation.
#[derive(Debug, Clone, Default)]
pub struct TickerRun {
    pub ticker: String,
    pub trades: Vec<Trade>,
    pub warnings: Vec<String>,
}

/// Replays one ticker's history through the entry evaluator and the trade
/// state machine.
///
/// While flat, each bar is checked for an entry signal; a signal fired on
/// bar t is realized at bar t+1 (no look-ahead), with the stop distance
/// taken from the ATR known when the order was placed. The fill honors the
/// order the signal modeled: a breakout stop-buy fills at the next open or
/// the trigger, whichever is higher, and a pullback limit-buy fills at the
/// next open or the trigger, whichever is lower. At most one trade is open
/// at a time. If the series ends mid-trade the position is force-closed at
/// the final close as a time exit so no capital is left in limbo.
pub fn run_ticker(bars: &[OhlcvBar], ticker: &str, config: &SimConfig) -> TickerRun {
    let mut run = TickerRun {
        ticker: ticker.to_string(),
        ..TickerRun::default()
    };

    if bars.len() < config.entry.min_history {
        run.warnings.push(format!(
            "{ticker}: insufficient data, have {} bars, need {}",
            bars.len(),
            config.entry.min_history
        ));
        return run;
    }

    let evaluator = EntryEvaluator::new(bars, &config.entry);
    let atr = calc_atr(bars, config.entry.atr_window);
    let trail_sma = calc_sma(bars, config.exit.trail_sma);

    let mut machine: Option<TradeStateMachine> = None;
    // Signal fired on the previous bar, to be filled at this bar's open.
    let mut pending: Option<(EntrySignal, f64)> = None;

    for (t, bar) in bars.iter().enumerate() {
        if let Some(sm) = machine.as_mut() {
            if let Some(trade) = sm.step(bar, trail_sma[t]) {
                run.warnings.extend(sm.take_warnings());
                run.trades.push(trade);
                machine = None;
            }
            continue;
        }

        if let Some((signal, signal_atr)) = pending.take() {
            let fill_price = match signal.kind {
                EntryKind::Breakout => bar.open.max(signal.trigger_price),
                EntryKind::Pullback => bar.open.min(signal.trigger_price),
            };
            match TradeStateMachine::open(
                ticker,
                bar.date,
                fill_price,
                signal_atr,
                &config.exit,
                &config.costs,
            ) {
                Ok(sm) => {
                    machine = Some(sm);
                    continue;
                }
                Err(warning) => run.warnings.push(warning),
            }
        }

        if let Some(signal) = evaluator.evaluate(t) {
            match atr[t] {
                Some(signal_atr) if t + 1 < bars.len() => {
                    pending = Some((signal, signal_atr));
                }
                Some(_) => {
                    // Signal on the final bar has no next open to fill at.
                }
                None => run.warnings.push(format!(
                    "{ticker}: {} signal on {} skipped, ATR not yet available",
                    signal.kind, bar.date
                )),
            }
        }
    }

    if let Some(mut sm) = machine {
        if let Some(last) = bars.last() {
            let trade = sm.force_close(last);
            run.warnings.extend(sm.take_warnings());
            run.trades.push(trade);
        }
    }

    run
}
