//! Entry rule evaluation: breakout and pullback signals.

use crate::domain::config::{EntryConfig, EntryType};
use crate::domain::indicators::{calc_prior_high, calc_sma};
use crate::domain::ohlcv::OhlcvBar;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Breakout,
    Pullback,
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryKind::Breakout => write!(f, "breakout"),
            EntryKind::Pullback => write!(f, "pullback"),
        }
    }
}

/// A fired entry rule and the price the order would have worked at.
///
/// Breakout triggers model a stop-buy resting at the prior channel top;
/// pullback triggers model a limit-buy at the moving-average level.
#[derive(Debug, Clone, PartialEq)]
pub struct EntrySignal {
    pub kind: EntryKind,
    pub trigger_price: f64,
}

/// Evaluates entry rules bar-by-bar over one ticker's history.
///
/// Indicator series are computed once at construction; `evaluate` is then a
/// cheap per-bar lookup, which keeps the driver loop linear.
pub struct EntryEvaluator<'a> {
    bars: &'a [OhlcvBar],
    config: &'a EntryConfig,
    prior_high: Vec<Option<f64>>,
    pullback_sma: Vec<Option<f64>>,
}

impl<'a> EntryEvaluator<'a> {
    pub fn new(bars: &'a [OhlcvBar], config: &'a EntryConfig) -> Self {
        EntryEvaluator {
            bars,
            config,
            prior_high: calc_prior_high(bars, config.breakout_lookback),
            pullback_sma: calc_sma(bars, config.pullback_ma),
        }
    }

    /// Returns the signal firing on bar `t`, if any.
    ///
    /// In `auto` mode breakout is checked before pullback; the first match
    /// wins. This ordering is the documented tie-break for bars where both
    /// rules fire. Returns `None` (never errors) while fewer than
    /// `min_history` bars are available.
    pub fn evaluate(&self, t: usize) -> Option<EntrySignal> {
        if t + 1 < self.config.min_history {
            return None;
        }

        match self.config.entry_type {
            EntryType::Breakout => self.breakout(t),
            EntryType::Pullback => self.pullback(t),
            EntryType::Auto => self.breakout(t).or_else(|| self.pullback(t)),
        }
    }

    /// Today's high crosses above the highest high of the prior
    /// `breakout_lookback` bars. Trigger is that prior high, not today's
    /// close: a stop-buy at the channel top fills at the breakout level or
    /// better.
    fn breakout(&self, t: usize) -> Option<EntrySignal> {
        let channel_top = self.prior_high[t]?;
        if self.bars[t].high > channel_top {
            Some(EntrySignal {
                kind: EntryKind::Breakout,
                trigger_price: channel_top,
            })
        } else {
            None
        }
    }

    /// Price closed at/below the `pullback_ma` SMA after being above it, and
    /// the current bar closes back above: a one-bar re-entry confirmation.
    /// Trigger is the moving-average level (limit-buy at the dip).
    fn pullback(&self, t: usize) -> Option<EntrySignal> {
        if t < 2 {
            return None;
        }
        let sma_now = self.pullback_sma[t]?;
        let sma_dip = self.pullback_sma[t - 1]?;
        let sma_before = self.pullback_sma[t - 2]?;

        let was_above = self.bars[t - 2].close > sma_before;
        let dipped = self.bars[t - 1].close <= sma_dip;
        let reclaimed = self.bars[t].close > sma_now;

        if was_above && dipped && reclaimed {
            Some(EntrySignal {
                kind: EntryKind::Pullback,
                trigger_price: sma_now,
            })
        } else {
            None
        }
    }
}
