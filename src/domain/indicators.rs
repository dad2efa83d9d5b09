//! Indicator calculations shared by entry evaluation and stop management.
//!
//! Every function returns a vector aligned index-for-index with the input
//! bars; warmup positions are `None`.

use crate::domain::ohlcv::OhlcvBar;

/// Wilder-smoothed Average True Range.
///
/// The first bar's true range is high − low (no prior close), the seed value
/// at index `period - 1` is the mean of the first `period` true ranges, and
/// subsequent values use Wilder smoothing:
/// `atr[i] = (atr[i-1] * (period - 1) + tr[i]) / period`.
pub fn calc_atr(bars: &[OhlcvBar], period: usize) -> Vec<Option<f64>> {
    if period == 0 || bars.len() < period {
        return vec![None; bars.len()];
    }

    let mut tr_values: Vec<f64> = Vec::with_capacity(bars.len());
    for (i, bar) in bars.iter().enumerate() {
        let tr = if i == 0 {
            bar.high - bar.low
        } else {
            bar.true_range(bars[i - 1].close)
        };
        tr_values.push(tr);
    }

    let mut out: Vec<Option<f64>> = Vec::with_capacity(bars.len());
    let mut prev_atr = 0.0;
    for i in 0..bars.len() {
        if i < period - 1 {
            out.push(None);
        } else if i == period - 1 {
            prev_atr = tr_values[0..=i].iter().sum::<f64>() / period as f64;
            out.push(Some(prev_atr));
        } else {
            prev_atr = (prev_atr * (period - 1) as f64 + tr_values[i]) / period as f64;
            out.push(Some(prev_atr));
        }
    }
    out
}

/// Simple moving average of closes.
pub fn calc_sma(bars: &[OhlcvBar], period: usize) -> Vec<Option<f64>> {
    if period == 0 {
        return vec![None; bars.len()];
    }

    let mut out: Vec<Option<f64>> = Vec::with_capacity(bars.len());
    let mut window_sum = 0.0;
    for (i, bar) in bars.iter().enumerate() {
        window_sum += bar.close;
        if i >= period {
            window_sum -= bars[i - period].close;
        }
        if i + 1 >= period {
            out.push(Some(window_sum / period as f64));
        } else {
            out.push(None);
        }
    }
    out
}

/// Highest high of the `lookback` bars strictly before each index.
///
/// Excludes the current bar so a breakout comparison "today's high vs the
/// prior channel top" never compares a bar against itself.
pub fn calc_prior_high(bars: &[OhlcvBar], lookback: usize) -> Vec<Option<f64>> {
    if lookback == 0 {
        return vec![None; bars.len()];
    }

    let mut out: Vec<Option<f64>> = Vec::with_capacity(bars.len());
    for i in 0..bars.len() {
        if i < lookback {
            out.push(None);
        } else {
            let top = bars[i - lookback..i]
                .iter()
                .map(|b| b.high)
                .fold(f64::MIN, f64::max);
            out.push(Some(top));
        }
    }
    out
}
