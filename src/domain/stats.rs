//! Trade-set statistics: expectancy, win rate, profit factor, R distribution.

use serde::Serialize;

use crate::domain::trade::Trade;

/// Fixed R-multiple bands for the distribution histogram.
const RR_BUCKETS: [(&str, f64, f64); 7] = [
    ("<=-2", f64::NEG_INFINITY, -2.0),
    ("-2..-1", -2.0, -1.0),
    ("-1..0", -1.0, 0.0),
    ("0..1", 0.0, 1.0),
    ("1..2", 1.0, 2.0),
    ("2..3", 2.0, 3.0),
    (">3", 3.0, f64::INFINITY),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RrBucket {
    pub label: String,
    pub count: usize,
}

/// Summary statistics over a set of closed trades.
///
/// Total over its input: an empty trade set yields zeros and `None`s, and
/// `profit_factor_r` is `None` when there are no losing trades rather than
/// a division blowing up.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub trades: usize,
    pub expectancy_r: f64,
    pub winrate: f64,
    pub profit_factor_r: Option<f64>,
    pub avg_r: f64,
    pub avg_win_r: f64,
    pub avg_loss_r: f64,
    pub best_trade_r: f64,
    pub worst_trade_r: f64,
    pub rr_distribution: Vec<RrBucket>,
}

impl Summary {
    fn empty() -> Self {
        Summary {
            trades: 0,
            expectancy_r: 0.0,
            winrate: 0.0,
            profit_factor_r: None,
            avg_r: 0.0,
            avg_win_r: 0.0,
            avg_loss_r: 0.0,
            best_trade_r: 0.0,
            worst_trade_r: 0.0,
            rr_distribution: RR_BUCKETS
                .iter()
                .map(|(label, _, _)| RrBucket {
                    label: (*label).to_string(),
                    count: 0,
                })
                .collect(),
        }
    }
}

/// Computes [`Summary`] over net (cost-adjusted) R-multiples.
pub fn summarize(trades: &[Trade]) -> Summary {
    let mut summary = Summary::empty();
    if trades.is_empty() {
        return summary;
    }

    let n = trades.len();
    let mut wins = 0usize;
    let mut win_sum = 0.0;
    let mut loss_sum = 0.0; // absolute
    let mut losses = 0usize;
    let mut total = 0.0;
    let mut best = f64::NEG_INFINITY;
    let mut worst = f64::INFINITY;

    for trade in trades {
        let r = trade.r;
        total += r;
        best = best.max(r);
        worst = worst.min(r);
        if r > 0.0 {
            wins += 1;
            win_sum += r;
        } else if r < 0.0 {
            losses += 1;
            loss_sum += r.abs();
        }

        for (i, (_, lo, hi)) in RR_BUCKETS.iter().enumerate() {
            // Bands are half-open (lo, hi]; the top band is unbounded.
            if r > *lo && r <= *hi {
                summary.rr_distribution[i].count += 1;
                break;
            }
        }
    }

    summary.trades = n;
    summary.expectancy_r = total / n as f64;
    summary.avg_r = summary.expectancy_r;
    summary.winrate = wins as f64 / n as f64;
    summary.profit_factor_r = if loss_sum > 0.0 {
        Some(win_sum / loss_sum)
    } else {
        None
    };
    summary.avg_win_r = if wins > 0 { win_sum / wins as f64 } else { 0.0 };
    summary.avg_loss_r = if losses > 0 {
        loss_sum / losses as f64
    } else {
        0.0
    };
    summary.best_trade_r = best;
    summary.worst_trade_r = worst;
    summary
}
