//! Trade cost model: commission, slippage, and FX in R-units.

use crate::domain::config::CostConfig;

/// Round-trip cost of a closed trade, expressed as an R-multiple.
///
/// Commission and slippage apply to both the entry and exit notional; FX
/// conversion applies to the exit notional only. The gross cost is divided
/// by the dollar risk taken (`initial_risk * shares`) so it subtracts
/// directly from the gross R-multiple.
///
/// Pure and deterministic. Non-finite or degenerate inputs clamp to zero
/// cost with a warning string so a bad position record can never poison the
/// simulation loop.
pub fn cost_in_r(
    entry_price: f64,
    exit_price: f64,
    shares: f64,
    initial_risk: f64,
    config: &CostConfig,
) -> (f64, Option<String>) {
    let inputs = [entry_price, exit_price, shares, initial_risk];
    if inputs.iter().any(|v| !v.is_finite()) {
        return (
            0.0,
            Some(format!(
                "non-finite cost input (entry={entry_price}, exit={exit_price}, \
                 shares={shares}, risk={initial_risk}); cost clamped to zero"
            )),
        );
    }

    let risk_dollars = initial_risk * shares;
    if risk_dollars <= 0.0 {
        return (
            0.0,
            Some(format!(
                "degenerate dollar risk {risk_dollars}; cost clamped to zero"
            )),
        );
    }

    let entry_notional = entry_price * shares;
    let exit_notional = exit_price * shares;
    let round_trip = entry_notional + exit_notional;

    let commission = config.commission_pct * round_trip;
    let slippage = config.slippage_bps / 10_000.0 * round_trip;
    let fx = config.fx_pct * exit_notional;

    ((commission + slippage + fx) / risk_dollars, None)
}
