//! Typed engine configuration, resolved and validated at the boundary.
//!
//! The core never reads ambient configuration: callers resolve INI (or any
//! other `ConfigPort` source) into these value objects once, and every engine
//! call receives them explicitly.

use crate::domain::error::SwingsimError;
use crate::ports::config_port::ConfigPort;

/// Which entry rule(s) the evaluator tries on each bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryType {
    /// Breakout first, then pullback; first match wins.
    Auto,
    Breakout,
    Pullback,
}

impl std::str::FromStr for EntryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(EntryType::Auto),
            "breakout" => Ok(EntryType::Breakout),
            "pullback" => Ok(EntryType::Pullback),
            other => Err(format!("unknown entry_type '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitMode {
    TakeProfit,
    TrailingStop,
}

impl std::str::FromStr for ExitMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "take_profit" => Ok(ExitMode::TakeProfit),
            "trailing_stop" => Ok(ExitMode::TrailingStop),
            other => Err(format!("unknown exit_mode '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntryConfig {
    pub entry_type: EntryType,
    pub breakout_lookback: usize,
    pub pullback_ma: usize,
    pub atr_window: usize,
    pub min_history: usize,
}

impl Default for EntryConfig {
    fn default() -> Self {
        EntryConfig {
            entry_type: EntryType::Auto,
            breakout_lookback: 20,
            pullback_ma: 20,
            atr_window: 14,
            min_history: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExitConfig {
    pub exit_mode: ExitMode,
    /// Initial stop distance in ATR units.
    pub k_atr: f64,
    /// Target in R, used only in `TakeProfit` mode.
    pub take_profit_r: f64,
    pub breakeven_at_r: f64,
    pub trail_after_r: f64,
    pub trail_sma: usize,
    pub sma_buffer_pct: f64,
    pub max_holding_days: usize,
}

impl Default for ExitConfig {
    fn default() -> Self {
        ExitConfig {
            exit_mode: ExitMode::TrailingStop,
            k_atr: 2.0,
            take_profit_r: 2.5,
            breakeven_at_r: 1.0,
            trail_after_r: 1.5,
            trail_sma: 20,
            sma_buffer_pct: 0.01,
            max_holding_days: 40,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CostConfig {
    /// Commission as a fraction of notional (0.001 = 0.1%).
    pub commission_pct: f64,
    /// Slippage in basis points of notional, both sides.
    pub slippage_bps: f64,
    /// FX conversion cost as a fraction of exit notional.
    pub fx_pct: f64,
}

impl Default for CostConfig {
    fn default() -> Self {
        CostConfig {
            commission_pct: 0.0,
            slippage_bps: 0.0,
            fx_pct: 0.0,
        }
    }
}

/// Stop-management parameters for live positions. Mirrors the trailing
/// fields of [`ExitConfig`] so open positions are managed by the same rules
/// the backtest simulated.
#[derive(Debug, Clone, PartialEq)]
pub struct ManageConfig {
    pub breakeven_at_r: f64,
    pub trail_after_r: f64,
    pub trail_sma: usize,
    pub sma_buffer_pct: f64,
    pub max_holding_days: usize,
}

impl ManageConfig {
    pub fn from_exit(exit: &ExitConfig) -> Self {
        ManageConfig {
            breakeven_at_r: exit.breakeven_at_r,
            trail_after_r: exit.trail_after_r,
            trail_sma: exit.trail_sma,
            sma_buffer_pct: exit.sma_buffer_pct,
            max_holding_days: exit.max_holding_days,
        }
    }
}

impl Default for ManageConfig {
    fn default() -> Self {
        ManageConfig::from_exit(&ExitConfig::default())
    }
}

/// Everything a single-ticker simulation needs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimConfig {
    pub entry: EntryConfig,
    pub exit: ExitConfig,
    pub costs: CostConfig,
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> SwingsimError {
    SwingsimError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn require_positive_int(
    cfg: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: usize,
) -> Result<usize, SwingsimError> {
    let value = cfg.get_int(section, key, default as i64);
    if value < 1 {
        return Err(invalid(section, key, "must be at least 1"));
    }
    Ok(value as usize)
}

pub fn resolve_entry_config(cfg: &dyn ConfigPort) -> Result<EntryConfig, SwingsimError> {
    let defaults = EntryConfig::default();

    let entry_type = match cfg.get_string("entry", "entry_type") {
        None => defaults.entry_type,
        Some(s) => s
            .parse()
            .map_err(|reason: String| invalid("entry", "entry_type", reason))?,
    };

    let breakout_lookback =
        require_positive_int(cfg, "entry", "breakout_lookback", defaults.breakout_lookback)?;
    let pullback_ma = require_positive_int(cfg, "entry", "pullback_ma", defaults.pullback_ma)?;
    let atr_window = require_positive_int(cfg, "entry", "atr_window", defaults.atr_window)?;
    let min_history = require_positive_int(cfg, "entry", "min_history", defaults.min_history)?;

    Ok(EntryConfig {
        entry_type,
        breakout_lookback,
        pullback_ma,
        atr_window,
        min_history,
    })
}

pub fn resolve_exit_config(cfg: &dyn ConfigPort) -> Result<ExitConfig, SwingsimError> {
    let defaults = ExitConfig::default();

    let exit_mode = match cfg.get_string("exit", "exit_mode") {
        None => defaults.exit_mode,
        Some(s) => s
            .parse()
            .map_err(|reason: String| invalid("exit", "exit_mode", reason))?,
    };

    let k_atr = cfg.get_double("exit", "k_atr", defaults.k_atr);
    if !(k_atr > 0.0) || !k_atr.is_finite() {
        return Err(invalid("exit", "k_atr", "must be positive and finite"));
    }

    let take_profit_r = cfg.get_double("exit", "take_profit_r", defaults.take_profit_r);
    if exit_mode == ExitMode::TakeProfit && !(take_profit_r > 0.0) {
        return Err(invalid(
            "exit",
            "take_profit_r",
            "must be positive in take_profit mode",
        ));
    }

    let breakeven_at_r = cfg.get_double("exit", "breakeven_at_r", defaults.breakeven_at_r);
    if breakeven_at_r < 0.0 {
        return Err(invalid("exit", "breakeven_at_r", "must be non-negative"));
    }

    let trail_after_r = cfg.get_double("exit", "trail_after_r", defaults.trail_after_r);
    if trail_after_r < 0.0 {
        return Err(invalid("exit", "trail_after_r", "must be non-negative"));
    }

    let trail_sma = require_positive_int(cfg, "exit", "trail_sma", defaults.trail_sma)?;

    let sma_buffer_pct = cfg.get_double("exit", "sma_buffer_pct", defaults.sma_buffer_pct);
    if !(0.0..1.0).contains(&sma_buffer_pct) {
        return Err(invalid("exit", "sma_buffer_pct", "must be in [0, 1)"));
    }

    let max_holding_days =
        require_positive_int(cfg, "exit", "max_holding_days", defaults.max_holding_days)?;

    Ok(ExitConfig {
        exit_mode,
        k_atr,
        take_profit_r,
        breakeven_at_r,
        trail_after_r,
        trail_sma,
        sma_buffer_pct,
        max_holding_days,
    })
}

pub fn resolve_cost_config(cfg: &dyn ConfigPort) -> Result<CostConfig, SwingsimError> {
    let defaults = CostConfig::default();

    let commission_pct = cfg.get_double("costs", "commission_pct", defaults.commission_pct);
    let slippage_bps = cfg.get_double("costs", "slippage_bps", defaults.slippage_bps);
    let fx_pct = cfg.get_double("costs", "fx_pct", defaults.fx_pct);

    for (key, value) in [
        ("commission_pct", commission_pct),
        ("slippage_bps", slippage_bps),
        ("fx_pct", fx_pct),
    ] {
        if value < 0.0 || !value.is_finite() {
            return Err(invalid("costs", key, "must be non-negative and finite"));
        }
    }

    Ok(CostConfig {
        commission_pct,
        slippage_bps,
        fx_pct,
    })
}

/// `[manage]` keys override the backtest `[exit]` values so live positions
/// default to the exact rules that were simulated.
pub fn resolve_manage_config(
    cfg: &dyn ConfigPort,
    exit: &ExitConfig,
) -> Result<ManageConfig, SwingsimError> {
    let breakeven_at_r = cfg.get_double("manage", "breakeven_at_r", exit.breakeven_at_r);
    if breakeven_at_r < 0.0 {
        return Err(invalid("manage", "breakeven_at_r", "must be non-negative"));
    }

    let trail_after_r = cfg.get_double("manage", "trail_after_r", exit.trail_after_r);
    if trail_after_r < 0.0 {
        return Err(invalid("manage", "trail_after_r", "must be non-negative"));
    }

    let trail_sma = require_positive_int(cfg, "manage", "trail_sma", exit.trail_sma)?;

    let sma_buffer_pct = cfg.get_double("manage", "sma_buffer_pct", exit.sma_buffer_pct);
    if !(0.0..1.0).contains(&sma_buffer_pct) {
        return Err(invalid("manage", "sma_buffer_pct", "must be in [0, 1)"));
    }

    let max_holding_days =
        require_positive_int(cfg, "manage", "max_holding_days", exit.max_holding_days)?;

    Ok(ManageConfig {
        breakeven_at_r,
        trail_after_r,
        trail_sma,
        sma_buffer_pct,
        max_holding_days,
    })
}

pub fn resolve_sim_config(cfg: &dyn ConfigPort) -> Result<SimConfig, SwingsimError> {
    Ok(SimConfig {
        entry: resolve_entry_config(cfg)?,
        exit: resolve_exit_config(cfg)?,
        costs: resolve_cost_config(cfg)?,
    })
}
