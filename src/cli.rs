//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_positions_adapter::JsonPositionsAdapter;
use crate::adapters::json_report_adapter::JsonReportAdapter;
use crate::domain::aggregate::run_many;
use crate::domain::config::{resolve_manage_config, resolve_sim_config};
use crate::domain::error::SwingsimError;
use crate::domain::manage::{suggest, PositionUpdate};
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::universe::{check_universe, parse_tickers};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::positions_port::PositionsPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "swingsim", about = "Swing-trade simulator and stop manager")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a multi-ticker backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        ticker: Option<String>,
        #[arg(long)]
        sequential: bool,
        #[arg(long)]
        dry_run: bool,
    },
    /// Evaluate stop suggestions for open positions
    Manage {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        positions: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List tickers available in the data directory
    ListTickers {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show data range for ticker(s)
    Info {
        #[arg(long)]
        ticker: Option<String>,
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            output,
            ticker,
            sequential,
            dry_run,
        } => {
            if dry_run {
                run_dry_run(&config)
            } else {
                run_backtest(&config, output.as_ref(), ticker.as_deref(), sequential)
            }
        }
        Command::Manage {
            config,
            positions,
            output,
        } => run_manage(&config, positions.as_ref(), output.as_ref()),
        Command::ListTickers { config } => run_list_tickers(&config),
        Command::Validate { config } => run_validate(&config),
        Command::Info { ticker, config } => run_info(ticker.as_deref(), &config),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = SwingsimError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn parse_config_date(
    adapter: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<NaiveDate, SwingsimError> {
    let raw = adapter
        .get_string(section, key)
        .ok_or_else(|| SwingsimError::ConfigMissing {
            section: section.into(),
            key: key.into(),
        })?;
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|_| SwingsimError::ConfigInvalid {
        section: section.into(),
        key: key.into(),
        reason: "invalid date format (expected YYYY-MM-DD)".into(),
    })
}

fn build_data_adapter(adapter: &dyn ConfigPort) -> Result<CsvAdapter, SwingsimError> {
    let dir = adapter
        .get_string("data", "csv_dir")
        .ok_or_else(|| SwingsimError::ConfigMissing {
            section: "data".into(),
            key: "csv_dir".into(),
        })?;
    Ok(CsvAdapter::new(PathBuf::from(dir)))
}

pub fn resolve_universe_tickers(
    ticker_override: Option<&str>,
    config: &dyn ConfigPort,
) -> Vec<String> {
    if let Some(t) = ticker_override {
        return vec![t.to_uppercase()];
    }

    if let Some(tickers_str) = config.get_string("backtest", "tickers") {
        return tickers_str
            .split(',')
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect();
    }

    if let Some(ticker) = config.get_string("backtest", "ticker") {
        let ticker = ticker.trim().to_uppercase();
        if !ticker.is_empty() {
            return vec![ticker];
        }
    }

    vec![]
}

/// The `--sequential` flag always forces a serial run; otherwise the
/// `[backtest] parallel` key decides, defaulting to parallel.
pub fn resolve_parallel(sequential_flag: bool, config: &dyn ConfigPort) -> bool {
    !sequential_flag && config.get_bool("backtest", "parallel", true)
}

fn run_backtest(
    config_path: &PathBuf,
    output_path: Option<&PathBuf>,
    ticker_override: Option<&str>,
    sequential: bool,
) -> ExitCode {
    // Stage 1: Load and resolve config
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let sim_config = match resolve_sim_config(&adapter) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let (start_date, end_date) =
        match parse_config_date(&adapter, "backtest", "start_date").and_then(|start| {
            let end = parse_config_date(&adapter, "backtest", "end_date")?;
            Ok((start, end))
        }) {
            Ok(dates) => dates,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        };

    // Stage 2: Resolve tickers
    let tickers = resolve_universe_tickers(ticker_override, &adapter);
    if tickers.is_empty() {
        eprintln!("error: no tickers configured");
        return ExitCode::from(2);
    }

    // Stage 3: Validate universe against data
    let data_port = match build_data_adapter(&adapter) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    eprintln!("Validating {} tickers...", tickers.len());
    let check = check_universe(
        &data_port,
        &tickers,
        start_date,
        end_date,
        sim_config.entry.min_history,
    );
    let mut skip_warnings = check.warnings;

    // Stage 4: Fetch data
    let mut data: HashMap<String, Vec<OhlcvBar>> = HashMap::new();
    let mut run_tickers: Vec<String> = Vec::new();
    for ticker in &check.tickers {
        match data_port.fetch_ohlcv(ticker, start_date, end_date) {
            Ok(bars) => {
                data.insert(ticker.clone(), bars);
                run_tickers.push(ticker.clone());
            }
            Err(e) => skip_warnings.push(format!("{ticker}: skipped ({e})")),
        }
    }

    // Stage 5: Run simulation. Skips are carried as warnings on the
    // result, so a partially usable universe still produces a report.
    let parallel = resolve_parallel(sequential, &adapter);
    eprintln!(
        "Running simulation: {} tickers, {} to {}",
        data.len(),
        start_date,
        end_date,
    );
    let mut result = run_many(&data, &run_tickers, &sim_config, parallel, None);
    skip_warnings.append(&mut result.warnings);
    result.warnings = skip_warnings;

    // Stage 6: Print console summary to stderr
    let summary = &result.summary;
    eprintln!("\n=== Aggregate Results ===");
    eprintln!("Trades:           {}", summary.trades);
    eprintln!("Expectancy:       {:+.3} R", summary.expectancy_r);
    eprintln!("Win Rate:         {:.1}%", summary.winrate * 100.0);
    match summary.profit_factor_r {
        Some(pf) => eprintln!("Profit Factor:    {:.2}", pf),
        None => eprintln!("Profit Factor:    n/a"),
    }
    eprintln!("Max Drawdown:     {:.2} R", result.max_drawdown_r);
    eprintln!(
        "Cumulative:       {:+.2} R",
        result.equity_curve.last().map(|p| p.cum_r).unwrap_or(0.0)
    );

    if !result.per_ticker_curves.is_empty() {
        eprintln!("\n=== Per-Ticker Summary ===");
        for (ticker, curve) in &result.per_ticker_curves {
            let trades = result.trades.iter().filter(|t| &t.ticker == ticker).count();
            let cum = curve.last().map(|p| p.cum_r).unwrap_or(0.0);
            eprintln!("  {}:  {} trades, {:+.2} R", ticker, trades, cum);
        }
    }

    for warning in &result.warnings {
        eprintln!("warning: {}", warning);
    }

    // Stage 7: Write report
    if let Some(output) = output_path {
        let report_port = JsonReportAdapter::new();
        match report_port.write_backtest(&result, &output.display().to_string()) {
            Ok(()) => eprintln!("\nReport written to: {}", output.display()),
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        }
    }

    ExitCode::SUCCESS
}

fn run_manage(
    config_path: &PathBuf,
    positions_override: Option<&PathBuf>,
    output_path: Option<&PathBuf>,
) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let sim_config = match resolve_sim_config(&adapter) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let manage_config = match resolve_manage_config(&adapter, &sim_config.exit) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let positions_path = match positions_override {
        Some(p) => p.clone(),
        None => match adapter.get_string("manage", "positions_file") {
            Some(p) => PathBuf::from(p),
            None => {
                let err = SwingsimError::ConfigMissing {
                    section: "manage".into(),
                    key: "positions_file".into(),
                };
                eprintln!("error: {err}");
                return (&err).into();
            }
        },
    };

    let positions_port = JsonPositionsAdapter::new(positions_path);
    let positions = match positions_port.load_positions() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    if positions.is_empty() {
        eprintln!("No open positions");
        return ExitCode::SUCCESS;
    }

    let data_port = match build_data_adapter(&adapter) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    eprintln!("Evaluating {} open positions...", positions.len());
    let mut updates: Vec<PositionUpdate> = Vec::new();

    for position in &positions {
        let bars = match data_port.fetch_ohlcv(&position.ticker, position.entry_date, NaiveDate::MAX)
        {
            Ok(bars) => bars,
            Err(e) => {
                eprintln!("warning: skipping {} ({})", position.ticker, e);
                continue;
            }
        };

        match suggest(position, &bars, &manage_config) {
            Ok(update) => {
                eprintln!(
                    "  {}: {} (stop {:.2} -> {:.2}, R {:+.2}) {}",
                    update.ticker,
                    update.action,
                    update.stop_old,
                    update.stop_suggested,
                    update.r_now,
                    update.reason,
                );
                updates.push(update);
            }
            Err(reason) => {
                eprintln!("warning: skipping {} ({})", position.ticker, reason);
            }
        }
    }

    if updates.is_empty() {
        eprintln!("error: no positions could be evaluated");
        return ExitCode::from(4);
    }

    if let Some(output) = output_path {
        let report_port = JsonReportAdapter::new();
        match report_port.write_updates(&updates, &output.display().to_string()) {
            Ok(()) => eprintln!("\nUpdates written to: {}", output.display()),
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        }
    }

    ExitCode::SUCCESS
}

pub fn run_dry_run(config_path: &PathBuf) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let sim_config = match resolve_sim_config(&adapter) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    eprintln!("Config validated successfully");

    eprintln!("\nResolved strategy:");
    eprintln!("  entry_type: {:?}", sim_config.entry.entry_type);
    eprintln!("  exit_mode:  {:?}", sim_config.exit.exit_mode);
    eprintln!("  k_atr:      {}", sim_config.exit.k_atr);

    let tickers_str = adapter
        .get_string("backtest", "tickers")
        .or_else(|| adapter.get_string("backtest", "ticker"));

    eprintln!("\nUniverse:");
    match tickers_str {
        Some(tickers) => match parse_tickers(&tickers) {
            Ok(parsed) => {
                eprintln!("  tickers: {}", parsed.join(", "));
            }
            Err(e) => {
                eprintln!("error: failed to parse tickers: {e}");
                return ExitCode::from(2);
            }
        },
        None => {
            eprintln!("error: no tickers configured");
            return ExitCode::from(2);
        }
    }

    eprintln!("\nDry run complete: configuration is valid");
    ExitCode::SUCCESS
}

fn run_list_tickers(config_path: &PathBuf) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let adapter = match build_data_adapter(&config) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let tickers = match adapter.list_tickers() {
        Ok(t) => t,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    if tickers.is_empty() {
        eprintln!("No tickers found");
    } else {
        for ticker in &tickers {
            println!("{}", ticker);
        }
        eprintln!("{} tickers found", tickers.len());
    }
    ExitCode::SUCCESS
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let sim_config = match resolve_sim_config(&adapter) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let manage_config = match resolve_manage_config(&adapter, &sim_config.exit) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    eprintln!("\nEntry:");
    eprintln!("  entry_type:        {:?}", sim_config.entry.entry_type);
    eprintln!("  breakout_lookback: {}", sim_config.entry.breakout_lookback);
    eprintln!("  pullback_ma:       {}", sim_config.entry.pullback_ma);
    eprintln!("  atr_window:        {}", sim_config.entry.atr_window);
    eprintln!("  min_history:       {}", sim_config.entry.min_history);

    eprintln!("\nExit:");
    eprintln!("  exit_mode:         {:?}", sim_config.exit.exit_mode);
    eprintln!("  k_atr:             {}", sim_config.exit.k_atr);
    eprintln!("  take_profit_r:     {}", sim_config.exit.take_profit_r);
    eprintln!("  breakeven_at_r:    {}", sim_config.exit.breakeven_at_r);
    eprintln!("  trail_after_r:     {}", sim_config.exit.trail_after_r);
    eprintln!("  trail_sma:         {}", sim_config.exit.trail_sma);
    eprintln!("  sma_buffer_pct:    {}", sim_config.exit.sma_buffer_pct);
    eprintln!("  max_holding_days:  {}", sim_config.exit.max_holding_days);

    eprintln!("\nCosts:");
    eprintln!("  commission_pct:    {}", sim_config.costs.commission_pct);
    eprintln!("  slippage_bps:      {}", sim_config.costs.slippage_bps);
    eprintln!("  fx_pct:            {}", sim_config.costs.fx_pct);

    eprintln!("\nManage:");
    eprintln!("  breakeven_at_r:    {}", manage_config.breakeven_at_r);
    eprintln!("  trail_after_r:     {}", manage_config.trail_after_r);
    eprintln!("  trail_sma:         {}", manage_config.trail_sma);
    eprintln!("  max_holding_days:  {}", manage_config.max_holding_days);

    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}

fn run_info(ticker: Option<&str>, config_path: &PathBuf) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let adapter = match build_data_adapter(&config) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let tickers = resolve_universe_tickers(ticker, &config);
    if tickers.is_empty() {
        eprintln!("error: no tickers configured (use --ticker or set in config)");
        return ExitCode::from(2);
    }

    for t in &tickers {
        match adapter.get_data_range(t) {
            Ok(Some((min_date, max_date, count))) => {
                println!("{}: {} bars, {} to {}", t, count, min_date, max_date);
            }
            Ok(None) => {
                eprintln!("{}: no data found", t);
            }
            Err(e) => {
                eprintln!("error querying {}: {}", t, e);
            }
        }
    }
    ExitCode::SUCCESS
}
