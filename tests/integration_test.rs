//! Integration tests for the simulation pipeline.
//!
//! Tests cover:
//! - Universe checks with a mock data port (configurable floor, skips as warnings)
//! - Full backtest pipeline: fetch, simulate, aggregate, summarize
//! - Aggregation equality: multi-ticker trades match solo runs
//! - Config resolution from real INI files on disk
//! - Live management pipeline: positions JSON in, updates out
//! - JSON report output shape

mod common;

use approx::assert_relative_eq;
use common::*;
use std::collections::HashMap;
use std::io::Write;
use swingsim::adapters::file_config_adapter::FileConfigAdapter;
use swingsim::adapters::json_positions_adapter::JsonPositionsAdapter;
use swingsim::adapters::json_report_adapter::JsonReportAdapter;
use swingsim::cli::resolve_universe_tickers;
use swingsim::domain::aggregate::run_many;
use swingsim::domain::config::{resolve_manage_config, resolve_sim_config, EntryType, ExitMode};
use swingsim::domain::driver::run_ticker;
use swingsim::domain::manage::{suggest, PositionAction};
use swingsim::domain::trade::ExitReason;
use swingsim::domain::universe::check_universe;
use swingsim::ports::data_port::DataPort;
use swingsim::ports::positions_port::PositionsPort;
use swingsim::ports::report_port::ReportPort;

fn write_temp_file(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

const VALID_INI: &str = r#"
[data]
csv_dir = /tmp/bars

[backtest]
start_date = 2024-01-01
end_date = 2024-12-31
tickers = BHP,CBA,WBC

[entry]
entry_type = breakout
breakout_lookback = 20
atr_window = 14
min_history = 30

[exit]
exit_mode = trailing_stop
k_atr = 2.0
breakeven_at_r = 1.0
trail_after_r = 1.5
trail_sma = 20
sma_buffer_pct = 0.01
max_holding_days = 40

[costs]
commission_pct = 0.001
slippage_bps = 5
fx_pct = 0.0

[manage]
max_holding_days = 60
positions_file = /tmp/positions.json
"#;

mod universe_validation {
    use super::*;

    #[test]
    fn thin_tickers_skipped_others_proceed() {
        let port = MockDataPort::new()
            .with_bars("BHP", generate_flat_bars("BHP", 50, 100.0))
            .with_bars("CBA", generate_flat_bars("CBA", 5, 50.0));

        let check = check_universe(
            &port,
            &["BHP".to_string(), "CBA".to_string()],
            date(2024, 1, 1),
            date(2024, 12, 31),
            30,
        );

        assert_eq!(check.tickers, vec!["BHP"]);
        assert_eq!(check.warnings.len(), 1);
        assert!(check.warnings[0].contains("only 5 bars"));
    }

    #[test]
    fn floor_follows_configured_min_history() {
        // 20 bars is plenty when the strategy only needs 5 of history
        let port = MockDataPort::new().with_bars("BHP", generate_flat_bars("BHP", 20, 100.0));

        let check = check_universe(
            &port,
            &["BHP".to_string()],
            date(2024, 1, 1),
            date(2024, 12, 31),
            5,
        );

        assert_eq!(check.tickers, vec!["BHP"]);
        assert!(check.warnings.is_empty());
    }

    #[test]
    fn fetch_error_becomes_skip() {
        let port = MockDataPort::new()
            .with_bars("BHP", generate_flat_bars("BHP", 50, 100.0))
            .with_error("CBA", "file corrupt");

        let check = check_universe(
            &port,
            &["BHP".to_string(), "CBA".to_string()],
            date(2024, 1, 1),
            date(2024, 12, 31),
            30,
        );

        assert_eq!(check.tickers, vec!["BHP"]);
        assert!(check.warnings[0].contains("file corrupt"));
    }

    #[test]
    fn all_tickers_failing_leaves_explained_empty_universe() {
        let port = MockDataPort::new().with_error("BHP", "unavailable");

        let check = check_universe(
            &port,
            &["BHP".to_string()],
            date(2024, 1, 1),
            date(2024, 12, 31),
            30,
        );

        assert!(check.tickers.is_empty());
        assert_eq!(check.warnings.len(), 1);
        assert!(check.warnings[0].contains("BHP"));
    }

    #[test]
    fn skip_warnings_travel_with_the_result() {
        // A thin ticker must not abort the run; its skip reason rides on
        // the surviving tickers' result as a warning.
        let port = MockDataPort::new()
            .with_bars("BHP", breakout_then_bust("BHP"))
            .with_bars("CBA", generate_flat_bars("CBA", 3, 50.0));

        let check = check_universe(
            &port,
            &["BHP".to_string(), "CBA".to_string()],
            date(2024, 1, 1),
            date(2024, 12, 31),
            5,
        );
        assert_eq!(check.tickers, vec!["BHP"]);

        let mut data = HashMap::new();
        for ticker in &check.tickers {
            let bars = port
                .fetch_ohlcv(ticker, date(2024, 1, 1), date(2024, 12, 31))
                .unwrap();
            data.insert(ticker.clone(), bars);
        }

        let mut result = run_many(&data, &check.tickers, &small_sim_config(), false, None);
        let mut warnings = check.warnings;
        warnings.append(&mut result.warnings);
        result.warnings = warnings;

        assert_eq!(result.trades.len(), 1);
        assert!(result.warnings.iter().any(|w| w.contains("CBA")));
    }
}

mod full_pipeline {
    use super::*;

    #[test]
    fn known_breakout_produces_one_losing_trade() {
        let port = MockDataPort::new().with_bars("BHP", breakout_then_bust("BHP"));
        let bars = port
            .fetch_ohlcv("BHP", date(2024, 1, 1), date(2024, 12, 31))
            .unwrap();

        let run = run_ticker(&bars, "BHP", &small_sim_config());

        assert_eq!(run.trades.len(), 1);
        let trade = &run.trades[0];
        assert_eq!(trade.entry_date, date(2024, 1, 13));
        assert_eq!(trade.exit_date, date(2024, 1, 14));
        assert_eq!(trade.exit_reason, ExitReason::StopHit);
        // Stop-hit fill at the initial stop is exactly -1R before costs.
        assert_relative_eq!(trade.r_gross, -1.0, epsilon = 1e-9);
        assert_relative_eq!(trade.r, trade.r_gross, epsilon = 1e-9);
    }

    #[test]
    fn aggregate_matches_solo_runs_and_summarizes() {
        let mut data = HashMap::new();
        data.insert("BHP".to_string(), breakout_then_bust("BHP"));
        data.insert("CBA".to_string(), breakout_then_bust("CBA"));
        let config = small_sim_config();

        let result = run_many(
            &data,
            &["BHP".to_string(), "CBA".to_string()],
            &config,
            true,
            None,
        );

        assert_eq!(result.trades.len(), 2);
        for ticker in ["BHP", "CBA"] {
            let solo = run_ticker(&data[ticker], ticker, &config);
            let own: Vec<_> = result
                .trades
                .iter()
                .filter(|t| t.ticker == ticker)
                .cloned()
                .collect();
            assert_eq!(own, solo.trades);
        }

        assert_eq!(result.summary.trades, 2);
        assert!((result.summary.winrate - 0.0).abs() < f64::EPSILON);
        assert!(result.summary.expectancy_r < 0.0);
        assert!(result.max_drawdown_r <= -2.0 + 1e-9);
    }

    #[test]
    fn missing_and_present_tickers_yield_partial_result() {
        let mut data = HashMap::new();
        data.insert("BHP".to_string(), breakout_then_bust("BHP"));

        let result = run_many(
            &data,
            &["BHP".to_string(), "GHOST".to_string()],
            &small_sim_config(),
            false,
            None,
        );

        assert_eq!(result.trades.len(), 1);
        assert!(result.warnings.iter().any(|w| w.contains("GHOST")));
    }
}

mod config_resolution {
    use super::*;

    #[test]
    fn valid_ini_resolves_end_to_end() {
        let file = write_temp_file(VALID_INI);
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();

        let sim = resolve_sim_config(&adapter).unwrap();
        assert_eq!(sim.entry.entry_type, EntryType::Breakout);
        assert_eq!(sim.entry.breakout_lookback, 20);
        assert_eq!(sim.exit.exit_mode, ExitMode::TrailingStop);
        assert_eq!(sim.exit.max_holding_days, 40);
        assert_eq!(sim.costs.slippage_bps, 5.0);

        let manage = resolve_manage_config(&adapter, &sim.exit).unwrap();
        // [manage] overrides only what it names; the rest inherits [exit].
        assert_eq!(manage.max_holding_days, 60);
        assert_eq!(manage.trail_sma, 20);

        let tickers = resolve_universe_tickers(None, &adapter);
        assert_eq!(tickers, vec!["BHP", "CBA", "WBC"]);
    }

    #[test]
    fn invalid_value_is_rejected() {
        let file = write_temp_file("[exit]\nk_atr = -2.0\n");
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert!(resolve_sim_config(&adapter).is_err());
    }
}

mod manage_pipeline {
    use super::*;

    #[test]
    fn positions_json_to_updates() {
        let file = write_temp_file(
            r#"[
  {
    "ticker": "BHP",
    "entry_date": "2024-01-02",
    "entry_price": 100.0,
    "stop_price": 96.0,
    "shares": 50.0,
    "initial_risk": 4.0
  }
]"#,
        );
        let positions = JsonPositionsAdapter::new(file.path().to_path_buf())
            .load_positions()
            .unwrap();
        assert_eq!(positions.len(), 1);

        let ini = write_temp_file(VALID_INI);
        let adapter = FileConfigAdapter::from_file(ini.path()).unwrap();
        let sim = resolve_sim_config(&adapter).unwrap();
        let manage = resolve_manage_config(&adapter, &sim.exit).unwrap();

        // Close 104 => R = 1.0: breakeven raise to entry.
        let bars: Vec<OhlcvBar> = (0..25)
            .map(|d| make_bar("BHP", d, 103.0, 105.0, 102.0, 104.0))
            .collect();
        let update = suggest(&positions[0], &bars, &manage).unwrap();

        assert_eq!(update.action, PositionAction::MoveStopUp);
        assert!((update.stop_suggested - 100.0).abs() < f64::EPSILON);
    }
}

mod report_output {
    use super::*;

    #[test]
    fn backtest_report_round_trips_through_json() {
        let mut data = HashMap::new();
        data.insert("BHP".to_string(), breakout_then_bust("BHP"));
        let result = run_many(
            &data,
            &["BHP".to_string()],
            &small_sim_config(),
            false,
            None,
        );

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("result.json");
        JsonReportAdapter::new()
            .write_backtest(&result, path.to_str().unwrap())
            .unwrap();

        let parsed: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed["trades"].as_array().unwrap().len(), 1);
        assert_eq!(parsed["trades"][0]["exit_reason"], "STOP_HIT");
        assert_eq!(parsed["summary"]["trades"], 1);
        assert!(parsed["equity_curve"][0]["cum_r"].is_number());
    }
}
