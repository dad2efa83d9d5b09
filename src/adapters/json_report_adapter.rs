//! JSON report adapter. Serializes backtest results and position updates
//! as-is; field names match the domain structs.

use crate::domain::aggregate::BacktestResult;
use crate::domain::error::SwingsimError;
use crate::domain::manage::PositionUpdate;
use crate::ports::report_port::ReportPort;
use std::fs::File;
use std::io::BufWriter;

pub struct JsonReportAdapter;

impl JsonReportAdapter {
    pub fn new() -> Self {
        Self
    }

    fn write_json<T: serde::Serialize>(value: &T, output_path: &str) -> Result<(), SwingsimError> {
        let file = File::create(output_path).map_err(|e| SwingsimError::Report {
            reason: format!("failed to create {}: {}", output_path, e),
        })?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, value).map_err(|e| SwingsimError::Report {
            reason: format!("failed to serialize to {}: {}", output_path, e),
        })
    }
}

impl Default for JsonReportAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportPort for JsonReportAdapter {
    fn write_backtest(
        &self,
        result: &BacktestResult,
        output_path: &str,
    ) -> Result<(), SwingsimError> {
        Self::write_json(result, output_path)
    }

    fn write_updates(
        &self,
        updates: &[PositionUpdate],
        output_path: &str,
    ) -> Result<(), SwingsimError> {
        Self::write_json(&updates, output_path)
    }
}
