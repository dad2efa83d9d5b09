//! Report generation port trait.

use crate::domain::aggregate::BacktestResult;
use crate::domain::error::SwingsimError;
use crate::domain::manage::PositionUpdate;

/// Port for writing simulation and management output.
pub trait ReportPort {
    fn write_backtest(
        &self,
        result: &BacktestResult,
        output_path: &str,
    ) -> Result<(), SwingsimError>;

    fn write_updates(
        &self,
        updates: &[PositionUpdate],
        output_path: &str,
    ) -> Result<(), SwingsimError>;
}
