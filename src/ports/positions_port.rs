//! Open-positions store port trait.

use crate::domain::error::SwingsimError;
use crate::domain::manage::OpenPosition;

/// Read-only access to the open positions under live management. The
/// engine never writes back; acting on suggestions is the caller's job.
pub trait PositionsPort {
    fn load_positions(&self) -> Result<Vec<OpenPosition>, SwingsimError>;
}
