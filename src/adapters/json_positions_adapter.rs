//! JSON open-positions store adapter. Reads a flat JSON array of
//! position records.

use crate::domain::error::SwingsimError;
use crate::domain::manage::OpenPosition;
use crate::ports::positions_port::PositionsPort;
use std::fs;
use std::path::PathBuf;

pub struct JsonPositionsAdapter {
    path: PathBuf,
}

impl JsonPositionsAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl PositionsPort for JsonPositionsAdapter {
    fn load_positions(&self) -> Result<Vec<OpenPosition>, SwingsimError> {
        let content = fs::read_to_string(&self.path).map_err(|e| SwingsimError::Positions {
            reason: format!("failed to read {}: {}", self.path.display(), e),
        })?;

        serde_json::from_str(&content).map_err(|e| SwingsimError::Positions {
            reason: format!("invalid positions JSON in {}: {}", self.path.display(), e),
        })
    }
}
