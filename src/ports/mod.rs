//! Port traits decoupling the domain from its collaborators.

pub mod config_port;
pub mod data_port;
pub mod positions_port;
pub mod report_port;
