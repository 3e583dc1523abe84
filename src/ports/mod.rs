//! Port traits implemented by the adapters.

pub mod config_port;
pub mod price_port;
pub mod score_port;
pub mod report_port;
