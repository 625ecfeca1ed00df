pub mod banner;
pub mod cli;
pub mod config;
pub mod error;
pub mod metrics;
pub mod signal;
pub mod status;
pub mod supervisor;
