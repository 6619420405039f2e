//! CLI command implementations.

pub mod check_config;
pub mod distance;
pub mod role;
pub mod run;
