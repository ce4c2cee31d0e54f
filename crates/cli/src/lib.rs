pub mod commands;
pub mod config;
pub mod logging;
pub mod provider;
pub mod units;
