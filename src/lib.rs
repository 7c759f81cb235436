pub mod agent;
pub mod config;
pub mod display;
pub mod export;
pub mod feed;
pub mod sink;
pub mod telemetry;
