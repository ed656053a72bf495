pub mod api;
pub mod browser;
pub mod check;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod runner;
pub mod task;
