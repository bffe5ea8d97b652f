pub mod browser;
pub mod config;
pub mod engine;
pub mod network;
pub mod report;
pub mod runner;
pub mod types;
pub mod watcher;
