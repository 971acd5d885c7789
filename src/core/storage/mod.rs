//! Persistent settings

mod config;

pub use config::ConfigStorage;
