// src/config/mod.rs
//! Configuration for the filter chain, spectral estimator and feature engine

pub mod constants;
pub mod loader;
pub mod pipeline_config;

pub use constants::*;
pub use loader::{ConfigError, ConfigLoader};
pub use pipeline_config::*;
