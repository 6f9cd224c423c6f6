//! emg-features: surface EMG preprocessing and feature extraction
//!
//! Each channel of a recording runs through a fixed filter chain (powerline
//! notch, Butterworth bandpass, rectification, artifact screening, gap
//! filling and smoothing). The smoothed series feeds the time-domain
//! features; a Welch PSD of the band-limited series feeds the spectral
//! features. Missing samples are NaN throughout and missing feature values
//! are `None`.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use emg_features::{BatchProcessor, PipelineConfig, Recording};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let processor = BatchProcessor::new(PipelineConfig::default())?;
//!
//!     let samples: Vec<f64> = (0..4000).map(|i| (i as f64 * 0.25).sin()).collect();
//!     let recording = Recording::new("trial_01", 2000.0).with_channel("EMG1", samples);
//!
//!     let report = processor.run(&[recording])?;
//!     println!("{:?}", report.table.columns());
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod batch;
pub mod config;
pub mod error;
pub mod processing;
pub mod utils;

pub use batch::{BatchProcessor, BatchReport, CancellationToken, FailurePolicy, FeatureTable};
pub use config::{ConfigLoader, PipelineConfig};
pub use error::{EmgError, EmgResult, ErrorKind};
pub use processing::{
    ChannelFeatures, ChannelSeries, FeatureTag, FeatureVector, FilterChain, Recording, StageName, MISSING,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn version_info() -> VersionInfo {
    VersionInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: "Surface EMG preprocessing and feature extraction".to_string(),
        stages: StageName::ALL.iter().map(|s| s.as_str().to_string()).collect(),
        feature_count: FeatureTag::ALL.len(),
    }
}

/// Library version information
#[derive(Debug, Clone)]
pub struct VersionInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    /// Named stage outputs, in chain order
    pub stages: Vec<String>,
    /// Features computed per channel
    pub feature_count: usize,
}
