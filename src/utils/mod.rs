//! Common utility functions
//!
//! Missing-aware statistics shared by the artifact screen, the gap filler
//! and the feature extractor.

pub mod stats;

pub use stats::{linear_slope, mean, median, median_mad, variance};
