// src/processing/filters/mod.rs
//! Digital filters for the preprocessing chain
//!
//! Filter design lives in [`iir`]; [`zero_phase`] applies a designed cascade
//! forward and backward so the stage output carries no phase shift. The
//! notch and bandpass stages wrap both for use by the filter chain.

pub mod bandpass;
pub mod iir;
pub mod notch;
pub mod zero_phase;

pub use bandpass::BandpassStage;
pub use iir::{Biquad, SosFilter};
pub use notch::NotchStage;
pub use zero_phase::{filtfilt, filtfilt_gapped};

use thiserror::Error;

/// Filter design errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),
    #[error("Invalid coefficients: {0}")]
    InvalidCoefficients(String),
}
