// src/config/constants.rs
//! Default parameters for the preprocessing chain and feature engine

/// Recording defaults
pub mod signal {
    pub const DEFAULT_SAMPLING_RATE_HZ: f64 = 2000.0;
    /// Relative tolerance on time column spacing
    pub const TIME_BASE_TOLERANCE: f64 = 1e-3;
    /// Allowed disagreement between the time column step and `1/fs`
    pub const SAMPLE_PERIOD_TOLERANCE: f64 = 0.01;
}

/// Filter design constants
pub mod filters {
    pub const POWERLINE_FREQ_50HZ: f64 = 50.0;
    pub const DEFAULT_NOTCH_Q: f64 = 5.0;
    pub const DEFAULT_BANDPASS_LOW_HZ: f64 = 20.0;
    pub const DEFAULT_BANDPASS_HIGH_HZ: f64 = 450.0;
    pub const DEFAULT_BANDPASS_ORDER: usize = 4;
    pub const MIN_FILTER_ORDER: usize = 1;
    pub const MAX_FILTER_ORDER: usize = 8;
    /// Padding multiplier used by zero-phase filtering (per section order)
    pub const PAD_MULTIPLIER: usize = 3;
}

/// Artifact screening constants
pub mod artifact {
    pub const DEFAULT_WINDOW_S: f64 = 0.05;
    pub const DEFAULT_N_SIGMA: f64 = 3.0;
    /// Consistency constant turning a MAD into a Gaussian sigma estimate
    pub const MAD_SCALE: f64 = 1.4826;
}

/// Gap filling constants
pub mod gap_fill {
    pub const DEFAULT_MAX_GAP_SAMPLES: usize = 5;
    /// Valid knots taken from each side of a run
    pub const BOUNDARY_KNOTS: usize = 2;
}

/// Smoothing constants
pub mod smoothing {
    pub const DEFAULT_WINDOW_S: f64 = 0.05;
    /// Gaussian sigma expressed as a fraction of the window length
    pub const GAUSSIAN_SIGMA_FRACTION: f64 = 1.0 / 6.0;
}

/// Spectral estimation constants
pub mod spectral {
    pub const DEFAULT_SEGMENT_S: f64 = 1.0;
    pub const DEFAULT_OVERLAP: f64 = 0.5;
}

/// Feature extraction constants
pub mod features {
    pub const DEFAULT_WAMP_THRESHOLD: f64 = 0.05;
    pub const DEFAULT_V_ORDER: u32 = 3;
    pub const DEFAULT_TWITCH_BOUNDARY_HZ: f64 = 60.0;
    pub const DEFAULT_ROLLOFF_FRACTION: f64 = 0.85;
    pub const TEMPORAL_MISSING_COLUMN: &str = "Temporal_PCT_Missing";
    pub const SPECTRAL_MISSING_COLUMN: &str = "Spectral_PCT_Missing";
    pub const FILE_ID_COLUMN: &str = "FileIdentifier";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_consistent() {
        assert!(filters::DEFAULT_BANDPASS_LOW_HZ < filters::DEFAULT_BANDPASS_HIGH_HZ);
        assert!(filters::DEFAULT_BANDPASS_HIGH_HZ < signal::DEFAULT_SAMPLING_RATE_HZ / 2.0);
        assert!((filters::MIN_FILTER_ORDER..=filters::MAX_FILTER_ORDER)
            .contains(&filters::DEFAULT_BANDPASS_ORDER));
        assert!(spectral::DEFAULT_OVERLAP > 0.0 && spectral::DEFAULT_OVERLAP < 1.0);
        assert!(features::DEFAULT_ROLLOFF_FRACTION > 0.0 && features::DEFAULT_ROLLOFF_FRACTION < 1.0);
    }
}
