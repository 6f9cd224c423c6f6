// src/processing/stage.rs
//! Common interface of the filter stage library

use crate::error::EmgResult;
use crate::processing::types::{ChannelSeries, StageName};

/// Result of running one stage on one channel
#[derive(Debug, Clone, PartialEq)]
pub struct StageOutcome {
    pub series: ChannelSeries,
    /// Samples the stage replaced or filled (screening and gap filling)
    pub altered_samples: usize,
}

impl StageOutcome {
    pub fn plain(series: ChannelSeries) -> Self {
        Self { series, altered_samples: 0 }
    }
}

/// A pure transform from one channel series to another of equal length
///
/// Stages are designed for a fixed sampling rate at construction and hold no
/// per-channel state, so one instance may be shared by every channel and
/// every worker thread.
pub trait FilterStage: Send + Sync {
    fn name(&self) -> StageName;

    fn apply(&self, input: &ChannelSeries) -> EmgResult<StageOutcome>;
}

/// Odd, centred window length in samples for a window given in seconds
pub fn centred_window(window_s: f64, sample_rate_hz: f64) -> usize {
    let n = (window_s * sample_rate_hz).round().max(1.0) as usize;
    if n % 2 == 0 {
        n + 1
    } else {
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centred_window() {
        assert_eq!(centred_window(0.05, 2000.0), 101);
        assert_eq!(centred_window(0.001, 2000.0), 3);
        assert_eq!(centred_window(0.0001, 2000.0), 1);
        assert_eq!(centred_window(0.0, 2000.0), 1);
    }
}
