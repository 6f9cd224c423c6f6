// src/processing/filters/bandpass.rs
//! Butterworth bandpass stage

use tracing::debug;

use super::iir::SosFilter;
use super::zero_phase::filtfilt_gapped;
use crate::config::BandpassConfig;
use crate::error::EmgResult;
use crate::processing::stage::{FilterStage, StageOutcome};
use crate::processing::types::{ChannelSeries, StageName};

#[derive(Debug, Clone)]
pub struct BandpassStage {
    config: BandpassConfig,
    filter: SosFilter,
}

impl BandpassStage {
    pub fn new(config: &BandpassConfig, sample_rate: f64) -> EmgResult<Self> {
        let filter = SosFilter::butterworth_bandpass(config.order, config.low_hz, config.high_hz, sample_rate)?;
        Ok(Self { config: *config, filter })
    }

    pub fn filter(&self) -> &SosFilter {
        &self.filter
    }
}

impl FilterStage for BandpassStage {
    fn name(&self) -> StageName {
        StageName::Bandpass
    }

    fn apply(&self, input: &ChannelSeries) -> EmgResult<StageOutcome> {
        let samples = filtfilt_gapped(&self.filter, &input.samples);
        debug!(
            channel = %input.name,
            low_hz = self.config.low_hz,
            high_hz = self.config.high_hz,
            order = self.config.order,
            "bandpass applied"
        );
        Ok(StageOutcome::plain(input.with_samples(samples)))
    }
}
