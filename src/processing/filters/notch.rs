// src/processing/filters/notch.rs
//! Powerline interference removal

use tracing::debug;

use super::iir::SosFilter;
use super::zero_phase::filtfilt_gapped;
use crate::config::NotchConfig;
use crate::error::EmgResult;
use crate::processing::stage::{FilterStage, StageOutcome};
use crate::processing::types::{ChannelSeries, StageName};

/// Cascade of zero-phase notches, applied in configuration order
#[derive(Debug, Clone)]
pub struct NotchStage {
    notches: Vec<(f64, SosFilter)>,
}

impl NotchStage {
    pub fn new(config: &NotchConfig, sample_rate: f64) -> EmgResult<Self> {
        let notches = config
            .notches
            .iter()
            .map(|spec| Ok((spec.frequency_hz, SosFilter::notch(spec.frequency_hz, spec.q_factor, sample_rate)?)))
            .collect::<EmgResult<Vec<_>>>()?;
        Ok(Self { notches })
    }

    pub fn frequencies(&self) -> impl Iterator<Item = f64> + '_ {
        self.notches.iter().map(|(f0, _)| *f0)
    }
}

impl FilterStage for NotchStage {
    fn name(&self) -> StageName {
        StageName::Notch
    }

    fn apply(&self, input: &ChannelSeries) -> EmgResult<StageOutcome> {
        let mut samples = input.samples.clone();
        for (f0, filter) in &self.notches {
            samples = filtfilt_gapped(filter, &samples);
            debug!(channel = %input.name, f0, "notch applied");
        }
        Ok(StageOutcome::plain(input.with_samples(samples)))
    }
}
