// src/processing/rectify.rs
//! Full-wave rectification

use crate::error::EmgResult;
use crate::processing::stage::{FilterStage, StageOutcome};
use crate::processing::types::{ChannelSeries, StageName};

/// Elementwise absolute value; missing samples stay missing
#[derive(Debug, Clone, Copy, Default)]
pub struct RectifyStage;

impl FilterStage for RectifyStage {
    fn name(&self) -> StageName {
        StageName::Rectified
    }

    fn apply(&self, input: &ChannelSeries) -> EmgResult<StageOutcome> {
        let samples = input.samples.iter().map(|x| x.abs()).collect();
        Ok(StageOutcome::plain(input.with_samples(samples)))
    }
}
