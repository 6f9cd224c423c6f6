use std::sync::Arc;

use tracing::{debug, info, info_span};

use crate::config::PipelineConfig;
use crate::error::{EmgErrorBuilder, EmgResult};
use crate::processing::artifact::ArtifactStage;
use crate::processing::features::{FeatureExtractor, FeatureVector};
use crate::processing::filters::{BandpassStage, NotchStage};
use crate::processing::gap_fill::GapFillStage;
use crate::processing::rectify::RectifyStage;
use crate::processing::smoothing::SmoothStage;
use crate::processing::stage::FilterStage;
use crate::processing::types::{ChannelSeries, Recording, StageName, StageOutputs};

/// Preprocessing chain plus feature extraction for whole recordings
///
/// Stages run in the fixed order notch, bandpass, rectify, artifact
/// screen, gap fill, smooth. The bandpass output is also gap filled on
/// its own to give the band-limited series the spectral estimator reads.
/// The chain holds no per-channel state and can be shared across threads.
pub struct FilterChain {
    config: PipelineConfig,
    notch: Option<NotchStage>,
    bandpass: Option<BandpassStage>,
    rectify: RectifyStage,
    artifact: Option<ArtifactStage>,
    gap_fill: GapFillStage,
    smoothing: Option<SmoothStage>,
    extractor: FeatureExtractor,
}

/// Per-channel counts gathered while the chain runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelDiagnostics {
    /// Samples replaced by the artifact screen
    pub replaced_samples: usize,
    /// Samples interpolated by the gap filler on the time-domain path
    pub filled_samples: usize,
    /// Samples interpolated in the band-limited series
    pub band_limited_filled: usize,
    /// Samples still missing in the time-domain input after filling
    pub residual_missing: usize,
}

/// Every retained stage output for one channel
#[derive(Debug, Clone)]
pub struct ChannelRun {
    pub channel: String,
    pub outputs: StageOutputs,
    pub diagnostics: ChannelDiagnostics,
}

impl ChannelRun {
    /// Input to the time-domain features
    pub fn time_domain_input(&self) -> Option<&ChannelSeries> {
        self.outputs.get(StageName::Smoothed)
    }

    /// Input to the spectral estimator
    pub fn spectral_input(&self) -> Option<&ChannelSeries> {
        self.outputs.get(StageName::BandLimited)
    }
}

impl FilterChain {
    /// Validate the configuration and design every enabled stage
    pub fn new(config: PipelineConfig) -> EmgResult<Self> {
        config.validate()?;
        let fs = config.sample_rate_hz;

        let notch = config.notch.as_ref().map(|c| NotchStage::new(c, fs)).transpose()?;
        let bandpass = config.bandpass.as_ref().map(|c| BandpassStage::new(c, fs)).transpose()?;
        let artifact = config.artifact.as_ref().map(|c| ArtifactStage::new(c, fs));
        let gap_fill = GapFillStage::new(&config.gap_fill);
        let smoothing = config.smoothing.as_ref().map(|c| SmoothStage::new(c, fs));
        let extractor = FeatureExtractor::new(&config);

        info!(
            sample_rate_hz = fs,
            notch = notch.is_some(),
            bandpass = bandpass.is_some(),
            artifact = artifact.is_some(),
            smoothing = smoothing.is_some(),
            "filter chain configured"
        );

        Ok(Self {
            config,
            notch,
            bandpass,
            rectify: RectifyStage,
            artifact,
            gap_fill,
            smoothing,
            extractor,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage on one channel, keeping each output by name
    pub fn run_channel(&self, input: &ChannelSeries) -> EmgResult<ChannelRun> {
        let mut outputs = StageOutputs::new();
        let mut diagnostics = ChannelDiagnostics::default();

        let raw = Arc::new(input.clone());
        outputs.insert(StageName::Raw, raw.clone());

        let notched = run_stage(&mut outputs, StageName::Notch, self.notch.as_ref(), raw)?.0;
        let band = run_stage(&mut outputs, StageName::Bandpass, self.bandpass.as_ref(), notched)?.0;

        let (_, filled) = run_stage(&mut outputs, StageName::BandLimited, Some(&self.gap_fill), band.clone())?;
        diagnostics.band_limited_filled = filled;

        let rectified = run_stage(&mut outputs, StageName::Rectified, Some(&self.rectify), band)?.0;

        let (screened, replaced) = run_stage(&mut outputs, StageName::Screened, self.artifact.as_ref(), rectified)?;
        diagnostics.replaced_samples = replaced;

        let (filled_series, filled) = run_stage(&mut outputs, StageName::Filled, Some(&self.gap_fill), screened)?;
        diagnostics.filled_samples = filled;

        let (smoothed, _) = run_stage(&mut outputs, StageName::Smoothed, self.smoothing.as_ref(), filled_series)?;
        diagnostics.residual_missing = smoothed.missing_count();

        debug!(
            channel = %input.name,
            replaced = diagnostics.replaced_samples,
            filled = diagnostics.filled_samples,
            residual_missing = diagnostics.residual_missing,
            "channel processed"
        );

        Ok(ChannelRun {
            channel: input.name.clone(),
            outputs,
            diagnostics,
        })
    }

    /// Validate a recording, run the chain on every channel and extract features
    pub fn process_recording(&self, recording: &Recording) -> EmgResult<FeatureVector> {
        let span = info_span!("process_file", file_id = %recording.file_id);
        let _enter = span.enter();

        recording.validate()?;
        if (recording.sample_rate_hz - self.config.sample_rate_hz).abs() > f64::EPSILON * self.config.sample_rate_hz {
            return Err(EmgErrorBuilder::new("filter_chain", "process_recording")
                .data_mismatch(
                    "sampling rate differs from the configured filter design",
                    self.config.sample_rate_hz.to_string(),
                    recording.sample_rate_hz.to_string(),
                )
                .for_file(&recording.file_id));
        }

        let mut channels = Vec::with_capacity(recording.channels.len());
        for series in &recording.channels {
            let run = self.run_channel(series).map_err(|e| e.for_file(&recording.file_id))?;
            let features = match (run.time_domain_input(), run.spectral_input()) {
                (Some(time), Some(spectral)) => self.extractor.extract(time, spectral),
                _ => {
                    return Err(EmgErrorBuilder::new("filter_chain", "process_recording")
                        .data_format(format!("channel {} is missing a feature input stage", series.name))
                        .for_file(&recording.file_id))
                }
            };
            channels.push(features);
        }

        info!(channels = channels.len(), samples = recording.samples_per_channel(), "file processed");
        Ok(FeatureVector {
            file_id: recording.file_id.clone(),
            channels,
        })
    }
}

/// Apply `stage` (or alias the input when disabled) and record its output
fn run_stage<S: FilterStage>(
    outputs: &mut StageOutputs,
    key: StageName,
    stage: Option<&S>,
    input: Arc<ChannelSeries>,
) -> EmgResult<(Arc<ChannelSeries>, usize)> {
    let (series, altered) = match stage {
        Some(stage) => {
            let outcome = stage.apply(&input)?;
            (Arc::new(outcome.series), outcome.altered_samples)
        }
        None => (input, 0),
    };
    outputs.insert(key, series.clone());
    Ok((series, altered))
}
