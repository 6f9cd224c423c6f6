//! EMG feature extraction
//!
//! Features are a closed registry: each [`FeatureTag`] names one column and
//! is bound to a pure formula over either the time-domain stage output or
//! the Welch PSD of the band-limited signal.
//! - Time domain formulas live in [`time_domain`]
//! - Frequency domain formulas live in [`frequency`]

pub mod frequency;
pub mod time_domain;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::constants::features::{SPECTRAL_MISSING_COLUMN, TEMPORAL_MISSING_COLUMN};
use crate::config::{FeatureConfig, PipelineConfig};
use crate::processing::spectral::{Psd, WelchEstimator};
use crate::processing::types::ChannelSeries;

/// Which stage output a feature is computed from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureDomain {
    /// Rectified, gap-filled, smoothed series
    Time,
    /// PSD of the band-limited series
    Spectral,
}

/// Every feature the extractor produces, in column order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FeatureTag {
    Min,
    Max,
    Mean,
    Sd,
    Skew,
    Kurtosis,
    Iemg,
    Mav,
    Mmav1,
    Mmav2,
    Ssi,
    Var,
    VOrder,
    Rms,
    Wl,
    Wamp,
    Log,
    Mfl,
    Ap,
    MaxFreq,
    MeanFreq,
    MedianFreq,
    SpecCentroid,
    SpecFlatness,
    SpecEntropy,
    SpecRolloff,
    SpecBandwidth,
    SpecDecrease,
    SpecFlux,
    TotalPower,
    AveragePower,
    TwitchRatio,
    TwitchIndex,
    FastTwitchSlope,
    SlowTwitchSlope,
}

impl FeatureTag {
    pub const ALL: [FeatureTag; 35] = [
        FeatureTag::Min,
        FeatureTag::Max,
        FeatureTag::Mean,
        FeatureTag::Sd,
        FeatureTag::Skew,
        FeatureTag::Kurtosis,
        FeatureTag::Iemg,
        FeatureTag::Mav,
        FeatureTag::Mmav1,
        FeatureTag::Mmav2,
        FeatureTag::Ssi,
        FeatureTag::Var,
        FeatureTag::VOrder,
        FeatureTag::Rms,
        FeatureTag::Wl,
        FeatureTag::Wamp,
        FeatureTag::Log,
        FeatureTag::Mfl,
        FeatureTag::Ap,
        FeatureTag::MaxFreq,
        FeatureTag::MeanFreq,
        FeatureTag::MedianFreq,
        FeatureTag::SpecCentroid,
        FeatureTag::SpecFlatness,
        FeatureTag::SpecEntropy,
        FeatureTag::SpecRolloff,
        FeatureTag::SpecBandwidth,
        FeatureTag::SpecDecrease,
        FeatureTag::SpecFlux,
        FeatureTag::TotalPower,
        FeatureTag::AveragePower,
        FeatureTag::TwitchRatio,
        FeatureTag::TwitchIndex,
        FeatureTag::FastTwitchSlope,
        FeatureTag::SlowTwitchSlope,
    ];

    /// Column suffix, as in `<channel>_<name>`
    pub fn name(&self) -> &'static str {
        match self {
            FeatureTag::Min => "Min",
            FeatureTag::Max => "Max",
            FeatureTag::Mean => "Mean",
            FeatureTag::Sd => "SD",
            FeatureTag::Skew => "Skew",
            FeatureTag::Kurtosis => "Kurtosis",
            FeatureTag::Iemg => "IEMG",
            FeatureTag::Mav => "MAV",
            FeatureTag::Mmav1 => "MMAV1",
            FeatureTag::Mmav2 => "MMAV2",
            FeatureTag::Ssi => "SSI",
            FeatureTag::Var => "VAR",
            FeatureTag::VOrder => "VOrder",
            FeatureTag::Rms => "RMS",
            FeatureTag::Wl => "WL",
            FeatureTag::Wamp => "WAMP",
            FeatureTag::Log => "LOG",
            FeatureTag::Mfl => "MFL",
            FeatureTag::Ap => "AP",
            FeatureTag::MaxFreq => "Max_Freq",
            FeatureTag::MeanFreq => "Mean_Freq",
            FeatureTag::MedianFreq => "Median_Freq",
            FeatureTag::SpecCentroid => "Spec_Centroid",
            FeatureTag::SpecFlatness => "Spec_Flatness",
            FeatureTag::SpecEntropy => "Spec_Entropy",
            FeatureTag::SpecRolloff => "Spec_Rolloff",
            FeatureTag::SpecBandwidth => "Spec_Bandwidth",
            FeatureTag::SpecDecrease => "Spec_Decrease",
            FeatureTag::SpecFlux => "Spec_Flux",
            FeatureTag::TotalPower => "Total_Power",
            FeatureTag::AveragePower => "Average_Power",
            FeatureTag::TwitchRatio => "Twitch_Ratio",
            FeatureTag::TwitchIndex => "Twitch_Index",
            FeatureTag::FastTwitchSlope => "Fast_Twitch_Slope",
            FeatureTag::SlowTwitchSlope => "Slow_Twitch_Slope",
        }
    }

    pub fn domain(&self) -> FeatureDomain {
        if *self < FeatureTag::MaxFreq {
            FeatureDomain::Time
        } else {
            FeatureDomain::Spectral
        }
    }

    /// Evaluate this feature's formula on its stage input
    pub fn evaluate(&self, inputs: &FeatureInputs<'_>, params: &FeatureConfig) -> Option<f64> {
        use frequency as fd;
        use time_domain as td;

        let x = inputs.time;
        match self {
            FeatureTag::Min => td::min(x),
            FeatureTag::Max => td::max(x),
            FeatureTag::Mean => td::average(x),
            FeatureTag::Sd => td::standard_deviation(x),
            FeatureTag::Skew => td::skewness(x),
            FeatureTag::Kurtosis => td::kurtosis(x),
            FeatureTag::Iemg => td::iemg(x),
            FeatureTag::Mav => td::mav(x),
            FeatureTag::Mmav1 => td::mmav1(x),
            FeatureTag::Mmav2 => td::mmav2(x),
            FeatureTag::Ssi => td::ssi(x),
            FeatureTag::Var => td::emg_variance(x),
            FeatureTag::VOrder => td::v_order(x, params.v_order),
            FeatureTag::Rms => td::rms(x),
            FeatureTag::Wl => td::waveform_length(x),
            FeatureTag::Wamp => td::willison_amplitude(x, params.wamp_threshold),
            FeatureTag::Log => td::log_detector(x),
            FeatureTag::Mfl => td::max_fractal_length(x),
            FeatureTag::Ap => td::average_power(x),
            FeatureTag::MaxFreq => fd::max_frequency(inputs.psd?),
            FeatureTag::MeanFreq => fd::mean_frequency(inputs.psd?),
            FeatureTag::MedianFreq => fd::median_frequency(inputs.psd?),
            FeatureTag::SpecCentroid => fd::spectral_centroid(inputs.psd?),
            FeatureTag::SpecFlatness => fd::spectral_flatness(inputs.psd?),
            FeatureTag::SpecEntropy => fd::spectral_entropy(inputs.psd?),
            FeatureTag::SpecRolloff => fd::spectral_rolloff(inputs.psd?, params.rolloff_fraction),
            FeatureTag::SpecBandwidth => fd::spectral_bandwidth(inputs.psd?),
            FeatureTag::SpecDecrease => fd::spectral_decrease(inputs.psd?),
            FeatureTag::SpecFlux => {
                let (first, second) = inputs.halves?;
                fd::spectral_flux(first, second)
            }
            FeatureTag::TotalPower => fd::total_power(inputs.psd?),
            FeatureTag::AveragePower => fd::average_power(inputs.psd?),
            FeatureTag::TwitchRatio => fd::twitch_ratio(inputs.psd?, params.twitch_boundary_hz),
            FeatureTag::TwitchIndex => fd::twitch_index(inputs.psd?, params.twitch_boundary_hz),
            FeatureTag::FastTwitchSlope => fd::fast_twitch_slope(inputs.psd?, params.twitch_boundary_hz),
            FeatureTag::SlowTwitchSlope => fd::slow_twitch_slope(inputs.psd?, params.twitch_boundary_hz),
        }
    }
}

/// Stage inputs a feature formula may read
#[derive(Debug, Clone, Copy)]
pub struct FeatureInputs<'a> {
    /// Samples of the time-domain stage output
    pub time: &'a [f64],
    /// Long-term PSD, `None` when no frame survived
    pub psd: Option<&'a Psd>,
    /// PSDs of the two halves of the series, for spectral flux
    pub halves: Option<(&'a Psd, &'a Psd)>,
}

/// Non-fatal data shortfall recorded next to missing feature values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Shortfall {
    /// The time-domain input has no valid samples
    NoValidSamples,
    /// Every Welch frame was rejected (or none fit)
    SpectrumUndefined { frames_total: usize, frames_rejected: usize },
    /// Formulas undefined on otherwise usable input
    UndefinedFeatures(Vec<FeatureTag>),
}

/// Feature values and missing-data diagnostics for one channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelFeatures {
    pub channel: String,
    values: Vec<Option<f64>>,
    pub temporal_missing_pct: f64,
    pub spectral_missing_pct: f64,
    pub shortfalls: Vec<Shortfall>,
}

impl ChannelFeatures {
    /// `None` also when the tag has no stored value, e.g. a truncated row
    /// read back from disk
    pub fn get(&self, tag: FeatureTag) -> Option<f64> {
        self.values.get(tag as usize).copied().flatten()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FeatureTag, Option<f64>)> + '_ {
        FeatureTag::ALL.iter().map(move |&tag| (tag, self.get(tag)))
    }

    /// Column names for a channel, in output order
    pub fn column_names(channel: &str) -> Vec<String> {
        FeatureTag::ALL
            .iter()
            .map(|t| t.name())
            .chain([TEMPORAL_MISSING_COLUMN, SPECTRAL_MISSING_COLUMN])
            .map(|suffix| format!("{}_{}", channel, suffix))
            .collect()
    }

    /// Values in the order of [`ChannelFeatures::column_names`]
    pub fn column_values(&self) -> Vec<Option<f64>> {
        FeatureTag::ALL
            .iter()
            .map(|&tag| self.get(tag))
            .chain([Some(self.temporal_missing_pct), Some(self.spectral_missing_pct)])
            .collect()
    }

    pub fn is_shortfall(&self) -> bool {
        !self.shortfalls.is_empty()
    }
}

/// All channels' features for one file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub file_id: String,
    pub channels: Vec<ChannelFeatures>,
}

impl FeatureVector {
    pub fn channel(&self, name: &str) -> Option<&ChannelFeatures> {
        self.channels.iter().find(|c| c.channel == name)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.channels
            .iter()
            .flat_map(|c| ChannelFeatures::column_names(&c.channel))
            .collect()
    }

    pub fn column_values(&self) -> Vec<Option<f64>> {
        self.channels.iter().flat_map(|c| c.column_values()).collect()
    }
}

/// Computes the full feature registry for one channel
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    params: FeatureConfig,
    welch: WelchEstimator,
}

impl FeatureExtractor {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            params: config.features,
            welch: WelchEstimator::new(&config.spectral, config.sample_rate_hz),
        }
    }

    pub fn params(&self) -> &FeatureConfig {
        &self.params
    }

    /// Time features from `time_input`, spectral features from the PSD of `spectral_input`
    pub fn extract(&self, time_input: &ChannelSeries, spectral_input: &ChannelSeries) -> ChannelFeatures {
        let estimate = self.welch.estimate(&spectral_input.samples);
        let (first, second) = self.welch.estimate_halves(&spectral_input.samples);
        let halves = first.psd.as_ref().zip(second.psd.as_ref());

        let inputs = FeatureInputs {
            time: &time_input.samples,
            psd: estimate.psd.as_ref(),
            halves,
        };

        let mut shortfalls = Vec::new();
        let time_missing = time_input.missing_count() == time_input.len();
        if time_missing {
            shortfalls.push(Shortfall::NoValidSamples);
        }
        if estimate.psd.is_none() {
            warn!(channel = %spectral_input.name, frames = estimate.frames_total, "spectrum undefined");
            shortfalls.push(Shortfall::SpectrumUndefined {
                frames_total: estimate.frames_total,
                frames_rejected: estimate.frames_rejected,
            });
        }

        let values: Vec<Option<f64>> = FeatureTag::ALL
            .iter()
            .map(|tag| tag.evaluate(&inputs, &self.params))
            .collect();

        let undefined: Vec<FeatureTag> = FeatureTag::ALL
            .iter()
            .zip(&values)
            .filter(|(tag, v)| {
                v.is_none()
                    && match tag.domain() {
                        FeatureDomain::Time => !time_missing,
                        FeatureDomain::Spectral => estimate.psd.is_some(),
                    }
            })
            .map(|(tag, _)| *tag)
            .collect();
        if !undefined.is_empty() {
            shortfalls.push(Shortfall::UndefinedFeatures(undefined));
        }

        let features = ChannelFeatures {
            channel: time_input.name.clone(),
            values,
            temporal_missing_pct: 100.0 * time_input.missing_fraction(),
            spectral_missing_pct: estimate.missing_percent(),
            shortfalls,
        };
        debug!(
            channel = %features.channel,
            temporal_missing_pct = features.temporal_missing_pct,
            spectral_missing_pct = features.spectral_missing_pct,
            "features extracted"
        );
        features
    }
}
