// src/config/pipeline_config.rs
//! Filter chain and feature configuration structures
//!
//! [`RawPipelineOptions`] mirrors the loosely-typed options a caller hands
//! over (method names as strings, absent keys meaning "skip this stage").
//! [`PipelineConfig`] is the validated form the chain actually runs with:
//! every configurable axis is a closed enum carrying only its own
//! parameters.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::constants::{artifact, features, filters, gap_fill, signal, smoothing, spectral};
use crate::error::{EmgError, EmgErrorBuilder, EmgResult};

/// Complete, validated pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub sample_rate_hz: f64,
    pub notch: Option<NotchConfig>,
    pub bandpass: Option<BandpassConfig>,
    pub artifact: Option<ArtifactConfig>,
    pub gap_fill: GapFillConfig,
    pub smoothing: Option<SmoothConfig>,
    pub spectral: SpectralConfig,
    pub features: FeatureConfig,
}

/// Cascade of notches, applied in the order given
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotchConfig {
    pub notches: Vec<NotchSpec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NotchSpec {
    pub frequency_hz: f64,
    pub q_factor: f64,
}

/// Butterworth bandpass edges and prototype order
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandpassConfig {
    pub low_hz: f64,
    pub high_hz: f64,
    pub order: usize,
}

/// Artifact screening method with its parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum ArtifactConfig {
    Hampel { window_s: f64, n_sigma: f64 },
    Wiener { window_s: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GapFillMethod {
    Pchip,
    #[serde(rename = "cubic")]
    CubicSpline,
}

/// Gap filling: runs strictly shorter than `max_gap_samples` are filled
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GapFillConfig {
    pub method: GapFillMethod,
    pub max_gap_samples: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmoothMethod {
    Rms,
    Boxcar,
    Gaussian,
    Loess,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmoothConfig {
    pub method: SmoothMethod,
    pub window_s: f64,
}

/// Welch estimator framing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpectralConfig {
    pub segment_s: f64,
    pub overlap: f64,
}

/// Parameters of individual feature formulas
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureConfig {
    pub wamp_threshold: f64,
    pub v_order: u32,
    pub twitch_boundary_hz: f64,
    pub rolloff_fraction: f64,
}

/// Loosely-typed options as supplied by the caller
///
/// Absent stage keys disable the stage (gap filling always runs, with
/// defaults). Method tags are matched case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawPipelineOptions {
    pub sample_rate_hz: Option<f64>,
    pub notch: Option<Vec<(f64, f64)>>,
    pub bandpass: Option<(f64, f64)>,
    pub bandpass_order: Option<usize>,
    pub artifact_method: Option<String>,
    pub artifact_window: Option<f64>,
    pub n_sigma: Option<f64>,
    pub gap_fill_method: Option<String>,
    pub gap_threshold_samples: Option<usize>,
    pub smooth_method: Option<String>,
    pub smooth_window: Option<f64>,
    pub spectral_segment_s: Option<f64>,
    pub wamp_threshold: Option<f64>,
    pub v_order: Option<u32>,
    pub twitch_boundary_hz: Option<f64>,
    pub rolloff_fraction: Option<f64>,
}

fn config_error(component: &str, reason: impl Into<String>) -> EmgError {
    EmgErrorBuilder::new(component, "validate").configuration(reason)
}

impl FromStr for GapFillMethod {
    type Err = EmgError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "pchip" => Ok(GapFillMethod::Pchip),
            "cubic" | "spline" | "cubicspline" => Ok(GapFillMethod::CubicSpline),
            other => Err(config_error("gap_fill", format!("unsupported gap fill method '{}'", other))),
        }
    }
}

impl FromStr for SmoothMethod {
    type Err = EmgError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "rms" => Ok(SmoothMethod::Rms),
            "boxcar" => Ok(SmoothMethod::Boxcar),
            "gaussian" | "gauss" => Ok(SmoothMethod::Gaussian),
            "loess" => Ok(SmoothMethod::Loess),
            other => Err(config_error("smoothing", format!("unsupported smoothing method '{}'", other))),
        }
    }
}

impl ArtifactConfig {
    /// Build from a method tag and the shared window/threshold options
    pub fn from_tag(tag: &str, window_s: f64, n_sigma: f64) -> EmgResult<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "hampel" => Ok(ArtifactConfig::Hampel { window_s, n_sigma }),
            "wiener" => Ok(ArtifactConfig::Wiener { window_s }),
            other => Err(config_error("artifact", format!("unsupported artifact method '{}'", other))),
        }
    }

    pub fn window_s(&self) -> f64 {
        match *self {
            ArtifactConfig::Hampel { window_s, .. } | ArtifactConfig::Wiener { window_s } => window_s,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: signal::DEFAULT_SAMPLING_RATE_HZ,
            notch: Some(NotchConfig {
                notches: vec![NotchSpec {
                    frequency_hz: filters::POWERLINE_FREQ_50HZ,
                    q_factor: filters::DEFAULT_NOTCH_Q,
                }],
            }),
            bandpass: Some(BandpassConfig::default()),
            artifact: None,
            gap_fill: GapFillConfig::default(),
            smoothing: Some(SmoothConfig::default()),
            spectral: SpectralConfig::default(),
            features: FeatureConfig::default(),
        }
    }
}

impl Default for BandpassConfig {
    fn default() -> Self {
        Self {
            low_hz: filters::DEFAULT_BANDPASS_LOW_HZ,
            high_hz: filters::DEFAULT_BANDPASS_HIGH_HZ,
            order: filters::DEFAULT_BANDPASS_ORDER,
        }
    }
}

impl Default for GapFillConfig {
    fn default() -> Self {
        Self {
            method: GapFillMethod::Pchip,
            max_gap_samples: gap_fill::DEFAULT_MAX_GAP_SAMPLES,
        }
    }
}

impl Default for SmoothConfig {
    fn default() -> Self {
        Self {
            method: SmoothMethod::Rms,
            window_s: smoothing::DEFAULT_WINDOW_S,
        }
    }
}

impl Default for SpectralConfig {
    fn default() -> Self {
        Self {
            segment_s: spectral::DEFAULT_SEGMENT_S,
            overlap: spectral::DEFAULT_OVERLAP,
        }
    }
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            wamp_threshold: features::DEFAULT_WAMP_THRESHOLD,
            v_order: features::DEFAULT_V_ORDER,
            twitch_boundary_hz: features::DEFAULT_TWITCH_BOUNDARY_HZ,
            rolloff_fraction: features::DEFAULT_ROLLOFF_FRACTION,
        }
    }
}

impl PipelineConfig {
    pub fn nyquist_hz(&self) -> f64 {
        self.sample_rate_hz / 2.0
    }

    /// Convert a window length in seconds to an odd, centred sample count
    pub fn window_samples(&self, window_s: f64) -> usize {
        crate::processing::stage::centred_window(window_s, self.sample_rate_hz)
    }

    /// Validate every parameter against the sampling rate
    pub fn validate(&self) -> EmgResult<()> {
        let fs = self.sample_rate_hz;
        if !(fs.is_finite() && fs > 0.0) {
            return Err(config_error("sampling", format!("sampling rate must be positive, got {}", fs)));
        }
        let nyquist = self.nyquist_hz();

        if let Some(notch) = &self.notch {
            if notch.notches.is_empty() {
                return Err(config_error("notch", "notch stage enabled with no (f0, Q) pairs"));
            }
            for spec in &notch.notches {
                if !(spec.frequency_hz > 0.0 && spec.frequency_hz < nyquist) {
                    return Err(config_error("notch", format!(
                        "notch frequency {} Hz outside (0, {}) Hz", spec.frequency_hz, nyquist)));
                }
                if !(spec.q_factor > 0.0 && spec.q_factor.is_finite()) {
                    return Err(config_error("notch", format!(
                        "quality factor must be positive, got {}", spec.q_factor)));
                }
            }
        }

        if let Some(band) = &self.bandpass {
            if !(band.low_hz > 0.0 && band.low_hz < band.high_hz && band.high_hz < nyquist) {
                return Err(config_error("bandpass", format!(
                    "band edges must satisfy 0 < low < high < {} Hz, got ({}, {})",
                    nyquist, band.low_hz, band.high_hz)));
            }
            if !(filters::MIN_FILTER_ORDER..=filters::MAX_FILTER_ORDER).contains(&band.order) {
                return Err(config_error("bandpass", format!(
                    "order must be {}-{}, got {}",
                    filters::MIN_FILTER_ORDER, filters::MAX_FILTER_ORDER, band.order)));
            }
        }

        if let Some(artifact) = &self.artifact {
            if !(artifact.window_s() > 0.0 && artifact.window_s().is_finite()) {
                return Err(config_error("artifact", "artifact window must be positive"));
            }
            if let ArtifactConfig::Hampel { n_sigma, .. } = artifact {
                if !(*n_sigma > 0.0 && n_sigma.is_finite()) {
                    return Err(config_error("artifact", format!("n_sigma must be positive, got {}", n_sigma)));
                }
            }
        }

        if self.gap_fill.max_gap_samples == 0 {
            return Err(config_error("gap_fill", "gap threshold must be at least one sample"));
        }

        if let Some(smooth) = &self.smoothing {
            if !(smooth.window_s > 0.0 && smooth.window_s.is_finite()) {
                return Err(config_error("smoothing", "smoothing window must be positive"));
            }
        }

        if !(self.spectral.segment_s > 0.0 && self.spectral.segment_s.is_finite()) {
            return Err(config_error("spectral", "segment length must be positive"));
        }
        if !(self.spectral.overlap >= 0.0 && self.spectral.overlap < 1.0) {
            return Err(config_error("spectral", format!(
                "overlap must be in [0, 1), got {}", self.spectral.overlap)));
        }

        let feat = &self.features;
        if !(feat.wamp_threshold >= 0.0 && feat.wamp_threshold.is_finite()) {
            return Err(config_error("features", "WAMP threshold must be non-negative"));
        }
        if feat.v_order == 0 {
            return Err(config_error("features", "V-order must be at least 1"));
        }
        if !(feat.twitch_boundary_hz > 0.0 && feat.twitch_boundary_hz < nyquist) {
            return Err(config_error("features", format!(
                "twitch boundary {} Hz outside (0, {}) Hz", feat.twitch_boundary_hz, nyquist)));
        }
        if !(feat.rolloff_fraction > 0.0 && feat.rolloff_fraction < 1.0) {
            return Err(config_error("features", "roll-off fraction must be in (0, 1)"));
        }

        Ok(())
    }
}

impl TryFrom<RawPipelineOptions> for PipelineConfig {
    type Error = EmgError;

    fn try_from(raw: RawPipelineOptions) -> Result<Self, Self::Error> {
        let defaults = PipelineConfig::default();

        let notch = raw.notch.map(|pairs| NotchConfig {
            notches: pairs
                .into_iter()
                .map(|(frequency_hz, q_factor)| NotchSpec { frequency_hz, q_factor })
                .collect(),
        });

        let bandpass = raw.bandpass.map(|(low_hz, high_hz)| BandpassConfig {
            low_hz,
            high_hz,
            order: raw.bandpass_order.unwrap_or(filters::DEFAULT_BANDPASS_ORDER),
        });

        let artifact = raw
            .artifact_method
            .as_deref()
            .map(|tag| {
                ArtifactConfig::from_tag(
                    tag,
                    raw.artifact_window.unwrap_or(artifact::DEFAULT_WINDOW_S),
                    raw.n_sigma.unwrap_or(artifact::DEFAULT_N_SIGMA),
                )
            })
            .transpose()?;

        let gap_fill = GapFillConfig {
            method: match raw.gap_fill_method.as_deref() {
                Some(tag) => tag.parse()?,
                None => GapFillMethod::Pchip,
            },
            max_gap_samples: raw.gap_threshold_samples.unwrap_or(gap_fill::DEFAULT_MAX_GAP_SAMPLES),
        };

        let smoothing = raw
            .smooth_method
            .as_deref()
            .map(|tag| -> EmgResult<SmoothConfig> {
                Ok(SmoothConfig {
                    method: tag.parse()?,
                    window_s: raw.smooth_window.unwrap_or(smoothing::DEFAULT_WINDOW_S),
                })
            })
            .transpose()?;

        let config = PipelineConfig {
            sample_rate_hz: raw.sample_rate_hz.unwrap_or(defaults.sample_rate_hz),
            notch,
            bandpass,
            artifact,
            gap_fill,
            smoothing,
            spectral: SpectralConfig {
                segment_s: raw.spectral_segment_s.unwrap_or(spectral::DEFAULT_SEGMENT_S),
                ..defaults.spectral
            },
            features: FeatureConfig {
                wamp_threshold: raw.wamp_threshold.unwrap_or(defaults.features.wamp_threshold),
                v_order: raw.v_order.unwrap_or(defaults.features.v_order),
                twitch_boundary_hz: raw.twitch_boundary_hz.unwrap_or(defaults.features.twitch_boundary_hz),
                rolloff_fraction: raw.rolloff_fraction.unwrap_or(defaults.features.rolloff_fraction),
            },
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn raw_full() -> RawPipelineOptions {
        RawPipelineOptions {
            sample_rate_hz: Some(2000.0),
            notch: Some(vec![(50.0, 5.0), (150.0, 25.0)]),
            bandpass: Some((20.0, 450.0)),
            artifact_method: Some("Hampel".to_string()),
            artifact_window: Some(0.1),
            n_sigma: Some(4.0),
            gap_fill_method: Some("cubic".to_string()),
            gap_threshold_samples: Some(8),
            smooth_method: Some("loess".to_string()),
            smooth_window: Some(0.02),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_raw_options_convert_to_closed_variants() {
        let config = PipelineConfig::try_from(raw_full()).unwrap();

        assert_eq!(config.notch.as_ref().unwrap().notches.len(), 2);
        assert_eq!(config.artifact, Some(ArtifactConfig::Hampel { window_s: 0.1, n_sigma: 4.0 }));
        assert_eq!(config.gap_fill.method, GapFillMethod::CubicSpline);
        assert_eq!(config.gap_fill.max_gap_samples, 8);
        assert_eq!(config.smoothing.unwrap().method, SmoothMethod::Loess);
        assert_eq!(config.bandpass.unwrap().order, filters::DEFAULT_BANDPASS_ORDER);
    }

    #[test]
    fn test_absent_stage_keys_disable_stages() {
        let config = PipelineConfig::try_from(RawPipelineOptions::default()).unwrap();
        assert!(config.notch.is_none());
        assert!(config.bandpass.is_none());
        assert!(config.artifact.is_none());
        assert!(config.smoothing.is_none());
        assert_eq!(config.gap_fill, GapFillConfig::default());
    }

    #[test]
    fn test_unsupported_method_tags_are_rejected() {
        let mut raw = raw_full();
        raw.smooth_method = Some("median".to_string());
        assert_eq!(PipelineConfig::try_from(raw).unwrap_err().kind(), ErrorKind::Configuration);

        let mut raw = raw_full();
        raw.artifact_method = Some("kalman".to_string());
        assert!(PipelineConfig::try_from(raw).is_err());

        let mut raw = raw_full();
        raw.gap_fill_method = Some("linear".to_string());
        assert!(PipelineConfig::try_from(raw).is_err());
    }

    #[test]
    fn test_notch_validation() {
        let mut raw = raw_full();
        raw.notch = Some(vec![(1000.0, 5.0)]);
        assert!(PipelineConfig::try_from(raw).is_err());

        let mut raw = raw_full();
        raw.notch = Some(vec![(50.0, 0.0)]);
        assert!(PipelineConfig::try_from(raw).is_err());

        let mut raw = raw_full();
        raw.notch = Some(vec![(50.0, -2.0)]);
        assert!(PipelineConfig::try_from(raw).is_err());
    }

    #[test]
    fn test_bandpass_validation() {
        for edges in [(450.0, 20.0), (20.0, 20.0), (0.0, 450.0), (20.0, 1000.0), (20.0, 1200.0)] {
            let mut raw = raw_full();
            raw.bandpass = Some(edges);
            assert!(PipelineConfig::try_from(raw).is_err(), "edges {:?} accepted", edges);
        }

        let mut raw = raw_full();
        raw.bandpass_order = Some(9);
        assert!(PipelineConfig::try_from(raw).is_err());
    }

    #[test]
    fn test_window_samples_are_odd() {
        let config = PipelineConfig::default();
        assert_eq!(config.window_samples(0.05), 101);
        assert_eq!(config.window_samples(0.0505), 101);
        assert_eq!(config.window_samples(0.0), 1);
    }

    #[test]
    fn test_config_serialization() {
        let config = PipelineConfig::try_from(raw_full()).unwrap();
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: PipelineConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config, deserialized);
    }
}
