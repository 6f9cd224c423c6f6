// src/processing/artifact.rs
//! Artifact screening: robust outlier replacement and local Wiener filtering

use tracing::debug;

use crate::config::constants::artifact::MAD_SCALE;
use crate::config::ArtifactConfig;
use crate::error::EmgResult;
use crate::processing::stage::{centred_window, FilterStage, StageOutcome};
use crate::processing::types::{ChannelSeries, StageName};
use crate::processing::windowing::WindowSums;
use crate::utils::stats::median_mad;

/// Artifact screen with the method fixed at construction
#[derive(Debug, Clone)]
pub struct ArtifactStage {
    method: ScreenMethod,
    window: usize,
}

#[derive(Debug, Clone, Copy)]
enum ScreenMethod {
    Hampel { n_sigma: f64 },
    Wiener,
}

impl ArtifactStage {
    pub fn new(config: &ArtifactConfig, sample_rate: f64) -> Self {
        let window = centred_window(config.window_s(), sample_rate);
        let method = match *config {
            ArtifactConfig::Hampel { n_sigma, .. } => ScreenMethod::Hampel { n_sigma },
            ArtifactConfig::Wiener { .. } => ScreenMethod::Wiener,
        };
        Self { method, window }
    }

    pub fn window_samples(&self) -> usize {
        self.window
    }
}

impl FilterStage for ArtifactStage {
    fn name(&self) -> StageName {
        StageName::Screened
    }

    fn apply(&self, input: &ChannelSeries) -> EmgResult<StageOutcome> {
        let (samples, replaced) = match self.method {
            ScreenMethod::Hampel { n_sigma } => hampel(&input.samples, self.window, n_sigma),
            ScreenMethod::Wiener => wiener(&input.samples, self.window),
        };
        debug!(channel = %input.name, replaced, window = self.window, "artifact screen applied");
        Ok(StageOutcome {
            series: input.with_samples(samples),
            altered_samples: replaced,
        })
    }
}

/// Replace samples further than `n_sigma` scaled MADs from their local median
pub fn hampel(samples: &[f64], window: usize, n_sigma: f64) -> (Vec<f64>, usize) {
    let half = window / 2;
    let n = samples.len();
    let mut out = samples.to_vec();
    let mut replaced = 0;

    for (i, &x) in samples.iter().enumerate() {
        if !x.is_finite() {
            continue;
        }
        let lo = i.saturating_sub(half);
        let hi = (i + half + 1).min(n);
        if let Some((med, mad)) = median_mad(&samples[lo..hi]) {
            if (x - med).abs() > n_sigma * MAD_SCALE * mad {
                out[i] = med;
                replaced += 1;
            }
        }
    }
    (out, replaced)
}

/// Local minimum-mean-square-error filter
///
/// The noise power is the average of the local variances. Where the local
/// variance does not exceed it the sample is replaced by the local mean;
/// those replacements are what the returned count reports.
pub fn wiener(samples: &[f64], window: usize) -> (Vec<f64>, usize) {
    let sums = WindowSums::new(samples);
    let moments: Vec<Option<(f64, f64)>> = samples
        .iter()
        .enumerate()
        .map(|(i, x)| if x.is_finite() { sums.local_moments(i, window) } else { None })
        .collect();

    let (total, count) = moments
        .iter()
        .flatten()
        .fold((0.0, 0usize), |(s, c), (_, var)| (s + var, c + 1));
    if count == 0 {
        return (samples.to_vec(), 0);
    }
    let noise = total / count as f64;

    let mut replaced = 0;
    let out = samples
        .iter()
        .zip(&moments)
        .map(|(&x, m)| match m {
            Some((mean, var)) if *var > noise => mean + (1.0 - noise / var) * (x - mean),
            Some((mean, _)) => {
                replaced += 1;
                *mean
            }
            None => x,
        })
        .collect();
    (out, replaced)
}
