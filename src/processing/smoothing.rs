// src/processing/smoothing.rs
//! Centred moving-window smoothers for rectified signals

use tracing::debug;

use crate::config::constants::smoothing::GAUSSIAN_SIGMA_FRACTION;
use crate::config::{SmoothConfig, SmoothMethod};
use crate::error::EmgResult;
use crate::processing::stage::{centred_window, FilterStage, StageOutcome};
use crate::processing::types::{ChannelSeries, StageName};
use crate::processing::windowing::{WindowSums, WindowType};

#[derive(Debug, Clone)]
pub struct SmoothStage {
    method: SmoothMethod,
    window: usize,
}

impl SmoothStage {
    pub fn new(config: &SmoothConfig, sample_rate: f64) -> Self {
        Self {
            method: config.method,
            window: centred_window(config.window_s, sample_rate),
        }
    }

    pub fn window_samples(&self) -> usize {
        self.window
    }

    pub fn smooth(&self, samples: &[f64]) -> Vec<f64> {
        match self.method {
            SmoothMethod::Rms => moving_rms(samples, self.window),
            SmoothMethod::Boxcar => moving_average(samples, self.window),
            SmoothMethod::Gaussian => gaussian(samples, self.window),
            SmoothMethod::Loess => loess(samples, self.window),
        }
    }
}

impl FilterStage for SmoothStage {
    fn name(&self) -> StageName {
        StageName::Smoothed
    }

    fn apply(&self, input: &ChannelSeries) -> EmgResult<StageOutcome> {
        let samples = self.smooth(&input.samples);
        debug!(channel = %input.name, method = ?self.method, window = self.window, "smoothing applied");
        Ok(StageOutcome::plain(input.with_samples(samples)))
    }
}

/// Apply `f` at every valid position; missing positions stay missing
fn per_valid(samples: &[f64], mut f: impl FnMut(usize) -> f64) -> Vec<f64> {
    samples
        .iter()
        .enumerate()
        .map(|(i, x)| if x.is_finite() { f(i) } else { f64::NAN })
        .collect()
}

pub fn moving_rms(samples: &[f64], window: usize) -> Vec<f64> {
    let sums = WindowSums::new(samples);
    per_valid(samples, |i| {
        let (_, sq, c) = sums.totals(sums.span(i, window));
        (sq / c as f64).sqrt()
    })
}

pub fn moving_average(samples: &[f64], window: usize) -> Vec<f64> {
    let sums = WindowSums::new(samples);
    per_valid(samples, |i| {
        let (s, _, c) = sums.totals(sums.span(i, window));
        s / c as f64
    })
}

/// Gaussian-weighted average, weights renormalised over valid neighbours
pub fn gaussian(samples: &[f64], window: usize) -> Vec<f64> {
    let sigma = (window as f64 * GAUSSIAN_SIGMA_FRACTION).max(f64::MIN_POSITIVE);
    let weights = WindowType::Gaussian { sigma }.generate(window);
    let half = window / 2;
    let n = samples.len();
    per_valid(samples, |i| {
        let (mut acc, mut norm) = (0.0, 0.0);
        for (j, w) in weights.iter().enumerate() {
            let Some(idx) = (i + j).checked_sub(half) else { continue };
            if idx >= n || !samples[idx].is_finite() {
                continue;
            }
            acc += w * samples[idx];
            norm += w;
        }
        acc / norm
    })
}

/// Local linear regression with tricube weights, evaluated at the centre
pub fn loess(samples: &[f64], window: usize) -> Vec<f64> {
    let half = window / 2;
    let n = samples.len();
    let reach = (half + 1) as f64;
    per_valid(samples, |i| {
        let lo = i.saturating_sub(half);
        let hi = (i + half + 1).min(n);
        let (mut sw, mut swx, mut swy, mut swxx, mut swxy) = (0.0, 0.0, 0.0, 0.0, 0.0);
        for (idx, &y) in samples.iter().enumerate().take(hi).skip(lo) {
            if !y.is_finite() {
                continue;
            }
            let x = idx as f64 - i as f64;
            let w = (1.0 - (x.abs() / reach).powi(3)).powi(3);
            sw += w;
            swx += w * x;
            swy += w * y;
            swxx += w * x * x;
            swxy += w * x * y;
        }
        let det = sw * swxx - swx * swx;
        if det.abs() <= f64::EPSILON * sw * swxx {
            swy / sw
        } else {
            // intercept of the weighted fit, x measured from the centre
            (swxx * swy - swx * swxy) / det
        }
    })
}
