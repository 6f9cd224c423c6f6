// src/processing/gap_fill.rs
//! Interpolation of short interior runs of missing samples

use std::ops::Range;

use tracing::debug;

use crate::config::constants::gap_fill::BOUNDARY_KNOTS;
use crate::config::{GapFillConfig, GapFillMethod};
use crate::error::EmgResult;
use crate::processing::stage::{FilterStage, StageOutcome};
use crate::processing::types::{ChannelSeries, StageName};

/// Fills missing runs strictly shorter than the configured threshold
///
/// Only runs with valid samples on both sides are candidates; the series
/// is never extended past its first or last valid sample.
#[derive(Debug, Clone, Copy)]
pub struct GapFillStage {
    config: GapFillConfig,
}

impl GapFillStage {
    pub fn new(config: &GapFillConfig) -> Self {
        Self { config: *config }
    }

    /// Fill eligible runs, returning the new samples and the number filled
    pub fn fill(&self, samples: &[f64]) -> (Vec<f64>, usize) {
        let mut out = samples.to_vec();
        let mut filled = 0;
        let n = samples.len();

        for run in missing_runs(samples) {
            if run.start == 0 || run.end == n || run.len() >= self.config.max_gap_samples {
                continue;
            }
            let (xs, ys) = boundary_knots(samples, &run);
            let at: Vec<f64> = run.clone().map(|i| i as f64).collect();
            let values = match self.config.method {
                GapFillMethod::Pchip => pchip(&xs, &ys, &at),
                GapFillMethod::CubicSpline => natural_spline(&xs, &ys, &at),
            };
            out[run.clone()].copy_from_slice(&values);
            filled += run.len();
        }
        (out, filled)
    }
}

impl FilterStage for GapFillStage {
    fn name(&self) -> StageName {
        StageName::Filled
    }

    fn apply(&self, input: &ChannelSeries) -> EmgResult<StageOutcome> {
        let (samples, filled) = self.fill(&input.samples);
        debug!(channel = %input.name, filled, remaining = samples.iter().filter(|x| !x.is_finite()).count(), "gaps filled");
        Ok(StageOutcome {
            series: input.with_samples(samples),
            altered_samples: filled,
        })
    }
}

fn missing_runs(samples: &[f64]) -> Vec<Range<usize>> {
    let mut runs = Vec::new();
    let mut start = None;
    for (i, x) in samples.iter().enumerate() {
        match (x.is_finite(), start) {
            (false, None) => start = Some(i),
            (true, Some(s)) => {
                runs.push(s..i);
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        runs.push(s..samples.len());
    }
    runs
}

/// Up to `BOUNDARY_KNOTS` contiguous valid samples on each side of `run`
fn boundary_knots(samples: &[f64], run: &Range<usize>) -> (Vec<f64>, Vec<f64>) {
    let left = (1..=BOUNDARY_KNOTS)
        .map_while(|k| run.start.checked_sub(k))
        .take_while(|&i| samples[i].is_finite())
        .collect::<Vec<_>>();
    let right = (0..BOUNDARY_KNOTS)
        .map(|k| run.end + k)
        .take_while(|&i| i < samples.len() && samples[i].is_finite())
        .collect::<Vec<_>>();

    left.iter()
        .rev()
        .chain(right.iter())
        .map(|&i| (i as f64, samples[i]))
        .unzip()
}

/// Index of the knot interval containing `x`
fn interval(xs: &[f64], x: f64) -> usize {
    let k = xs.partition_point(|&k| k <= x);
    k.saturating_sub(1).min(xs.len() - 2)
}

/// Shape-preserving piecewise cubic Hermite interpolation
///
/// Interior slopes are the weighted harmonic mean of the neighbouring secant
/// slopes (zero at local extrema); end slopes use the three-point formula
/// limited so the interpolant never overshoots.
pub fn pchip(xs: &[f64], ys: &[f64], at: &[f64]) -> Vec<f64> {
    let n = xs.len();
    if n < 2 {
        return vec![ys.first().copied().unwrap_or(f64::NAN); at.len()];
    }
    let h: Vec<f64> = xs.windows(2).map(|w| w[1] - w[0]).collect();
    let delta: Vec<f64> = (0..n - 1).map(|k| (ys[k + 1] - ys[k]) / h[k]).collect();

    let mut d = vec![0.0; n];
    if n == 2 {
        d[0] = delta[0];
        d[1] = delta[0];
    } else {
        for k in 1..n - 1 {
            if delta[k - 1] * delta[k] > 0.0 {
                let w1 = 2.0 * h[k] + h[k - 1];
                let w2 = h[k] + 2.0 * h[k - 1];
                d[k] = (w1 + w2) / (w1 / delta[k - 1] + w2 / delta[k]);
            }
        }
        d[0] = end_slope(h[0], h[1], delta[0], delta[1]);
        d[n - 1] = end_slope(h[n - 2], h[n - 3], delta[n - 2], delta[n - 3]);
    }

    at.iter()
        .map(|&x| {
            let k = interval(xs, x);
            let t = (x - xs[k]) / h[k];
            let t2 = t * t;
            let t3 = t2 * t;
            (2.0 * t3 - 3.0 * t2 + 1.0) * ys[k]
                + (t3 - 2.0 * t2 + t) * h[k] * d[k]
                + (-2.0 * t3 + 3.0 * t2) * ys[k + 1]
                + (t3 - t2) * h[k] * d[k + 1]
        })
        .collect()
}

fn end_slope(h0: f64, h1: f64, delta0: f64, delta1: f64) -> f64 {
    let d = ((2.0 * h0 + h1) * delta0 - h0 * delta1) / (h0 + h1);
    if d.signum() != delta0.signum() || delta0 == 0.0 {
        0.0
    } else if delta0.signum() != delta1.signum() && d.abs() > 3.0 * delta0.abs() {
        3.0 * delta0
    } else {
        d
    }
}

/// Natural cubic spline through the knots (zero curvature at both ends)
pub fn natural_spline(xs: &[f64], ys: &[f64], at: &[f64]) -> Vec<f64> {
    let n = xs.len();
    if n < 3 {
        return pchip(xs, ys, at);
    }
    let h: Vec<f64> = xs.windows(2).map(|w| w[1] - w[0]).collect();

    // Tridiagonal system for interior second derivatives (Thomas algorithm)
    let m_int = n - 2;
    let mut diag = vec![0.0; m_int];
    let mut upper = vec![0.0; m_int];
    let mut rhs = vec![0.0; m_int];
    for i in 0..m_int {
        let k = i + 1;
        diag[i] = 2.0 * (h[k - 1] + h[k]);
        upper[i] = h[k];
        rhs[i] = 6.0 * ((ys[k + 1] - ys[k]) / h[k] - (ys[k] - ys[k - 1]) / h[k - 1]);
    }
    for i in 1..m_int {
        let lower = h[i];
        let w = lower / diag[i - 1];
        diag[i] -= w * upper[i - 1];
        rhs[i] -= w * rhs[i - 1];
    }
    let mut m = vec![0.0; n];
    for i in (0..m_int).rev() {
        let next = if i + 1 < m_int { m[i + 2] } else { 0.0 };
        m[i + 1] = (rhs[i] - upper[i] * next) / diag[i];
    }

    at.iter()
        .map(|&x| {
            let k = interval(xs, x);
            let a = xs[k + 1] - x;
            let b = x - xs[k];
            let hk = h[k];
            m[k] * a.powi(3) / (6.0 * hk)
                + m[k + 1] * b.powi(3) / (6.0 * hk)
                + (ys[k] / hk - m[k] * hk / 6.0) * a
                + (ys[k + 1] / hk - m[k + 1] * hk / 6.0) * b
        })
        .collect()
}
