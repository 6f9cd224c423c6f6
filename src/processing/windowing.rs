// src/processing/windowing.rs
//! Window functions, frame segmentation and moving-window sums

use std::f64::consts::PI;
use std::ops::Range;

/// Taper shapes used by the spectral estimator and the smoothers
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WindowType {
    Rectangular,
    /// Periodic Hann, as used for spectral analysis
    Hann,
    /// Symmetric Gaussian with the given sigma in samples
    Gaussian { sigma: f64 },
}

impl WindowType {
    pub fn generate(&self, size: usize) -> Vec<f64> {
        match *self {
            WindowType::Rectangular => vec![1.0; size],
            WindowType::Hann => (0..size)
                .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f64 / size as f64).cos()))
                .collect(),
            WindowType::Gaussian { sigma } => {
                let centre = (size as f64 - 1.0) / 2.0;
                (0..size)
                    .map(|i| {
                        let n = (i as f64 - centre) / sigma;
                        (-0.5 * n * n).exp()
                    })
                    .collect()
            }
        }
    }
}

/// Overlapping frame ranges of `frame_len` samples, advancing by `hop`
///
/// Only complete frames are produced; trailing samples that do not fill a
/// frame are not analysed.
pub fn frames(len: usize, frame_len: usize, hop: usize) -> impl Iterator<Item = Range<usize>> {
    let hop = hop.max(1);
    let count = if frame_len == 0 || frame_len > len {
        0
    } else {
        (len - frame_len) / hop + 1
    };
    (0..count).map(move |k| k * hop..k * hop + frame_len)
}

/// Prefix sums over finite samples for O(1) centred window statistics
pub struct WindowSums {
    sum: Vec<f64>,
    sum_sq: Vec<f64>,
    count: Vec<usize>,
}

impl WindowSums {
    pub fn new(samples: &[f64]) -> Self {
        let n = samples.len();
        let mut sum = Vec::with_capacity(n + 1);
        let mut sum_sq = Vec::with_capacity(n + 1);
        let mut count = Vec::with_capacity(n + 1);
        sum.push(0.0);
        sum_sq.push(0.0);
        count.push(0);
        for &x in samples {
            let (v, c) = if x.is_finite() { (x, 1) } else { (0.0, 0) };
            sum.push(sum[sum.len() - 1] + v);
            sum_sq.push(sum_sq[sum_sq.len() - 1] + v * v);
            count.push(count[count.len() - 1] + c);
        }
        Self { sum, sum_sq, count }
    }

    /// Index range of the centred window of `width` samples around `i`, clipped to the series
    pub fn span(&self, i: usize, width: usize) -> Range<usize> {
        let half = width / 2;
        let n = self.count.len() - 1;
        i.saturating_sub(half)..(i + half + 1).min(n)
    }

    /// (sum, sum of squares, finite count) over `range`
    pub fn totals(&self, range: Range<usize>) -> (f64, f64, usize) {
        (
            self.sum[range.end] - self.sum[range.start],
            self.sum_sq[range.end] - self.sum_sq[range.start],
            self.count[range.end] - self.count[range.start],
        )
    }

    /// Local mean and population variance of the finite samples around `i`
    pub fn local_moments(&self, i: usize, width: usize) -> Option<(f64, f64)> {
        let (s, sq, c) = self.totals(self.span(i, width));
        if c == 0 {
            return None;
        }
        let mean = s / c as f64;
        let var = (sq / c as f64 - mean * mean).max(0.0);
        Some((mean, var))
    }
}
