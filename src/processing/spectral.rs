// src/processing/spectral.rs
//! Gap-aware Welch power spectral density estimation

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;
use tracing::{debug, warn};

use crate::config::SpectralConfig;
use crate::processing::windowing::{frames, WindowType};

/// One-sided power spectral density
#[derive(Debug, Clone, PartialEq)]
pub struct Psd {
    pub frequencies: Vec<f64>,
    pub power: Vec<f64>,
}

impl Psd {
    /// Bin spacing in Hz
    pub fn resolution(&self) -> f64 {
        match self.frequencies.as_slice() {
            [a, b, ..] => b - a,
            _ => 0.0,
        }
    }

    /// Sum of the density over bins, scaled by the bin width
    pub fn total_power(&self) -> f64 {
        self.power.iter().sum::<f64>() * self.resolution()
    }

    /// Bins whose frequency satisfies `keep`
    pub fn bins_where<'a>(&'a self, keep: impl Fn(f64) -> bool + 'a) -> impl Iterator<Item = (f64, f64)> + 'a {
        self.frequencies
            .iter()
            .zip(&self.power)
            .filter(move |(f, _)| keep(**f))
            .map(|(f, p)| (*f, *p))
    }

    pub fn len(&self) -> usize {
        self.power.len()
    }

    pub fn is_empty(&self) -> bool {
        self.power.is_empty()
    }
}

/// Welch estimate plus frame accounting
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralEstimate {
    /// `None` when no frame survived rejection
    pub psd: Option<Psd>,
    pub frames_total: usize,
    pub frames_rejected: usize,
}

impl SpectralEstimate {
    /// Percentage of frames rejected for containing missing samples
    pub fn missing_percent(&self) -> f64 {
        if self.frames_total == 0 {
            100.0
        } else {
            100.0 * self.frames_rejected as f64 / self.frames_total as f64
        }
    }
}

/// Welch estimator with Hann frames at a fixed sampling rate
#[derive(Debug, Clone)]
pub struct WelchEstimator {
    sample_rate: f64,
    segment_s: f64,
    overlap: f64,
}

impl WelchEstimator {
    pub fn new(config: &SpectralConfig, sample_rate: f64) -> Self {
        Self {
            sample_rate,
            segment_s: config.segment_s,
            overlap: config.overlap,
        }
    }

    /// Frame length for a series of `len` samples
    pub fn segment_len(&self, len: usize) -> usize {
        let nominal = (self.segment_s * self.sample_rate).round().max(1.0) as usize;
        nominal.min(len)
    }

    fn hop(&self, segment: usize) -> usize {
        ((segment as f64 * (1.0 - self.overlap)).round() as usize).max(1)
    }

    /// Average the periodograms of every frame free of missing samples
    pub fn estimate(&self, samples: &[f64]) -> SpectralEstimate {
        let segment = self.segment_len(samples.len());
        if segment < 2 {
            return SpectralEstimate { psd: None, frames_total: 0, frames_rejected: 0 };
        }
        let hop = self.hop(segment);
        let window = WindowType::Hann.generate(segment);
        let window_power: f64 = window.iter().map(|w| w * w).sum();
        let scale = 1.0 / (self.sample_rate * window_power);
        let bins = segment / 2 + 1;

        let fft = FftPlanner::<f64>::new().plan_fft_forward(segment);
        let mut buffer = vec![Complex::new(0.0, 0.0); segment];
        let mut accum = vec![0.0; bins];
        let mut frames_total = 0;
        let mut frames_rejected = 0;

        for range in frames(samples.len(), segment, hop) {
            frames_total += 1;
            let frame = &samples[range];
            if frame.iter().any(|x| !x.is_finite()) {
                frames_rejected += 1;
                continue;
            }
            let mean = frame.iter().sum::<f64>() / segment as f64;
            for ((slot, x), w) in buffer.iter_mut().zip(frame).zip(&window) {
                *slot = Complex::new((x - mean) * w, 0.0);
            }
            fft.process(&mut buffer);
            for (k, acc) in accum.iter_mut().enumerate() {
                let one_sided = if k == 0 || (segment % 2 == 0 && k == segment / 2) { 1.0 } else { 2.0 };
                *acc += one_sided * buffer[k].norm_sqr() * scale;
            }
        }

        let accepted = frames_total - frames_rejected;
        debug!(frames_total, frames_rejected, segment, "welch estimate");
        if accepted == 0 {
            warn!(frames_total, "no complete frame available, PSD undefined");
            return SpectralEstimate { psd: None, frames_total, frames_rejected };
        }

        let df = self.sample_rate / segment as f64;
        let psd = Psd {
            frequencies: (0..bins).map(|k| k as f64 * df).collect(),
            power: accum.into_iter().map(|p| p / accepted as f64).collect(),
        };
        SpectralEstimate { psd: Some(psd), frames_total, frames_rejected }
    }

    /// Separate estimates for the first and second halves of the series
    pub fn estimate_halves(&self, samples: &[f64]) -> (SpectralEstimate, SpectralEstimate) {
        let mid = samples.len() / 2;
        let (first, second) = samples.split_at(mid);
        // both halves share one frame length so their bins line up
        let segment_s = self.segment_len(first.len().min(second.len())) as f64 / self.sample_rate;
        let halves = Self { segment_s, ..self.clone() };
        (halves.estimate(first), halves.estimate(second))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn estimator() -> WelchEstimator {
        WelchEstimator::new(&SpectralConfig::default(), 2000.0)
    }

    fn sine(freq: f64, amplitude: f64, n: usize) -> Vec<f64> {
        (0..n).map(|i| amplitude * (2.0 * PI * freq * i as f64 / 2000.0).sin()).collect()
    }

    #[test]
    fn test_peak_at_tone_frequency() {
        let est = estimator().estimate(&sine(120.0, 1.0, 10_000));
        let psd = est.psd.as_ref().unwrap();
        assert_eq!(psd.resolution(), 1.0);
        assert_eq!(psd.len(), 1001);
        let (peak, _) = psd
            .frequencies
            .iter()
            .zip(&psd.power)
            .fold((0.0, 0.0), |best, (f, p)| if *p > best.1 { (*f, *p) } else { best });
        assert_eq!(peak, 120.0);
        assert_eq!(est.frames_total, 9);
        assert_eq!(est.frames_rejected, 0);
        assert_eq!(est.missing_percent(), 0.0);
    }

    #[test]
    fn test_total_power_matches_variance() {
        // a unit-amplitude sine carries power 0.5
        let psd = estimator().estimate(&sine(200.0, 1.0, 10_000)).psd.unwrap();
        assert!((psd.total_power() - 0.5).abs() < 0.01, "total {}", psd.total_power());
    }

    #[test]
    fn test_frames_with_missing_samples_are_rejected() {
        let mut x = sine(100.0, 1.0, 10_000);
        x[100] = f64::NAN;
        let est = estimator().estimate(&x);
        assert_eq!(est.frames_total, 9);
        assert_eq!(est.frames_rejected, 1);
        assert!(est.psd.is_some());
        assert!((est.missing_percent() - 100.0 / 9.0).abs() < 1e-9);
    }

    #[test]
    fn test_all_missing_is_undefined() {
        let est = estimator().estimate(&vec![f64::NAN; 4000]);
        assert!(est.psd.is_none());
        assert_eq!(est.missing_percent(), 100.0);

        let empty = estimator().estimate(&[]);
        assert!(empty.psd.is_none());
        assert_eq!(empty.frames_total, 0);
        assert_eq!(empty.missing_percent(), 100.0);
    }

    #[test]
    fn test_short_series_uses_single_frame() {
        let est = estimator().estimate(&sine(100.0, 1.0, 500));
        assert_eq!(est.frames_total, 1);
        assert_eq!(est.psd.unwrap().resolution(), 4.0);
    }

    #[test]
    fn test_halves_share_bins() {
        let (a, b) = estimator().estimate_halves(&sine(80.0, 1.0, 3000));
        let (a, b) = (a.psd.unwrap(), b.psd.unwrap());
        assert_eq!(a.frequencies, b.frequencies);
    }
}
