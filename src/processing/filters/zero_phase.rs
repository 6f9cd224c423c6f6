// src/processing/filters/zero_phase.rs
//! Forward-backward filtering with odd-extension padding

use super::iir::SosFilter;
use crate::config::constants::filters::PAD_MULTIPLIER;

/// Zero-phase filtering of a fully finite signal
///
/// The signal is extended at both ends by point reflection about its end
/// samples, filtered forward from the steady state of the first padded
/// sample, reversed, filtered again, and trimmed back to its original length.
pub fn filtfilt(filter: &SosFilter, signal: &[f64]) -> Vec<f64> {
    let n = signal.len();
    if n == 0 {
        return Vec::new();
    }
    if n == 1 {
        return signal.to_vec();
    }

    let sections = filter.sections().len();
    let padlen = (PAD_MULTIPLIER * (2 * sections + 1)).min(n - 1);

    let first = signal[0];
    let last = signal[n - 1];
    let mut ext = Vec::with_capacity(n + 2 * padlen);
    ext.extend((1..=padlen).rev().map(|i| 2.0 * first - signal[i]));
    ext.extend_from_slice(signal);
    ext.extend((1..=padlen).map(|i| 2.0 * last - signal[n - 1 - i]));

    let zi = filter.steady_state(ext[0]);
    filter.process(&mut ext, Some(&zi));

    ext.reverse();
    let zi = filter.steady_state(ext[0]);
    filter.process(&mut ext, Some(&zi));
    ext.reverse();

    ext[padlen..padlen + n].to_vec()
}

/// Zero-phase filtering that treats NaN runs as segment boundaries
///
/// Each maximal run of finite samples is filtered on its own; NaN samples are
/// copied through unchanged. The output has the input's length.
pub fn filtfilt_gapped(filter: &SosFilter, signal: &[f64]) -> Vec<f64> {
    let mut out = signal.to_vec();
    let mut start = None;
    for i in 0..=signal.len() {
        let finite = i < signal.len() && signal[i].is_finite();
        match (finite, start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                let filtered = filtfilt(filter, &signal[s..i]);
                out[s..i].copy_from_slice(&filtered);
                start = None;
            }
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn sine(freq: f64, fs: f64, n: usize) -> Vec<f64> {
        (0..n).map(|i| (2.0 * PI * freq * i as f64 / fs).sin()).collect()
    }

    #[test]
    fn test_filtfilt_preserves_length() {
        let bp = SosFilter::butterworth_bandpass(4, 20.0, 450.0, 2000.0).unwrap();
        for n in [0usize, 1, 2, 5, 30, 1000] {
            assert_eq!(filtfilt(&bp, &sine(100.0, 2000.0, n)).len(), n);
        }
    }

    #[test]
    fn test_filtfilt_has_no_phase_lag() {
        let bp = SosFilter::butterworth_bandpass(4, 20.0, 450.0, 2000.0).unwrap();
        let x = sine(100.0, 2000.0, 4000);
        let y = filtfilt(&bp, &x);
        // compare away from the ends
        let err = x[1000..3000]
            .iter()
            .zip(&y[1000..3000])
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max);
        assert!(err < 0.01, "max deviation {}", err);
    }

    #[test]
    fn test_filtfilt_removes_notched_tone() {
        let notch = SosFilter::notch(50.0, 5.0, 2000.0).unwrap();
        let y = filtfilt(&notch, &sine(50.0, 2000.0, 8000));
        let peak = y[2000..6000].iter().map(|v| v.abs()).fold(0.0, f64::max);
        assert!(peak < 0.01, "residual {}", peak);
    }

    #[test]
    fn test_gapped_keeps_nan_positions() {
        let bp = SosFilter::butterworth_bandpass(2, 20.0, 450.0, 2000.0).unwrap();
        let mut x = sine(100.0, 2000.0, 200);
        x[50] = f64::NAN;
        x[120] = f64::NAN;
        x[121] = f64::NAN;
        let y = filtfilt_gapped(&bp, &x);
        assert_eq!(y.len(), x.len());
        for (a, b) in x.iter().zip(&y) {
            assert_eq!(a.is_nan(), b.is_nan());
        }
    }

    #[test]
    fn test_gapped_all_missing() {
        let bp = SosFilter::butterworth_bandpass(2, 20.0, 450.0, 2000.0).unwrap();
        let y = filtfilt_gapped(&bp, &[f64::NAN; 10]);
        assert!(y.iter().all(|v| v.is_nan()));
    }
}
