//! Time domain feature formulas
//!
//! Every function takes the samples of one stage output, skips missing
//! values, and returns `None` when its formula is undefined on what is left.
//! Difference-based features only use pairs of adjacent samples that are
//! both present.

use crate::utils::stats::{finite, mean, variance};

fn valid(data: &[f64]) -> Vec<f64> {
    finite(data).collect()
}

/// Absolute differences between adjacent samples that are both present
fn adjacent_diffs(data: &[f64]) -> impl Iterator<Item = f64> + '_ {
    data.windows(2)
        .filter(|w| w[0].is_finite() && w[1].is_finite())
        .map(|w| (w[1] - w[0]).abs())
}

fn non_empty<T>(values: Vec<T>) -> Option<Vec<T>> {
    (!values.is_empty()).then_some(values)
}

pub fn min(data: &[f64]) -> Option<f64> {
    finite(data).reduce(f64::min)
}

pub fn max(data: &[f64]) -> Option<f64> {
    finite(data).reduce(f64::max)
}

pub fn average(data: &[f64]) -> Option<f64> {
    mean(data)
}

/// Sample standard deviation (N - 1 denominator)
pub fn standard_deviation(data: &[f64]) -> Option<f64> {
    variance(data, 1).map(f64::sqrt)
}

/// Central moments m2, m3, m4 of the valid samples
fn central_moments(data: &[f64]) -> Option<(f64, f64, f64)> {
    let m = mean(data)?;
    let v = valid(data);
    let n = v.len() as f64;
    let (m2, m3, m4) = v.iter().fold((0.0, 0.0, 0.0), |(a, b, c), x| {
        let d = x - m;
        (a + d * d, b + d * d * d, c + d * d * d * d)
    });
    Some((m2 / n, m3 / n, m4 / n))
}

/// Population skewness; undefined for a constant signal
pub fn skewness(data: &[f64]) -> Option<f64> {
    let (m2, m3, _) = central_moments(data)?;
    (m2 > 0.0).then(|| m3 / m2.powf(1.5))
}

/// Population excess kurtosis; undefined for a constant signal
pub fn kurtosis(data: &[f64]) -> Option<f64> {
    let (m2, _, m4) = central_moments(data)?;
    (m2 > 0.0).then(|| m4 / (m2 * m2) - 3.0)
}

/// Integrated EMG: sum of absolute values
pub fn iemg(data: &[f64]) -> Option<f64> {
    let v = non_empty(valid(data))?;
    Some(v.iter().map(|x| x.abs()).sum())
}

pub fn mav(data: &[f64]) -> Option<f64> {
    let v = non_empty(valid(data))?;
    Some(v.iter().map(|x| x.abs()).sum::<f64>() / v.len() as f64)
}

/// MAV with the outer quarters of the record weighted by one half
pub fn mmav1(data: &[f64]) -> Option<f64> {
    weighted_mav(data, |i, n| {
        if 4 * i >= n && 4 * i <= 3 * n {
            1.0
        } else {
            0.5
        }
    })
}

/// MAV with the outer quarters of the record weighted by a linear ramp
pub fn mmav2(data: &[f64]) -> Option<f64> {
    weighted_mav(data, |i, n| {
        if 4 * i < n {
            4.0 * i as f64 / n as f64
        } else if 4 * i > 3 * n {
            4.0 * (n - i) as f64 / n as f64
        } else {
            1.0
        }
    })
}

/// `weight(i, n)` receives the 1-based position among valid samples
fn weighted_mav(data: &[f64], weight: impl Fn(usize, usize) -> f64) -> Option<f64> {
    let v = non_empty(valid(data))?;
    let n = v.len();
    let total: f64 = v.iter().enumerate().map(|(i, x)| weight(i + 1, n) * x.abs()).sum();
    Some(total / n as f64)
}

/// Simple square integral
pub fn ssi(data: &[f64]) -> Option<f64> {
    let v = non_empty(valid(data))?;
    Some(v.iter().map(|x| x * x).sum())
}

/// EMG variance: squared samples over N - 1
pub fn emg_variance(data: &[f64]) -> Option<f64> {
    let v = valid(data);
    (v.len() > 1).then(|| v.iter().map(|x| x * x).sum::<f64>() / (v.len() - 1) as f64)
}

/// V-order amplitude estimator
pub fn v_order(data: &[f64], order: u32) -> Option<f64> {
    let v = non_empty(valid(data))?;
    let p = order as i32;
    let m = v.iter().map(|x| x.abs().powi(p)).sum::<f64>() / v.len() as f64;
    Some(m.powf(1.0 / order as f64))
}

pub fn rms(data: &[f64]) -> Option<f64> {
    average_power(data).map(f64::sqrt)
}

/// Waveform length: cumulative absolute change
pub fn waveform_length(data: &[f64]) -> Option<f64> {
    let d: Vec<f64> = non_empty(adjacent_diffs(data).collect())?;
    Some(d.iter().sum())
}

/// Willison amplitude: adjacent changes larger than `threshold`
pub fn willison_amplitude(data: &[f64], threshold: f64) -> Option<f64> {
    let d: Vec<f64> = non_empty(adjacent_diffs(data).collect())?;
    Some(d.iter().filter(|&&x| x > threshold).count() as f64)
}

/// Log detector; any exact zero collapses it to zero
pub fn log_detector(data: &[f64]) -> Option<f64> {
    let v = non_empty(valid(data))?;
    if v.iter().any(|x| *x == 0.0) {
        return Some(0.0);
    }
    Some((v.iter().map(|x| x.abs().ln()).sum::<f64>() / v.len() as f64).exp())
}

/// Maximum fractal length
pub fn max_fractal_length(data: &[f64]) -> Option<f64> {
    let d: Vec<f64> = non_empty(adjacent_diffs(data).collect())?;
    let energy: f64 = d.iter().map(|x| x * x).sum();
    (energy > 0.0).then(|| energy.sqrt().log10())
}

/// Average power: mean squared value
pub fn average_power(data: &[f64]) -> Option<f64> {
    let v = non_empty(valid(data))?;
    Some(v.iter().map(|x| x * x).sum::<f64>() / v.len() as f64)
}
