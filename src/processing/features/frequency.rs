//! Frequency domain feature formulas over a Welch PSD
//!
//! Shape features normalise by total power and are undefined (`None`) on a
//! spectrum with no power.

use crate::processing::spectral::Psd;
use crate::utils::stats::linear_slope;

fn power_sum(psd: &Psd) -> Option<f64> {
    let total: f64 = psd.power.iter().sum();
    (total > 0.0 && total.is_finite()).then_some(total)
}

/// Frequency of the largest PSD bin
pub fn max_frequency(psd: &Psd) -> Option<f64> {
    power_sum(psd)?;
    psd.frequencies
        .iter()
        .zip(&psd.power)
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(f, _)| *f)
}

/// Power-weighted mean frequency
pub fn mean_frequency(psd: &Psd) -> Option<f64> {
    let total = power_sum(psd)?;
    Some(psd.frequencies.iter().zip(&psd.power).map(|(f, p)| f * p).sum::<f64>() / total)
}

/// Frequency splitting the spectrum into halves of equal power,
/// interpolated linearly inside the bin that crosses the half-way mark.
/// Each bin spans `[f - df/2, f + df/2]` around its centre frequency.
pub fn median_frequency(psd: &Psd) -> Option<f64> {
    cumulative_crossing(psd, 0.5, true)
}

/// Frequency below which `fraction` of the total power lies
pub fn spectral_rolloff(psd: &Psd, fraction: f64) -> Option<f64> {
    cumulative_crossing(psd, fraction, false)
}

fn cumulative_crossing(psd: &Psd, fraction: f64, interpolate: bool) -> Option<f64> {
    let total = power_sum(psd)?;
    let target = fraction * total;
    let df = psd.resolution();
    let mut cumulative = 0.0;
    for (k, (&f, &p)) in psd.frequencies.iter().zip(&psd.power).enumerate() {
        let before = cumulative;
        cumulative += p;
        if cumulative >= target {
            if !interpolate || p <= 0.0 {
                return Some(f);
            }
            let lower = f - 0.5 * df;
            return Some((lower + (target - before) / p * df).max(0.0));
        }
    }
    psd.frequencies.last().copied()
}

/// Magnitude-weighted spectral centroid
pub fn spectral_centroid(psd: &Psd) -> Option<f64> {
    power_sum(psd)?;
    let magnitude: Vec<f64> = psd.power.iter().map(|p| p.max(0.0).sqrt()).collect();
    let norm: f64 = magnitude.iter().sum();
    Some(psd.frequencies.iter().zip(&magnitude).map(|(f, m)| f * m).sum::<f64>() / norm)
}

/// Geometric over arithmetic mean of the PSD
pub fn spectral_flatness(psd: &Psd) -> Option<f64> {
    let total = power_sum(psd)?;
    let n = psd.len() as f64;
    if psd.power.iter().any(|p| *p <= 0.0) {
        return Some(0.0);
    }
    let log_mean = psd.power.iter().map(|p| p.ln()).sum::<f64>() / n;
    Some(log_mean.exp() / (total / n))
}

/// Shannon entropy of the normalised PSD, scaled to [0, 1]
pub fn spectral_entropy(psd: &Psd) -> Option<f64> {
    let total = power_sum(psd)?;
    if psd.len() < 2 {
        return None;
    }
    let h: f64 = psd
        .power
        .iter()
        .map(|p| p / total)
        .filter(|p| *p > 0.0)
        .map(|p| -p * p.ln())
        .sum();
    Some(h / (psd.len() as f64).ln())
}

/// Power-weighted spread around the mean frequency
pub fn spectral_bandwidth(psd: &Psd) -> Option<f64> {
    let total = power_sum(psd)?;
    let centre = mean_frequency(psd)?;
    let spread: f64 = psd
        .frequencies
        .iter()
        .zip(&psd.power)
        .map(|(f, p)| (f - centre).powi(2) * p)
        .sum();
    Some((spread / total).sqrt())
}

/// Average decrease of the spectrum relative to its first bin
pub fn spectral_decrease(psd: &Psd) -> Option<f64> {
    let (first, rest) = psd.power.split_first()?;
    let norm: f64 = rest.iter().sum();
    if norm <= 0.0 {
        return None;
    }
    let decrease: f64 = rest
        .iter()
        .enumerate()
        .map(|(k, p)| (p - first) / (k + 1) as f64)
        .sum();
    Some(decrease / norm)
}

/// Euclidean distance between the power-normalised spectra of two segments
pub fn spectral_flux(first: &Psd, second: &Psd) -> Option<f64> {
    if first.len() != second.len() {
        return None;
    }
    let a = power_sum(first)?;
    let b = power_sum(second)?;
    let sq: f64 = first
        .power
        .iter()
        .zip(&second.power)
        .map(|(p, q)| (q / b - p / a).powi(2))
        .sum();
    Some(sq.sqrt())
}

/// Integrated power over all bins
pub fn total_power(psd: &Psd) -> Option<f64> {
    (!psd.is_empty()).then(|| psd.total_power())
}

/// Mean PSD level across bins
pub fn average_power(psd: &Psd) -> Option<f64> {
    (!psd.is_empty()).then(|| psd.power.iter().sum::<f64>() / psd.len() as f64)
}

/// Bins at or above `boundary_hz` (fast) and strictly between DC and it (slow)
fn twitch_bands(psd: &Psd, boundary_hz: f64) -> (Vec<(f64, f64)>, Vec<(f64, f64)>) {
    let fast = psd.bins_where(move |f| f >= boundary_hz).collect();
    let slow = psd.bins_where(move |f| f > 0.0 && f < boundary_hz).collect();
    (fast, slow)
}

/// Fast-band energy over slow-band energy
pub fn twitch_ratio(psd: &Psd, boundary_hz: f64) -> Option<f64> {
    let (fast, slow) = twitch_bands(psd, boundary_hz);
    let high: f64 = fast.iter().map(|b| b.1).sum();
    let low: f64 = slow.iter().map(|b| b.1).sum();
    (low > 0.0).then(|| high / low)
}

/// Fast-band peak over slow-band peak
pub fn twitch_index(psd: &Psd, boundary_hz: f64) -> Option<f64> {
    let (fast, slow) = twitch_bands(psd, boundary_hz);
    let high = fast.iter().map(|b| b.1).fold(0.0, f64::max);
    let low = slow.iter().map(|b| b.1).fold(0.0, f64::max);
    (low > 0.0).then(|| high / low)
}

/// Least-squares slope of the PSD across the fast band
pub fn fast_twitch_slope(psd: &Psd, boundary_hz: f64) -> Option<f64> {
    band_slope(twitch_bands(psd, boundary_hz).0)
}

/// Least-squares slope of the PSD across the slow band
pub fn slow_twitch_slope(psd: &Psd, boundary_hz: f64) -> Option<f64> {
    band_slope(twitch_bands(psd, boundary_hz).1)
}

fn band_slope(bins: Vec<(f64, f64)>) -> Option<f64> {
    let (f, p): (Vec<f64>, Vec<f64>) = bins.into_iter().unzip();
    linear_slope(&f, &p)
}
