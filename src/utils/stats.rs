// src/utils/stats.rs
//! Small statistics helpers over finite samples
//!
//! Every function skips non-finite values and returns `None` when nothing
//! is left to compute on.

/// Finite values of `data`, in order
pub fn finite(data: &[f64]) -> impl Iterator<Item = f64> + '_ {
    data.iter().copied().filter(|x| x.is_finite())
}

pub fn mean(data: &[f64]) -> Option<f64> {
    let (sum, n) = finite(data).fold((0.0, 0usize), |(s, n), x| (s + x, n + 1));
    (n > 0).then(|| sum / n as f64)
}

/// Variance with `ddof` delta degrees of freedom
pub fn variance(data: &[f64], ddof: usize) -> Option<f64> {
    let m = mean(data)?;
    let (ss, n) = finite(data).fold((0.0, 0usize), |(s, n), x| (s + (x - m).powi(2), n + 1));
    (n > ddof).then(|| ss / (n - ddof) as f64)
}

/// Median of the finite values; the slice is used as scratch space
pub fn median_in_place(scratch: &mut Vec<f64>) -> Option<f64> {
    scratch.retain(|x| x.is_finite());
    let n = scratch.len();
    if n == 0 {
        return None;
    }
    scratch.sort_unstable_by(|a, b| a.total_cmp(b));
    Some(if n % 2 == 1 {
        scratch[n / 2]
    } else {
        (scratch[n / 2 - 1] + scratch[n / 2]) / 2.0
    })
}

pub fn median(data: &[f64]) -> Option<f64> {
    median_in_place(&mut data.to_vec())
}

/// Median and unscaled median absolute deviation
pub fn median_mad(data: &[f64]) -> Option<(f64, f64)> {
    let mut scratch = data.to_vec();
    let med = median_in_place(&mut scratch)?;
    for x in scratch.iter_mut() {
        *x = (*x - med).abs();
    }
    let mad = median_in_place(&mut scratch)?;
    Some((med, mad))
}

/// Least-squares slope of `ys` against `xs` over pairs where both are finite
pub fn linear_slope(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys)
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .map(|(x, y)| (*x, *y))
        .collect();
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mx = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let my = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let sxx: f64 = pairs.iter().map(|p| (p.0 - mx).powi(2)).sum();
    let sxy: f64 = pairs.iter().map(|p| (p.0 - mx) * (p.1 - my)).sum();
    (sxx > 0.0).then(|| sxy / sxx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_variance_skip_nan() {
        let data = [1.0, f64::NAN, 2.0, 3.0];
        assert_eq!(mean(&data), Some(2.0));
        assert_eq!(variance(&data, 0), Some(2.0 / 3.0));
        assert_eq!(variance(&data, 1), Some(1.0));
        assert_eq!(variance(&[5.0], 1), None);
        assert_eq!(mean(&[f64::NAN]), None);
    }

    #[test]
    fn test_median_mad() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), Some(2.5));
        let (med, mad) = median_mad(&[1.0, 2.0, 3.0, 4.0, 100.0]).unwrap();
        assert_eq!(med, 3.0);
        assert_eq!(mad, 1.0);
        assert!(median_mad(&[]).is_none());
    }

    #[test]
    fn test_linear_slope() {
        let xs = [0.0, 1.0, 2.0, 3.0];
        let ys = [1.0, 3.0, 5.0, 7.0];
        assert!((linear_slope(&xs, &ys).unwrap() - 2.0).abs() < 1e-12);
        assert!(linear_slope(&[1.0], &[1.0]).is_none());
        assert!(linear_slope(&[1.0, 1.0], &[0.0, 2.0]).is_none());
    }
}
