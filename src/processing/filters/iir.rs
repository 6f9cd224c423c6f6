// src/processing/filters/iir.rs
//! IIR (Infinite Impulse Response) filter design as second-order sections

use std::f64::consts::PI;

use rustfft::num_complex::Complex;

use super::FilterError;
use crate::config::constants::filters::{MAX_FILTER_ORDER, MIN_FILTER_ORDER};

/// Poles with a smaller imaginary part are treated as real
const IMAG_EPS: f64 = 1e-9;

/// Second-order section, normalised so that `a[0] == 1`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Biquad {
    pub b: [f64; 3],
    pub a: [f64; 3],
}

impl Biquad {
    /// Second-order IIR notch at `f0` with bandwidth `f0 / q`
    pub fn notch(f0: f64, q: f64, sample_rate: f64) -> Result<Self, FilterError> {
        let nyquist = sample_rate / 2.0;
        if !(f0 > 0.0 && f0 < nyquist) {
            return Err(FilterError::InvalidParameters(format!(
                "notch frequency {} Hz must lie in (0, {}) Hz", f0, nyquist)));
        }
        if !(q > 0.0) {
            return Err(FilterError::InvalidParameters(format!("quality factor must be positive, got {}", q)));
        }

        let w0 = PI * f0 / nyquist;
        let bw = w0 / q;
        let beta = (bw / 2.0).tan();
        let gain = 1.0 / (1.0 + beta);
        let cos_w0 = w0.cos();

        Ok(Self {
            b: [gain, -2.0 * gain * cos_w0, gain],
            a: [1.0, -2.0 * gain * cos_w0, 2.0 * gain - 1.0],
        })
    }

    /// Complex response at normalised angular frequency `omega` (rad/sample)
    pub fn response(&self, omega: f64) -> Complex<f64> {
        let z1 = Complex::from_polar(1.0, -omega);
        let z2 = z1 * z1;
        let num = Complex::new(self.b[0], 0.0) + z1 * self.b[1] + z2 * self.b[2];
        let den = Complex::new(self.a[0], 0.0) + z1 * self.a[1] + z2 * self.a[2];
        num / den
    }

    /// Gain at DC, `None` when a pole sits on z = 1
    pub fn dc_gain(&self) -> Option<f64> {
        let den = self.a.iter().sum::<f64>();
        if den.abs() < f64::EPSILON {
            None
        } else {
            Some(self.b.iter().sum::<f64>() / den)
        }
    }

    /// Transposed direct form II state reached after a constant input of 1
    pub fn steady_state(&self) -> [f64; 2] {
        match self.dc_gain() {
            Some(h) => {
                let z2 = self.b[2] - self.a[2] * h;
                [h - self.b[0], z2]
            }
            None => [0.0, 0.0],
        }
    }

    /// Filter in place, transposed direct form II, starting from `state`
    fn process(&self, data: &mut [f64], mut state: [f64; 2]) {
        let [b0, b1, b2] = self.b;
        let [_, a1, a2] = self.a;
        for x in data.iter_mut() {
            let input = *x;
            let y = b0 * input + state[0];
            state[0] = b1 * input - a1 * y + state[1];
            state[1] = b2 * input - a2 * y;
            *x = y;
        }
    }
}

/// Cascade of second-order sections
#[derive(Debug, Clone, PartialEq)]
pub struct SosFilter {
    sections: Vec<Biquad>,
}

impl SosFilter {
    pub fn new(sections: Vec<Biquad>) -> Result<Self, FilterError> {
        if sections.is_empty() {
            return Err(FilterError::InvalidCoefficients("filter has no sections".to_string()));
        }
        for s in &sections {
            if s.b.iter().chain(s.a.iter()).any(|c| !c.is_finite()) {
                return Err(FilterError::InvalidCoefficients("non-finite coefficient".to_string()));
            }
        }
        Ok(Self { sections })
    }

    /// Butterworth bandpass of prototype order `order` (2 * order poles)
    ///
    /// Analog prototype poles are shifted onto the band, mapped through the
    /// bilinear transform with pre-warped edges, and paired into sections
    /// each holding one zero at z = 1 and one at z = -1. The cascade is
    /// scaled to unit gain at the band's geometric centre.
    pub fn butterworth_bandpass(order: usize, low_hz: f64, high_hz: f64, sample_rate: f64) -> Result<Self, FilterError> {
        if !(MIN_FILTER_ORDER..=MAX_FILTER_ORDER).contains(&order) {
            return Err(FilterError::InvalidParameters(format!(
                "Order must be {}-{}", MIN_FILTER_ORDER, MAX_FILTER_ORDER)));
        }
        let nyquist = sample_rate / 2.0;
        if !(low_hz > 0.0 && low_hz < high_hz && high_hz < nyquist) {
            return Err(FilterError::InvalidParameters(format!(
                "band edges ({}, {}) Hz must satisfy 0 < low < high < {} Hz", low_hz, high_hz, nyquist)));
        }

        let fs2 = 2.0 * sample_rate;
        let w1 = fs2 * (PI * low_hz / sample_rate).tan();
        let w2 = fs2 * (PI * high_hz / sample_rate).tan();
        let bw = w2 - w1;
        let w0_sq = w1 * w2;

        let mut upper = Vec::with_capacity(order);
        let mut real = Vec::new();
        for k in 0..order {
            let theta = PI * (2 * k + order + 1) as f64 / (2 * order) as f64;
            let p_lp = Complex::from_polar(1.0, theta) * (bw / 2.0);
            let disc = (p_lp * p_lp - Complex::new(w0_sq, 0.0)).sqrt();
            for s in [p_lp + disc, p_lp - disc] {
                let z = (Complex::new(fs2, 0.0) + s) / (Complex::new(fs2, 0.0) - s);
                if z.im > IMAG_EPS {
                    upper.push(z);
                } else if z.im.abs() <= IMAG_EPS {
                    real.push(z.re);
                }
            }
        }

        if real.len() % 2 != 0 {
            return Err(FilterError::InvalidCoefficients("unpaired real pole".to_string()));
        }

        let mut sections: Vec<Biquad> = upper
            .iter()
            .map(|p| Biquad {
                b: [1.0, 0.0, -1.0],
                a: [1.0, -2.0 * p.re, p.norm_sqr()],
            })
            .collect();
        sections.extend(real.chunks_exact(2).map(|pair| Biquad {
            b: [1.0, 0.0, -1.0],
            a: [1.0, -(pair[0] + pair[1]), pair[0] * pair[1]],
        }));

        if sections.len() != order {
            return Err(FilterError::InvalidCoefficients(format!(
                "expected {} sections, designed {}", order, sections.len())));
        }

        let mut filter = Self::new(sections)?;
        let centre_hz = sample_rate / PI * ((w0_sq.sqrt()) / fs2).atan();
        let gain = filter.magnitude_at(centre_hz, sample_rate);
        if !(gain > 0.0 && gain.is_finite()) {
            return Err(FilterError::InvalidCoefficients("degenerate passband gain".to_string()));
        }
        for c in filter.sections[0].b.iter_mut() {
            *c /= gain;
        }
        Ok(filter)
    }

    /// Single-section notch
    pub fn notch(f0: f64, q: f64, sample_rate: f64) -> Result<Self, FilterError> {
        Self::new(vec![Biquad::notch(f0, q, sample_rate)?])
    }

    pub fn sections(&self) -> &[Biquad] {
        &self.sections
    }

    /// Magnitude response at `freq_hz`
    pub fn magnitude_at(&self, freq_hz: f64, sample_rate: f64) -> f64 {
        let omega = 2.0 * PI * freq_hz / sample_rate;
        self.sections
            .iter()
            .map(|s| s.response(omega))
            .fold(Complex::new(1.0, 0.0), |acc, h| acc * h)
            .norm()
    }

    /// Initial state of each section for a constant input `x0`
    pub fn steady_state(&self, x0: f64) -> Vec<[f64; 2]> {
        let mut scale = x0;
        self.sections
            .iter()
            .map(|s| {
                let [z1, z2] = s.steady_state();
                let zi = [z1 * scale, z2 * scale];
                scale *= s.dc_gain().unwrap_or(0.0);
                zi
            })
            .collect()
    }

    /// Filter `data` in place through every section
    pub fn process(&self, data: &mut [f64], initial: Option<&[[f64; 2]]>) {
        for (i, section) in self.sections.iter().enumerate() {
            let state = initial.and_then(|zi| zi.get(i).copied()).unwrap_or([0.0, 0.0]);
            section.process(data, state);
        }
    }
}
