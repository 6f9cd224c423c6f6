// tests/spectral_tests.rs
//! Spectral estimator scenarios: tone recovery, twitch bands and mains removal

use std::f64::consts::PI;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use emg_features::config::SpectralConfig;
use emg_features::processing::features::frequency::{
    mean_frequency, median_frequency, spectral_entropy, spectral_flatness, twitch_ratio,
};
use emg_features::processing::spectral::{Psd, WelchEstimator};
use emg_features::{ChannelSeries, FeatureTag, FilterChain, PipelineConfig, Recording, StageName};

const FS: f64 = 2000.0;

fn tones(n: usize, components: &[(f64, f64)]) -> Vec<f64> {
    (0..n)
        .map(|i| {
            let t = i as f64 / FS;
            components.iter().map(|(f, a)| a * (2.0 * PI * f * t).sin()).sum()
        })
        .collect()
}

fn welch() -> WelchEstimator {
    WelchEstimator::new(&SpectralConfig::default(), FS)
}

fn power_at(psd: &Psd, freq: f64) -> f64 {
    let k = (freq / psd.resolution()).round() as usize;
    psd.power[k]
}

#[test]
fn test_tone_recovered_through_full_chain() {
    let chain = FilterChain::new(PipelineConfig::default()).unwrap();
    for freq in [80.0, 120.0, 200.0, 333.0] {
        let recording = Recording::new("tone", FS).with_channel("EMG1", tones(20_000, &[(freq, 1.0)]));
        let vector = chain.process_recording(&recording).unwrap();
        let features = vector.channel("EMG1").unwrap();
        let mean = features.get(FeatureTag::MeanFreq).unwrap();
        let median = features.get(FeatureTag::MedianFreq).unwrap();
        assert!((mean - freq).abs() <= 1.0, "{} Hz: mean {}", freq, mean);
        assert!((median - freq).abs() <= 1.0, "{} Hz: median {}", freq, median);
        assert_eq!(features.get(FeatureTag::MaxFreq), Some(freq));
    }
}

#[test]
fn test_tone_recovered_by_estimator() {
    let psd = welch().estimate(&tones(10_000, &[(150.0, 2.0)])).psd.unwrap();
    assert!((mean_frequency(&psd).unwrap() - 150.0).abs() < 1e-6);
    assert!((median_frequency(&psd).unwrap() - 150.0).abs() <= 1.0);
}

#[test]
fn test_median_unbiased_with_coarse_bins() {
    let config = SpectralConfig { segment_s: 0.25, ..SpectralConfig::default() };
    let psd = WelchEstimator::new(&config, FS)
        .estimate(&tones(20_000, &[(100.0, 1.0)]))
        .psd
        .unwrap();
    assert_eq!(psd.resolution(), 4.0);
    // well inside half a bin
    let median = median_frequency(&psd).unwrap();
    assert!((median - 100.0).abs() < 0.1, "median {}", median);
    assert!((mean_frequency(&psd).unwrap() - 100.0).abs() < 0.1);
}

#[test]
fn test_twitch_ratio_boundary() {
    let est = welch();
    let slow = est.estimate(&tones(10_000, &[(30.0, 1.0)])).psd.unwrap();
    assert!(twitch_ratio(&slow, 60.0).unwrap() < 1e-9);

    let fast = est.estimate(&tones(10_000, &[(200.0, 1.0)])).psd.unwrap();
    assert!(twitch_ratio(&fast, 60.0).map_or(true, |r| r > 1e9));

    let mixed = est.estimate(&tones(10_000, &[(30.0, 1.0), (200.0, 1.0)])).psd.unwrap();
    let ratio = twitch_ratio(&mixed, 60.0).unwrap();
    assert!(ratio > 0.0 && ratio.is_finite());
    assert!((ratio - 1.0).abs() < 1e-6);
}

#[test]
fn test_notch_removes_mains_from_two_channel_recording() {
    let chain = FilterChain::new(PipelineConfig::default()).unwrap();
    let amplitude = 3.0;
    let n = 20_000;
    let channels = [
        ("EMG1", tones(n, &[(50.0, amplitude), (150.0, 1.0), (250.0, 0.5)])),
        ("EMG2", tones(n, &[(50.0, amplitude), (95.0, 0.8), (310.0, 0.6)])),
    ];
    let est = welch();

    for (name, samples) in &channels {
        let run = chain.run_channel(&ChannelSeries::new(*name, FS, samples.clone())).unwrap();
        let raw = est.estimate(&run.outputs.get(StageName::Raw).unwrap().samples).psd.unwrap();
        let notched = est.estimate(&run.outputs.get(StageName::Notch).unwrap().samples).psd.unwrap();

        let reduction_db = 10.0 * (power_at(&raw, 50.0) / power_at(&notched, 50.0)).log10();
        assert!(reduction_db >= 20.0, "{}: only {:.1} dB at 50 Hz", name, reduction_db);

        for (k, (&f, &p)) in raw.frequencies.iter().zip(&raw.power).enumerate() {
            // compare only bins carrying signal, away from the notch
            if (f - 50.0).abs() < 30.0 || p < 1e-6 * raw.power.iter().copied().fold(0.0, f64::max) {
                continue;
            }
            let change_db = 10.0 * (notched.power[k] / p).log10();
            assert!(change_db.abs() < 0.5, "{}: {:.2} dB change at {} Hz", name, change_db, f);
        }
    }

    let mut recording = Recording::new("mains", FS);
    for (name, samples) in channels {
        recording = recording.with_channel(name, samples);
    }
    let vector = chain.process_recording(&recording).unwrap();
    assert_eq!(vector.channel("EMG1").unwrap().get(FeatureTag::MaxFreq), Some(150.0));
    assert_eq!(vector.channel("EMG2").unwrap().get(FeatureTag::MaxFreq), Some(95.0));
}

#[test]
fn test_short_series_has_undefined_spectrum() {
    let est = welch().estimate(&[1.0]);
    assert!(est.psd.is_none());
    assert_eq!(est.frames_total, 0);
    assert_eq!(est.missing_percent(), 100.0);
}

#[test]
fn test_white_noise_is_flat() {
    let mut rng = StdRng::seed_from_u64(7);
    let noise: Vec<f64> = (0..40_000).map(|_| rng.gen_range(-1.0..1.0)).collect();
    let psd = welch().estimate(&noise).psd.unwrap();
    assert!(spectral_flatness(&psd).unwrap() > 0.5);
    assert!(spectral_entropy(&psd).unwrap() > 0.9);

    let tone = welch().estimate(&tones(40_000, &[(100.0, 1.0)])).psd.unwrap();
    assert!(spectral_entropy(&tone).unwrap() < spectral_entropy(&psd).unwrap());
}
