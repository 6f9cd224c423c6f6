// tests/filter_stage_tests.rs
//! Property and scenario tests for the filter stage library

use std::f64::consts::PI;

use proptest::prelude::*;

use emg_features::config::{
    ArtifactConfig, BandpassConfig, GapFillConfig, GapFillMethod, NotchConfig, NotchSpec, SmoothConfig, SmoothMethod,
};
use emg_features::processing::{
    ArtifactStage, BandpassStage, FilterStage, GapFillStage, NotchStage, RectifyStage, SmoothStage,
};
use emg_features::{ChannelSeries, FilterChain, PipelineConfig, Recording, StageName};

const FS: f64 = 2000.0;

fn every_stage() -> Vec<Box<dyn FilterStage>> {
    let notch = NotchConfig {
        notches: vec![
            NotchSpec { frequency_hz: 50.0, q_factor: 5.0 },
            NotchSpec { frequency_hz: 150.0, q_factor: 10.0 },
        ],
    };
    let mut stages: Vec<Box<dyn FilterStage>> = vec![
        Box::new(NotchStage::new(&notch, FS).unwrap()),
        Box::new(BandpassStage::new(&BandpassConfig::default(), FS).unwrap()),
        Box::new(RectifyStage),
        Box::new(ArtifactStage::new(&ArtifactConfig::Hampel { window_s: 0.01, n_sigma: 3.0 }, FS)),
        Box::new(ArtifactStage::new(&ArtifactConfig::Wiener { window_s: 0.01 }, FS)),
    ];
    for method in [GapFillMethod::Pchip, GapFillMethod::CubicSpline] {
        stages.push(Box::new(GapFillStage::new(&GapFillConfig { method, max_gap_samples: 5 })));
    }
    for method in [SmoothMethod::Rms, SmoothMethod::Boxcar, SmoothMethod::Gaussian, SmoothMethod::Loess] {
        stages.push(Box::new(SmoothStage::new(&SmoothConfig { method, window_s: 0.01 }, FS)));
    }
    stages
}

fn gappy_samples() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(prop_oneof![9 => -1.0f64..1.0, 1 => Just(f64::NAN)], 1..400)
}

proptest! {
    #[test]
    fn prop_every_stage_preserves_length(samples in gappy_samples()) {
        let input = ChannelSeries::new("ch", FS, samples);
        for stage in every_stage() {
            let out = stage.apply(&input).unwrap();
            prop_assert_eq!(out.series.len(), input.len(), "stage {}", stage.name());
            prop_assert_eq!(&out.series.name, &input.name);
        }
    }

    #[test]
    fn prop_filters_keep_missing_positions(samples in gappy_samples()) {
        let input = ChannelSeries::new("ch", FS, samples);
        let stages: Vec<Box<dyn FilterStage>> = vec![
            Box::new(NotchStage::new(&NotchConfig { notches: vec![NotchSpec { frequency_hz: 60.0, q_factor: 5.0 }] }, FS).unwrap()),
            Box::new(BandpassStage::new(&BandpassConfig::default(), FS).unwrap()),
            Box::new(RectifyStage),
        ];
        for stage in stages {
            let out = stage.apply(&input).unwrap();
            for (i, (a, b)) in input.samples.iter().zip(&out.series.samples).enumerate() {
                prop_assert_eq!(a.is_finite(), b.is_finite(), "stage {} index {}", stage.name(), i);
            }
        }
    }

    #[test]
    fn prop_rectify_is_idempotent(samples in gappy_samples()) {
        let input = ChannelSeries::new("ch", FS, samples);
        let once = RectifyStage.apply(&input).unwrap().series;
        let twice = RectifyStage.apply(&once).unwrap().series;
        for (a, b) in once.samples.iter().zip(&twice.samples) {
            prop_assert!(a == b || (a.is_nan() && b.is_nan()));
        }
    }

    #[test]
    fn prop_short_gap_filled_within_boundary_range(
        start in 2usize..60,
        len in 1usize..5,
        slope in 0.1f64..3.0,
    ) {
        // monotone data: the fill must stay between the samples bracketing the gap
        let mut samples: Vec<f64> = (0..80).map(|i| slope * (i as f64).powf(1.5)).collect();
        for x in &mut samples[start..start + len] {
            *x = f64::NAN;
        }
        let stage = GapFillStage::new(&GapFillConfig { method: GapFillMethod::Pchip, max_gap_samples: 5 });
        let (filled, count) = stage.fill(&samples);
        prop_assert_eq!(count, len);
        let lo = samples[start - 1];
        let hi = samples[start + len];
        for x in &filled[start..start + len] {
            prop_assert!(x.is_finite());
            prop_assert!(*x >= lo && *x <= hi);
        }
    }
}

fn emg_like(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| {
            let t = i as f64 / FS;
            (2.0 * PI * 85.0 * t).sin() + 0.5 * (2.0 * PI * 210.0 * t).sin() + 0.2 * (2.0 * PI * 37.0 * t).cos()
        })
        .collect()
}

#[test]
fn test_gap_at_threshold_stays_missing() {
    let stage = GapFillStage::new(&GapFillConfig { method: GapFillMethod::CubicSpline, max_gap_samples: 4 });
    let mut samples = emg_like(100);
    for x in &mut samples[40..44] {
        *x = f64::NAN;
    }
    let (out, count) = stage.fill(&samples);
    assert_eq!(count, 0);
    assert!(out[40..44].iter().all(|x| x.is_nan()));
}

#[test]
fn test_edge_gaps_never_extrapolated() {
    let stage = GapFillStage::new(&GapFillConfig::default());
    let mut samples = emg_like(50);
    samples[0] = f64::NAN;
    samples[49] = f64::NAN;
    let (out, count) = stage.fill(&samples);
    assert_eq!(count, 0);
    assert!(out[0].is_nan() && out[49].is_nan());
}

#[test]
fn test_short_gap_filled_through_chain() {
    let chain = FilterChain::new(PipelineConfig::default()).unwrap();
    let mut samples = emg_like(8000);
    for x in &mut samples[3000..3003] {
        *x = f64::NAN;
    }
    let run = chain.run_channel(&ChannelSeries::new("EMG1", FS, samples)).unwrap();

    let rectified = run.outputs.get(StageName::Rectified).unwrap();
    assert_eq!(rectified.missing_count(), 3);
    assert_eq!(run.outputs.get(StageName::BandLimited).unwrap().missing_count(), 0);
    assert_eq!(run.outputs.get(StageName::Filled).unwrap().missing_count(), 0);
    assert_eq!(run.outputs.get(StageName::Smoothed).unwrap().missing_count(), 0);
    assert_eq!(run.diagnostics.filled_samples, 3);
    assert_eq!(run.diagnostics.band_limited_filled, 3);
    assert_eq!(run.diagnostics.residual_missing, 0);
}

#[test]
fn test_long_gap_propagates_and_rejects_frames() {
    let chain = FilterChain::new(PipelineConfig::default()).unwrap();
    let mut samples = emg_like(20_000);
    for x in &mut samples[4000..4500] {
        *x = f64::NAN;
    }
    let series = ChannelSeries::new("EMG1", FS, samples.clone());
    let run = chain.run_channel(&series).unwrap();
    for stage in StageName::ALL {
        let out = run.outputs.get(stage).unwrap();
        assert!(out.samples[4000..4500].iter().all(|x| x.is_nan()), "stage {}", stage);
        assert_eq!(out.missing_count(), 500, "stage {}", stage);
    }

    let recording = Recording::new("gappy", FS).with_channel("EMG1", samples);
    let vector = chain.process_recording(&recording).unwrap();
    let features = vector.channel("EMG1").unwrap();
    assert!((features.temporal_missing_pct - 2.5).abs() < 1e-12);
    // 1 s frames at 50% overlap: 19 frames, two of them overlap the gap
    assert!((features.spectral_missing_pct - 200.0 / 19.0).abs() < 1e-9);
}

#[test]
fn test_hampel_replaces_spike_in_chain() {
    let config = PipelineConfig {
        artifact: Some(ArtifactConfig::Hampel { window_s: 0.025, n_sigma: 3.0 }),
        ..PipelineConfig::default()
    };
    let chain = FilterChain::new(config).unwrap();
    let mut samples = emg_like(6000);
    samples[2500] += 80.0;
    let run = chain.run_channel(&ChannelSeries::new("EMG1", FS, samples)).unwrap();
    assert!(run.diagnostics.replaced_samples > 0);
    let rectified = run.outputs.get(StageName::Rectified).unwrap();
    let screened = run.outputs.get(StageName::Screened).unwrap();
    let peak = |s: &ChannelSeries| s.samples.iter().copied().fold(0.0, f64::max);
    assert!(peak(screened) < peak(rectified));
}
