// src/processing/types.rs
//! Core data types: channel series, recordings and named stage outputs

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::constants::signal;
use crate::error::{EmgErrorBuilder, EmgResult};

/// Sentinel marking a missing sample
pub const MISSING: f64 = f64::NAN;

/// One named channel's ordered samples at a uniform sampling rate
///
/// Missing samples hold [`MISSING`]. Every stage maps a series to a new
/// series of identical length; nothing resamples or reorders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSeries {
    pub name: String,
    pub sample_rate_hz: f64,
    pub samples: Vec<f64>,
}

impl ChannelSeries {
    pub fn new(name: impl Into<String>, sample_rate_hz: f64, samples: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            sample_rate_hz,
            samples,
        }
    }

    /// Same name and rate, new samples
    pub fn with_samples(&self, samples: Vec<f64>) -> Self {
        debug_assert_eq!(samples.len(), self.samples.len());
        Self {
            name: self.name.clone(),
            sample_rate_hz: self.sample_rate_hz,
            samples,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_s(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate_hz
    }

    pub fn is_missing(&self, index: usize) -> bool {
        !self.samples[index].is_finite()
    }

    pub fn missing_count(&self) -> usize {
        self.samples.iter().filter(|x| !x.is_finite()).count()
    }

    /// Fraction of missing samples; an empty series counts as fully missing
    pub fn missing_fraction(&self) -> f64 {
        if self.samples.is_empty() {
            1.0
        } else {
            self.missing_count() as f64 / self.samples.len() as f64
        }
    }

    /// Valid (finite) samples in order
    pub fn valid_samples(&self) -> Vec<f64> {
        self.samples.iter().copied().filter(|x| x.is_finite()).collect()
    }

    /// Maximal index ranges of consecutive valid samples
    pub fn valid_runs(&self) -> Vec<Range<usize>> {
        runs_where(&self.samples, |x| x.is_finite())
    }

    /// Maximal index ranges of consecutive missing samples
    pub fn missing_runs(&self) -> Vec<Range<usize>> {
        runs_where(&self.samples, |x| !x.is_finite())
    }
}

fn runs_where(samples: &[f64], pred: impl Fn(f64) -> bool) -> Vec<Range<usize>> {
    let mut runs = Vec::new();
    let mut start = None;
    for (i, &x) in samples.iter().enumerate() {
        match (pred(x), start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
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

/// A loaded input file: identifier, optional time column and channels
#[derive(Debug, Clone, PartialEq)]
pub struct Recording {
    pub file_id: String,
    pub sample_rate_hz: f64,
    pub time: Option<Vec<f64>>,
    pub channels: Vec<ChannelSeries>,
}

impl Recording {
    pub fn new(file_id: impl Into<String>, sample_rate_hz: f64) -> Self {
        Self {
            file_id: file_id.into(),
            sample_rate_hz,
            time: None,
            channels: Vec::new(),
        }
    }

    pub fn with_time(mut self, time: Vec<f64>) -> Self {
        self.time = Some(time);
        self
    }

    /// Append a channel sampled at the recording rate
    pub fn with_channel(mut self, name: impl Into<String>, samples: Vec<f64>) -> Self {
        self.channels.push(ChannelSeries::new(name, self.sample_rate_hz, samples));
        self
    }

    /// Length of every channel (taken from the first)
    pub fn samples_per_channel(&self) -> usize {
        self.channels.first().map_or(0, |c| c.len())
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn channel(&self, name: &str) -> Option<&ChannelSeries> {
        self.channels.iter().find(|c| c.name == name)
    }

    /// Keep only the named channels, in the order given
    pub fn select_channels(&self, names: &[&str]) -> EmgResult<Recording> {
        let mut channels = Vec::with_capacity(names.len());
        for name in names {
            match self.channel(name) {
                Some(ch) => channels.push(ch.clone()),
                None => {
                    return Err(EmgErrorBuilder::new("recording", "select_channels")
                        .data_mismatch("missing channel column", *name, self.channel_names().join(","))
                        .for_file(&self.file_id));
                }
            }
        }
        Ok(Recording {
            file_id: self.file_id.clone(),
            sample_rate_hz: self.sample_rate_hz,
            time: self.time.clone(),
            channels,
        })
    }

    /// Check channel lengths, names and the time base
    pub fn validate(&self) -> EmgResult<()> {
        let err = || EmgErrorBuilder::new("recording", "validate");

        if self.channels.is_empty() {
            return Err(err().data_format("recording has no channel columns").for_file(&self.file_id));
        }

        let len = self.channels[0].len();
        for ch in &self.channels {
            if ch.len() != len {
                return Err(err()
                    .data_mismatch(format!("channel '{}' length differs", ch.name), len.to_string(), ch.len().to_string())
                    .for_file(&self.file_id));
            }
            if ch.sample_rate_hz != self.sample_rate_hz {
                return Err(err()
                    .data_mismatch(
                        format!("channel '{}' sampling rate differs", ch.name),
                        self.sample_rate_hz.to_string(),
                        ch.sample_rate_hz.to_string(),
                    )
                    .for_file(&self.file_id));
            }
        }

        let mut seen = std::collections::HashSet::new();
        for name in self.channel_names() {
            if !seen.insert(name) {
                return Err(err().data_format(format!("duplicate channel '{}'", name)).for_file(&self.file_id));
            }
        }

        if let Some(time) = &self.time {
            if time.len() != len {
                return Err(err()
                    .data_mismatch("time column length differs", len.to_string(), time.len().to_string())
                    .for_file(&self.file_id));
            }
            self.validate_time_base(time)?;
        }

        Ok(())
    }

    fn validate_time_base(&self, time: &[f64]) -> EmgResult<()> {
        if time.len() < 2 {
            return Ok(());
        }
        let err = || EmgErrorBuilder::new("recording", "validate_time_base");

        let step = (time[time.len() - 1] - time[0]) / (time.len() - 1) as f64;
        if !(step.is_finite() && step > 0.0) {
            return Err(err().data_format("time column is not increasing").for_file(&self.file_id));
        }

        for (i, pair) in time.windows(2).enumerate() {
            let dt = pair[1] - pair[0];
            if !(dt > 0.0) {
                return Err(err()
                    .data_format(format!("time column not strictly increasing at row {}", i + 1))
                    .for_file(&self.file_id));
            }
            if (dt - step).abs() > step * signal::TIME_BASE_TOLERANCE {
                return Err(err()
                    .data_mismatch(format!("irregular time base at row {}", i + 1), step.to_string(), dt.to_string())
                    .for_file(&self.file_id));
            }
        }

        let nominal = 1.0 / self.sample_rate_hz;
        if ((step - nominal) / nominal).abs() > signal::SAMPLE_PERIOD_TOLERANCE {
            return Err(err()
                .data_mismatch("time step disagrees with sampling rate", nominal.to_string(), step.to_string())
                .for_file(&self.file_id));
        }
        Ok(())
    }
}

/// Named points of the filter chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StageName {
    Raw,
    Notch,
    Bandpass,
    /// Bandpass output with micro-gaps filled; input to spectral estimation
    BandLimited,
    Rectified,
    Screened,
    Filled,
    Smoothed,
}

impl StageName {
    pub const ALL: [StageName; 8] = [
        StageName::Raw,
        StageName::Notch,
        StageName::Bandpass,
        StageName::BandLimited,
        StageName::Rectified,
        StageName::Screened,
        StageName::Filled,
        StageName::Smoothed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StageName::Raw => "raw",
            StageName::Notch => "notch",
            StageName::Bandpass => "bandpass",
            StageName::BandLimited => "band_limited",
            StageName::Rectified => "rectified",
            StageName::Screened => "screened",
            StageName::Filled => "filled",
            StageName::Smoothed => "smoothed",
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only map from stage name to that stage's output for one channel
///
/// A disabled stage shares its input's allocation.
#[derive(Debug, Clone, Default)]
pub struct StageOutputs {
    outputs: BTreeMap<StageName, Arc<ChannelSeries>>,
}

impl StageOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a stage output. Stages are never overwritten.
    pub(crate) fn insert(&mut self, stage: StageName, series: Arc<ChannelSeries>) {
        debug_assert!(!self.outputs.contains_key(&stage), "stage {} recorded twice", stage);
        self.outputs.entry(stage).or_insert(series);
    }

    pub fn get(&self, stage: StageName) -> Option<&ChannelSeries> {
        self.outputs.get(&stage).map(|s| s.as_ref())
    }

    pub fn shared(&self, stage: StageName) -> Option<Arc<ChannelSeries>> {
        self.outputs.get(&stage).cloned()
    }

    pub fn stages(&self) -> impl Iterator<Item = StageName> + '_ {
        self.outputs.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }
}
