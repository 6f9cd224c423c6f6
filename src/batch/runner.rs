// src/batch/runner.rs
//! Parallel processing of many recordings under one configuration

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::batch::aggregator::{Aggregated, FeatureTable, FileFailure, ResultAggregator};
use crate::config::PipelineConfig;
use crate::error::{EmgErrorBuilder, EmgResult};
use crate::processing::pipeline::FilterChain;
use crate::processing::types::Recording;

/// What to do when one file fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailurePolicy {
    /// Record the failure and keep going
    #[default]
    Isolate,
    /// Stop scheduling new files and return the first failure
    FailFast,
}

/// Cooperative cancellation shared between a batch and its caller
///
/// Files already running finish their current stage work but their results
/// are discarded; files not yet started are skipped.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Result of a batch run
#[derive(Debug, Clone)]
pub struct BatchReport {
    /// One row per completed file, in submission order
    pub table: FeatureTable,
    /// Files that failed, in submission order
    pub failures: Vec<FileFailure>,
    /// Files skipped or discarded after cancellation
    pub abandoned: Vec<String>,
}

impl BatchReport {
    pub fn completed(&self) -> usize {
        self.table.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.abandoned.is_empty()
    }
}

/// Runs one shared [`FilterChain`] over a list of recordings with rayon
pub struct BatchProcessor {
    chain: FilterChain,
    policy: FailurePolicy,
    cancellation: CancellationToken,
    threads: Option<usize>,
}

impl BatchProcessor {
    /// Validate `config` once for the whole batch
    pub fn new(config: PipelineConfig) -> EmgResult<Self> {
        Ok(Self {
            chain: FilterChain::new(config)?,
            policy: FailurePolicy::default(),
            cancellation: CancellationToken::new(),
            threads: None,
        })
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Use a dedicated pool of `threads` workers instead of the global pool
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    pub fn chain(&self) -> &FilterChain {
        &self.chain
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Process every recording and assemble the feature table
    ///
    /// Under [`FailurePolicy::FailFast`] the first failing file (by
    /// submission order) is returned as the error.
    pub fn run(&self, recordings: &[Recording]) -> EmgResult<BatchReport> {
        self.run_with_progress(recordings, |_| {})
    }

    /// As [`BatchProcessor::run`], calling `progress` with each file id as
    /// soon as that file's processing returns, before its result is kept
    ///
    /// A cancel issued from `progress` discards the file being reported.
    pub fn run_with_progress<F>(&self, recordings: &[Recording], progress: F) -> EmgResult<BatchReport>
    where
        F: Fn(&str) + Sync,
    {
        match self.threads {
            Some(threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()
                    .map_err(|e| {
                        EmgErrorBuilder::new("batch", "run").configuration(format!("cannot build worker pool: {}", e))
                    })?;
                pool.install(|| self.run_in_pool(recordings, &progress))
            }
            None => self.run_in_pool(recordings, &progress),
        }
    }

    fn run_in_pool<F>(&self, recordings: &[Recording], progress: &F) -> EmgResult<BatchReport>
    where
        F: Fn(&str) + Sync,
    {
        let started = Instant::now();
        let aggregator = ResultAggregator::new();
        let halted = AtomicBool::new(false);

        recordings.par_iter().enumerate().for_each(|(index, recording)| {
            if self.cancellation.is_cancelled() || halted.load(Ordering::SeqCst) {
                aggregator.record_abandoned(index, recording.file_id.as_str());
                return;
            }

            let result = self.chain.process_recording(recording);
            progress(&recording.file_id);

            if self.cancellation.is_cancelled() {
                aggregator.record_abandoned(index, recording.file_id.as_str());
                return;
            }
            match result {
                Ok(vector) => aggregator.append(index, vector),
                Err(error) => {
                    warn!(file_id = %recording.file_id, %error, "file failed");
                    aggregator.record_failure(index, recording.file_id.as_str(), error);
                    if self.policy == FailurePolicy::FailFast {
                        halted.store(true, Ordering::SeqCst);
                    }
                }
            }
        });

        let Aggregated {
            table,
            failures,
            abandoned,
        } = aggregator.finish();

        info!(
            files = recordings.len(),
            completed = table.len(),
            failed = failures.len(),
            abandoned = abandoned.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "batch finished"
        );

        if self.policy == FailurePolicy::FailFast {
            if let Some(first) = failures.into_iter().next() {
                return Err(first.error);
            }
            return Ok(BatchReport {
                table,
                failures: Vec::new(),
                abandoned,
            });
        }

        Ok(BatchReport {
            table,
            failures,
            abandoned,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn recording(id: &str, fs: f64) -> Recording {
        let samples: Vec<f64> = (0..4000).map(|i| ((i * 37) % 101) as f64 / 101.0 - 0.5).collect();
        Recording::new(id, fs).with_channel("EMG1", samples)
    }

    #[test]
    fn test_invalid_config_rejected_before_any_file() {
        let config = PipelineConfig {
            sample_rate_hz: -1.0,
            ..PipelineConfig::default()
        };
        let err = BatchProcessor::new(config).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_isolate_keeps_good_files() {
        let processor = BatchProcessor::new(PipelineConfig::default()).unwrap();
        let files = vec![recording("a", 2000.0), recording("bad", 1000.0), recording("c", 2000.0)];
        let report = processor.run(&files).unwrap();
        assert_eq!(report.completed(), 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].file_id, "bad");
        assert!(!report.is_complete());
    }

    #[test]
    fn test_fail_fast_returns_error() {
        let processor = BatchProcessor::new(PipelineConfig::default())
            .unwrap()
            .with_policy(FailurePolicy::FailFast)
            .with_threads(1);
        let files = vec![recording("a", 2000.0), recording("bad", 1000.0)];
        let err = processor.run(&files).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataFormat);
    }

    #[test]
    fn test_cancelled_before_start_abandons_everything() {
        let token = CancellationToken::new();
        let processor = BatchProcessor::new(PipelineConfig::default())
            .unwrap()
            .with_cancellation(token.clone());
        token.cancel();
        let report = processor.run(&[recording("a", 2000.0), recording("b", 2000.0)]).unwrap();
        assert!(report.table.is_empty());
        assert_eq!(report.abandoned, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_cancel_discards_file_in_flight() {
        let processor = BatchProcessor::new(PipelineConfig::default())
            .unwrap()
            .with_threads(1);
        let token = processor.cancellation_token();
        let report = processor
            .run_with_progress(&[recording("a", 2000.0), recording("b", 2000.0)], |id| {
                if id == "a" {
                    token.cancel();
                }
            })
            .unwrap();
        assert!(report.abandoned.contains(&"a".to_string()));
        assert!(report.table.rows().iter().all(|r| r.file_id != "a"));
        assert_eq!(report.completed() + report.abandoned.len(), 2);
    }
}
