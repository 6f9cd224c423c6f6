// src/batch/mod.rs
//! Batch orchestration: many recordings, one configuration, one feature table

pub mod aggregator;
pub mod runner;

pub use aggregator::{FeatureRow, FeatureTable, FileFailure, ResultAggregator};
pub use runner::{BatchProcessor, BatchReport, CancellationToken, FailurePolicy};
