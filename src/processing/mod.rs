// src/processing/mod.rs
//! Signal processing pipeline for EMG recordings

pub mod artifact;
pub mod features;
pub mod filters;
pub mod gap_fill;
pub mod pipeline;
pub mod rectify;
pub mod smoothing;
pub mod spectral;
pub mod stage;
pub mod types;
pub mod windowing;

pub use artifact::ArtifactStage;
pub use features::{ChannelFeatures, FeatureDomain, FeatureExtractor, FeatureTag, FeatureVector, Shortfall};
pub use filters::{BandpassStage, NotchStage};
pub use gap_fill::GapFillStage;
pub use pipeline::{ChannelDiagnostics, ChannelRun, FilterChain};
pub use rectify::RectifyStage;
pub use smoothing::SmoothStage;
pub use spectral::{Psd, SpectralEstimate, WelchEstimator};
pub use stage::{FilterStage, StageOutcome};
pub use types::{ChannelSeries, Recording, StageName, StageOutputs, MISSING};
