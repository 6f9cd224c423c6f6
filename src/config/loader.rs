// src/config/loader.rs
//! Configuration loader: TOML files layered with environment overrides

use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{PipelineConfig, RawPipelineOptions};
use crate::error::EmgResult;

/// Prefix for environment overrides, e.g. `EMG_SMOOTH_METHOD=boxcar`
pub const ENV_PREFIX: &str = "EMG";

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),
    #[error("Configuration parse error: {0}")]
    ParseError(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

/// Loads [`RawPipelineOptions`] and validates them into a [`PipelineConfig`]
pub struct ConfigLoader {
    config_paths: Vec<PathBuf>,
    use_environment: bool,
}

impl ConfigLoader {
    /// Loader reading nothing but the environment
    pub fn new() -> Self {
        Self {
            config_paths: Vec::new(),
            use_environment: true,
        }
    }

    /// Create loader with custom paths; later files override earlier ones
    pub fn with_paths(paths: Vec<PathBuf>) -> Self {
        Self {
            config_paths: paths,
            use_environment: true,
        }
    }

    /// Ignore `EMG_*` environment variables
    pub fn without_environment(mut self) -> Self {
        self.use_environment = false;
        self
    }

    /// Read and merge raw options from all sources
    pub fn load_raw(&self) -> Result<RawPipelineOptions, ConfigError> {
        let mut builder = Config::builder();

        for path in &self.config_paths {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path.display().to_string()));
            }
            debug!(path = %path.display(), "adding configuration file");
            builder = builder.add_source(File::from(path.as_path()).format(FileFormat::Toml));
        }

        if self.use_environment {
            builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true));
        }

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Load, merge and validate
    pub fn load(&self) -> EmgResult<PipelineConfig> {
        let raw = self.load_raw()?;
        let config = PipelineConfig::try_from(raw)?;
        info!(
            sample_rate_hz = config.sample_rate_hz,
            notch = config.notch.is_some(),
            bandpass = config.bandpass.is_some(),
            artifact = config.artifact.is_some(),
            smoothing = config.smoothing.is_some(),
            "pipeline configuration loaded"
        );
        Ok(config)
    }

    /// Parse and validate a TOML document without touching the filesystem
    pub fn from_toml_str(content: &str) -> EmgResult<PipelineConfig> {
        let raw: RawPipelineOptions = Config::builder()
            .add_source(File::from_str(content, FileFormat::Toml))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(ConfigError::from)?;
        PipelineConfig::try_from(raw)
    }

    /// Write the validated form of `config` as TOML
    ///
    /// The file records the exact parameters a run used and is read back
    /// with [`ConfigLoader::import_config`].
    pub fn export_config<P: AsRef<Path>>(config: &PipelineConfig, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(config).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Read a file written by [`ConfigLoader::export_config`] and validate it
    pub fn import_config<P: AsRef<Path>>(path: P) -> EmgResult<PipelineConfig> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()).into());
        }
        let content = std::fs::read_to_string(path).map_err(ConfigError::from)?;
        let config: PipelineConfig = toml::from_str(&content).map_err(ConfigError::from)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate a configuration file without keeping the result
    pub fn validate_config_file<P: AsRef<Path>>(path: P) -> EmgResult<()> {
        ConfigLoader::with_paths(vec![path.as_ref().to_path_buf()])
            .without_environment()
            .load()
            .map(|_| ())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ArtifactConfig, SmoothMethod};
    use crate::error::ErrorKind;
    use serial_test::serial;
    use std::io::Write;

    const SAMPLE_TOML: &str = r#"
sample_rate_hz = 2000.0
notch = [[50.0, 5.0], [150.0, 25.0]]
bandpass = [20.0, 450.0]
artifact_method = "wiener"
artifact_window = 0.02
gap_fill_method = "pchip"
gap_threshold_samples = 5
smooth_method = "rms"
smooth_window = 0.05
"#;

    #[test]
    fn test_from_toml_str() {
        let config = ConfigLoader::from_toml_str(SAMPLE_TOML).unwrap();
        assert_eq!(config.notch.unwrap().notches[1].q_factor, 25.0);
        assert_eq!(config.artifact, Some(ArtifactConfig::Wiener { window_s: 0.02 }));
        assert_eq!(config.smoothing.unwrap().method, SmoothMethod::Rms);
    }

    #[test]
    fn test_invalid_toml_is_configuration_error() {
        let err = ConfigLoader::from_toml_str("smooth_method = \"median\"").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_missing_file() {
        let loader = ConfigLoader::with_paths(vec![PathBuf::from("/nonexistent/pipeline.toml")]);
        assert!(matches!(loader.load_raw(), Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    #[serial]
    fn test_file_with_environment_override() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(SAMPLE_TOML.as_bytes()).unwrap();

        std::env::set_var("EMG_SMOOTH_METHOD", "boxcar");
        let result = ConfigLoader::with_paths(vec![file.path().to_path_buf()]).load();
        std::env::remove_var("EMG_SMOOTH_METHOD");

        let config = result.unwrap();
        assert_eq!(config.smoothing.unwrap().method, SmoothMethod::Boxcar);
        assert_eq!(config.bandpass.unwrap().high_hz, 450.0);
    }

    #[test]
    fn test_export_then_import() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("effective.toml");
        let config = ConfigLoader::from_toml_str(SAMPLE_TOML).unwrap();
        ConfigLoader::export_config(&config, &path).unwrap();
        assert_eq!(ConfigLoader::import_config(&path).unwrap(), config);
    }

    #[test]
    fn test_import_rejects_invalid_parameters() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        let config = PipelineConfig {
            sample_rate_hz: 500.0,
            ..PipelineConfig::default()
        };
        ConfigLoader::export_config(&config, &path).unwrap();
        let err = ConfigLoader::import_config(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    #[serial]
    fn test_validate_config_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(b"bandpass = [500.0, 100.0]\n").unwrap();
        assert!(ConfigLoader::validate_config_file(file.path()).is_err());
    }
}
