// src/error.rs
//! Unified error handling for the preprocessing chain and feature engine
//!
//! Two error categories exist. Configuration errors are raised while the
//! options are validated, before any file is touched, and are fatal to a run.
//! A filter design that cannot be realised is a configuration error too.
//! Data format errors are raised per file and, under the default batch policy,
//! only cost that file its row.
//!
//! Insufficient data has no variant: it degrades to missing
//! feature values plus diagnostics and never travels as an `Err`.

use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// Unified error type for the whole crate
#[derive(Debug, Clone)]
pub enum EmgError {
    /// Invalid filter or feature parameters
    Configuration {
        component: String,
        reason: String,
        context: ErrorContext,
    },

    /// Malformed input recording, or a channel-set mismatch in aggregation
    DataFormat {
        file_id: Option<String>,
        reason: String,
        expected: Option<String>,
        actual: Option<String>,
        context: ErrorContext,
    },
}

/// Coarse error category, for callers that branch on kind only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    Configuration,
    DataFormat,
}

/// Error context for debugging and analysis
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub timestamp: SystemTime,
    pub thread_id: Option<String>,
    pub component: String,
    pub operation: String,
    pub file: Option<&'static str>,
    pub line: Option<u32>,
    pub additional_info: HashMap<String, String>,
}

impl ErrorContext {
    /// Create a new error context
    pub fn new(component: &str, operation: &str) -> Self {
        Self {
            timestamp: SystemTime::now(),
            thread_id: std::thread::current().name().map(|s| s.to_string()),
            component: component.to_string(),
            operation: operation.to_string(),
            file: None,
            line: None,
            additional_info: HashMap::new(),
        }
    }

    /// Create error context with file and line information
    pub fn with_location(component: &str, operation: &str, file: &'static str, line: u32) -> Self {
        let mut context = Self::new(component, operation);
        context.file = Some(file);
        context.line = Some(line);
        context
    }

    /// Add additional information to the context
    pub fn add_info<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.additional_info.insert(key.into(), value.into());
        self
    }
}

/// Macro for creating error context with file and line info
#[macro_export]
macro_rules! error_context {
    ($component:expr, $operation:expr) => {
        $crate::error::ErrorContext::with_location($component, $operation, file!(), line!())
    };
}

impl EmgError {
    /// Error category
    pub fn kind(&self) -> ErrorKind {
        match self {
            EmgError::Configuration { .. } => ErrorKind::Configuration,
            EmgError::DataFormat { .. } => ErrorKind::DataFormat,
        }
    }

    pub fn context(&self) -> &ErrorContext {
        match self {
            EmgError::Configuration { context, .. } | EmgError::DataFormat { context, .. } => context,
        }
    }

    /// Attach the file identifier to a data format error raised below the
    /// batch layer, where the id was not yet known.
    pub fn for_file(self, id: &str) -> Self {
        match self {
            EmgError::DataFormat { file_id: None, reason, expected, actual, context } => {
                EmgError::DataFormat {
                    file_id: Some(id.to_string()),
                    reason,
                    expected,
                    actual,
                    context,
                }
            }
            other => other,
        }
    }
}

impl fmt::Display for EmgError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmgError::Configuration { component, reason, context } => {
                write!(f, "[CONFIG] Configuration error in {}: {} ({})",
                       component, reason, context.operation)
            }
            EmgError::DataFormat { file_id, reason, expected, actual, context } => {
                let file = file_id.as_deref().unwrap_or("<unknown file>");
                match (expected, actual) {
                    (Some(exp), Some(act)) => write!(f, "[DATA] {}: {} (expected: {}, got: {}) ({})",
                                                     file, reason, exp, act, context.operation),
                    _ => write!(f, "[DATA] {}: {} ({})", file, reason, context.operation),
                }
            }
        }
    }
}

impl Error for EmgError {}

/// Conversion from filter design errors
impl From<crate::processing::filters::FilterError> for EmgError {
    fn from(err: crate::processing::filters::FilterError) -> Self {
        EmgError::Configuration {
            component: "filter_design".to_string(),
            reason: err.to_string(),
            context: error_context!("filter_design", "design"),
        }
    }
}

/// Conversion from configuration loading errors
impl From<crate::config::loader::ConfigError> for EmgError {
    fn from(err: crate::config::loader::ConfigError) -> Self {
        EmgError::Configuration {
            component: "config_loader".to_string(),
            reason: err.to_string(),
            context: error_context!("config_loader", "load"),
        }
    }
}

/// Result type alias for crate operations
pub type EmgResult<T> = Result<T, EmgError>;

/// Error builder for convenient error construction
pub struct EmgErrorBuilder {
    component: String,
    operation: String,
}

impl EmgErrorBuilder {
    pub fn new(component: &str, operation: &str) -> Self {
        Self {
            component: component.to_string(),
            operation: operation.to_string(),
        }
    }

    pub fn configuration(self, reason: impl Into<String>) -> EmgError {
        let context = ErrorContext::new(&self.component, &self.operation);
        EmgError::Configuration {
            component: self.component,
            reason: reason.into(),
            context,
        }
    }

    pub fn data_format(self, reason: impl Into<String>) -> EmgError {
        EmgError::DataFormat {
            file_id: None,
            reason: reason.into(),
            expected: None,
            actual: None,
            context: ErrorContext::new(&self.component, &self.operation),
        }
    }

    pub fn data_mismatch(
        self,
        reason: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> EmgError {
        EmgError::DataFormat {
            file_id: None,
            reason: reason.into(),
            expected: Some(expected.into()),
            actual: Some(actual.into()),
            context: ErrorContext::new(&self.component, &self.operation),
        }
    }
}
