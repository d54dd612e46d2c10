use std::fmt;
use std::path::Path;

use polars::error::PolarsError;

use crate::fits::FitsReadError;

pub type Result<T> = std::result::Result<T, PrepError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrepErrorKind {
    Io,
    NotFound,
    Validation,
    Fits,
    Unsupported,
    Polars,
    Config,
}

impl fmt::Display for PrepErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrepErrorKind::Io => write!(f, "io error"),
            PrepErrorKind::NotFound => write!(f, "not found"),
            PrepErrorKind::Validation => write!(f, "invalid input"),
            PrepErrorKind::Fits => write!(f, "FITS error"),
            PrepErrorKind::Unsupported => write!(f, "unsupported"),
            PrepErrorKind::Polars => write!(f, "dataframe error"),
            PrepErrorKind::Config => write!(f, "config error"),
        }
    }
}

/// Error carrying a kind, a message, `key=value` context pairs and the
/// underlying cause.
#[derive(Debug)]
pub struct PrepError {
    pub kind: PrepErrorKind,
    pub message: String,
    pub context: Vec<(String, String)>,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl PrepError {
    fn new(kind: PrepErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            context: Vec::new(),
            source: None,
        }
    }

    fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn io(operation: &str, source: std::io::Error) -> Self {
        let kind = if source.kind() == std::io::ErrorKind::NotFound {
            PrepErrorKind::NotFound
        } else {
            PrepErrorKind::Io
        };
        Self::new(kind, format!("{operation} failed"))
            .with_context("operation", operation)
            .with_source(source)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(PrepErrorKind::NotFound, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(PrepErrorKind::Validation, message)
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::new(PrepErrorKind::Unsupported, message)
    }

    pub fn polars(message: impl Into<String>, source: PolarsError) -> Self {
        Self::new(PrepErrorKind::Polars, message).with_source(source)
    }

    pub fn config_load(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::new(PrepErrorKind::Config, "cannot read config file")
            .with_context("path", path.as_ref().display().to_string())
            .with_source(source)
    }

    pub fn config_parse(path: impl AsRef<Path>, message: impl Into<String>) -> Self {
        Self::new(PrepErrorKind::Config, message)
            .with_context("path", path.as_ref().display().to_string())
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.push((key.into(), value.into()));
        self
    }

    pub fn kind(&self) -> PrepErrorKind {
        self.kind
    }

    pub fn context_value(&self, key: &str) -> Option<&str> {
        self.context
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for PrepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        for (k, v) in &self.context {
            write!(f, " [{}={}]", k, v)?;
        }
        if let Some(ref s) = self.source {
            write!(f, " (cause: {})", s)?;
        }
        Ok(())
    }
}

impl std::error::Error for PrepError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|b| b.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl From<FitsReadError> for PrepError {
    fn from(e: FitsReadError) -> Self {
        match e {
            FitsReadError::Io(io) => PrepError::io("read_fits", io),
            FitsReadError::Unsupported(msg) => PrepError::unsupported(msg),
            other => PrepError::new(PrepErrorKind::Fits, other.to_string()),
        }
    }
}

impl From<PolarsError> for PrepError {
    fn from(e: PolarsError) -> Self {
        PrepError::polars("dataframe operation failed", e)
    }
}
