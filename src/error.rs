//! Error taxonomy for config loading and dumping

use crate::format::Format;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub type Result<T, E = ConfigError> = std::result::Result<T, E>;

/// Everything that can go wrong while loading or writing a config.
///
/// Every load failure names the file it happened in. No partial config is
/// ever returned alongside an error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {}", .path.display())]
    FileNotFound { path: PathBuf },

    #[error("unsupported config extension '.{extension}' for file {}", .path.display())]
    UnsupportedFormat { path: PathBuf, extension: String },

    #[error("invalid {format} config {}: {message}", .path.display())]
    Parse { path: PathBuf, format: Format, message: String },

    #[error("circular base inheritance: {}", format_chain(.chain))]
    CircularInheritance { chain: Vec<PathBuf> },

    #[error("invalid base list in {}: {message}", .path.display())]
    InvalidBase { path: PathBuf, message: String },

    #[error("base inheritance deeper than {limit} levels at {}", .path.display())]
    InheritanceTooDeep { path: PathBuf, limit: usize },

    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write config as {format}: {message}")]
    Dump { format: Format, message: String },
}

impl ConfigError {
    pub(crate) fn parse(path: &Path, format: Format, message: impl Into<String>) -> Self {
        Self::Parse { path: path.to_path_buf(), format, message: message.into() }
    }

    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io { path: path.to_path_buf(), source }
    }

    /// The file the error is about, when there is a single one.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::FileNotFound { path }
            | Self::UnsupportedFormat { path, .. }
            | Self::Parse { path, .. }
            | Self::InvalidBase { path, .. }
            | Self::InheritanceTooDeep { path, .. }
            | Self::Io { path, .. } => Some(path),
            Self::CircularInheritance { chain } => chain.last().map(PathBuf::as_path),
            Self::Dump { .. } => None,
        }
    }
}

fn format_chain(chain: &[PathBuf]) -> String {
    chain.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circular_message_lists_chain_in_order() {
        let err = ConfigError::CircularInheritance {
            chain: vec![PathBuf::from("/cfg/a.py"), PathBuf::from("/cfg/b.py"), PathBuf::from("/cfg/a.py")],
        };
        assert_eq!(
            err.to_string(),
            "circular base inheritance: /cfg/a.py -> /cfg/b.py -> /cfg/a.py"
        );
        assert_eq!(err.path(), Some(Path::new("/cfg/a.py")));
    }

    #[test]
    fn parse_message_names_format_and_file() {
        let err = ConfigError::parse(Path::new("train.yaml"), Format::Yaml, "bad indent");
        assert_eq!(err.to_string(), "invalid YAML config train.yaml: bad indent");
    }

    #[test]
    fn dump_error_has_no_path() {
        let err = ConfigError::Dump { format: Format::Toml, message: "null value".into() };
        assert!(err.path().is_none());
    }
}
