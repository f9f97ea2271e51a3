//! Config file formats and extension-based parser dispatch
//!
//! Each format maps to a pure parse function that turns file text into an
//! ordered mapping. The reserved base key is left in the mapping; the loader
//! strips it.

use crate::error::{ConfigError, Result};
use crate::utils::decode_config_bytes;
use serde_json::{Map, Value};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub mod data;
pub mod python;

/// A supported config file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Yaml,
    Json,
    Toml,
    Python,
}

/// Broad family a format belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatFamily {
    /// Nested mappings with typed scalars and lists (YAML).
    StructuredData,
    /// Declarative key-value documents (JSON, TOML).
    KeyValue,
    /// Python-syntax files made of top-level assignments.
    Scriptable,
}

impl Format {
    pub const ALL: [Format; 4] = [Format::Yaml, Format::Json, Format::Toml, Format::Python];

    /// Look up a format by file extension, without the leading dot.
    /// Matching is case-insensitive.
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_ascii_lowercase();
        Self::ALL.into_iter().find(|format| format.extensions().contains(&ext.as_str()))
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension().and_then(|e| e.to_str()).and_then(Self::from_extension)
    }

    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Self::Yaml => &["yaml", "yml"],
            Self::Json => &["json"],
            Self::Toml => &["toml"],
            Self::Python => &["py"],
        }
    }

    pub fn family(self) -> FormatFamily {
        match self {
            Self::Yaml => FormatFamily::StructuredData,
            Self::Json | Self::Toml => FormatFamily::KeyValue,
            Self::Python => FormatFamily::Scriptable,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Yaml => "YAML",
            Self::Json => "JSON",
            Self::Toml => "TOML",
            Self::Python => "Python",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parse config text of the given format into a mapping.
///
/// `path` is only used for error messages. `base_key` tells the Python
/// parser which underscore-prefixed name to keep.
pub fn parse_str(
    format: Format,
    content: &str,
    path: &Path,
    base_key: &str,
) -> Result<Map<String, Value>> {
    match format {
        Format::Yaml => data::parse_yaml(content, path),
        Format::Json => data::parse_json(content, path),
        Format::Toml => data::parse_toml(content, path),
        Format::Python => python::parse_python(content, path, base_key),
    }
}

/// A config file that exists on disk and has a recognized format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSource {
    path: PathBuf,
    format: Format,
}

impl ConfigSource {
    /// Check that `path` has a known extension and is an existing file, and
    /// canonicalize it so that the same file is always named the same way.
    ///
    /// The extension is checked first: an unknown format is reported as
    /// `UnsupportedFormat` even when the file does not exist.
    pub fn resolve(path: &Path) -> Result<Self> {
        let format = Format::from_path(path).ok_or_else(|| ConfigError::UnsupportedFormat {
            path: path.to_path_buf(),
            extension: path
                .extension()
                .map(|e| e.to_string_lossy().into_owned())
                .unwrap_or_default(),
        })?;

        if !path.is_file() {
            return Err(ConfigError::FileNotFound { path: path.to_path_buf() });
        }

        let path = fs::canonicalize(path).map_err(|e| ConfigError::io(path, e))?;
        Ok(Self { path, format })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn family(&self) -> FormatFamily {
        self.format.family()
    }

    /// Directory that relative base references are resolved against.
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }

    /// Read, decode and parse the file.
    pub fn read(&self, base_key: &str) -> Result<Map<String, Value>> {
        let bytes = fs::read(&self.path).map_err(|e| ConfigError::io(&self.path, e))?;
        let decoded = decode_config_bytes(&bytes).ok_or_else(|| {
            ConfigError::parse(&self.path, self.format, "file looks binary (contains NUL bytes)")
        })?;
        if decoded.encoding != "UTF-8" {
            tracing::warn!(
                "Decoded {} as {} instead of UTF-8",
                self.path.display(),
                decoded.encoding
            );
        }
        parse_str(self.format, &decoded.content, &self.path, base_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn detects_formats_by_extension() {
        assert_eq!(Format::from_path(Path::new("a/train.yaml")), Some(Format::Yaml));
        assert_eq!(Format::from_path(Path::new("train.YML")), Some(Format::Yaml));
        assert_eq!(Format::from_path(Path::new("train.json")), Some(Format::Json));
        assert_eq!(Format::from_path(Path::new("train.toml")), Some(Format::Toml));
        assert_eq!(Format::from_path(Path::new("train.py")), Some(Format::Python));
        assert_eq!(Format::from_path(Path::new("train.ini")), None);
        assert_eq!(Format::from_path(Path::new("Makefile")), None);
    }

    #[test]
    fn families_group_formats() {
        assert_eq!(Format::Yaml.family(), FormatFamily::StructuredData);
        assert_eq!(Format::Json.family(), FormatFamily::KeyValue);
        assert_eq!(Format::Toml.family(), FormatFamily::KeyValue);
        assert_eq!(Format::Python.family(), FormatFamily::Scriptable);
    }

    #[test]
    fn resolve_missing_file_is_not_found() {
        let tmp = TempDir::new().expect("tmp");
        let err = ConfigSource::resolve(&tmp.path().join("missing.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }

    #[test]
    fn resolve_directory_is_not_found() {
        let tmp = TempDir::new().expect("tmp");
        let dir = tmp.path().join("conf.yaml");
        fs::create_dir(&dir).expect("mkdir");
        let err = ConfigSource::resolve(&dir).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }

    #[test]
    fn resolve_unknown_extension_is_unsupported() {
        let tmp = TempDir::new().expect("tmp");
        let path = tmp.path().join("settings.ini");
        fs::write(&path, "[a]\nb = 1\n").expect("write");
        match ConfigSource::resolve(&path).unwrap_err() {
            ConfigError::UnsupportedFormat { extension, .. } => assert_eq!(extension, "ini"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn resolve_checks_extension_before_existence() {
        let tmp = TempDir::new().expect("tmp");
        match ConfigSource::resolve(&tmp.path().join("x.ini")).unwrap_err() {
            ConfigError::UnsupportedFormat { extension, .. } => assert_eq!(extension, "ini"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn read_rejects_binary_content() {
        let tmp = TempDir::new().expect("tmp");
        let path = tmp.path().join("weights.json");
        fs::write(&path, [0x7b, 0x00, 0x01, 0x7d]).expect("write");
        let source = ConfigSource::resolve(&path).expect("resolve");
        let err = source.read("_base_").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { format: Format::Json, .. }));
    }

    #[test]
    fn read_strips_utf8_bom() {
        let tmp = TempDir::new().expect("tmp");
        let path = tmp.path().join("bom.json");
        let mut bytes = vec![0xef, 0xbb, 0xbf];
        bytes.extend_from_slice(br#"{"lr": 0.1}"#);
        fs::write(&path, bytes).expect("write");
        let source = ConfigSource::resolve(&path).expect("resolve");
        assert_eq!(source.family(), FormatFamily::KeyValue);
        let map = source.read("_base_").expect("read");
        assert_eq!(map["lr"], serde_json::json!(0.1));
    }
}
