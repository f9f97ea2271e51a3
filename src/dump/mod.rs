//! Writing configs back to disk
//!
//! Any loaded config can be rendered in every supported format. What
//! `dump` writes, `load_config` reads back to an equal config.

use crate::config::Config;
use crate::error::{ConfigError, Result};
use crate::format::Format;
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::Path;

pub mod python;

impl Config {
    /// Render the config as text in `format`.
    pub fn render(&self, format: Format) -> Result<String> {
        let dump_err = |message: String| ConfigError::Dump { format, message };

        match format {
            Format::Json => render_json(self).map_err(|e| dump_err(e.to_string())),
            Format::Yaml => serde_yaml::to_string(self.as_map()).map_err(|e| dump_err(e.to_string())),
            Format::Toml => {
                if let Some(key) = find_null(self) {
                    return Err(dump_err(format!("TOML cannot represent null (at '{key}')")));
                }
                toml::to_string(self.as_map()).map_err(|e| dump_err(e.to_string()))
            }
            Format::Python => python::render_python(self).map_err(dump_err),
        }
    }

    /// Write the config to `path`, picking the format from its extension.
    pub fn dump(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let format = Format::from_path(path).ok_or_else(|| ConfigError::UnsupportedFormat {
            path: path.to_path_buf(),
            extension: path
                .extension()
                .map(|e| e.to_string_lossy().into_owned())
                .unwrap_or_default(),
        })?;
        self.dump_as(path, format)
    }

    /// Write the config to `path` in an explicit format.
    pub fn dump_as(&self, path: impl AsRef<Path>, format: Format) -> Result<()> {
        let path = path.as_ref();
        let content = self.render(format)?;
        fs::write(path, content).map_err(|e| ConfigError::io(path, e))?;
        tracing::debug!("Wrote {} config {}", format, path.display());
        Ok(())
    }
}

/// Pretty JSON with four-space indentation.
fn render_json(config: &Config) -> serde_json::Result<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    config.serialize(&mut serializer)?;
    buf.push(b'\n');
    // serde_json only ever writes UTF-8
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Dotted path of the first null value, if any.
fn find_null(config: &Config) -> Option<String> {
    fn walk(value: &Value, path: &str) -> Option<String> {
        match value {
            Value::Null => Some(path.to_string()),
            Value::Array(items) => items
                .iter()
                .enumerate()
                .find_map(|(idx, item)| walk(item, &format!("{path}.{idx}"))),
            Value::Object(map) => map.iter().find_map(|(k, v)| walk(v, &format!("{path}.{k}"))),
            _ => None,
        }
    }
    config.iter().find_map(|(key, value)| walk(value, key))
}
