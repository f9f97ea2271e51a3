//! The merged configuration object and how it is loaded
//!
//! `Config` is an ordered, immutable mapping. Values are read by key
//! (`config["lr"]`), by dotted path (`config.get_path("optim.lr")`) or as
//! typed views deserialized with serde.

pub mod loader;
pub mod merge;

pub use loader::{load_config, Configurator, DEFAULT_BASE_KEY, DEFAULT_MAX_DEPTH};
pub use merge::{merge_into, merge_layers};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::ops::Index;

static NULL: Value = Value::Null;

/// A fully merged configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Config {
    values: Map<String, Value>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Look up a value through nested mappings, e.g. `"data.train.resize"`.
    ///
    /// Numeric segments index into sequences (`"layers.0"`).
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.values.get(first)?;
        for segment in segments {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// A nested mapping as a config of its own.
    pub fn section(&self, key: &str) -> Option<Config> {
        match self.values.get(key)? {
            Value::Object(map) => Some(Config::from(map.clone())),
            _ => None,
        }
    }

    /// Deserialize a single key. `Ok(None)` when the key is absent.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> serde_json::Result<Option<T>> {
        self.values.get(key).map(|v| T::deserialize(v)).transpose()
    }

    /// Deserialize the whole config into a typed struct, so fields read the
    /// same values keys do.
    pub fn extract<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        T::deserialize(&self.to_value())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> serde_json::map::Iter<'_> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.values
    }

    /// The config as a plain JSON object value.
    pub fn to_value(&self) -> Value {
        Value::Object(self.values.clone())
    }

    /// A new config with `overlay` deep-merged on top of this one.
    pub fn merge(&self, overlay: &Config) -> Config {
        let mut values = self.values.clone();
        merge_into(&mut values, overlay.values.clone());
        Config { values }
    }
}

impl From<Map<String, Value>> for Config {
    fn from(values: Map<String, Value>) -> Self {
        Self { values }
    }
}

impl TryFrom<Value> for Config {
    type Error = Value;

    /// Only objects convert; anything else is handed back.
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(values) => Ok(Self { values }),
            other => Err(other),
        }
    }
}

/// Missing keys read as `Value::Null`.
impl Index<&str> for Config {
    type Output = Value;

    fn index(&self, key: &str) -> &Value {
        self.values.get(key).unwrap_or(&NULL)
    }
}

impl<'a> IntoIterator for &'a Config {
    type Item = (&'a String, &'a Value);
    type IntoIter = serde_json::map::Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Config {
        Config::try_from(json!({
            "learning_rate": 0.001,
            "layers": [64, 128, 256],
            "training_params": {"batch_size": 64, "epochs": 20},
            "data_transforms": {"train": {"normalize": true, "resize": [256, 256]}},
        }))
        .expect("object")
    }

    #[test]
    fn key_access_and_missing_keys() {
        let cfg = sample();
        assert_eq!(cfg["learning_rate"], json!(0.001));
        assert_eq!(cfg.get("learning_rate"), Some(&json!(0.001)));
        assert!(cfg["missing"].is_null());
        assert!(cfg.get("missing").is_none());
        assert!(cfg.contains_key("layers"));
        assert_eq!(cfg.len(), 4);
    }

    #[test]
    fn dotted_paths_walk_mappings_and_sequences() {
        let cfg = sample();
        assert_eq!(cfg.get_path("training_params.batch_size"), Some(&json!(64)));
        assert_eq!(cfg.get_path("data_transforms.train.resize.1"), Some(&json!(256)));
        assert_eq!(cfg.get_path("layers.2"), Some(&json!(256)));
        assert_eq!(cfg.get_path("layers.9"), None);
        assert_eq!(cfg.get_path("learning_rate.x"), None);
        assert_eq!(cfg.get_path("training_params"), cfg.get("training_params"));
    }

    #[test]
    fn sections_are_configs() {
        let cfg = sample();
        let train = cfg.section("data_transforms").and_then(|s| s.section("train")).expect("section");
        assert_eq!(train["normalize"], json!(true));
        assert!(cfg.section("layers").is_none());
    }

    #[test]
    fn typed_views_match_key_access() {
        #[derive(Deserialize)]
        struct Training {
            batch_size: u32,
            epochs: u32,
        }
        #[derive(Deserialize)]
        struct Run {
            learning_rate: f64,
            layers: Vec<u32>,
            training_params: Training,
        }

        let cfg = sample();
        let run: Run = cfg.extract().expect("extract");
        assert_eq!(json!(run.learning_rate), cfg["learning_rate"]);
        assert_eq!(json!(run.layers), cfg["layers"]);
        assert_eq!(run.training_params.batch_size, 64);
        assert_eq!(run.training_params.epochs, 20);

        let lr: Option<f64> = cfg.get_as("learning_rate").expect("typed");
        assert_eq!(lr, Some(0.001));
        let missing: Option<String> = cfg.get_as("missing").expect("typed");
        assert!(missing.is_none());
        assert!(cfg.get_as::<String>("layers").is_err());
    }

    #[test]
    fn merge_returns_new_config() {
        let base = sample();
        let overlay = Config::try_from(json!({"training_params": {"epochs": 5}})).expect("object");
        let merged = base.merge(&overlay);
        assert_eq!(merged.get_path("training_params.epochs"), Some(&json!(5)));
        assert_eq!(merged.get_path("training_params.batch_size"), Some(&json!(64)));
        assert_eq!(base.get_path("training_params.epochs"), Some(&json!(20)));
    }

    #[test]
    fn non_objects_do_not_convert() {
        assert_eq!(Config::try_from(json!([1, 2])), Err(json!([1, 2])));
    }

    #[test]
    fn serializes_as_plain_mapping() {
        let cfg = Config::try_from(json!({"a": 1})).expect("object");
        assert_eq!(serde_json::to_string(&cfg).expect("json"), r#"{"a":1}"#);
        let back: Config = serde_json::from_str(r#"{"a":1}"#).expect("json");
        assert_eq!(back, cfg);
    }
}
