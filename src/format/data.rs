//! YAML, JSON and TOML parsing into the shared value model

use crate::error::{ConfigError, Result};
use crate::format::Format;
use serde_json::{Map, Number, Value};
use std::path::Path;

/// Parse a YAML document. An empty document is an empty mapping.
pub fn parse_yaml(content: &str, path: &Path) -> Result<Map<String, Value>> {
    let mut raw: serde_yaml::Value = serde_yaml::from_str(content)
        .map_err(|e| ConfigError::parse(path, Format::Yaml, e.to_string()))?;
    raw.apply_merge().map_err(|e| ConfigError::parse(path, Format::Yaml, e.to_string()))?;

    let value = yaml_to_json(raw).map_err(|msg| ConfigError::parse(path, Format::Yaml, msg))?;
    top_level_mapping(value, path, Format::Yaml)
}

pub fn parse_json(content: &str, path: &Path) -> Result<Map<String, Value>> {
    let value: Value = serde_json::from_str(content)
        .map_err(|e| ConfigError::parse(path, Format::Json, e.to_string()))?;
    top_level_mapping(value, path, Format::Json)
}

/// Parse a TOML document. Datetimes become their RFC 3339 text.
pub fn parse_toml(content: &str, path: &Path) -> Result<Map<String, Value>> {
    let table: toml::Table = toml::from_str(content)
        .map_err(|e| ConfigError::parse(path, Format::Toml, e.to_string()))?;

    let value = toml_to_json(toml::Value::Table(table))
        .map_err(|msg| ConfigError::parse(path, Format::Toml, msg))?;
    top_level_mapping(value, path, Format::Toml)
}

fn top_level_mapping(value: Value, path: &Path, format: Format) -> Result<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(ConfigError::parse(
            path,
            format,
            format!("top level must be a mapping, found {}", value_kind(&other)),
        )),
    }
}

pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}

pub(crate) fn float_value(f: f64) -> std::result::Result<Value, String> {
    Number::from_f64(f).map(Value::Number).ok_or_else(|| format!("non-finite float {f} is not supported"))
}

fn yaml_to_json(value: serde_yaml::Value) -> std::result::Result<Value, String> {
    use serde_yaml::Value as Yaml;

    Ok(match value {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Bool(b),
        Yaml::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                float_value(n.as_f64().unwrap_or(f64::NAN))?
            }
        }
        Yaml::String(s) => Value::String(s),
        Yaml::Sequence(items) => {
            Value::Array(items.into_iter().map(yaml_to_json).collect::<Result<_, _>>()?)
        }
        Yaml::Mapping(mapping) => {
            let mut map = Map::new();
            for (key, value) in mapping {
                map.insert(yaml_key(key)?, yaml_to_json(value)?);
            }
            Value::Object(map)
        }
        // Tags carry no meaning for config values; keep what they wrap.
        Yaml::Tagged(tagged) => yaml_to_json(tagged.value)?,
    })
}

/// Scalar keys are stringified (`0` becomes `"0"`); collection keys are rejected.
fn yaml_key(key: serde_yaml::Value) -> std::result::Result<String, String> {
    use serde_yaml::Value as Yaml;

    match key {
        Yaml::String(s) => Ok(s),
        Yaml::Number(n) => Ok(n.to_string()),
        Yaml::Bool(b) => Ok(b.to_string()),
        Yaml::Null => Ok("null".to_string()),
        Yaml::Tagged(tagged) => yaml_key(tagged.value),
        Yaml::Sequence(_) | Yaml::Mapping(_) => {
            Err("mapping keys must be scalars, found a collection".to_string())
        }
    }
}

fn toml_to_json(value: toml::Value) -> std::result::Result<Value, String> {
    use toml::Value as Toml;

    Ok(match value {
        Toml::String(s) => Value::String(s),
        Toml::Integer(i) => Value::from(i),
        Toml::Float(f) => float_value(f)?,
        Toml::Boolean(b) => Value::Bool(b),
        Toml::Datetime(dt) => Value::String(dt.to_string()),
        Toml::Array(items) => {
            Value::Array(items.into_iter().map(toml_to_json).collect::<Result<_, _>>()?)
        }
        Toml::Table(table) => {
            let mut map = Map::new();
            for (key, value) in table {
                map.insert(key, toml_to_json(value)?);
            }
            Value::Object(map)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path() -> &'static Path {
        Path::new("test-config")
    }

    #[test]
    fn yaml_keeps_nested_types_and_order() {
        let map = parse_yaml(
            "optimizer: Adam\nlearning_rate: 0.001\nlayers: [64, 128]\nuse_cuda: true\nnested:\n  b: 1\n  a: ~\n",
            path(),
        )
        .expect("yaml");
        assert_eq!(
            map.keys().collect::<Vec<_>>(),
            ["optimizer", "learning_rate", "layers", "use_cuda", "nested"]
        );
        assert_eq!(map["layers"], json!([64, 128]));
        assert_eq!(map["nested"], json!({"b": 1, "a": null}));
    }

    #[test]
    fn empty_yaml_is_empty_mapping() {
        assert!(parse_yaml("", path()).expect("yaml").is_empty());
        assert!(parse_yaml("# only a comment\n", path()).expect("yaml").is_empty());
    }

    #[test]
    fn yaml_top_level_sequence_is_rejected() {
        let err = parse_yaml("- a\n- b\n", path()).unwrap_err();
        assert!(err.to_string().contains("top level must be a mapping, found a sequence"));
    }

    #[test]
    fn yaml_scalar_keys_become_strings() {
        let map = parse_yaml(
            "class_names:\n  0: background\n  1: person\nflags:\n  true: on\n  ~: none\n",
            path(),
        )
        .expect("yaml");
        assert_eq!(map["class_names"], json!({"0": "background", "1": "person"}));
        assert_eq!(map["flags"], json!({"true": "on", "null": "none"}));
    }

    #[test]
    fn yaml_collection_keys_are_rejected() {
        let err = parse_yaml("? [a, b]\n: pair\n", path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { format: Format::Yaml, .. }));
        assert!(err.to_string().contains("must be scalars"));
    }

    #[test]
    fn yaml_merge_keys_are_applied() {
        let map = parse_yaml(
            "defaults: &d {lr: 0.1, bs: 32}\ntrain:\n  <<: *d\n  bs: 64\n",
            path(),
        )
        .expect("yaml");
        assert_eq!(map["train"], json!({"lr": 0.1, "bs": 64}));
        assert_eq!(map["defaults"], json!({"lr": 0.1, "bs": 32}));
    }

    #[test]
    fn yaml_tags_are_unwrapped() {
        let map = parse_yaml("name: !custom hello\n", path()).expect("yaml");
        assert_eq!(map["name"], json!("hello"));
    }

    #[test]
    fn malformed_yaml_is_parse_error() {
        let err = parse_yaml("a: [1, 2\n", path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { format: Format::Yaml, .. }));
    }

    #[test]
    fn json_object_parses() {
        let map = parse_json(r#"{"database": {"host": "localhost", "port": 5432}}"#, path())
            .expect("json");
        assert_eq!(map["database"]["port"], json!(5432));
    }

    #[test]
    fn json_scalar_top_level_is_rejected() {
        let err = parse_json("42", path()).unwrap_err();
        assert!(err.to_string().contains("found a number"));
    }

    #[test]
    fn toml_tables_and_datetimes() {
        let map = parse_toml(
            "name = \"run\"\nstarted = 1979-05-27T07:32:00Z\n[optim]\nlr = 0.01\nbetas = [0.9, 0.999]\n",
            path(),
        )
        .expect("toml");
        assert_eq!(map["started"], json!("1979-05-27T07:32:00Z"));
        assert_eq!(map["optim"], json!({"lr": 0.01, "betas": [0.9, 0.999]}));
    }

    #[test]
    fn toml_nan_is_rejected() {
        let err = parse_toml("x = nan\n", path()).unwrap_err();
        assert!(err.to_string().contains("non-finite"));
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        let err = parse_toml("x = \n", path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { format: Format::Toml, .. }));
    }
}
