//! Rendering configs as Python assignment files

use crate::config::Config;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").expect("valid identifier regex"));

const PYTHON_KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if",
    "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try",
    "while", "with", "yield",
];

/// One `key = literal` line per top-level key.
///
/// Keys must be public Python identifiers: underscore-prefixed names would be
/// dropped on reload.
pub fn render_python(config: &Config) -> Result<String, String> {
    let mut out = String::new();
    for (key, value) in config {
        if !IDENTIFIER_RE.is_match(key) || PYTHON_KEYWORDS.contains(&key.as_str()) {
            return Err(format!("'{key}' is not a public Python identifier"));
        }
        out.push_str(key);
        out.push_str(" = ");
        write_literal(&mut out, value);
        out.push('\n');
    }
    Ok(out)
}

fn write_literal(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("None"),
        Value::Bool(true) => out.push_str("True"),
        Value::Bool(false) => out.push_str("False"),
        Value::Number(n) => match (n.as_i64(), n.as_u64(), n.as_f64()) {
            (Some(i), _, _) => out.push_str(&i.to_string()),
            (None, Some(u), _) => out.push_str(&u.to_string()),
            // Debug formatting always keeps a decimal point or exponent
            (None, None, Some(f)) => out.push_str(&format!("{f:?}")),
            _ => out.push_str(&n.to_string()),
        },
        // JSON string escapes are all valid in Python string literals
        Value::String(s) => out.push_str(&Value::String(s.clone()).to_string()),
        Value::Array(items) => {
            out.push('[');
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    out.push_str(", ");
                }
                write_literal(out, item);
            }
            out.push(']');
        }
        Value::Object(map) => {
            out.push('{');
            for (idx, (key, item)) in map.iter().enumerate() {
                if idx > 0 {
                    out.push_str(", ");
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push_str(": ");
                write_literal(out, item);
            }
            out.push('}');
        }
    }
}
