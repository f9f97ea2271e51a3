//! Config file loading with base-file inheritance

use crate::config::merge::merge_layers;
use crate::config::Config;
use crate::error::{ConfigError, Result};
use crate::format::ConfigSource;
use crate::utils::resolve_base_path;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Reserved key listing the files a config inherits from.
pub const DEFAULT_BASE_KEY: &str = "_base_";

/// How many inheritance levels are followed below the loaded file.
/// Zero means the file may not declare any bases.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Load a config file with default options.
///
/// Equivalent to `Configurator::new().load(path)`.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config> {
    Configurator::new().load(path)
}

/// Loads config files of any supported format and resolves their bases.
///
/// Holds only immutable options, so one instance can serve concurrent loads.
#[derive(Debug, Clone)]
pub struct Configurator {
    base_key: String,
    max_depth: usize,
}

impl Default for Configurator {
    fn default() -> Self {
        Self::new()
    }
}

impl Configurator {
    /// Create a Configurator with default settings.
    pub fn new() -> Self {
        Self { base_key: DEFAULT_BASE_KEY.to_string(), max_depth: DEFAULT_MAX_DEPTH }
    }

    /// Set the reserved key that declares base files
    pub fn base_key(mut self, key: impl Into<String>) -> Self {
        self.base_key = key.into();
        self
    }

    /// Set the maximum inheritance depth
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Load `path`, merging every base it declares underneath its own keys.
    ///
    /// Bases are applied in listed order, so later bases override earlier
    /// ones and the file itself overrides them all.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<Config> {
        let mut state = LoadState::default();
        let (values, _) = self.load_node(path.as_ref(), &mut state)?;
        Ok(Config::from(values))
    }

    /// Load one file and its bases. Returns the merged mapping and the
    /// number of inheritance levels below it.
    fn load_node(&self, path: &Path, state: &mut LoadState) -> Result<(Map<String, Value>, usize)> {
        let source = ConfigSource::resolve(path)?;
        let depth = state.stack.len();

        if state.stack.iter().any(|p| p == source.path()) {
            let mut chain = state.stack.clone();
            chain.push(source.path().to_path_buf());
            return Err(ConfigError::CircularInheritance { chain });
        }

        if let Some((values, height)) = state.resolved.get(source.path()) {
            self.check_depth(&source, depth + height)?;
            tracing::trace!("Reusing resolved config {}", source.path().display());
            return Ok((values.clone(), *height));
        }
        self.check_depth(&source, depth)?;

        tracing::debug!("Loading {} config {}", source.format(), source.path().display());
        let mut node = source.read(&self.base_key)?;
        let bases = take_bases(&mut node, &self.base_key, source.path())?;

        state.stack.push(source.path().to_path_buf());
        let mut layers = Vec::with_capacity(bases.len() + 1);
        let mut height = 0;
        for base in &bases {
            let base_path = resolve_base_path(source.dir(), base);
            tracing::debug!("{} inherits from {}", source.path().display(), base_path.display());
            let (values, base_height) = self.load_node(&base_path, state)?;
            height = height.max(base_height + 1);
            layers.push(values);
        }
        state.stack.pop();

        layers.push(node);
        let values = merge_layers(layers);
        state.resolved.insert(source.path().to_path_buf(), (values.clone(), height));
        Ok((values, height))
    }

    fn check_depth(&self, source: &ConfigSource, depth: usize) -> Result<()> {
        if depth > self.max_depth {
            return Err(ConfigError::InheritanceTooDeep {
                path: source.path().to_path_buf(),
                limit: self.max_depth,
            });
        }
        Ok(())
    }
}

/// Bookkeeping for a single `load` call.
#[derive(Default)]
struct LoadState {
    /// Files currently being loaded, outermost first.
    stack: Vec<PathBuf>,
    /// Fully merged files, so a base shared by several branches is read once.
    resolved: HashMap<PathBuf, (Map<String, Value>, usize)>,
}

/// Remove the reserved key from `node` and return the base references it
/// held. A single string counts as a one-element list; null means none.
fn take_bases(node: &mut Map<String, Value>, base_key: &str, path: &Path) -> Result<Vec<String>> {
    let invalid = |message: String| ConfigError::InvalidBase { path: path.to_path_buf(), message };

    match node.remove(base_key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(base)) => Ok(vec![base]),
        Some(Value::Array(items)) => items
            .into_iter()
            .enumerate()
            .map(|(idx, item)| match item {
                Value::String(base) => Ok(base),
                other => Err(invalid(format!("entry {idx} must be a file path, found {other}"))),
            })
            .collect(),
        Some(other) => {
            Err(invalid(format!("'{base_key}' must be a path or a list of paths, found {other}")))
        }
    }
}
