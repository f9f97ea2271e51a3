//! mlconfig: hierarchical configuration loading for machine-learning projects
//!
//! Loads YAML, JSON, TOML and Python-syntax config files into one ordered
//! mapping. A file may list base files under the reserved `_base_` key; bases
//! are loaded recursively, relative to the declaring file, and the file's own
//! keys override everything it inherits.
//!
//! ```no_run
//! let config = mlconfig::load_config("configs/train.py")?;
//! let lr = &config["lr"];
//! assert_eq!(config.get_path("lr"), Some(lr));
//! # Ok::<(), mlconfig::ConfigError>(())
//! ```

pub mod config;
pub mod dump;
pub mod error;
pub mod format;
pub mod utils;

pub use config::{load_config, Config, Configurator};
pub use error::{ConfigError, Result};
pub use format::{ConfigSource, Format, FormatFamily};
