//! Shared helpers for reading config files

pub mod encoding;
pub mod paths;

pub use encoding::{decode_config_bytes, DecodedText};
pub use paths::{normalize_path, resolve_base_path};
