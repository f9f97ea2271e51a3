//! Configuration merge logic
//!
//! Merge semantics, applied key by key:
//! - Mappings: deep-merge (recursive)
//! - Sequences: REPLACE (overlay wins entirely)
//! - Scalars and mismatched types: override (overlay wins)
//! - Null: override (null can replace any value)

use serde_json::{Map, Value};

/// Merge `overlay` on top of `base` in place.
///
/// Keys already in `base` keep their position; new keys are appended in
/// overlay order.
pub fn merge_into(base: &mut Map<String, Value>, overlay: Map<String, Value>) {
    for (key, overlay_value) in overlay {
        if let Some(existing) = base.get_mut(&key) {
            match (existing, overlay_value) {
                (Value::Object(existing), Value::Object(incoming)) => {
                    merge_into(existing, incoming);
                }
                (slot, value) => *slot = value,
            }
        } else {
            base.insert(key, overlay_value);
        }
    }
}

/// Merge layers in order: the first is the base, the last has the highest
/// precedence.
pub fn merge_layers<I>(layers: I) -> Map<String, Value>
where
    I: IntoIterator<Item = Map<String, Value>>,
{
    layers.into_iter().fold(Map::new(), |mut acc, layer| {
        tracing::trace!(keys = layer.len(), "Merging config layer");
        merge_into(&mut acc, layer);
        acc
    })
}
