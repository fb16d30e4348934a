//! Layer metadata
//!
//! A layer can carry any number of metadata records. Records are plain
//! string-keyed maps. When a failure context is built for a layer, its
//! records are looked up through a [`MetadataProvider`] and folded into a
//! single map, later records overriding earlier keys.

use crate::layer::Layer;
use serde_json::Value;

mod registry;

pub use registry::MetadataRegistry;

/// One metadata record
pub type Metadata = serde_json::Map<String, Value>;

/// Build a record from key/value pairs
pub fn record<I, K, V>(entries: I) -> Metadata
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    entries
        .into_iter()
        .map(|(key, value)| (key.into(), value.into()))
        .collect()
}

/// Left-fold records into one map. On key conflicts the later record wins.
pub fn merge<I>(records: I) -> Metadata
where
    I: IntoIterator<Item = Metadata>,
{
    records
        .into_iter()
        .fold(Metadata::new(), |mut merged, record| {
            merged.extend(record);
            merged
        })
}

/// Looks up the metadata records attached to a layer
pub trait MetadataProvider<T>: Send + Sync + 'static {
    /// All records for `layer`, in declaration order
    fn lookup(&self, layer: &dyn Layer<T>) -> Vec<Metadata>;

    /// The merged view of [`lookup`](Self::lookup)
    fn resolve(&self, layer: &dyn Layer<T>) -> Metadata {
        merge(self.lookup(layer))
    }
}

/// Reads the records a layer declares on itself through [`Layer::metadata`]
#[derive(Debug, Clone, Copy, Default)]
pub struct Declared;

impl<T: 'static> MetadataProvider<T> for Declared {
    fn lookup(&self, layer: &dyn Layer<T>) -> Vec<Metadata> {
        layer.metadata()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::map_fn;
    use serde_json::json;

    #[test]
    fn test_merge_later_keys_win() {
        let merged = merge([
            record([("one", "One"), ("shared", "first")]),
            record([("two", "Two")]),
            record([("shared", "last")]),
        ]);

        assert_eq!(
            Value::Object(merged),
            json!({ "one": "One", "two": "Two", "shared": "last" })
        );
    }

    #[test]
    fn test_merge_of_nothing_is_empty() {
        assert!(merge(Vec::new()).is_empty());
    }

    #[test]
    fn test_declared_provider_reads_layer_records() {
        let layer = map_fn(|n: i32| n)
            .with_metadata([("one", "One"), ("two", "Two")])
            .with_metadata([("three", "Three")])
            .with_metadata([("four", "Four")]);

        let records = MetadataProvider::<i32>::lookup(&Declared, &layer);
        assert_eq!(records.len(), 3);

        let resolved = MetadataProvider::<i32>::resolve(&Declared, &layer);
        assert_eq!(
            Value::Object(resolved),
            json!({ "one": "One", "two": "Two", "three": "Three", "four": "Four" })
        );
    }
}
