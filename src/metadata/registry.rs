use crate::layer::Layer;
use crate::metadata::{Metadata, MetadataProvider};
use dashmap::DashMap;
use std::sync::Arc;

/// Metadata side table keyed by layer name.
///
/// Use this when records cannot be declared on the layer type itself, for
/// example for layers from another crate. A lookup returns the layer's own
/// declared records first, then the registered ones in registration order.
#[derive(Clone, Default)]
pub struct MetadataRegistry {
    records: Arc<DashMap<String, Vec<Metadata>>>,
}

impl MetadataRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a record for the layer reporting `name`
    pub fn declare(&self, name: impl Into<String>, record: Metadata) -> &Self {
        self.records.entry(name.into()).or_default().push(record);
        self
    }

    /// Register a record for every layer of type `L` that keeps the default name
    pub fn declare_for<L: ?Sized + 'static>(&self, record: Metadata) -> &Self {
        self.declare(std::any::type_name::<L>(), record)
    }

    /// Records registered under `name`, without the layer's declared ones
    pub fn registered(&self, name: &str) -> Vec<Metadata> {
        self.records
            .get(name)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<T: 'static> MetadataProvider<T> for MetadataRegistry {
    fn lookup(&self, layer: &dyn Layer<T>) -> Vec<Metadata> {
        let mut records = layer.metadata();
        records.extend(self.registered(layer.name()));
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::{LayerResult, map_fn};
    use crate::metadata::record;
    use serde_json::{Value, json};

    struct Tokenize;

    impl Layer<String> for Tokenize {
        fn invoke(&self, value: String) -> LayerResult<String> {
            Ok(value)
        }
    }

    #[test]
    fn test_declare_for_type_name() {
        let registry = MetadataRegistry::new();
        registry.declare_for::<Tokenize>(record([("stage", "lexing")]));

        assert!(registry.contains(std::any::type_name::<Tokenize>()));
        assert_eq!(registry.len(), 1);

        let resolved = MetadataProvider::<String>::resolve(&registry, &Tokenize);
        assert_eq!(Value::Object(resolved), json!({ "stage": "lexing" }));
    }

    #[test]
    fn test_registered_records_follow_declared_ones() {
        let registry = MetadataRegistry::new();
        registry
            .declare("trim", record([("owner", "registry")]))
            .declare("trim", record([("retries", json!(2))]));

        let layer = map_fn(|s: String| s.trim().to_owned())
            .named("trim")
            .with_metadata([("owner", "layer"), ("stage", "clean")]);

        let records = MetadataProvider::<String>::lookup(&registry, &layer);
        assert_eq!(records.len(), 3);

        let resolved = MetadataProvider::<String>::resolve(&registry, &layer);
        assert_eq!(
            Value::Object(resolved),
            json!({ "owner": "registry", "stage": "clean", "retries": 2 })
        );
    }

    #[test]
    fn test_unknown_layer_has_no_registered_records() {
        let registry = MetadataRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.registered("missing").is_empty());
    }
}
