//! In-memory cache of registered [`ModelDescriptor`]s, avoiding a `__schemas`
//! column-family read on every row operation. Schemas are registered rarely
//! and read constantly, so a plain `RwLock<HashMap>` with an LRU eviction
//! order outperforms anything fancier here — there are at most a handful of
//! tables per tenant-shared database.

use crate::types::ModelDescriptor;
use std::collections::HashMap;
use std::sync::RwLock;

pub struct SchemaCache {
    inner: RwLock<Inner>,
    capacity: usize,
}

struct Inner {
    entries: HashMap<String, ModelDescriptor>,
    /// Most-recently-used table names, back to front.
    order: Vec<String>,
}

impl SchemaCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: RwLock::new(Inner { entries: HashMap::new(), order: Vec::new() }),
            capacity,
        }
    }

    pub fn put(&self, table_name: String, descriptor: ModelDescriptor) {
        let mut inner = self.inner.write().unwrap();
        if !inner.entries.contains_key(&table_name) && inner.entries.len() >= self.capacity {
            if let Some(oldest) = inner.order.first().cloned() {
                inner.entries.remove(&oldest);
                inner.order.remove(0);
            }
        }
        inner.order.retain(|n| n != &table_name);
        inner.order.push(table_name.clone());
        inner.entries.insert(table_name, descriptor);
    }

    pub fn get(&self, table_name: &str) -> Option<ModelDescriptor> {
        let mut inner = self.inner.write().unwrap();
        let descriptor = inner.entries.get(table_name).cloned();
        if descriptor.is_some() {
            inner.order.retain(|n| n != table_name);
            inner.order.push(table_name.to_string());
        }
        descriptor
    }

    pub fn all(&self) -> Vec<ModelDescriptor> {
        self.inner.read().unwrap().entries.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(name: &str) -> ModelDescriptor {
        ModelDescriptor {
            table_name: name.to_string(),
            primary_key_field: "id".to_string(),
            embedding_fields: vec![],
            nameable_fields: vec![],
            tenant_isolated: true,
            entity_type: name.to_string(),
        }
    }

    #[test]
    fn evicts_least_recently_used_when_full() {
        let cache = SchemaCache::new(2);
        cache.put("a".into(), descriptor("a"));
        cache.put("b".into(), descriptor("b"));
        cache.get("a");
        cache.put("c".into(), descriptor("c"));

        assert!(cache.get("a").is_some());
        assert!(cache.get("b").is_none());
        assert!(cache.get("c").is_some());
    }
}
