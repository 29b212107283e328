//! KV entry (§3). Point get, put-with-TTL, prefix scan, delete-by-expiry.
//! No user-facing delete — lifecycle is TTL-governed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KvEntry {
    pub key: String,
    pub value: serde_json::Value,
    pub expires_at: Option<DateTime<Utc>>,
}

impl KvEntry {
    pub fn new(key: impl Into<String>, value: serde_json::Value, ttl_seconds: Option<u64>) -> Self {
        Self {
            key: key.into(),
            value,
            expires_at: ttl_seconds.map(|s| Utc::now() + chrono::Duration::seconds(s as i64)),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|exp| exp <= now).unwrap_or(false)
    }
}

/// Reverse-name entry value (§3, §4.2, §6 storage layout).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReverseNameEntry {
    pub entity_id: uuid::Uuid,
    pub entity_type: String,
    pub table_name: String,
    pub tenant_id: String,
}

impl ReverseNameEntry {
    /// `"<tenant_id>/<name>/<entity_type>"` per §4.2/§6 — reproduced exactly
    /// from `original_source`'s `rem_parser.py` reverse-mapping scheme.
    pub fn key(tenant_id: &str, name: &str, entity_type: &str) -> String {
        format!("{tenant_id}/{name}/{entity_type}")
    }

    /// Prefix used by type-agnostic LOOKUP's KV scan.
    pub fn scan_prefix(tenant_id: &str, name: &str) -> String {
        format!("{tenant_id}/{name}/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_matches_spec_literal_format() {
        assert_eq!(
            ReverseNameEntry::key("tenant-a", "my-project-alpha", "resource"),
            "tenant-a/my-project-alpha/resource"
        );
    }

    #[test]
    fn ttl_entry_expires_after_window() {
        let entry = KvEntry::new("k", serde_json::json!("v"), Some(1));
        assert!(!entry.is_expired(Utc::now()));
        assert!(entry.is_expired(Utc::now() + chrono::Duration::seconds(2)));
    }

    #[test]
    fn no_ttl_never_expires() {
        let entry = KvEntry::new("k", serde_json::json!("v"), None);
        assert!(!entry.is_expired(Utc::now() + chrono::Duration::days(3650)));
    }
}
