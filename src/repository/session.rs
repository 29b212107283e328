//! Message compression (§4.4 SUPPLEMENT, grounded in
//! `test_session_reload_integration.py`): any stored message whose content
//! exceeds `RemConfig::message_compression_length` characters is rewritten
//! in place as a `REM LOOKUP` stub, with the full text moved to a KV
//! sidecar at `"session-{session_id}-msg-{index}"`. The trigger is each
//! message's own length, not the session's aggregate size. System-role
//! messages are never compressed — they carry instructions a compressed
//! stub would corrupt.

use crate::error::Result;
use crate::storage::StorageProvider;
use crate::types::{KvEntry, Message};
use std::sync::Arc;
use uuid::Uuid;

pub struct MessageCompressor {
    storage: Arc<dyn StorageProvider>,
    threshold: usize,
}

impl MessageCompressor {
    pub fn new(storage: Arc<dyn StorageProvider>, threshold: usize) -> Self {
        Self { storage, threshold }
    }

    fn sidecar_key(session_id: Uuid, index: usize) -> String {
        format!("session-{session_id}-msg-{index}")
    }

    /// Compresses every non-system message whose own content exceeds the
    /// configured threshold. Returns the (possibly rewritten) message list;
    /// callers persist it back onto the `Session` row.
    pub async fn compress(&self, session_id: Uuid, mut messages: Vec<Message>) -> Result<Vec<Message>> {
        for (index, message) in messages.iter_mut().enumerate() {
            if message._compressed || message.role == "system" {
                continue;
            }
            if message.content.len() <= self.threshold {
                continue;
            }

            let original_length = message.content.len();
            let entity_key = Self::sidecar_key(session_id, index);

            let sidecar = serde_json::json!({"role": message.role, "content": message.content});
            self.storage.kv_put(KvEntry::new(entity_key.clone(), sidecar, None)).await?;

            message.content = format!("REM LOOKUP {entity_key}");
            message._compressed = true;
            message._entity_key = Some(entity_key);
            message._original_length = Some(original_length);
        }

        Ok(messages)
    }

    /// Reverses compression for display/LLM-context purposes: expands every
    /// compressed message back to its original content by resolving its
    /// KV sidecar. Leaves the stored (compressed) messages untouched.
    pub async fn expand(&self, messages: &[Message]) -> Result<Vec<Message>> {
        let mut out = Vec::with_capacity(messages.len());
        for message in messages {
            if let Some(key) = &message._entity_key {
                if let Some(value) = self.storage.kv_get(key).await? {
                    let content = value.get("content").and_then(|v| v.as_str()).unwrap_or(&message.content).to_string();
                    let mut expanded = message.clone();
                    expanded.content = content;
                    out.push(expanded);
                    continue;
                }
            }
            out.push(message.clone());
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::RocksStorage;

    async fn test_storage() -> Arc<dyn StorageProvider> {
        let dir = tempfile::tempdir().unwrap();
        let storage = RocksStorage::open(dir.path()).await.unwrap();
        std::mem::forget(dir);
        Arc::new(storage)
    }

    #[tokio::test]
    async fn compresses_only_messages_over_their_own_threshold() {
        let storage = test_storage().await;
        let compressor = MessageCompressor::new(storage.clone(), 50);
        let session_id = Uuid::new_v4();

        let messages = vec![
            Message::new("system", "you are a helpful assistant with a long preamble that stays put"),
            Message::new("user", "a".repeat(200)),
            Message::new("assistant", "short reply"),
        ];

        let compressed = compressor.compress(session_id, messages).await.unwrap();
        assert_eq!(compressed[0].role, "system");
        assert!(!compressed[0]._compressed, "system messages are never compressed regardless of length");
        assert!(compressed[1]._compressed);
        assert!(compressed[1].content.starts_with("REM LOOKUP session-"));
        assert!(!compressed[2]._compressed, "a message under the threshold stays untouched even in a long session");
    }

    #[tokio::test]
    async fn a_single_long_message_compresses_even_under_a_large_session_budget() {
        let storage = test_storage().await;
        let compressor = MessageCompressor::new(storage, 50);
        let messages = vec![Message::new("user", "a".repeat(51))];

        let compressed = compressor.compress(Uuid::new_v4(), messages).await.unwrap();
        assert!(compressed[0]._compressed);
    }

    #[tokio::test]
    async fn expand_recovers_original_content() {
        let storage = test_storage().await;
        let compressor = MessageCompressor::new(storage.clone(), 10);
        let session_id = Uuid::new_v4();

        let original = "the quick brown fox jumps over the lazy dog".to_string();
        let messages = vec![Message::new("user", original.clone())];
        let compressed = compressor.compress(session_id, messages).await.unwrap();
        assert!(compressed[0]._compressed);

        let expanded = compressor.expand(&compressed).await.unwrap();
        assert_eq!(expanded[0].content, original);
    }

    #[tokio::test]
    async fn leaves_messages_under_budget_untouched() {
        let storage = test_storage().await;
        let compressor = MessageCompressor::new(storage, 10_000);
        let messages = vec![Message::new("user", "hello")];
        let compressed = compressor.compress(Uuid::new_v4(), messages.clone()).await.unwrap();
        assert_eq!(compressed[0].content, messages[0].content);
        assert!(!compressed[0]._compressed);
    }
}
