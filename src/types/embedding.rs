//! Embedding record — stored in `embeddings.{table}` parallel to the owning
//! table (§3, §6). `(entity_id, field_name, tenant_id)` is the uniqueness
//! key (§3 invariant b, §8 property 3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub id: Uuid,
    pub entity_id: Uuid,
    pub field_name: String,
    pub embedding_provider: String,
    pub embedding_vector: Vec<f32>,
    pub vector_dimension: usize,
    pub tenant_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EmbeddingRecord {
    pub fn new(
        entity_id: Uuid,
        field_name: impl Into<String>,
        embedding_provider: impl Into<String>,
        embedding_vector: Vec<f32>,
        tenant_id: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        let vector_dimension = embedding_vector.len();
        Self {
            id: Uuid::new_v4(),
            entity_id,
            field_name: field_name.into(),
            embedding_provider: embedding_provider.into(),
            embedding_vector,
            vector_dimension,
            tenant_id: tenant_id.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Uniqueness key per §3 invariant (b) / §6's storage layout.
    pub fn unique_key(&self) -> (Uuid, String, String) {
        (self.entity_id, self.field_name.clone(), self.tenant_id.clone())
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

pub fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::INFINITY;
    }
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum::<f32>().sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_vectors_have_cosine_similarity_one() {
        let v = vec![0.3, 0.1, 0.9, -0.2];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn orthogonal_vectors_have_zero_similarity() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn mismatched_length_is_zero_not_a_panic() {
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
    }
}
