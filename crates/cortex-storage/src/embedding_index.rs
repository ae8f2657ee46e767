//! `IEmbeddingIndex` implementation: per-fact vectors in `fact_embeddings`,
//! queried by brute-force cosine scan — no offline-buildable vector
//! extension, so `score = 1 - distance` is computed in Rust instead of
//! delegated to a `vec0` virtual table as the original project does.

use rusqlite::params;

use cortex_core::errors::CortexResult;
use cortex_core::models::KnnHit;
use cortex_core::traits::IEmbeddingIndex;

use crate::pool::Pool;
use crate::to_storage_err;

pub struct EmbeddingIndexImpl {
    pool: std::sync::Arc<Pool>,
}

impl EmbeddingIndexImpl {
    pub fn new(pool: std::sync::Arc<Pool>) -> Self {
        Self { pool }
    }
}

fn encode_vector(v: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(v.len() * 4);
    for x in v {
        out.extend_from_slice(&x.to_le_bytes());
    }
    out
}

fn decode_vector(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

/// Cosine distance (`1 - cosine similarity`), matching `score = 1 -
/// distance` used throughout the original project's vector search.
fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 1.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    let similarity = dot / (norm_a.sqrt() * norm_b.sqrt());
    1.0 - similarity.clamp(-1.0, 1.0)
}

impl IEmbeddingIndex for EmbeddingIndexImpl {
    async fn upsert(&self, fact_id: i64, vector: &[f32]) -> CortexResult<()> {
        let bytes = encode_vector(vector);
        let dimension = vector.len() as i64;
        self.pool
            .with_writer(move |conn| {
                conn.execute(
                    "INSERT INTO fact_embeddings (fact_id, vector, dimension) VALUES (?1, ?2, ?3)
                     ON CONFLICT(fact_id) DO UPDATE SET vector = excluded.vector, dimension = excluded.dimension",
                    params![fact_id, bytes, dimension],
                )
                .map_err(|e| to_storage_err(e.to_string()))?;
                Ok(())
            })
            .await
    }

    async fn knn(&self, query_vector: &[f32], k: usize, project: Option<&str>) -> CortexResult<Vec<KnnHit>> {
        let query_vector = query_vector.to_vec();
        let project = project.map(|p| p.to_string());

        self.pool
            .with_reader(move |conn| {
                let sql = format!(
                    "SELECT ve.fact_id, ve.vector
                     FROM fact_embeddings ve JOIN facts f ON f.id = ve.fact_id
                     WHERE f.valid_until IS NULL {}",
                    if project.is_some() { "AND f.project = ?1" } else { "" }
                );
                let mut stmt = conn.prepare(&sql).map_err(|e| to_storage_err(e.to_string()))?;
                let rows = if let Some(p) = &project {
                    stmt.query_map(params![p], |row| {
                        Ok((row.get::<_, i64>(0)?, row.get::<_, Vec<u8>>(1)?))
                    })
                } else {
                    stmt.query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, Vec<u8>>(1)?)))
                }
                .map_err(|e| to_storage_err(e.to_string()))?;

                let mut scored = Vec::new();
                for row in rows {
                    let (fact_id, bytes) = row.map_err(|e| to_storage_err(e.to_string()))?;
                    let vector = decode_vector(&bytes);
                    let distance = cosine_distance(&query_vector, &vector);
                    scored.push(KnnHit { fact_id, distance });
                }
                scored.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap());
                scored.truncate(k);
                Ok(scored)
            })
            .await
    }

    async fn remove(&self, fact_id: i64) -> CortexResult<()> {
        self.pool
            .with_writer(move |conn| {
                conn.execute("DELETE FROM fact_embeddings WHERE fact_id = ?1", params![fact_id])
                    .map_err(|e| to_storage_err(e.to_string()))?;
                Ok(())
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vector_round_trips_through_bytes() {
        let v = vec![0.5f32, -1.0, 2.25];
        assert_eq!(decode_vector(&encode_vector(&v)), v);
    }

    #[test]
    fn identical_vectors_have_zero_distance() {
        let v = vec![1.0f32, 2.0, 3.0];
        assert!(cosine_distance(&v, &v) < 1e-5);
    }

    #[test]
    fn orthogonal_vectors_have_unit_distance() {
        let a = vec![1.0f32, 0.0];
        let b = vec![0.0f32, 1.0];
        assert!((cosine_distance(&a, &b) - 1.0).abs() < 1e-5);
    }
}
