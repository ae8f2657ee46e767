use serde::{Deserialize, Serialize};

/// A fixed-dimension vector 1:1 with a fact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Embedding {
    pub fact_id: i64,
    pub vector: Vec<f32>,
}

/// One KNN hit: the fact and its cosine distance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnnHit {
    pub fact_id: i64,
    pub distance: f32,
}

impl KnnHit {
    pub fn score(&self) -> f32 {
        1.0 - self.distance
    }
}
