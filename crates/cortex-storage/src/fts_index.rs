//! `IFtsIndex` implementation: FTS5 lexical search over `facts_fts`
//!, with query sanitization ported from the original
//! project's `_sanitize_fts_query`.

use rusqlite::params;

use cortex_core::errors::CortexResult;
use cortex_core::models::RankedHit;
use cortex_core::traits::IFtsIndex;

use crate::pool::Pool;
use crate::to_storage_err;

pub struct FtsIndexImpl {
    pool: std::sync::Arc<Pool>,
}

impl FtsIndexImpl {
    pub fn new(pool: std::sync::Arc<Pool>) -> Self {
        Self { pool }
    }
}

/// Quote every non-operator token so FTS5's own operator characters
/// (`AND`/`OR`/`NOT`, `*`, `-`, `:`) can never be injected through free
/// text. Falls back to quoting the whole raw query when every token was
/// an operator (leaves the caller a literal phrase match instead of an
/// empty, always-failing MATCH clause).
pub fn sanitize_fts_query(query: &str) -> String {
    let mut safe_tokens = Vec::new();
    for token in query.split_whitespace() {
        let cleaned: String = token.chars().filter(|&c| c != '"' && c != '\'').collect();
        if !cleaned.is_empty() && !matches!(cleaned.to_uppercase().as_str(), "AND" | "OR" | "NOT") {
            safe_tokens.push(format!("\"{cleaned}\""));
        }
    }
    if safe_tokens.is_empty() {
        format!("\"{query}\"")
    } else {
        safe_tokens.join(" ")
    }
}

impl IFtsIndex for FtsIndexImpl {
    async fn search(&self, query: &str, k: usize, project: Option<&str>) -> CortexResult<Vec<RankedHit>> {
        let fts_query = sanitize_fts_query(query);
        let project = project.map(|p| p.to_string());

        self.pool
            .with_reader(move |conn| {
                let sql = format!(
                    "SELECT f.id, bm25(facts_fts) AS rank
                     FROM facts_fts fts JOIN facts f ON f.id = fts.rowid
                     WHERE fts.content MATCH ?1 AND f.valid_until IS NULL {}
                     ORDER BY rank ASC LIMIT {}",
                    if project.is_some() { "AND f.project = ?2" } else { "" },
                    k,
                );
                let mut stmt = conn.prepare(&sql).map_err(|e| to_storage_err(e.to_string()))?;
                let mut out = Vec::new();
                let rows = if let Some(p) = &project {
                    stmt.query_map(params![fts_query, p], |row| {
                        Ok((row.get::<_, i64>(0)?, row.get::<_, f64>(1)?))
                    })
                } else {
                    stmt.query_map(params![fts_query], |row| {
                        Ok((row.get::<_, i64>(0)?, row.get::<_, f64>(1)?))
                    })
                }
                .map_err(|e| to_storage_err(e.to_string()))?;

                for (rank, row) in rows.enumerate() {
                    let (fact_id, bm25_rank) = row.map_err(|e| to_storage_err(e.to_string()))?;
                    out.push(RankedHit {
                        fact_id,
                        rank,
                        score: -bm25_rank,
                    });
                }
                Ok(out)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_plain_tokens() {
        assert_eq!(sanitize_fts_query("hello world"), "\"hello\" \"world\"");
    }

    #[test]
    fn strips_boolean_operators() {
        assert_eq!(sanitize_fts_query("hello AND world"), "\"hello\" \"world\"");
    }

    #[test]
    fn falls_back_to_quoted_raw_query_when_all_operators() {
        assert_eq!(sanitize_fts_query("AND OR"), "\"AND OR\"");
    }

    #[test]
    fn strips_embedded_quotes() {
        assert_eq!(sanitize_fts_query("\"inject\""), "\"inject\"");
    }

    #[tokio::test]
    async fn operator_only_query_matches_nothing() {
        use crate::fact_store::FactStoreImpl;
        use cortex_core::config::StorageConfig;
        use cortex_core::models::{Confidence, FactType};
        use cortex_core::traits::IFactStore;

        let pool = std::sync::Arc::new(Pool::open_in_memory(&StorageConfig::default()).unwrap());
        let facts = FactStoreImpl::new(pool.clone());
        facts
            .store("p", "AND and OR operators are neutralized", FactType::Knowledge, &[], Confidence::Stated, None, serde_json::json!({}), None)
            .await
            .unwrap();

        let index = FtsIndexImpl::new(pool);
        let hits = index.search("AND OR NOT", 10, Some("p")).await.unwrap();
        assert!(hits.is_empty());
    }
}
