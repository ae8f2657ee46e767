//! `ICompactor` implementation: exact + near-duplicate dedup, error
//! consolidation, staleness pruning, grounded in the
//! original project's `compactor.py` and `compaction/strategies/*.py`.
//!
//! Every strategy only ever deprecates facts — originals are never
//! deleted, so the ledger hash-chain and time-travel queries stay
//! intact across a compaction pass.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use rusqlite::params;
use sha2::{Digest, Sha256};

use cortex_core::config::CompactionConfig;
use cortex_core::errors::CortexResult;
use cortex_core::models::{CompactionResult, CompactionStrategy, Confidence, Fact, FactType};
use cortex_core::traits::{ICompactor, IFactStore};
use cortex_storage::pool::Pool;
use cortex_storage::to_storage_err;

pub struct CompactorImpl<S> {
    facts: Arc<S>,
    pool: Arc<Pool>,
    config: CompactionConfig,
}

impl<S> CompactorImpl<S>
where
    S: IFactStore,
{
    pub fn new(facts: Arc<S>, pool: Arc<Pool>, config: CompactionConfig) -> Self {
        Self { facts, pool, config }
    }

    async fn log_compaction(&self, project: &str, result: &CompactionResult) -> CortexResult<()> {
        let project = project.to_string();
        let strategies = result
            .strategies
            .iter()
            .map(|s| match s {
                CompactionStrategy::Dedup => "dedup",
                CompactionStrategy::MergeErrors => "merge_errors",
                CompactionStrategy::StalenessPrune => "staleness_prune",
            })
            .collect::<Vec<_>>()
            .join(",");
        let deprecated_ids = serde_json::to_string(&result.deprecated_ids)?;
        let new_fact_ids = serde_json::to_string(&result.new_fact_ids)?;
        let before_count = result.before_count;
        let after_count = result.after_count;
        let now = Utc::now().to_rfc3339();

        self.pool
            .with_writer(move |conn| {
                conn.execute(
                    "INSERT INTO compaction_log
                        (project, strategies, deprecated_ids, new_fact_ids, before_count, after_count, dry_run, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7)",
                    params![project, strategies, deprecated_ids, new_fact_ids, before_count, after_count, now],
                )
                .map_err(|e| to_storage_err(e.to_string()))?;
                Ok(())
            })
            .await
    }
}

fn normalize_content(text: &str) -> String {
    text.to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ")
}

fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_content(text).as_bytes());
    format!("{:x}", hasher.finalize())
}

fn merge_error_contents(contents: &[String]) -> String {
    let mut unique = Vec::new();
    for c in contents {
        if !unique.contains(c) {
            unique.push(c.clone());
        }
    }
    if unique.len() == 1 {
        return format!("{} (occurred {}\u{d7})", unique[0], contents.len());
    }
    let combined = unique
        .iter()
        .take(5)
        .map(|msg| msg.chars().take(200).collect::<String>())
        .collect::<Vec<_>>()
        .join(" | ");
    format!("[Consolidated {} errors] {}", contents.len(), combined)
}

/// Phase 1: exact duplicates by normalized content hash. Phase 2: among
/// what's left, same-type near-duplicates above the similarity
/// threshold. Each group's first (oldest) id is canonical.
fn find_duplicate_groups(facts: &[Fact], threshold: f64) -> Vec<Vec<i64>> {
    let mut hash_groups: HashMap<String, Vec<&Fact>> = HashMap::new();
    for fact in facts {
        hash_groups.entry(content_hash(&fact.content)).or_default().push(fact);
    }

    let mut groups = Vec::new();
    let mut seen = std::collections::HashSet::new();
    for group in hash_groups.values() {
        if group.len() > 1 {
            let ids: Vec<i64> = group.iter().map(|f| f.id).collect();
            seen.extend(ids.iter().copied());
            groups.push(ids);
        }
    }

    let remaining: Vec<&Fact> = facts.iter().filter(|f| !seen.contains(&f.id)).collect();
    let mut local_seen = std::collections::HashSet::new();
    for (i, fact_i) in remaining.iter().enumerate() {
        if local_seen.contains(&fact_i.id) {
            continue;
        }
        let mut group = vec![fact_i.id];
        for fact_j in &remaining[i + 1..] {
            if local_seen.contains(&fact_j.id) || fact_i.fact_type != fact_j.fact_type {
                continue;
            }
            let ratio = strsim::normalized_levenshtein(
                &normalize_content(&fact_i.content),
                &normalize_content(&fact_j.content),
            );
            if ratio >= threshold {
                group.push(fact_j.id);
                local_seen.insert(fact_j.id);
            }
        }
        if group.len() > 1 {
            local_seen.insert(fact_i.id);
            groups.push(group);
        }
    }
    groups
}

impl<S> ICompactor for CompactorImpl<S>
where
    S: IFactStore,
{
    async fn compact(
        &self,
        project: &str,
        strategies: &[CompactionStrategy],
        dry_run: bool,
    ) -> CortexResult<CompactionResult> {
        let active: Vec<Fact> = self
            .facts
            .history(project, None)
            .await?
            .into_iter()
            .filter(|f| f.is_active())
            .collect();
        let before_count = active.len() as i64;

        let mut result = CompactionResult {
            strategies: Vec::new(),
            deprecated_ids: Vec::new(),
            new_fact_ids: Vec::new(),
            before_count,
            after_count: before_count,
            dry_run,
        };

        if strategies.contains(&CompactionStrategy::Dedup) {
            self.run_dedup(&active, dry_run, &mut result).await?;
        }
        if strategies.contains(&CompactionStrategy::MergeErrors) {
            self.run_merge_errors(project, &active, dry_run, &mut result).await?;
        }
        if strategies.contains(&CompactionStrategy::StalenessPrune) {
            self.run_staleness_prune(&active, dry_run, &mut result).await?;
        }

        if !dry_run {
            let after: Vec<Fact> = self
                .facts
                .history(project, None)
                .await?
                .into_iter()
                .filter(|f| f.is_active())
                .collect();
            result.after_count = after.len() as i64;

            if !result.deprecated_ids.is_empty() {
                self.log_compaction(project, &result).await?;
            }
        }

        tracing::info!(
            project,
            before = result.before_count,
            after = result.after_count,
            dry_run,
            "compaction pass complete"
        );
        Ok(result)
    }
}

impl<S> CompactorImpl<S>
where
    S: IFactStore,
{
    async fn run_dedup(&self, active: &[Fact], dry_run: bool, result: &mut CompactionResult) -> CortexResult<()> {
        let groups = find_duplicate_groups(active, self.config.similarity_threshold);
        if groups.is_empty() {
            return Ok(());
        }
        result.strategies.push(CompactionStrategy::Dedup);

        if !dry_run {
            for group in &groups {
                let canonical_id = group[0];
                for dup_id in &group[1..] {
                    self.facts
                        .deprecate(*dup_id, Some(&format!("compacted:dedup->#{canonical_id}")))
                        .await?;
                    result.deprecated_ids.push(*dup_id);
                }
            }
        }
        Ok(())
    }

    async fn run_merge_errors(
        &self,
        project: &str,
        active: &[Fact],
        dry_run: bool,
        result: &mut CompactionResult,
    ) -> CortexResult<()> {
        let errors: Vec<&Fact> = active.iter().filter(|f| f.fact_type == FactType::Error).collect();
        if errors.len() <= 1 {
            return Ok(());
        }

        let mut hash_groups: HashMap<String, Vec<&Fact>> = HashMap::new();
        for fact in &errors {
            hash_groups.entry(content_hash(&fact.content)).or_default().push(fact);
        }

        let mut merged_any = false;
        for group in hash_groups.values() {
            if group.len() <= 1 {
                continue;
            }
            merged_any = true;
            if dry_run {
                continue;
            }

            let canonical = group[0];
            let contents: Vec<String> = group.iter().map(|f| f.content.clone()).collect();
            let merged_content = merge_error_contents(&contents);
            let tags: Vec<String> = canonical.tags.iter().cloned().collect();

            let new_id = self
                .facts
                .store(
                    project,
                    &merged_content,
                    FactType::Error,
                    &tags,
                    canonical.confidence,
                    Some("compactor:merge_errors"),
                    serde_json::json!({}),
                    None,
                )
                .await?;
            result.new_fact_ids.push(new_id);

            for fact in group {
                self.facts.deprecate(fact.id, Some(&format!("compacted:merge_errors->#{new_id}"))).await?;
                result.deprecated_ids.push(fact.id);
            }
        }

        if merged_any {
            result.strategies.push(CompactionStrategy::MergeErrors);
        }
        Ok(())
    }

    async fn run_staleness_prune(
        &self,
        active: &[Fact],
        dry_run: bool,
        result: &mut CompactionResult,
    ) -> CortexResult<()> {
        let cutoff = Utc::now() - Duration::days(self.config.max_age_days);
        let stale: Vec<i64> = active
            .iter()
            .filter(|f| f.created_at < cutoff && f.consensus_score() < self.config.min_consensus)
            .map(|f| f.id)
            .collect();
        if stale.is_empty() {
            return Ok(());
        }

        result.strategies.push(CompactionStrategy::StalenessPrune);
        if !dry_run {
            for fact_id in stale {
                self.facts.deprecate(fact_id, Some("compacted:stale")).await?;
                result.deprecated_ids.push(fact_id);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cortex_core::config::StorageConfig;
    use cortex_storage::{fact_store::FactStoreImpl, pool::Pool};

    fn compactor() -> CompactorImpl<FactStoreImpl> {
        let pool = Arc::new(Pool::open_in_memory(&StorageConfig::default()).unwrap());
        CompactorImpl::new(Arc::new(FactStoreImpl::new(pool.clone())), pool, CompactionConfig::default())
    }

    #[tokio::test]
    async fn dedup_deprecates_exact_duplicate() {
        let c = compactor();
        let id1 = c
            .facts
            .store("p", "same content", FactType::Knowledge, &[], Confidence::Stated, None, serde_json::json!({}), None)
            .await
            .unwrap();
        let _id2 = c
            .facts
            .store("p", "same content", FactType::Knowledge, &[], Confidence::Stated, None, serde_json::json!({}), None)
            .await
            .unwrap();

        let result = c.compact("p", &[CompactionStrategy::Dedup], false).await.unwrap();
        assert_eq!(result.deprecated_ids.len(), 1);
        assert!(!result.deprecated_ids.contains(&id1));
    }

    #[tokio::test]
    async fn dry_run_reports_without_mutating() {
        let c = compactor();
        c.facts
            .store("p", "dup", FactType::Knowledge, &[], Confidence::Stated, None, serde_json::json!({}), None)
            .await
            .unwrap();
        c.facts
            .store("p", "dup", FactType::Knowledge, &[], Confidence::Stated, None, serde_json::json!({}), None)
            .await
            .unwrap();

        let result = c.compact("p", &[CompactionStrategy::Dedup], true).await.unwrap();
        assert!(result.deprecated_ids.is_empty());
        assert_eq!(result.before_count, 2);
        assert_eq!(result.after_count, 2);
    }

    #[tokio::test]
    async fn merge_errors_consolidates_repeated_error_facts() {
        let c = compactor();
        c.facts
            .store("p", "boom", FactType::Error, &[], Confidence::Stated, None, serde_json::json!({}), None)
            .await
            .unwrap();
        c.facts
            .store("p", "boom", FactType::Error, &[], Confidence::Stated, None, serde_json::json!({}), None)
            .await
            .unwrap();

        let result = c.compact("p", &[CompactionStrategy::MergeErrors], false).await.unwrap();
        assert_eq!(result.new_fact_ids.len(), 1);
        assert_eq!(result.deprecated_ids.len(), 2);
    }

    #[tokio::test]
    async fn dedup_is_idempotent_at_a_fixed_point() {
        let c = compactor();
        for _ in 0..3 {
            c.facts
                .store("p", "same content", FactType::Knowledge, &[], Confidence::Stated, None, serde_json::json!({}), None)
                .await
                .unwrap();
        }

        let first = c.compact("p", &[CompactionStrategy::Dedup], false).await.unwrap();
        assert_eq!(first.deprecated_ids.len(), 2);

        let second = c.compact("p", &[CompactionStrategy::Dedup], false).await.unwrap();
        assert_eq!(second.deprecated_ids.len(), 0);
    }
}
