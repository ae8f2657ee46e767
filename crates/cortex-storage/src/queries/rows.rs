//! Shared row → model mapping for the `facts` and `ghosts` tables.

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::Row;

use cortex_core::models::{Confidence, Fact, FactType, Ghost, GhostStatus};

/// Column order this module expects from any `SELECT` against `facts`:
/// `id, project, fact_type, content, tags, source, meta, confidence,
/// consensus_score, valid_from, valid_until, created_at, updated_at, tx_id`.
pub fn fact_from_row(row: &Row<'_>) -> rusqlite::Result<Fact> {
    let tags_json: String = row.get(4)?;
    let meta_json: String = row.get(6)?;
    let fact_type_str: String = row.get(2)?;
    let confidence_str: String = row.get(7)?;
    let valid_from: String = row.get(9)?;
    let valid_until: Option<String> = row.get(10)?;
    let created_at: String = row.get(11)?;
    let updated_at: String = row.get(12)?;

    let tags: BTreeSet<String> = serde_json::from_str(&tags_json).unwrap_or_default();
    let meta: BTreeMap<String, serde_json::Value> =
        serde_json::from_str(&meta_json).unwrap_or_default();

    Ok(Fact {
        id: row.get(0)?,
        project: row.get(1)?,
        fact_type: FactType::from_str(&fact_type_str).unwrap_or(FactType::Knowledge),
        content: row.get(3)?,
        tags,
        source: row.get(5)?,
        meta,
        confidence: Confidence::from_str(&confidence_str).unwrap_or(Confidence::Stated),
        consensus_score_raw: row.get(8)?,
        valid_from: parse_ts(&valid_from),
        valid_until: valid_until.as_deref().map(parse_ts),
        created_at: parse_ts(&created_at),
        updated_at: parse_ts(&updated_at),
        tx_id: row.get(13)?,
    })
}

pub const FACT_COLUMNS: &str = "id, project, fact_type, content, tags, source, meta, confidence, \
     consensus_score, valid_from, valid_until, created_at, updated_at, tx_id";

/// Column order: `id, reference, context, project, status, target_entity,
/// confidence, created_at`.
pub fn ghost_from_row(row: &Row<'_>) -> rusqlite::Result<Ghost> {
    let status_str: String = row.get(4)?;
    let created_at: String = row.get(7)?;
    Ok(Ghost {
        id: row.get(0)?,
        reference: row.get(1)?,
        context: row.get(2)?,
        project: row.get(3)?,
        status: if status_str == "resolved" {
            GhostStatus::Resolved
        } else {
            GhostStatus::Open
        },
        target_entity: row.get(5)?,
        confidence: row.get(6)?,
        created_at: parse_ts(&created_at),
    })
}

pub const GHOST_COLUMNS: &str = "id, reference, context, project, status, target_entity, confidence, created_at";

pub fn parse_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
