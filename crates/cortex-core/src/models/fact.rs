use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The nine kinds a stored fact may take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactType {
    Knowledge,
    Decision,
    Error,
    Rule,
    Axiom,
    Schema,
    Idea,
    Ghost,
    Bridge,
}

impl FactType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FactType::Knowledge => "knowledge",
            FactType::Decision => "decision",
            FactType::Error => "error",
            FactType::Rule => "rule",
            FactType::Axiom => "axiom",
            FactType::Schema => "schema",
            FactType::Idea => "idea",
            FactType::Ghost => "ghost",
            FactType::Bridge => "bridge",
        }
    }
}

impl std::str::FromStr for FactType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "knowledge" => Ok(FactType::Knowledge),
            "decision" => Ok(FactType::Decision),
            "error" => Ok(FactType::Error),
            "rule" => Ok(FactType::Rule),
            "axiom" => Ok(FactType::Axiom),
            "schema" => Ok(FactType::Schema),
            "idea" => Ok(FactType::Idea),
            "ghost" => Ok(FactType::Ghost),
            "bridge" => Ok(FactType::Bridge),
            other => Err(format!("unknown fact_type: {other}")),
        }
    }
}

/// Trust state attached to a fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Stated,
    Verified,
    Disputed,
    Deprecated,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::Stated => "stated",
            Confidence::Verified => "verified",
            Confidence::Disputed => "disputed",
            Confidence::Deprecated => "deprecated",
        }
    }
}

impl std::str::FromStr for Confidence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stated" => Ok(Confidence::Stated),
            "verified" => Ok(Confidence::Verified),
            "disputed" => Ok(Confidence::Disputed),
            "deprecated" => Ok(Confidence::Deprecated),
            other => Err(format!("unknown confidence: {other}")),
        }
    }
}

/// Reserved keys the engine itself writes into `Fact::meta`.
pub mod meta_keys {
    pub const PREVIOUS_FACT_ID: &str = "previous_fact_id";
    pub const DEPRECATION_REASON: &str = "deprecation_reason";
}

/// The atomic unit of memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fact {
    pub id: i64,
    pub project: String,
    pub fact_type: FactType,
    pub content: String,
    pub tags: BTreeSet<String>,
    pub source: Option<String>,
    pub meta: BTreeMap<String, serde_json::Value>,
    pub confidence: Confidence,
    /// Raw, unclamped accumulator. Use [`Fact::consensus_score`] to read the
    /// observable, clamped value.
    pub consensus_score_raw: f64,
    pub valid_from: DateTime<Utc>,
    pub valid_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub tx_id: Option<i64>,
}

impl Fact {
    /// `consensus_score` clamped to `[0.0, 2.0]` regardless of which vote
    /// path (v1 write-time clamp, v2 unclamped accumulation) produced the
    /// raw value.
    pub fn consensus_score(&self) -> f64 {
        self.consensus_score_raw.clamp(0.0, 2.0)
    }

    /// A fact is active iff `valid_until` is unset. Half-open interval:
    /// equality at `valid_until` means "no longer valid".
    pub fn is_active(&self) -> bool {
        self.valid_until.is_none()
    }

    /// `valid_from <= ts < valid_until` (or `valid_until` unset).
    pub fn valid_at(&self, ts: DateTime<Utc>) -> bool {
        self.valid_from <= ts && self.valid_until.map(|u| u > ts).unwrap_or(true)
    }

    pub fn recency_decay(&self, now: DateTime<Utc>) -> f64 {
        let days = (now - self.created_at).num_seconds() as f64 / 86_400.0;
        1.0 / (1.0 + days.max(0.0))
    }

    /// `consensus_score * 0.8 + recency_decay * 0.2`.
    pub fn recall_rank(&self, now: DateTime<Utc>) -> f64 {
        self.consensus_score() * 0.8 + self.recency_decay(now) * 0.2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn fact_with(valid_from: DateTime<Utc>, valid_until: Option<DateTime<Utc>>) -> Fact {
        Fact {
            id: 1,
            project: "p".into(),
            fact_type: FactType::Knowledge,
            content: "c".into(),
            tags: BTreeSet::new(),
            source: None,
            meta: BTreeMap::new(),
            confidence: Confidence::Stated,
            consensus_score_raw: 1.0,
            valid_from,
            valid_until,
            created_at: valid_from,
            updated_at: valid_from,
            tx_id: Some(1),
        }
    }

    #[test]
    fn valid_at_is_half_open() {
        let from = Utc::now();
        let until = from + Duration::seconds(60);
        let f = fact_with(from, Some(until));
        assert!(f.valid_at(from), "inclusive at valid_from");
        assert!(!f.valid_at(until), "exclusive at valid_until");
        assert!(f.valid_at(until - Duration::seconds(1)));
        assert!(!f.valid_at(until + Duration::seconds(1)));
    }

    #[test]
    fn valid_at_with_no_upper_bound_is_always_active() {
        let from = Utc::now();
        let f = fact_with(from, None);
        assert!(f.valid_at(from + Duration::days(3650)));
        assert!(f.is_active());
    }

    #[test]
    fn deprecated_fact_is_not_active() {
        let from = Utc::now();
        let f = fact_with(from, Some(from + Duration::seconds(1)));
        assert!(!f.is_active());
    }

    #[test]
    fn consensus_score_clamps_both_directions() {
        let mut f = fact_with(Utc::now(), None);
        f.consensus_score_raw = -5.0;
        assert_eq!(f.consensus_score(), 0.0);
        f.consensus_score_raw = 50.0;
        assert_eq!(f.consensus_score(), 2.0);
        f.consensus_score_raw = 1.25;
        assert_eq!(f.consensus_score(), 1.25);
    }

    #[test]
    fn recency_decay_is_one_at_creation_and_shrinks_with_age() {
        let now = Utc::now();
        let fresh = fact_with(now, None);
        assert!((fresh.recency_decay(now) - 1.0).abs() < 1e-9);

        let mut aged = fresh.clone();
        aged.created_at = now - Duration::days(9);
        let decay = aged.recency_decay(now);
        assert!((decay - 0.1).abs() < 1e-9);
        assert!(decay < fresh.recency_decay(now));
    }

    #[test]
    fn recall_rank_weights_consensus_over_recency() {
        let now = Utc::now();
        let mut f = fact_with(now, None);
        f.consensus_score_raw = 2.0;
        // consensus=2.0 -> 0.8*2.0 = 1.6; recency=1.0 -> 0.2*1.0 = 0.2
        assert!((f.recall_rank(now) - 1.8).abs() < 1e-9);

        f.created_at = now - Duration::days(999);
        let rank = f.recall_rank(now);
        assert!(rank >= 1.6 && rank < 1.8);
    }

    #[test]
    fn fact_type_round_trips_through_str() {
        for ft in [
            FactType::Knowledge,
            FactType::Decision,
            FactType::Error,
            FactType::Rule,
            FactType::Axiom,
            FactType::Schema,
            FactType::Idea,
            FactType::Ghost,
            FactType::Bridge,
        ] {
            let s = ft.as_str();
            assert_eq!(s.parse::<FactType>().unwrap(), ft);
        }
        assert!("not_a_type".parse::<FactType>().is_err());
    }

    #[test]
    fn confidence_round_trips_through_str() {
        for c in [
            Confidence::Stated,
            Confidence::Verified,
            Confidence::Disputed,
            Confidence::Deprecated,
        ] {
            assert_eq!(c.as_str().parse::<Confidence>().unwrap(), c);
        }
        assert!("unknown".parse::<Confidence>().is_err());
    }
}
