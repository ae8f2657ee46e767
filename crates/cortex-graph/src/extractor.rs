//! Regex-driven entity/relation extraction, ported from
//! the original project's `extract_entities`/`detect_relationships`.
//!
//! Patterns run in a fixed order and the first match for a given
//! lowercased name wins — a name cannot be tagged twice with two
//! different entity types.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use cortex_core::models::{ExtractedEntity, ExtractedGraph, ExtractedRelation};

struct EntityPattern {
    entity_type: &'static str,
    regex: Regex,
}

fn entity_patterns() -> &'static [EntityPattern] {
    static PATTERNS: OnceLock<Vec<EntityPattern>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        vec![
            EntityPattern {
                entity_type: "file",
                regex: Regex::new(
                    r#"(?:^|[\s`"'])([a-zA-Z_][\w]*\.(?:py|js|ts|tsx|jsx|css|html|md|yml|yaml|json|toml|rs|go|sql))\b"#,
                )
                .expect("static file pattern is valid regex"),
            },
            EntityPattern {
                entity_type: "class",
                regex: Regex::new(r"\b([A-Z][a-zA-Z0-9]{2,}(?:[A-Z][a-z]+)+)\b")
                    .expect("static class pattern is valid regex"),
            },
            EntityPattern {
                entity_type: "tool",
                regex: Regex::new(
                    r"(?i)\b(SQLite|FastAPI|Redis|Docker|Kubernetes|PostgreSQL|MySQL|React|Vue|Next\.js|Vite|Tailwind|Python|TypeScript|JavaScript|GitHub|GitLab|AWS|GCP|Azure|Vercel|Netlify|OpenAI|Anthropic|Claude|GPT|LangChain|LlamaIndex|Mem0|Zep|Letta|MemGPT|Cognee|pytest|uvicorn|pip|npm|node|cargo|sqlite-vec|sentence-transformers|ONNX|MCP)\b",
                )
                .expect("static tool pattern is valid regex"),
            },
            EntityPattern {
                entity_type: "url",
                regex: Regex::new(r#"(https?://[^\s<>"']+|[a-zA-Z0-9][-a-zA-Z0-9]*\.[a-z]{2,})"#)
                    .expect("static url pattern is valid regex"),
            },
            EntityPattern {
                entity_type: "project",
                regex: Regex::new(r"\b([a-z][a-z0-9]*(?:-[a-z0-9]+){1,})\b")
                    .expect("static project pattern is valid regex"),
            },
        ]
    })
}

fn common_words() -> &'static HashSet<&'static str> {
    static WORDS: OnceLock<HashSet<&'static str>> = OnceLock::new();
    WORDS.get_or_init(|| {
        [
            "how-to", "set-up", "built-in", "run-time", "self-hosted", "up-to", "opt-in",
            "opt-out", "plug-in", "add-on", "on-premise", "on-prem", "re-run", "re-use",
            "pre-built", "well-known", "long-term", "short-term", "real-time", "open-source",
            "third-party", "end-to", "out-of", "read-only", "write-only", "read-write",
            "day-to", "step-by", "one-to", "many-to", "high-level", "low-level", "top-level",
            "the-end", "to-do", "per-day", "per-hour", "day-one", "end-of", "on-the", "in-the",
            "at-the", "by-the", "for-the", "non-null", "non-empty", "pre-commit", "post-commit",
        ]
        .into_iter()
        .collect()
    })
}

/// Ordered relation-type signal phrases. The first relation type whose
/// phrase appears anywhere in the (lowercased) content wins; every
/// extracted entity pair is then tagged with that one relation.
fn relation_signals() -> &'static [(&'static str, &'static [&'static str])] {
    const SIGNALS: &[(&str, &[&str])] = &[
        ("uses", &["uses", "using", "used", "with", "via", "through"]),
        ("depends_on", &["depends on", "requires", "needs", "dependency"]),
        ("created_by", &["created by", "built by", "made by", "authored by", "written by"]),
        ("replaces", &["replaces", "replaced", "instead of", "migrated from"]),
        ("extends", &["extends", "inherits", "based on", "derived from"]),
        ("contains", &["contains", "includes", "has", "with"]),
        ("deployed_to", &["deployed to", "hosted on", "runs on", "deployed on"]),
        ("integrates", &["integrates with", "connects to", "integrated"]),
    ];
    SIGNALS
}

/// Entity names below this length are treated as noise.
const MIN_NAME_LEN: usize = 2;
/// Entity names above this length are treated as mis-extracted blobs.
const MAX_NAME_LEN: usize = 100;

fn extract_entities(content: &str) -> Vec<ExtractedEntity> {
    if content.trim().is_empty() {
        return Vec::new();
    }
    let mut seen = HashSet::new();
    let mut entities = Vec::new();
    for pattern in entity_patterns() {
        for caps in pattern.regex.captures_iter(content) {
            let Some(m) = caps.get(1) else { continue };
            let name = m.as_str().trim().to_string();
            let name_lower = name.to_lowercase();
            if name.len() < MIN_NAME_LEN || name.len() > MAX_NAME_LEN || seen.contains(&name_lower) {
                continue;
            }
            if pattern.entity_type == "project" && common_words().contains(name_lower.as_str()) {
                continue;
            }
            seen.insert(name_lower);
            entities.push(ExtractedEntity {
                name,
                entity_type: pattern.entity_type.to_string(),
            });
        }
    }
    entities
}

fn detect_relation_type(content_lower: &str) -> &'static str {
    for (relation_type, signals) in relation_signals() {
        if signals.iter().any(|signal| content_lower.contains(signal)) {
            return relation_type;
        }
    }
    "related_to"
}

fn detect_relationships(content: &str, entities: &[ExtractedEntity]) -> Vec<ExtractedRelation> {
    if entities.len() < 2 {
        return Vec::new();
    }
    let content_lower = content.to_lowercase();
    let relation_type = detect_relation_type(&content_lower);

    let mut relations = Vec::new();
    for (i, source) in entities.iter().enumerate() {
        for target in &entities[i + 1..] {
            if source.name.to_lowercase() == target.name.to_lowercase() {
                continue;
            }
            relations.push(ExtractedRelation {
                source_name: source.name.clone(),
                target_name: target.name.clone(),
                relation_type: relation_type.to_string(),
            });
        }
    }
    relations
}

/// Extract entities and pairwise relation assertions from `content`.
pub fn extract(content: &str) -> ExtractedGraph {
    let entities = extract_entities(content);
    let relations = detect_relationships(content, &entities);
    ExtractedGraph { entities, relations }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_content_yields_nothing() {
        let g = extract("");
        assert!(g.entities.is_empty());
        assert!(g.relations.is_empty());
    }

    #[test]
    fn extracts_file_entity() {
        let g = extract("see config.py for details");
        assert!(g.entities.iter().any(|e| e.name == "config.py" && e.entity_type == "file"));
    }

    #[test]
    fn extracts_tool_entity_case_insensitively() {
        let g = extract("we use sqlite for storage");
        assert!(g.entities.iter().any(|e| e.entity_type == "tool"));
    }

    #[test]
    fn project_entity_skips_stoplisted_words() {
        let g = extract("this is a built-in feature");
        assert!(!g.entities.iter().any(|e| e.name == "built-in"));
    }

    #[test]
    fn detects_uses_relation() {
        let g = extract("the api uses PostgreSQL for storage and FastAPI for routing");
        assert!(g.relations.iter().any(|r| r.relation_type == "uses"));
    }

    #[test]
    fn no_relations_with_fewer_than_two_entities() {
        let g = extract("just Python here");
        assert!(g.relations.is_empty());
    }

    #[test]
    fn skips_self_relations() {
        let g = extract("Python Python Python");
        assert!(g.relations.is_empty());
    }

    #[test]
    fn cortex_engine_uses_sqlite_and_fastapi() {
        let g = extract("CortexEngine uses SQLite and FastAPI");
        assert!(g.entities.iter().any(|e| e.name == "CortexEngine" && e.entity_type == "class"));
        assert!(g.entities.iter().any(|e| e.entity_type == "tool" && e.name.eq_ignore_ascii_case("sqlite")));
        assert!(g.entities.iter().any(|e| e.entity_type == "tool" && e.name.eq_ignore_ascii_case("fastapi")));
        assert!(g.relations.iter().all(|r| r.relation_type == "uses"));
        assert!(!g.relations.is_empty());
    }

    #[test]
    fn extraction_is_deterministic() {
        let content = "the api uses PostgreSQL for storage and FastAPI for routing";
        let a = extract(content);
        let b = extract(content);
        assert_eq!(a.entities.len(), b.entities.len());
        assert_eq!(a.relations.len(), b.relations.len());
        for (x, y) in a.entities.iter().zip(b.entities.iter()) {
            assert_eq!(x.name, y.name);
            assert_eq!(x.entity_type, y.entity_type);
        }
    }
}
