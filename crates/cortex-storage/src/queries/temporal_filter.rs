//! SQL predicate construction for validity windows and time-travel
//! reconstruction.

use chrono::{DateTime, Utc};
use cortex_core::errors::{CortexError, CortexResult};
use cortex_core::models::TemporalPredicate;

/// Table-alias prefixes interpolated into generated SQL must match this
/// shape before use — defends against SQL injection through a
/// caller-chosen alias.
fn validate_alias(alias: &str) -> CortexResult<()> {
    if !alias.is_empty() && !alias.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(CortexError::InvalidInput(format!(
            "invalid table alias: {alias:?}"
        )));
    }
    Ok(())
}

/// Render `predicate` as a SQL fragment (no leading `AND`), optionally
/// prefixed with `alias.`. Returns the fragment and its bind parameters
/// in positional order.
pub fn render(
    predicate: &TemporalPredicate,
    alias: &str,
) -> CortexResult<(String, Vec<String>)> {
    validate_alias(alias)?;
    let prefix = if alias.is_empty() {
        String::new()
    } else {
        format!("{alias}.")
    };

    Ok(match predicate {
        TemporalPredicate::ActiveOnly => (format!("{prefix}valid_until IS NULL"), vec![]),
        TemporalPredicate::AsOf(ts) => (
            format!(
                "{prefix}valid_from <= ?1 AND ({prefix}valid_until IS NULL OR {prefix}valid_until > ?1)"
            ),
            vec![ts.to_rfc3339()],
        ),
        TemporalPredicate::TimeTravel { target_tx_id } => (
            format!(
                "{prefix}tx_id <= ?1 AND ({prefix}valid_until IS NULL OR {prefix}valid_until > \
                 (SELECT timestamp FROM transactions WHERE id = ?1))"
            ),
            vec![target_tx_id.to_string()],
        ),
        TemporalPredicate::AllRevisions => ("1=1".to_string(), vec![]),
    })
}

/// Convenience: `as_of` predicate fragment with no alias.
pub fn as_of_fragment(ts: DateTime<Utc>) -> (String, Vec<String>) {
    render(&TemporalPredicate::AsOf(ts), "").expect("empty alias always valid")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_alphanumeric_alias() {
        assert!(validate_alias("f; DROP").is_err());
        assert!(validate_alias("f1").is_ok());
        assert!(validate_alias("").is_ok());
    }

    #[test]
    fn active_only_has_no_params() {
        let (sql, params) = render(&TemporalPredicate::ActiveOnly, "f").unwrap();
        assert_eq!(sql, "f.valid_until IS NULL");
        assert!(params.is_empty());
    }

    #[test]
    fn as_of_binds_one_timestamp_twice_referenced() {
        let ts = Utc::now();
        let (sql, params) = render(&TemporalPredicate::AsOf(ts), "").unwrap();
        assert!(sql.contains("valid_from <= ?1"));
        assert_eq!(params.len(), 1);
    }
}
