// src/freshness.rs

//! Freshness scheduler (C10): decides whether a `QueueEntry` should be
//! re-disambiguated.

use chrono::{DateTime, Utc};

use crate::disambiguate::audit::{AuditEntry, Confidence, QueueEntry, QueueStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreshnessDecision {
    Skip,
    Redisambiguate,
    /// Source changed but priority < 2; flag for human review without
    /// mutating `source` (§4.10 final paragraph).
    RequiresManual,
}

/// Evaluates §4.10's triggers against `entry`/`latest_audit` as of `now`.
///
/// `discovered_source` is the source this run's probing found for
/// `entry.name` (used for Trigger 3); pass `None` when no fresh discovery
/// pass has run yet.
pub fn evaluate(
    entry: &QueueEntry,
    latest_audit: Option<&AuditEntry>,
    discovered_source: Option<&str>,
    threshold_days: u32,
    now: DateTime<Utc>,
) -> FreshnessDecision {
    if entry.status == QueueStatus::Success {
        return FreshnessDecision::Skip;
    }
    if entry.confidence == Confidence::Curated {
        return FreshnessDecision::Skip;
    }

    let age_days = (now - entry.disambiguated_at).num_days();

    if age_days >= threshold_days as i64 {
        return FreshnessDecision::Redisambiguate;
    }

    if let Some(audit) = latest_audit {
        if audit.high_risk && age_days >= (threshold_days / 2) as i64 {
            return FreshnessDecision::Redisambiguate;
        }
    }

    if let Some(discovered) = discovered_source {
        if discovered != entry.source {
            return if entry.priority >= 2 {
                FreshnessDecision::Redisambiguate
            } else {
                FreshnessDecision::RequiresManual
            };
        }
    }

    FreshnessDecision::Skip
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn entry(source: &str, status: QueueStatus, confidence: Confidence, age_days: i64, priority: u8, now: DateTime<Utc>) -> QueueEntry {
        QueueEntry {
            name: "ripgrep".to_string(),
            source: source.to_string(),
            priority,
            status,
            confidence,
            disambiguated_at: now - Duration::days(age_days),
            previous_source: None,
        }
    }

    #[test]
    fn skips_when_status_success() {
        let now = Utc::now();
        let e = entry("cargo:ripgrep", QueueStatus::Success, Confidence::Auto, 100, 1, now);
        assert_eq!(evaluate(&e, None, None, 30, now), FreshnessDecision::Skip);
    }

    #[test]
    fn skips_when_curated() {
        let now = Utc::now();
        let e = entry("cargo:ripgrep", QueueStatus::Pending, Confidence::Curated, 100, 1, now);
        assert_eq!(evaluate(&e, None, None, 30, now), FreshnessDecision::Skip);
    }

    #[test]
    fn trigger_one_fires_past_threshold() {
        let now = Utc::now();
        let e = entry("cargo:ripgrep", QueueStatus::Pending, Confidence::Auto, 31, 1, now);
        assert_eq!(evaluate(&e, None, None, 30, now), FreshnessDecision::Redisambiguate);
    }

    #[test]
    fn trigger_two_fires_for_high_risk_at_half_threshold() {
        let now = Utc::now();
        let e = entry("cargo:ripgrep", QueueStatus::Pending, Confidence::Auto, 16, 1, now);
        let audit = AuditEntry {
            tool: "ripgrep".to_string(),
            selected: Some("cargo:ripgrep".to_string()),
            alternatives: vec![],
            downloads_ratio: 1.2,
            high_risk: true,
            probe_results: vec![],
            previous_source: None,
            disambiguated_at: now,
            seeding_run: "run-1".to_string(),
        };
        assert_eq!(evaluate(&e, Some(&audit), None, 30, now), FreshnessDecision::Redisambiguate);
    }

    #[test]
    fn trigger_three_auto_accepts_when_priority_at_least_two() {
        let now = Utc::now();
        let e = entry("cargo:foo", QueueStatus::Pending, Confidence::Auto, 1, 2, now);
        assert_eq!(
            evaluate(&e, None, Some("homebrew:foo"), 30, now),
            FreshnessDecision::Redisambiguate
        );
    }

    #[test]
    fn trigger_three_requires_manual_when_priority_below_two() {
        let now = Utc::now();
        let e = entry("cargo:foo", QueueStatus::Pending, Confidence::Auto, 1, 1, now);
        assert_eq!(
            evaluate(&e, None, Some("homebrew:foo"), 30, now),
            FreshnessDecision::RequiresManual
        );
    }

    #[test]
    fn no_trigger_fires_skips() {
        let now = Utc::now();
        let e = entry("cargo:foo", QueueStatus::Pending, Confidence::Auto, 1, 1, now);
        assert_eq!(evaluate(&e, None, Some("cargo:foo"), 30, now), FreshnessDecision::Skip);
    }
}
