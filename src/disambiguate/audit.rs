// src/disambiguate/audit.rs

//! Data models produced/consumed by disambiguation (§3, §4.9).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::prober::ProbeResult;

/// Consumed by an external batch orchestrator; C9 only produces these,
/// it never reads or schedules them itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    pub name: String,
    /// `builder:ident`, e.g. `cargo:ripgrep`.
    pub source: String,
    pub priority: u8,
    pub status: QueueStatus,
    pub confidence: Confidence,
    pub disambiguated_at: DateTime<Utc>,
    pub previous_source: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    Pending,
    Success,
    Failed,
    Blocked,
    RequiresManual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Curated,
    Auto,
    PriorityFallback,
}

/// Emitted by C9 for every `resolve()` call; one file per tool per seeding
/// run at `<audit_dir>/<tool>.json`, written atomically (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub tool: String,
    pub selected: Option<String>,
    pub alternatives: Vec<String>,
    pub downloads_ratio: f64,
    pub high_risk: bool,
    pub probe_results: Vec<ProbeResult>,
    pub previous_source: Option<String>,
    pub disambiguated_at: DateTime<Utc>,
    pub seeding_run: String,
}

/// Writes `entry` to `<audit_dir>/<tool>.json` via temp-file + rename so a
/// reader never observes a partial write.
pub fn write_audit_entry(audit_dir: &std::path::Path, entry: &AuditEntry) -> crate::error::Result<()> {
    std::fs::create_dir_all(audit_dir)?;
    let final_path = audit_dir.join(format!("{}.json", entry.tool));
    let tmp_path = audit_dir.join(format!(".tmp-{}-{}.json", entry.tool, uuid::Uuid::new_v4()));
    let body = serde_json::to_vec_pretty(entry)?;
    std::fs::write(&tmp_path, body)?;
    std::fs::rename(&tmp_path, &final_path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_result_roundtrips_through_json() {
        let pr = ProbeResult {
            source: "cargo:ripgrep".to_string(),
            downloads: 42,
            version_count: 3,
            has_repository: true,
            selection_reason: Some("dominant_downloads".to_string()),
        };
        let json = serde_json::to_string(&pr).unwrap();
        let back: ProbeResult = serde_json::from_str(&json).unwrap();
        assert_eq!(pr, back);
    }

    #[test]
    fn write_audit_entry_is_readable_after_rename() {
        let dir = tempfile::tempdir().unwrap();
        let entry = AuditEntry {
            tool: "ripgrep".to_string(),
            selected: Some("cargo:ripgrep".to_string()),
            alternatives: vec![],
            downloads_ratio: 12.0,
            high_risk: false,
            probe_results: vec![],
            previous_source: None,
            disambiguated_at: Utc::now(),
            seeding_run: "run-1".to_string(),
        };
        write_audit_entry(dir.path(), &entry).unwrap();
        let written = std::fs::read_to_string(dir.path().join("ripgrep.json")).unwrap();
        assert!(written.contains("cargo:ripgrep"));
    }
}
