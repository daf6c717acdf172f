// src/disambiguate/mod.rs

//! Multi-ecosystem disambiguation (C8/C9).

pub mod audit;
pub mod prober;
pub mod probers;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::Result;
use audit::AuditEntry;
use prober::{EcosystemProber, ProbeResult};

/// Fixed tie-break order referenced by §4.9's last paragraph.
const BUILDER_PRIORITY: &[&str] =
    &["homebrew", "cargo", "npm", "pypi", "rubygems", "go", "cpan", "cask"];

fn priority_rank(builder: &str) -> usize {
    BUILDER_PRIORITY.iter().position(|b| *b == builder).unwrap_or(BUILDER_PRIORITY.len())
}

#[derive(Debug, Clone)]
pub struct ResolveResult {
    pub selected: Option<ProbeResult>,
    pub all_probes: Vec<ProbeResult>,
}

pub struct Disambiguator {
    probers: Vec<Arc<dyn EcosystemProber>>,
    deadline: Duration,
}

impl Disambiguator {
    pub fn new(probers: Vec<Arc<dyn EcosystemProber>>, deadline: Duration) -> Self {
        Self { probers, deadline }
    }

    pub fn with_builtins(client: reqwest::Client, deadline: Duration) -> Self {
        Self::new(probers::all_builtins(client), deadline)
    }

    /// `resolve(name) -> ResolveResult` per §4.9. Never fails: a prober that
    /// errors or times out is dropped, same as a `NotFound`.
    pub async fn resolve(&self, name: &str, audit_dir: Option<&std::path::Path>, seeding_run: &str) -> Result<ResolveResult> {
        let mut set = tokio::task::JoinSet::new();
        for prober in &self.probers {
            let prober = Arc::clone(prober);
            let name = name.to_string();
            set.spawn(async move {
                let builder = prober.builder();
                match tokio::time::timeout(Duration::from_secs(30), prober.probe(&name)).await {
                    Ok(Ok(Some(result))) => Some(result),
                    Ok(Ok(None)) => {
                        debug!(builder, name, "prober returned not-found");
                        None
                    }
                    Ok(Err(e)) => {
                        warn!(builder, name, error = %e, "prober failed");
                        None
                    }
                    Err(_) => {
                        warn!(builder, name, "prober timed out");
                        None
                    }
                }
            });
        }

        let mut probes = Vec::new();
        let overall = tokio::time::timeout(self.deadline, async {
            while let Some(joined) = set.join_next().await {
                if let Ok(Some(result)) = joined {
                    probes.push(result);
                }
            }
        })
        .await;
        if overall.is_err() {
            warn!(name, "disambiguation deadline exceeded; using probes collected so far");
        }

        let (selected, alternatives, downloads_ratio, high_risk) = select(&probes);

        if let Some(audit_dir) = audit_dir {
            let entry = AuditEntry {
                tool: name.to_string(),
                selected: selected.as_ref().map(|p| p.source.clone()),
                alternatives: alternatives.iter().map(|p| p.source.clone()).collect(),
                downloads_ratio,
                high_risk,
                probe_results: probes.clone(),
                previous_source: None,
                disambiguated_at: chrono::Utc::now(),
                seeding_run: seeding_run.to_string(),
            };
            audit::write_audit_entry(audit_dir, &entry)?;
        }

        Ok(ResolveResult { selected, all_probes: probes })
    }
}

/// Implements the §4.9 step-3 selection algorithm over already-collected,
/// already-NotFound-filtered probes. Returns `(selected, alternatives,
/// downloads_ratio, high_risk)`.
fn select(probes: &[ProbeResult]) -> (Option<ProbeResult>, Vec<ProbeResult>, f64, bool) {
    if probes.is_empty() {
        return (None, Vec::new(), 0.0, false);
    }
    if probes.len() == 1 {
        let mut winner = probes[0].clone();
        winner.selection_reason = Some("unique".to_string());
        return (Some(winner), Vec::new(), 1.0, false);
    }

    let mut ranked = probes.to_vec();
    ranked.sort_by(|a, b| {
        b.downloads
            .cmp(&a.downloads)
            .then_with(|| priority_rank(source_builder(&a.source)).cmp(&priority_rank(source_builder(&b.source))))
    });

    let top1 = ranked[0].clone();
    let top2_downloads = ranked.get(1).map(|p| p.downloads).unwrap_or(0);
    let downloads_ratio = top1.downloads as f64 / top2_downloads.max(1) as f64;

    let (mut selected, high_risk) = if downloads_ratio >= 10.0 {
        let mut w = top1.clone();
        w.selection_reason = Some("dominant_downloads".to_string());
        (w, false)
    } else {
        let with_repo: Vec<&ProbeResult> = ranked.iter().filter(|p| p.has_repository).collect();
        if with_repo.len() == 1 {
            let mut w = with_repo[0].clone();
            w.selection_reason = Some("repository_presence".to_string());
            (w, false)
        } else {
            let max_version_count = ranked.iter().map(|p| p.version_count).max().unwrap_or(0);
            let dominant_history: Vec<&ProbeResult> = ranked
                .iter()
                .filter(|p| {
                    p.version_count == max_version_count
                        && ranked
                            .iter()
                            .filter(|o| o.source != p.source)
                            .all(|o| p.version_count as u64 >= 5 * o.version_count.max(1) as u64)
                })
                .collect();
            if dominant_history.len() == 1 {
                let mut w = dominant_history[0].clone();
                w.selection_reason = Some("version_history".to_string());
                (w, false)
            } else {
                let mut w = top1.clone();
                w.selection_reason = Some("priority_fallback".to_string());
                (w, true)
            }
        }
    };

    let alternatives: Vec<ProbeResult> =
        ranked.iter().filter(|p| p.source != selected.source).cloned().collect();

    if selected.selection_reason.is_none() {
        selected.selection_reason = Some("priority_fallback".to_string());
    }

    (Some(selected), alternatives, downloads_ratio, high_risk)
}

fn source_builder(source: &str) -> &str {
    source.split(':').next().unwrap_or(source)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probe(source: &str, downloads: u64, version_count: u32, has_repository: bool) -> ProbeResult {
        ProbeResult {
            source: source.to_string(),
            downloads,
            version_count,
            has_repository,
            selection_reason: None,
        }
    }

    #[test]
    fn single_survivor_is_unique() {
        let probes = vec![probe("cargo:foo", 10, 3, true)];
        let (selected, alternatives, ratio, high_risk) = select(&probes);
        let selected = selected.unwrap();
        assert_eq!(selected.selection_reason.as_deref(), Some("unique"));
        assert!(alternatives.is_empty());
        assert_eq!(ratio, 1.0);
        assert!(!high_risk);
    }

    #[test]
    fn dominant_downloads_wins_by_ratio() {
        let probes = vec![probe("cargo:foo", 1000, 3, true), probe("npm:foo", 10, 3, true)];
        let (selected, _, ratio, high_risk) = select(&probes);
        let selected = selected.unwrap();
        assert_eq!(selected.source, "cargo:foo");
        assert_eq!(selected.selection_reason.as_deref(), Some("dominant_downloads"));
        assert!(ratio >= 10.0);
        assert!(!high_risk);
    }

    #[test]
    fn unique_repository_presence_wins_when_downloads_close() {
        let probes = vec![probe("cargo:foo", 100, 3, true), probe("npm:foo", 95, 3, false)];
        let (selected, _, _, high_risk) = select(&probes);
        let selected = selected.unwrap();
        assert_eq!(selected.source, "cargo:foo");
        assert_eq!(selected.selection_reason.as_deref(), Some("repository_presence"));
        assert!(!high_risk);
    }

    #[test]
    fn version_history_dominance_wins_when_repo_tied() {
        let probes = vec![probe("cargo:foo", 100, 50, true), probe("npm:foo", 95, 2, true)];
        let (selected, _, _, _) = select(&probes);
        let selected = selected.unwrap();
        assert_eq!(selected.source, "cargo:foo");
        assert_eq!(selected.selection_reason.as_deref(), Some("version_history"));
    }

    #[test]
    fn priority_fallback_flags_high_risk() {
        let probes = vec![probe("npm:foo", 100, 3, true), probe("cargo:foo", 95, 3, true)];
        let (selected, _, _, high_risk) = select(&probes);
        let selected = selected.unwrap();
        assert_eq!(selected.selection_reason.as_deref(), Some("priority_fallback"));
        assert!(high_risk);
        assert_eq!(selected.source, "npm:foo");
    }

    #[test]
    fn empty_probes_yield_no_selection() {
        let (selected, alternatives, ratio, high_risk) = select(&[]);
        assert!(selected.is_none());
        assert!(alternatives.is_empty());
        assert_eq!(ratio, 0.0);
        assert!(!high_risk);
    }
}
