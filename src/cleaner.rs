// urraca is a disk intelligence and cleanup tool
// Copyright (C) 2025  Javier Lancha Vázquez <javier.lancha@gmail.com>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::Utc;
use filetime::FileTime;
use serde::Serialize;

use crate::{
    audit::AuditLog,
    classify::FileClassifier,
    global::{self, APP_NAME},
    progress::CancelToken,
    risk::{RiskAssessment, RiskLevel, RiskScorer},
    store::SnapshotStore,
    utils::{self, is_subpath, normalize_path},
};

/// Safety policy for one cleanup execution. Dry-run is the default;
/// destructive mode additionally requires `confirm`.
#[derive(Debug, Clone, Serialize)]
pub struct CleanupPolicy {
    pub dry_run: bool,
    pub force_high_risk: bool,
    pub quarantine_mode: bool,
    pub confirm: bool,
}

impl Default for CleanupPolicy {
    fn default() -> Self {
        Self {
            dry_run: true,
            force_high_risk: false,
            quarantine_mode: true,
            confirm: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ItemStatus {
    DryRun,
    Quarantined,
    Deleted,
    Skipped,
    Failed,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::DryRun => "dry-run",
            ItemStatus::Quarantined => "quarantined",
            ItemStatus::Deleted => "deleted",
            ItemStatus::Skipped => "skipped",
            ItemStatus::Failed => "failed",
        }
    }
}

/// Outcome of one target path.
#[derive(Debug, Clone, Serialize)]
pub struct CleanupItem {
    pub path: PathBuf,
    pub status: ItemStatus,
    pub risk_level: RiskLevel,
    pub risk_score: u8,
    pub reason: String,
    pub quarantine_path: Option<PathBuf>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CleanupReport {
    pub action_id: String,
    pub dry_run: bool,
    pub quarantine_mode: bool,
    pub attempted: usize,
    pub deleted_or_quarantined: usize,
    pub skipped: usize,
    pub failed: usize,
    pub estimated_freed_bytes: u64,
    pub estimated_freed_human: String,
    pub cancelled: bool,
    pub items: Vec<CleanupItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UndoFailure {
    pub original: PathBuf,
    pub quarantine: PathBuf,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UndoReport {
    pub action_id: String,
    pub restored: usize,
    pub failed: usize,
    pub failures: Vec<UndoFailure>,
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
struct ActionDetails<'a> {
    mode: &'a str,
    allowed_roots: &'a [PathBuf],
    dry_run: bool,
    quarantine_mode: bool,
    force_high_risk: bool,
}

/// Risk-scored, root-bound cleanup with quarantine and undo. The engine
/// is the only component that moves files or writes audit rows; each
/// action commits its rows in one transaction.
pub struct CleanupEngine<'a> {
    store: &'a SnapshotStore,
    snapshot_id: i64,
    audit: &'a AuditLog,
    classifier: &'a FileClassifier,
    risk_scorer: RiskScorer,
    quarantine_dir: PathBuf,
}

impl<'a> CleanupEngine<'a> {
    pub fn new(
        store: &'a SnapshotStore,
        snapshot_id: i64,
        audit: &'a AuditLog,
        classifier: &'a FileClassifier,
        quarantine_dir: PathBuf,
    ) -> Self {
        Self {
            store,
            snapshot_id,
            audit,
            classifier,
            risk_scorer: RiskScorer::new(),
            quarantine_dir,
        }
    }

    fn new_action_id() -> String {
        format!(
            "{}_{:08x}",
            Utc::now().format("%Y%m%d_%H%M%S"),
            rand::random::<u32>()
        )
    }

    /// Execute `paths` under `policy`, bounded by `allowed_roots`. Every
    /// target produces exactly one item row. Cancellation is honored
    /// between items, never mid-item.
    pub fn execute(
        &self,
        paths: &[PathBuf],
        mode: &str,
        policy: &CleanupPolicy,
        allowed_roots: &[PathBuf],
        cancel: &CancelToken,
    ) -> Result<CleanupReport> {
        if !policy.dry_run && !policy.confirm {
            bail!("Destructive cleanup requires policy.confirm");
        }

        let action_id = Self::new_action_id();
        let roots: Vec<PathBuf> = allowed_roots.iter().map(|r| normalize_path(r)).collect();
        let details = serde_json::to_string(&ActionDetails {
            mode,
            allowed_roots: &roots,
            dry_run: policy.dry_run,
            quarantine_mode: policy.quarantine_mode,
            force_high_risk: policy.force_high_risk,
        })?;

        let mut report = CleanupReport {
            action_id: action_id.clone(),
            dry_run: policy.dry_run,
            quarantine_mode: policy.quarantine_mode,
            attempted: 0,
            deleted_or_quarantined: 0,
            skipped: 0,
            failed: 0,
            estimated_freed_bytes: 0,
            estimated_freed_human: String::new(),
            cancelled: false,
            items: Vec::new(),
        };

        let tx = self.store.action_transaction()?;
        self.store
            .insert_cleanup_action(&action_id, self.snapshot_id, mode, policy.dry_run, &details)?;

        for path in paths {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            let resolved = normalize_path(path);
            report.attempted += 1;

            if !roots.iter().any(|root| is_subpath(&resolved, root)) {
                self.record_item(
                    &mut report,
                    resolved,
                    ItemStatus::Skipped,
                    RiskLevel::High,
                    100,
                    "outside_allowed_roots".to_string(),
                    None,
                    None,
                )?;
                continue;
            }

            if global::is_protected_path(&resolved) {
                self.record_item(
                    &mut report,
                    resolved,
                    ItemStatus::Skipped,
                    RiskLevel::High,
                    100,
                    "critical_path_protection".to_string(),
                    None,
                    None,
                )?;
                continue;
            }

            let (size, risk) = self.assess_target(&resolved)?;

            if risk.level == RiskLevel::High && !policy.force_high_risk {
                self.record_item(
                    &mut report,
                    resolved,
                    ItemStatus::Skipped,
                    risk.level,
                    risk.score,
                    "high_risk_requires_force".to_string(),
                    None,
                    None,
                )?;
                continue;
            }

            let reason = risk.reasons.join(";");

            if policy.dry_run {
                self.record_item(
                    &mut report,
                    resolved,
                    ItemStatus::DryRun,
                    risk.level,
                    risk.score,
                    reason,
                    None,
                    None,
                )?;
                report.estimated_freed_bytes += size;
                continue;
            }

            if policy.quarantine_mode {
                match self.move_to_quarantine(&action_id, &resolved) {
                    Ok(quarantine_path) => {
                        self.store.insert_quarantine_entry(
                            &action_id,
                            &resolved.to_string_lossy(),
                            &quarantine_path.to_string_lossy(),
                        )?;
                        self.audit.info(&format!(
                            "cleanup_success action={} path={} risk={}",
                            action_id,
                            resolved.display(),
                            risk.level
                        ));
                        self.record_item(
                            &mut report,
                            resolved,
                            ItemStatus::Quarantined,
                            risk.level,
                            risk.score,
                            reason,
                            Some(quarantine_path),
                            None,
                        )?;
                        report.estimated_freed_bytes += size;
                    }
                    Err(e) => {
                        self.audit.error(&format!(
                            "cleanup_failed action={} path={} err={}",
                            action_id,
                            resolved.display(),
                            e
                        ));
                        self.record_item(
                            &mut report,
                            resolved,
                            ItemStatus::Failed,
                            risk.level,
                            risk.score,
                            reason,
                            None,
                            Some(e.to_string()),
                        )?;
                    }
                }
            } else {
                match delete_permanently(&resolved) {
                    Ok(()) => {
                        self.audit.info(&format!(
                            "cleanup_success action={} path={} risk={}",
                            action_id,
                            resolved.display(),
                            risk.level
                        ));
                        self.record_item(
                            &mut report,
                            resolved,
                            ItemStatus::Deleted,
                            risk.level,
                            risk.score,
                            reason,
                            None,
                            None,
                        )?;
                        report.estimated_freed_bytes += size;
                    }
                    Err(e) => {
                        self.audit.error(&format!(
                            "cleanup_failed action={} path={} err={}",
                            action_id,
                            resolved.display(),
                            e
                        ));
                        self.record_item(
                            &mut report,
                            resolved,
                            ItemStatus::Failed,
                            risk.level,
                            risk.score,
                            reason,
                            None,
                            Some(e.to_string()),
                        )?;
                    }
                }
            }
        }

        tx.commit()?;

        report.estimated_freed_human = utils::format_size(report.estimated_freed_bytes);
        Ok(report)
    }

    /// Size and risk for one target, from the snapshot row when present,
    /// re-derived otherwise.
    fn assess_target(&self, resolved: &Path) -> Result<(u64, RiskAssessment)> {
        let facts = self
            .store
            .file_facts(self.snapshot_id, &resolved.to_string_lossy())?;

        let (size, is_hidden, category) = match facts {
            Some(facts) => (facts.size, facts.is_hidden, facts.category),
            None => {
                let extension = resolved
                    .extension()
                    .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
                    .unwrap_or_default();
                let is_hidden = resolved
                    .file_name()
                    .map(|n| n.to_string_lossy().starts_with('.'))
                    .unwrap_or(false);
                (0, is_hidden, self.classifier.classify(resolved, &extension))
            }
        };

        Ok((size, self.risk_scorer.assess(resolved, category, is_hidden)))
    }

    #[allow(clippy::too_many_arguments)]
    fn record_item(
        &self,
        report: &mut CleanupReport,
        path: PathBuf,
        status: ItemStatus,
        risk_level: RiskLevel,
        risk_score: u8,
        reason: String,
        quarantine_path: Option<PathBuf>,
        error: Option<String>,
    ) -> Result<()> {
        self.store.insert_cleanup_item(
            &report.action_id,
            &path.to_string_lossy(),
            status.as_str(),
            risk_level.as_str(),
            risk_score,
            &reason,
            quarantine_path
                .as_ref()
                .map(|p| p.to_string_lossy().to_string())
                .as_deref(),
            error.as_deref(),
        )?;

        match status {
            ItemStatus::Skipped => report.skipped += 1,
            ItemStatus::Failed => report.failed += 1,
            ItemStatus::DryRun | ItemStatus::Quarantined | ItemStatus::Deleted => {
                report.deleted_or_quarantined += 1
            }
        }

        report.items.push(CleanupItem {
            path,
            status,
            risk_level,
            risk_score,
            reason,
            quarantine_path,
            error,
        });
        Ok(())
    }

    /// Quarantine layout:
    /// `<quarantine_root>/<action_id>/<original_path_without_leading_separator>`.
    fn move_to_quarantine(&self, action_id: &str, original: &Path) -> Result<PathBuf> {
        let rel = original.strip_prefix("/").unwrap_or(original);
        let mut target = self.quarantine_dir.join(action_id).join(rel);

        let parent = target
            .parent()
            .context("Quarantine target has no parent")?
            .to_path_buf();
        if std::fs::create_dir_all(&parent).is_err() {
            // Unwritable quarantine root: fall back to a temp tree and
            // record the effective path.
            target = std::env::temp_dir()
                .join(APP_NAME)
                .join("quarantine")
                .join(action_id)
                .join(rel);
            let parent = target
                .parent()
                .context("Quarantine target has no parent")?;
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Could not create quarantine directory '{}'", parent.display())
            })?;
        }

        move_file(original, &target)?;
        Ok(target)
    }

    /// Restore every not-yet-restored manifest row of `action_id`.
    /// Failures are reported per row without aborting the remainder.
    pub fn undo(&self, action_id: &str) -> Result<UndoReport> {
        let rows = self.store.quarantine_entries(action_id)?;
        if rows.is_empty() {
            return Ok(UndoReport {
                action_id: action_id.to_string(),
                restored: 0,
                failed: 0,
                failures: Vec::new(),
                message: Some("No quarantine records found for action.".to_string()),
            });
        }

        let mut restored = 0;
        let mut failures: Vec<UndoFailure> = Vec::new();

        for row in rows {
            if row.restored_at.is_some() {
                continue;
            }

            let outcome = (|| -> Result<()> {
                if !row.quarantine_path.exists() {
                    bail!(
                        "Quarantine path missing: '{}'",
                        row.quarantine_path.display()
                    );
                }
                if let Some(parent) = row.original_path.parent() {
                    std::fs::create_dir_all(parent).with_context(|| {
                        format!("Could not create parent directory '{}'", parent.display())
                    })?;
                }
                move_file(&row.quarantine_path, &row.original_path)?;
                self.store.mark_restored(row.id)?;
                Ok(())
            })();

            match outcome {
                Ok(()) => {
                    restored += 1;
                    self.audit.info(&format!(
                        "undo_restored action={} path={}",
                        action_id,
                        row.original_path.display()
                    ));
                }
                Err(e) => {
                    self.audit.error(&format!(
                        "undo_failed action={} path={} err={}",
                        action_id,
                        row.original_path.display(),
                        e
                    ));
                    failures.push(UndoFailure {
                        original: row.original_path,
                        quarantine: row.quarantine_path,
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(UndoReport {
            action_id: action_id.to_string(),
            restored,
            failed: failures.len(),
            failures,
            message: None,
        })
    }
}

/// Move a file, preserving times when a cross-device rename degrades to
/// copy-and-remove.
fn move_file(src: &Path, dst: &Path) -> Result<()> {
    if std::fs::rename(src, dst).is_ok() {
        return Ok(());
    }

    let metadata = std::fs::symlink_metadata(src)
        .with_context(|| format!("Could not stat '{}'", src.display()))?;
    if !metadata.is_file() {
        bail!(
            "Could not rename '{}' to '{}' across filesystems",
            src.display(),
            dst.display()
        );
    }

    std::fs::copy(src, dst)
        .with_context(|| format!("Could not copy '{}' to '{}'", src.display(), dst.display()))?;
    let mtime = FileTime::from_last_modification_time(&metadata);
    let atime = FileTime::from_last_access_time(&metadata);
    let _ = filetime::set_file_times(dst, atime, mtime);
    std::fs::remove_file(src)
        .with_context(|| format!("Could not remove '{}' after copy", src.display()))?;
    Ok(())
}

fn delete_permanently(path: &Path) -> Result<()> {
    let metadata = std::fs::symlink_metadata(path)
        .with_context(|| format!("Could not stat '{}'", path.display()))?;
    if metadata.is_dir() {
        std::fs::remove_dir_all(path)
            .with_context(|| format!("Could not remove directory '{}'", path.display()))?;
    } else {
        std::fs::remove_file(path)
            .with_context(|| format!("Could not remove '{}'", path.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    struct Fixture {
        _tmp: tempfile::TempDir,
        root: PathBuf,
        quarantine: PathBuf,
        store: SnapshotStore,
        audit: AuditLog,
        classifier: FileClassifier,
        snapshot_id: i64,
    }

    fn fixture() -> Result<Fixture> {
        let tmp = tempdir()?;
        let root = tmp.path().join("data");
        std::fs::create_dir_all(&root)?;
        std::fs::write(root.join("app.log"), b"log line")?;
        std::fs::write(root.join("a.tmp"), b"temp bytes")?;
        std::fs::write(root.join("notes.txt"), b"keep me")?;

        let store = SnapshotStore::open_in_memory()?;
        let snapshot_id = store.create_snapshot(&[root.clone()])?;
        store.finalize_snapshot(snapshot_id, 3, 25, 0.1)?;

        let audit = AuditLog::open(&tmp.path().join("actions.log"))?;
        Ok(Fixture {
            quarantine: tmp.path().join("quarantine"),
            root,
            _tmp: tmp,
            store,
            audit,
            classifier: FileClassifier::new(),
            snapshot_id,
        })
    }

    fn engine(fix: &Fixture) -> CleanupEngine<'_> {
        CleanupEngine::new(
            &fix.store,
            fix.snapshot_id,
            &fix.audit,
            &fix.classifier,
            fix.quarantine.clone(),
        )
    }

    #[test]
    fn test_dry_run_touches_nothing() -> Result<()> {
        let fix = fixture()?;
        let targets = vec![fix.root.join("app.log"), fix.root.join("a.tmp")];

        let report = engine(&fix).execute(
            &targets,
            "logs-temp",
            &CleanupPolicy::default(),
            &[fix.root.clone()],
            &CancelToken::new(),
        )?;

        assert_eq!(report.attempted, 2);
        assert_eq!(report.deleted_or_quarantined, 2);
        assert_eq!(report.skipped, 0);
        assert!(report.items.iter().all(|i| i.status == ItemStatus::DryRun));
        assert!(fix.root.join("app.log").exists());
        assert!(fix.root.join("a.tmp").exists());
        assert!(fix.store.quarantine_entries(&report.action_id)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_destructive_requires_confirm() -> Result<()> {
        let fix = fixture()?;
        let policy = CleanupPolicy {
            dry_run: false,
            ..Default::default()
        };
        assert!(
            engine(&fix)
                .execute(
                    &[fix.root.join("app.log")],
                    "paths",
                    &policy,
                    &[fix.root.clone()],
                    &CancelToken::new(),
                )
                .is_err()
        );
        assert!(fix.root.join("app.log").exists());
        Ok(())
    }

    #[test]
    fn test_quarantine_and_undo_round_trip() -> Result<()> {
        let fix = fixture()?;
        let target = fix.root.join("app.log");
        let original_content = std::fs::read(&target)?;

        let policy = CleanupPolicy {
            dry_run: false,
            confirm: true,
            ..Default::default()
        };
        let cleanup_engine = engine(&fix);
        let report = cleanup_engine.execute(
            &[target.clone()],
            "paths",
            &policy,
            &[fix.root.clone()],
            &CancelToken::new(),
        )?;

        assert_eq!(report.deleted_or_quarantined, 1);
        let item = &report.items[0];
        assert_eq!(item.status, ItemStatus::Quarantined);
        let quarantine_path = item.quarantine_path.clone().unwrap();

        assert!(!target.exists());
        assert!(quarantine_path.exists());
        assert!(quarantine_path.starts_with(fix.quarantine.join(&report.action_id)));
        assert_eq!(std::fs::read(&quarantine_path)?, original_content);

        // Every quarantined item has a manifest row with a null
        // restoration instant.
        let entries = fix.store.quarantine_entries(&report.action_id)?;
        assert_eq!(entries.len(), 1);
        assert!(entries[0].restored_at.is_none());

        let undo = cleanup_engine.undo(&report.action_id)?;
        assert_eq!(undo.restored, 1);
        assert_eq!(undo.failed, 0);
        assert!(target.exists());
        assert_eq!(std::fs::read(&target)?, original_content);

        let entries = fix.store.quarantine_entries(&report.action_id)?;
        assert!(entries[0].restored_at.is_some());
        Ok(())
    }

    #[test]
    fn test_permanent_delete() -> Result<()> {
        let fix = fixture()?;
        let target = fix.root.join("a.tmp");

        let policy = CleanupPolicy {
            dry_run: false,
            quarantine_mode: false,
            confirm: true,
            ..Default::default()
        };
        let report = engine(&fix).execute(
            &[target.clone()],
            "paths",
            &policy,
            &[fix.root.clone()],
            &CancelToken::new(),
        )?;

        assert_eq!(report.items[0].status, ItemStatus::Deleted);
        assert!(!target.exists());
        assert!(fix.store.quarantine_entries(&report.action_id)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_containment_skips_outside_targets() -> Result<()> {
        let fix = fixture()?;
        let report = engine(&fix).execute(
            &[PathBuf::from("/etc/hosts")],
            "paths",
            &CleanupPolicy::default(),
            &[fix.root.clone()],
            &CancelToken::new(),
        )?;

        assert_eq!(report.skipped, 1);
        assert_eq!(report.items[0].status, ItemStatus::Skipped);
        assert_eq!(report.items[0].reason, "outside_allowed_roots");
        Ok(())
    }

    #[test]
    fn test_protected_path_skipped_even_inside_roots() -> Result<()> {
        let fix = fixture()?;
        let report = engine(&fix).execute(
            &[PathBuf::from("/etc")],
            "paths",
            &CleanupPolicy::default(),
            &[PathBuf::from("/etc")],
            &CancelToken::new(),
        )?;

        assert_eq!(report.skipped, 1);
        assert_eq!(report.items[0].reason, "critical_path_protection");
        Ok(())
    }

    #[test]
    fn test_high_risk_requires_force() -> Result<()> {
        let fix = fixture()?;
        // A shared library outside any cache/tmp path scores high via the
        // system category.
        let target = PathBuf::from("/home/nobody/libdemo.so");
        let report = engine(&fix).execute(
            &[target],
            "paths",
            &CleanupPolicy::default(),
            &[PathBuf::from("/home/nobody")],
            &CancelToken::new(),
        )?;

        assert_eq!(report.skipped, 1);
        assert_eq!(report.items[0].reason, "high_risk_requires_force");
        assert_eq!(report.items[0].risk_level, RiskLevel::High);
        Ok(())
    }

    #[test]
    fn test_missing_target_fails_per_item() -> Result<()> {
        let fix = fixture()?;
        let missing = fix.root.join("vanished.tmp");

        let policy = CleanupPolicy {
            dry_run: false,
            confirm: true,
            ..Default::default()
        };
        let report = engine(&fix).execute(
            &[missing, fix.root.join("a.tmp")],
            "paths",
            &policy,
            &[fix.root.clone()],
            &CancelToken::new(),
        )?;

        assert_eq!(report.failed, 1);
        assert_eq!(report.deleted_or_quarantined, 1);
        assert!(report.items[0].error.is_some());
        Ok(())
    }

    #[test]
    fn test_undo_reports_missing_quarantine_source() -> Result<()> {
        let fix = fixture()?;
        let target = fix.root.join("app.log");

        let policy = CleanupPolicy {
            dry_run: false,
            confirm: true,
            ..Default::default()
        };
        let cleanup_engine = engine(&fix);
        let report = cleanup_engine.execute(
            &[target],
            "paths",
            &policy,
            &[fix.root.clone()],
            &CancelToken::new(),
        )?;

        let quarantine_path = report.items[0].quarantine_path.clone().unwrap();
        std::fs::remove_file(&quarantine_path)?;

        let undo = cleanup_engine.undo(&report.action_id)?;
        assert_eq!(undo.restored, 0);
        assert_eq!(undo.failed, 1);
        assert!(undo.failures[0].error.contains("Quarantine path missing"));

        let entries = fix.store.quarantine_entries(&report.action_id)?;
        assert!(entries[0].restored_at.is_none());
        Ok(())
    }

    #[test]
    fn test_undo_unknown_action() -> Result<()> {
        let fix = fixture()?;
        let undo = engine(&fix).undo("nope")?;
        assert_eq!(undo.restored, 0);
        assert!(undo.message.is_some());
        Ok(())
    }
}
