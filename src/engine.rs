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

use std::path::PathBuf;

use anyhow::{Result, anyhow};

use crate::{
    analyzer::Analyzer,
    audit::AuditLog,
    classify::FileClassifier,
    cleaner::CleanupEngine,
    global::{self, APP_NAME},
    progress::{CancelToken, ProgressCallback},
    scanner::{ScanConfig, ScanReport, Scanner},
    store::SnapshotStore,
    ui,
};

/// Engine wiring, resolved from CLI arguments or embedder configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub db_path: PathBuf,
    pub classifier_rules: Option<PathBuf>,
    pub log_file: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            db_path: global::default_db_path(),
            classifier_rules: None,
            log_file: global::default_log_file(),
        }
    }
}

/// Top-level orchestrator owning the store, the classifier and the audit
/// log. Collaborators are injected here once; nothing in the core keeps
/// hidden global state.
pub struct Engine {
    store: SnapshotStore,
    classifier: FileClassifier,
    audit: AuditLog,
}

impl Engine {
    pub fn open(config: &EngineConfig) -> Result<Self> {
        let audit = AuditLog::open(&config.log_file)?;

        let store = match SnapshotStore::open(&config.db_path) {
            Ok(store) => store,
            Err(e) => {
                let fallback = std::env::temp_dir().join(APP_NAME).join("urraca.db");
                ui::cli::warning!(
                    "Could not open database '{}': {}. Falling back to '{}'",
                    config.db_path.display(),
                    e,
                    fallback.display()
                );
                SnapshotStore::open(&fallback)?
            }
        };

        let classifier = match &config.classifier_rules {
            Some(rule_file) => FileClassifier::with_rule_file(rule_file)?,
            None => FileClassifier::new(),
        };

        Ok(Self {
            store,
            classifier,
            audit,
        })
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub fn classifier(&self) -> &FileClassifier {
        &self.classifier
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// Run one scan into a fresh snapshot. Root validation happens before
    /// the snapshot row is created.
    pub fn scan(
        &mut self,
        config: &ScanConfig,
        progress: Option<&ProgressCallback>,
        cancel: &CancelToken,
    ) -> Result<ScanReport> {
        let Self {
            store,
            classifier,
            audit,
        } = self;

        let scanner = Scanner::new(config, classifier);
        let roots = scanner.validated_roots()?;
        let snapshot_id = store.create_snapshot(&roots)?;
        let report = scanner.scan_to_store(store, snapshot_id, &roots, progress, cancel)?;

        audit.info(&format!(
            "scan_complete snapshot={} files={} bytes={} cancelled={}",
            report.snapshot_id, report.total_files, report.total_bytes, report.cancelled
        ));
        Ok(report)
    }

    pub fn analyzer(&self, snapshot_id: i64) -> Analyzer<'_> {
        Analyzer::new(&self.store, snapshot_id)
    }

    pub fn cleanup_engine(&self, snapshot_id: i64, quarantine_dir: PathBuf) -> CleanupEngine<'_> {
        CleanupEngine::new(
            &self.store,
            snapshot_id,
            &self.audit,
            &self.classifier,
            quarantine_dir,
        )
    }

    /// Resolve an explicit snapshot id, or the latest one.
    pub fn resolve_snapshot(&self, requested: Option<i64>) -> Result<i64> {
        match requested {
            Some(id) => {
                self.store.snapshot_row(id)?;
                Ok(id)
            }
            None => self
                .store
                .latest_snapshot()?
                .ok_or_else(|| anyhow!("No snapshots available. Run a scan first.")),
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_scan_and_resolve() -> Result<()> {
        let tmp = tempdir()?;
        let data = tmp.path().join("data");
        std::fs::create_dir_all(&data)?;
        std::fs::write(data.join("x.txt"), b"x")?;

        let config = EngineConfig {
            db_path: tmp.path().join("db").join("urraca.db"),
            classifier_rules: None,
            log_file: tmp.path().join("actions.log"),
        };
        let mut engine = Engine::open(&config)?;

        assert!(engine.resolve_snapshot(None).is_err());

        let scan_config = ScanConfig::new(vec![data]);
        let report = engine.scan(&scan_config, None, &CancelToken::new())?;
        assert_eq!(report.total_files, 1);

        assert_eq!(engine.resolve_snapshot(None)?, report.snapshot_id);
        assert_eq!(
            engine.resolve_snapshot(Some(report.snapshot_id))?,
            report.snapshot_id
        );
        assert!(engine.resolve_snapshot(Some(9999)).is_err());

        // The scan left an audit line behind.
        let log = std::fs::read_to_string(tmp.path().join("actions.log"))?;
        assert!(log.contains("scan_complete"));
        Ok(())
    }

    #[test]
    fn test_database_fallback() -> Result<()> {
        let tmp = tempdir()?;
        let config = EngineConfig {
            // A path that cannot be created forces the temp fallback.
            db_path: PathBuf::from("/proc/urraca-nope/urraca.db"),
            classifier_rules: None,
            log_file: tmp.path().join("actions.log"),
        };
        let engine = Engine::open(&config)?;
        assert!(engine.store().db_path().is_some());
        Ok(())
    }
}
