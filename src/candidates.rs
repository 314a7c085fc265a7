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

use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};

use crate::{
    analyzer::Analyzer,
    duplicates::{DuplicateDetector, DuplicateReport},
    progress::CancelToken,
    store::SnapshotStore,
    utils::normalize_path,
};

/// How cleanup candidates are selected from a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupMode {
    Duplicates,
    LargeOld,
    LogsTemp,
    PathList,
}

impl CleanupMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CleanupMode::Duplicates => "duplicates",
            CleanupMode::LargeOld => "large-old",
            CleanupMode::LogsTemp => "logs-temp",
            CleanupMode::PathList => "path-list",
        }
    }
}

impl std::fmt::Display for CleanupMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parameters consumed by the individual selectors.
#[derive(Debug, Clone)]
pub struct CandidateParams {
    pub min_size: u64,
    pub older_than_days: u32,
    pub limit: usize,
    pub path_list: Option<PathBuf>,
}

/// Collect cleanup candidates for `mode` over one snapshot.
pub fn collect(
    store: &SnapshotStore,
    snapshot_id: i64,
    mode: CleanupMode,
    params: &CandidateParams,
    cancel: &CancelToken,
) -> Result<Vec<PathBuf>> {
    match mode {
        CleanupMode::Duplicates => {
            let report =
                DuplicateDetector::new(store, snapshot_id, None).find_duplicates(cancel)?;
            Ok(duplicate_remove_paths(&report))
        }
        CleanupMode::LargeOld => {
            let analyzer = Analyzer::new(store, snapshot_id);
            Ok(analyzer
                .large_and_old_files(params.min_size, params.older_than_days, params.limit)?
                .into_iter()
                .map(|f| f.path)
                .collect())
        }
        CleanupMode::LogsTemp => logs_temp(store, snapshot_id, params.limit),
        CleanupMode::PathList => {
            let Some(list_file) = &params.path_list else {
                bail!("A path list file is required for path-list mode");
            };
            path_list_candidates(list_file)
        }
    }
}

const LOGS_TEMP_EXTENSIONS: [&str; 6] = [".log", ".tmp", ".cache", ".trace", ".out", ".err"];
const LOGS_TEMP_MARKERS: [&str; 3] = ["/tmp/", "/cache/", "/var/tmp/"];

/// Log and temp candidates, largest first. Path markers are matched
/// against the path relative to the scan roots, so a snapshot rooted
/// inside `/tmp` does not sweep up every file it holds.
pub fn logs_temp(store: &SnapshotStore, snapshot_id: i64, limit: usize) -> Result<Vec<PathBuf>> {
    let roots = store.snapshot_row(snapshot_id)?.roots;
    let broad = store.logs_temp_candidates(snapshot_id, limit)?;

    Ok(broad
        .into_iter()
        .filter(|path| {
            let extension = path
                .extension()
                .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
                .unwrap_or_default();
            if LOGS_TEMP_EXTENSIONS.contains(&extension.as_str()) {
                return true;
            }

            let relative = roots
                .iter()
                .find_map(|root| path.strip_prefix(root).ok())
                .map(|rel| format!("/{}", rel.to_string_lossy()))
                .unwrap_or_else(|| path.to_string_lossy().to_string());
            LOGS_TEMP_MARKERS.iter().any(|m| relative.contains(m))
        })
        .collect())
}

/// All remove-paths across clusters, deduplicated, order preserved.
pub fn duplicate_remove_paths(report: &DuplicateReport) -> Vec<PathBuf> {
    let mut seen: BTreeSet<&PathBuf> = BTreeSet::new();
    let mut paths = Vec::new();
    for cluster in &report.clusters {
        for path in &cluster.remove_paths {
            if seen.insert(path) {
                paths.push(path.clone());
            }
        }
    }
    paths
}

/// Caller-supplied newline-separated path list; entries are normalized.
pub fn path_list_candidates(list_file: &Path) -> Result<Vec<PathBuf>> {
    let text = std::fs::read_to_string(list_file)
        .with_context(|| format!("Path list file not found: '{}'", list_file.display()))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| normalize_path(Path::new(line)))
        .collect())
}
