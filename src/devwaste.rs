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

use anyhow::Result;
use serde::Serialize;

use crate::{
    store::SnapshotStore,
    utils,
};

const TOP_LOCATION_SAMPLE: usize = 20;
const FOLDER_FETCH: usize = 200;

const CACHE_PATTERNS: [&str; 7] = [
    "/.cache/pip",
    "/.npm/_cacache",
    "/.cache/yarn",
    "/.cache/pnpm",
    "/var/cache/pacman/pkg",
    "/.cache/go-build",
    "/.cargo/registry",
];

const NODE_MODULES_PATTERNS: [&str; 1] = ["%/node_modules/%"];
const VENV_PATTERNS: [&str; 3] = ["%/.venv/%", "%/venv/%", "%/env/%"];
const BUILD_PATTERNS: [&str; 6] = [
    "%/dist/%",
    "%/build/%",
    "%/target/%",
    "%/.next/%",
    "%/.nuxt/%",
    "%/coverage/%",
];

#[derive(Debug, Clone, Serialize)]
pub struct WasteLocation {
    pub folder: String,
    pub bytes: u64,
    pub bytes_human: String,
    pub files: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CachePatternHit {
    pub pattern: String,
    pub bytes: u64,
    pub bytes_human: String,
    pub files: u64,
}

/// One suggestion. Suggestions never delete anything; they point at
/// reclaimable trees the user can act on through the cleanup engine.
#[derive(Debug, Clone, Serialize)]
pub struct WasteSuggestion {
    pub kind: &'static str,
    pub estimated_bytes: u64,
    pub estimated_human: String,
    pub recommendation: &'static str,
    pub top_locations: Vec<WasteLocation>,
    pub cache_hits: Vec<CachePatternHit>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DevWasteReport {
    pub snapshot_id: i64,
    pub suggestions: Vec<WasteSuggestion>,
}

/// Snapshot-backed detection of common development-environment storage
/// waste patterns.
pub struct DevWasteAnalyzer<'a> {
    store: &'a SnapshotStore,
    snapshot_id: i64,
}

impl<'a> DevWasteAnalyzer<'a> {
    pub fn new(store: &'a SnapshotStore, snapshot_id: i64) -> Self {
        Self { store, snapshot_id }
    }

    pub fn analyze(&self) -> Result<DevWasteReport> {
        let mut suggestions = Vec::new();

        if let Some(suggestion) = self.folder_suggestion(
            "node_modules_duplication",
            &NODE_MODULES_PATTERNS,
            "Review monorepo/package dedupe and remove unused node_modules trees.",
        )? {
            suggestions.push(suggestion);
        }

        if let Some(suggestion) = self.folder_suggestion(
            "virtualenv_accumulation",
            &VENV_PATTERNS,
            "Remove stale virtual environments and rebuild from lock files when needed.",
        )? {
            suggestions.push(suggestion);
        }

        let mut cache_hits = Vec::new();
        for pattern in CACHE_PATTERNS {
            let (bytes, files) = self
                .store
                .path_pattern_totals(self.snapshot_id, &format!("%{pattern}%"))?;
            if bytes > 0 {
                cache_hits.push(CachePatternHit {
                    pattern: pattern.to_string(),
                    bytes,
                    bytes_human: utils::format_size(bytes),
                    files,
                });
            }
        }
        if !cache_hits.is_empty() {
            let total: u64 = cache_hits.iter().map(|h| h.bytes).sum();
            suggestions.push(WasteSuggestion {
                kind: "package_manager_caches",
                estimated_bytes: total,
                estimated_human: utils::format_size(total),
                recommendation:
                    "Use package-manager-specific cleanup commands; avoid deleting active caches blindly.",
                top_locations: Vec::new(),
                cache_hits,
            });
        }

        if let Some(suggestion) = self.folder_suggestion(
            "build_artifacts",
            &BUILD_PATTERNS,
            "Delete generated artifacts that can be rebuilt from source.",
        )? {
            suggestions.push(suggestion);
        }

        Ok(DevWasteReport {
            snapshot_id: self.snapshot_id,
            suggestions,
        })
    }

    fn folder_suggestion(
        &self,
        kind: &'static str,
        patterns: &[&str],
        recommendation: &'static str,
    ) -> Result<Option<WasteSuggestion>> {
        let folders = self
            .store
            .path_pattern_folders(self.snapshot_id, patterns, FOLDER_FETCH)?;
        if folders.is_empty() {
            return Ok(None);
        }

        let total: u64 = folders.iter().map(|f| f.bytes).sum();
        let top_locations = folders
            .into_iter()
            .take(TOP_LOCATION_SAMPLE)
            .map(|f| WasteLocation {
                bytes_human: utils::format_size(f.bytes),
                folder: f.folder,
                bytes: f.bytes,
                files: f.file_count,
            })
            .collect();

        Ok(Some(WasteSuggestion {
            kind,
            estimated_bytes: total,
            estimated_human: utils::format_size(total),
            recommendation,
            top_locations,
            cache_hits: Vec::new(),
        }))
    }
}
