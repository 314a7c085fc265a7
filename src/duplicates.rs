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
    collections::BTreeMap,
    path::PathBuf,
};

use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::Serialize;

use crate::{
    global::defaults::{
        DEFAULT_CANDIDATE_CEILING, FULL_HASH_BUFFER, FULL_HASH_CHUNK, HASH_ERROR_SAMPLE,
        PARTIAL_HASH_BYTES, PARTIAL_HASH_CHUNK,
    },
    hashing,
    progress::CancelToken,
    store::{HashCandidate, SnapshotStore},
    utils,
};

const CLUSTER_ID_LEN: usize = 16;

#[derive(Debug, Clone, Serialize)]
pub struct HashError {
    pub path: PathBuf,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PhaseStats {
    pub size_groups: usize,
    pub partial_groups: usize,
    pub full_groups: usize,
}

/// One set of byte-identical files. The keep path is the oldest member;
/// everything else is reclaimable.
#[derive(Debug, Clone, Serialize)]
pub struct DuplicateCluster {
    pub cluster_id: String,
    pub size_each: u64,
    pub size_each_human: String,
    pub file_count: usize,
    pub potential_waste: u64,
    pub potential_waste_human: String,
    pub keep_path: PathBuf,
    pub remove_paths: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DuplicateReport {
    pub cluster_count: usize,
    pub potential_waste_bytes: u64,
    pub potential_waste_human: String,
    pub phase_stats: PhaseStats,
    pub clusters: Vec<DuplicateCluster>,
    pub cancelled: bool,
    pub errors_count: usize,
    pub errors: Vec<HashError>,
}

impl DuplicateReport {
    fn empty() -> Self {
        Self {
            cluster_count: 0,
            potential_waste_bytes: 0,
            potential_waste_human: utils::format_size(0),
            phase_stats: PhaseStats::default(),
            clusters: Vec::new(),
            cancelled: false,
            errors_count: 0,
            errors: Vec::new(),
        }
    }
}

/// Three-phase duplicate detector: size bucketing, partial hashing, full
/// hashing. Hashing runs on a worker pool sized from the CPU count and is
/// deterministic for a given snapshot.
pub struct DuplicateDetector<'a> {
    store: &'a SnapshotStore,
    snapshot_id: i64,
    workers: usize,
    candidate_ceiling: usize,
}

impl<'a> DuplicateDetector<'a> {
    pub fn new(store: &'a SnapshotStore, snapshot_id: i64, workers: Option<usize>) -> Self {
        Self {
            store,
            snapshot_id,
            workers: workers.unwrap_or_else(|| (num_cpus::get().saturating_sub(1)).max(1)),
            candidate_ceiling: DEFAULT_CANDIDATE_CEILING,
        }
    }

    pub fn with_candidate_ceiling(mut self, ceiling: usize) -> Self {
        self.candidate_ceiling = ceiling.max(1);
        self
    }

    pub fn find_duplicates(&self, cancel: &CancelToken) -> Result<DuplicateReport> {
        // Phase 1: sizes with at least two non-empty files, largest
        // buckets first. Trimming whole candidate lists at the ceiling
        // biases toward large groups.
        let buckets = self.store.duplicate_size_buckets(self.snapshot_id)?;
        if buckets.is_empty() {
            return Ok(DuplicateReport::empty());
        }

        let mut candidates: Vec<HashCandidate> = Vec::new();
        for (size, _count) in &buckets {
            if candidates.len() >= self.candidate_ceiling {
                break;
            }
            candidates.extend(self.store.files_with_size(self.snapshot_id, *size)?);
        }
        candidates.truncate(self.candidate_ceiling);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()
            .context("Could not build the hashing worker pool")?;

        let mut errors: Vec<HashError> = Vec::new();

        // Phase 2: partial hash, grouped by (size, digest).
        let paths: Vec<PathBuf> = candidates.iter().map(|c| c.path.clone()).collect();
        let partial_digests = Self::hash_paths(&pool, &paths, PARTIAL_HASH_CHUNK, cancel, |path| {
            hashing::hash_file_prefix(path, PARTIAL_HASH_BYTES)
        });

        let meta: BTreeMap<PathBuf, &HashCandidate> =
            candidates.iter().map(|c| (c.path.clone(), c)).collect();

        let mut partial_groups: BTreeMap<(u64, String), Vec<&HashCandidate>> = BTreeMap::new();
        for (path, digest) in partial_digests {
            let Some(candidate) = meta.get(&path).copied() else {
                continue;
            };
            match digest {
                Ok(digest) => partial_groups
                    .entry((candidate.size, digest))
                    .or_default()
                    .push(candidate),
                Err(error) => errors.push(HashError { path, error }),
            }
        }
        let partial_group_count = partial_groups.len();

        // Phase 3: full hash over multi-member partial groups.
        let full_candidates: Vec<&HashCandidate> = partial_groups
            .into_values()
            .filter(|group| group.len() > 1)
            .flatten()
            .collect();
        let full_paths: Vec<PathBuf> = full_candidates.iter().map(|c| c.path.clone()).collect();
        let full_digests = Self::hash_paths(&pool, &full_paths, FULL_HASH_CHUNK, cancel, |path| {
            hashing::hash_file_full(path, FULL_HASH_BUFFER)
        });

        let mut digest_by_path: BTreeMap<PathBuf, String> = BTreeMap::new();
        for (path, digest) in full_digests {
            match digest {
                Ok(digest) => {
                    digest_by_path.insert(path, digest);
                }
                Err(error) => errors.push(HashError { path, error }),
            }
        }

        let mut by_full: BTreeMap<String, Vec<&HashCandidate>> = BTreeMap::new();
        for &candidate in &full_candidates {
            if let Some(digest) = digest_by_path.get(&candidate.path) {
                by_full.entry(digest.clone()).or_default().push(candidate);
            }
        }
        let full_group_count = by_full.len();

        let mut clusters: Vec<DuplicateCluster> = Vec::new();
        for (digest, mut group) in by_full {
            if group.len() < 2 {
                continue;
            }
            // Keep the oldest member; ties break on path so the result is
            // stable across runs.
            group.sort_by(|a, b| a.mtime.cmp(&b.mtime).then_with(|| a.path.cmp(&b.path)));

            let size_each = group[0].size;
            let potential_waste = size_each * (group.len() as u64 - 1);
            clusters.push(DuplicateCluster {
                cluster_id: digest[..CLUSTER_ID_LEN].to_string(),
                size_each,
                size_each_human: utils::format_size(size_each),
                file_count: group.len(),
                potential_waste,
                potential_waste_human: utils::format_size(potential_waste),
                keep_path: group[0].path.clone(),
                remove_paths: group[1..].iter().map(|c| c.path.clone()).collect(),
            });
        }

        clusters.sort_by(|a, b| {
            b.potential_waste
                .cmp(&a.potential_waste)
                .then_with(|| a.cluster_id.cmp(&b.cluster_id))
        });

        let total_waste: u64 = clusters.iter().map(|c| c.potential_waste).sum();
        let errors_count = errors.len();
        errors.truncate(HASH_ERROR_SAMPLE);

        Ok(DuplicateReport {
            cluster_count: clusters.len(),
            potential_waste_bytes: total_waste,
            potential_waste_human: utils::format_size(total_waste),
            phase_stats: PhaseStats {
                size_groups: buckets.len(),
                partial_groups: partial_group_count,
                full_groups: full_group_count,
            },
            clusters,
            cancelled: cancel.is_cancelled(),
            errors_count,
            errors,
        })
    }

    /// Hash paths on the pool in chunks. Cancellation is honored between
    /// chunks; cancelled chunks produce no results.
    fn hash_paths(
        pool: &rayon::ThreadPool,
        paths: &[PathBuf],
        chunk_size: usize,
        cancel: &CancelToken,
        hash_one: impl Fn(&PathBuf) -> Result<String> + Sync,
    ) -> Vec<(PathBuf, Result<String, String>)> {
        pool.install(|| {
            paths
                .par_chunks(chunk_size)
                .flat_map_iter(|chunk| {
                    if cancel.is_cancelled() {
                        return Vec::new().into_iter();
                    }
                    chunk
                        .iter()
                        .map(|path| {
                            (
                                path.clone(),
                                hash_one(path).map_err(|e| e.to_string()),
                            )
                        })
                        .collect::<Vec<_>>()
                        .into_iter()
                })
                .collect()
        })
    }
}
