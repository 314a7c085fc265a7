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

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::{
    classify::Category,
    global::defaults::FOLDER_REPORT_SAMPLE,
    store::{SnapshotStore, StoredFile},
    utils::{self, size},
};

const PARETO_FOLDER_FETCH: usize = 20_000;
const PARETO_TARGET: f64 = 0.8;

/// Histogram bucket boundaries, lower-inclusive and upper-exclusive, with
/// an overflow bucket past the last boundary.
const SIZE_HIST_BINS: [u64; 8] = [
    0,
    4 * size::KiB,
    64 * size::KiB,
    size::MiB,
    10 * size::MiB,
    100 * size::MiB,
    size::GiB,
    10 * size::GiB,
];

#[derive(Debug, Clone, Serialize)]
pub struct SummaryReport {
    pub snapshot_id: i64,
    pub created_at: DateTime<Utc>,
    pub total_files: u64,
    pub total_bytes: u64,
    pub total_human: String,
    pub duration_sec: f64,
    pub roots: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileEntry {
    pub path: PathBuf,
    pub size: u64,
    pub size_human: String,
    pub mtime: i64,
    pub days_old: i64,
    pub category: Category,
}

impl From<StoredFile> for FileEntry {
    fn from(file: StoredFile) -> Self {
        Self {
            size_human: utils::format_size(file.size),
            days_old: utils::days_since(file.mtime),
            path: file.path,
            size: file.size,
            mtime: file.mtime,
            category: file.category,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FolderEntry {
    pub folder: String,
    pub bytes: u64,
    pub bytes_human: String,
    pub file_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TypeEntry {
    pub category: Category,
    pub files: u64,
    pub bytes: u64,
    pub bytes_human: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtensionEntry {
    pub extension: String,
    pub files: u64,
    pub bytes: u64,
    pub bytes_human: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParetoReport {
    pub target_bytes_80pct: u64,
    pub target_human_80pct: String,
    pub folder_count_needed: usize,
    pub total_folders: usize,
    pub coverage_pct: f64,
    pub top_consumers: Vec<FolderEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistogramBucket {
    pub label: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FolderDelta {
    pub folder: String,
    pub delta_bytes: i64,
    pub delta_human: String,
    pub direction: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChurnReport {
    pub added: u64,
    pub removed: u64,
    pub changed: u64,
    pub churn_rate_pct: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GrowthReport {
    pub has_previous: bool,
    pub current_snapshot: i64,
    pub previous_snapshot: Option<i64>,
    pub current_total_bytes: u64,
    pub previous_total_bytes: u64,
    pub delta_bytes: i64,
    pub delta_human: String,
    pub direction: &'static str,
    pub folder_level_changes: Vec<FolderDelta>,
    pub file_churn: Option<ChurnReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub snapshot_id: i64,
    pub created_at: DateTime<Utc>,
    pub total_files: u64,
    pub total_bytes: u64,
    pub total_human: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictionReport {
    pub has_prediction: bool,
    pub points: usize,
    pub model: Option<&'static str>,
    pub slope_bytes_per_day: Option<f64>,
    pub intercept: Option<f64>,
    pub disk_total_bytes: Option<u64>,
    pub disk_total_human: Option<String>,
    pub predicted_full_date: Option<DateTime<Utc>>,
    pub eta_days: Option<f64>,
    pub assumptions: Vec<String>,
}

impl PredictionReport {
    pub fn unavailable(points: usize, note: &str) -> Self {
        Self {
            has_prediction: false,
            points,
            model: None,
            slope_bytes_per_day: None,
            intercept: None,
            disk_total_bytes: None,
            disk_total_human: None,
            predicted_full_date: None,
            eta_days: None,
            assumptions: vec![note.to_string()],
        }
    }
}

/// Read-only aggregation over one finalized snapshot, plus growth
/// comparison against its nearest finalized predecessor.
pub struct Analyzer<'a> {
    store: &'a SnapshotStore,
    snapshot_id: i64,
}

impl<'a> Analyzer<'a> {
    pub fn new(store: &'a SnapshotStore, snapshot_id: i64) -> Self {
        Self { store, snapshot_id }
    }

    pub fn summary(&self) -> Result<SummaryReport> {
        let row = self.store.snapshot_row(self.snapshot_id)?;
        Ok(SummaryReport {
            snapshot_id: row.id,
            created_at: row.created_at,
            total_files: row.total_files,
            total_bytes: row.total_bytes,
            total_human: utils::format_size(row.total_bytes),
            duration_sec: row.duration_sec,
            roots: row.roots,
        })
    }

    pub fn largest_files(&self, limit: usize) -> Result<Vec<FileEntry>> {
        Ok(self
            .store
            .largest_files(self.snapshot_id, limit)?
            .into_iter()
            .map(FileEntry::from)
            .collect())
    }

    pub fn folder_sizes(&self, limit: usize) -> Result<Vec<FolderEntry>> {
        Ok(self
            .store
            .folder_sizes(self.snapshot_id, limit)?
            .into_iter()
            .map(|f| FolderEntry {
                bytes_human: utils::format_size(f.bytes),
                folder: f.folder,
                bytes: f.bytes,
                file_count: f.file_count,
            })
            .collect())
    }

    pub fn type_distribution(&self) -> Result<Vec<TypeEntry>> {
        Ok(self
            .store
            .type_distribution(self.snapshot_id)?
            .into_iter()
            .map(|t| TypeEntry {
                bytes_human: utils::format_size(t.bytes),
                category: t.category,
                files: t.files,
                bytes: t.bytes,
            })
            .collect())
    }

    pub fn extension_frequency(&self, limit: usize) -> Result<Vec<ExtensionEntry>> {
        Ok(self
            .store
            .extension_frequency(self.snapshot_id, limit)?
            .into_iter()
            .map(|e| ExtensionEntry {
                extension: if e.extension.is_empty() {
                    "(none)".to_string()
                } else {
                    e.extension
                },
                bytes_human: utils::format_size(e.bytes),
                files: e.files,
                bytes: e.bytes,
            })
            .collect())
    }

    /// Smallest prefix of the folder ordering covering 80% of the folder
    /// total, with the coverage actually achieved.
    pub fn pareto_top_consumers(&self) -> Result<ParetoReport> {
        let folders = self.folder_sizes(PARETO_FOLDER_FETCH)?;
        let total: u64 = folders.iter().map(|f| f.bytes).sum();
        let total = total.max(1);
        let target = (total as f64 * PARETO_TARGET) as u64;

        let mut running: u64 = 0;
        let mut chosen = Vec::new();
        for folder in &folders {
            running += folder.bytes;
            chosen.push(folder.clone());
            if running >= target {
                break;
            }
        }

        let coverage_pct = (running as f64 * 100.0 / total as f64 * 100.0).round() / 100.0;
        let folder_count_needed = chosen.len();
        chosen.truncate(FOLDER_REPORT_SAMPLE);

        Ok(ParetoReport {
            target_bytes_80pct: target,
            target_human_80pct: utils::format_size(target),
            folder_count_needed,
            total_folders: folders.len(),
            coverage_pct,
            top_consumers: chosen,
        })
    }

    /// Counts per fixed logarithmic size bucket, in bucket order.
    pub fn size_histogram(&self) -> Result<Vec<HistogramBucket>> {
        let mut labels: Vec<String> = Vec::new();
        for window in SIZE_HIST_BINS.windows(2) {
            labels.push(format!(
                "{}-{}",
                utils::format_size(window[0]),
                utils::format_size(window[1])
            ));
        }
        labels.push(format!(
            ">={}",
            utils::format_size(SIZE_HIST_BINS[SIZE_HIST_BINS.len() - 1])
        ));

        let mut counts = vec![0u64; labels.len()];
        for file_size in self.store.file_sizes(self.snapshot_id)? {
            let mut bucket = labels.len() - 1;
            for (i, window) in SIZE_HIST_BINS.windows(2).enumerate() {
                if file_size < window[1] {
                    bucket = i;
                    break;
                }
            }
            counts[bucket] += 1;
        }

        Ok(labels
            .into_iter()
            .zip(counts)
            .map(|(label, count)| HistogramBucket { label, count })
            .collect())
    }

    pub fn large_files(&self, min_size: u64, limit: usize) -> Result<Vec<FileEntry>> {
        Ok(self
            .store
            .large_files(self.snapshot_id, min_size, limit)?
            .into_iter()
            .map(FileEntry::from)
            .collect())
    }

    pub fn old_files(&self, older_than_days: u32, limit: usize) -> Result<Vec<FileEntry>> {
        let cutoff = Utc::now().timestamp() - i64::from(older_than_days) * 86_400;
        Ok(self
            .store
            .old_files(self.snapshot_id, cutoff, limit)?
            .into_iter()
            .map(FileEntry::from)
            .collect())
    }

    pub fn large_and_old_files(
        &self,
        min_size: u64,
        older_than_days: u32,
        limit: usize,
    ) -> Result<Vec<FileEntry>> {
        let cutoff = Utc::now().timestamp() - i64::from(older_than_days) * 86_400;
        Ok(self
            .store
            .large_and_old_files(self.snapshot_id, min_size, cutoff, limit)?
            .into_iter()
            .map(FileEntry::from)
            .collect())
    }

    /// Growth against the nearest finalized predecessor: total deltas,
    /// per-top-dir deltas by absolute magnitude, and file churn.
    pub fn growth_compare_previous(&self) -> Result<GrowthReport> {
        let current = self.store.snapshot_row(self.snapshot_id)?;

        let Some(previous_id) = self.store.previous_snapshot(self.snapshot_id)? else {
            return Ok(GrowthReport {
                has_previous: false,
                current_snapshot: self.snapshot_id,
                previous_snapshot: None,
                current_total_bytes: current.total_bytes,
                previous_total_bytes: 0,
                delta_bytes: 0,
                delta_human: utils::format_size(0),
                direction: "flat",
                folder_level_changes: Vec::new(),
                file_churn: None,
            });
        };

        let previous = self.store.snapshot_row(previous_id)?;
        let delta = current.total_bytes as i64 - previous.total_bytes as i64;

        let current_dirs = self.store.folder_usage_map(self.snapshot_id)?;
        let previous_dirs = self.store.folder_usage_map(previous_id)?;

        let mut changes: Vec<FolderDelta> = Vec::new();
        let all_dirs: std::collections::BTreeSet<&String> =
            current_dirs.keys().chain(previous_dirs.keys()).collect();
        for dir in all_dirs {
            let diff = current_dirs.get(dir).copied().unwrap_or(0)
                - previous_dirs.get(dir).copied().unwrap_or(0);
            if diff != 0 {
                changes.push(FolderDelta {
                    folder: dir.clone(),
                    delta_bytes: diff,
                    delta_human: utils::format_size(diff.unsigned_abs()),
                    direction: if diff > 0 { "growth" } else { "shrink" },
                });
            }
        }
        changes.sort_by_key(|c| std::cmp::Reverse(c.delta_bytes.abs()));
        changes.truncate(FOLDER_REPORT_SAMPLE);

        let churn = self.store.churn_counts(self.snapshot_id, previous_id)?;
        let total_files = current.total_files.max(1);
        let churn_rate =
            (churn.added + churn.removed + churn.changed) as f64 * 100.0 / total_files as f64;

        Ok(GrowthReport {
            has_previous: true,
            current_snapshot: self.snapshot_id,
            previous_snapshot: Some(previous_id),
            current_total_bytes: current.total_bytes,
            previous_total_bytes: previous.total_bytes,
            delta_bytes: delta,
            delta_human: utils::format_size(delta.unsigned_abs()),
            direction: if delta > 0 {
                "growth"
            } else if delta < 0 {
                "shrink"
            } else {
                "flat"
            },
            folder_level_changes: changes,
            file_churn: Some(ChurnReport {
                added: churn.added,
                removed: churn.removed,
                changed: churn.changed,
                churn_rate_pct: (churn_rate * 1000.0).round() / 1000.0,
            }),
        })
    }

    /// All snapshots in insertion order with their totals.
    pub fn growth_history(&self) -> Result<Vec<HistoryEntry>> {
        Ok(self
            .store
            .all_snapshots()?
            .into_iter()
            .map(|row| HistoryEntry {
                snapshot_id: row.id,
                created_at: row.created_at,
                total_files: row.total_files,
                total_bytes: row.total_bytes,
                total_human: utils::format_size(row.total_bytes),
            })
            .collect())
    }

    /// Fit `y = a + b·x` over (days since first snapshot, total bytes) and
    /// solve for the day the first root's filesystem fills up.
    pub fn predict_disk_fill(&self) -> Result<PredictionReport> {
        let roots = self.store.snapshot_row(self.snapshot_id)?.roots;
        let root = roots
            .first()
            .cloned()
            .unwrap_or_else(|| PathBuf::from("/"));
        let disk_total = utils::disk_total_bytes(&root)?;
        self.predict_with_disk_total(disk_total)
    }

    /// Prediction against a caller-supplied disk capacity.
    pub fn predict_with_disk_total(&self, disk_total: u64) -> Result<PredictionReport> {
        let history: Vec<_> = self
            .store
            .all_snapshots()?
            .into_iter()
            .filter(|row| row.is_finalized())
            .collect();

        if history.len() < 3 {
            return Ok(PredictionReport::unavailable(
                history.len(),
                "Requires at least 3 snapshots for linear trend.",
            ));
        }

        let t0 = history[0].created_at.timestamp();
        let xs: Vec<f64> = history
            .iter()
            .map(|h| (h.created_at.timestamp() - t0) as f64 / 86_400.0)
            .collect();
        let ys: Vec<f64> = history.iter().map(|h| h.total_bytes as f64).collect();

        let n = xs.len() as f64;
        let mean_x = xs.iter().sum::<f64>() / n;
        let mean_y = ys.iter().sum::<f64>() / n;
        let num: f64 = xs
            .iter()
            .zip(&ys)
            .map(|(x, y)| (x - mean_x) * (y - mean_y))
            .sum();
        let den: f64 = xs.iter().map(|x| (x - mean_x).powi(2)).sum();

        if den == 0.0 {
            return Ok(PredictionReport::unavailable(
                history.len(),
                "Insufficient time variance between snapshots.",
            ));
        }

        let slope = num / den;
        let intercept = mean_y - slope * mean_x;

        if slope <= 0.0 {
            let mut report = PredictionReport::unavailable(
                history.len(),
                "Linear trend indicates stable/decreasing usage.",
            );
            report.slope_bytes_per_day = Some(slope);
            report.disk_total_bytes = Some(disk_total);
            return Ok(report);
        }

        let day_to_full = (disk_total as f64 - intercept) / slope;
        let last_day = *xs.last().expect("At least three samples");
        let eta_days = (day_to_full - last_day).max(0.0);

        let last_created = history
            .last()
            .expect("At least three samples")
            .created_at;
        let predicted = last_created + Duration::seconds((eta_days * 86_400.0) as i64);

        Ok(PredictionReport {
            has_prediction: true,
            points: history.len(),
            model: Some("linear_regression"),
            slope_bytes_per_day: Some(slope),
            intercept: Some(intercept),
            disk_total_bytes: Some(disk_total),
            disk_total_human: Some(utils::format_size(disk_total)),
            predicted_full_date: Some(predicted),
            eta_days: Some((eta_days * 100.0).round() / 100.0),
            assumptions: vec![
                "Assumes linear growth trend based on historical snapshots.".to_string(),
                "Assumes no major cleanup or unusual future storage events.".to_string(),
            ],
        })
    }
}
