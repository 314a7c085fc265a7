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
    time::{Instant, SystemTime, UNIX_EPOCH},
};

use anyhow::{Context, Result, bail};
use serde::Serialize;

use crate::{
    classify::FileClassifier,
    global::{
        self,
        defaults::{
            DEFAULT_SKIP_NAMES, DEFAULT_SKIP_PREFIXES, DEFAULT_TOP_DIR_DEPTH, SCAN_BATCH_SIZE,
            SCAN_ERROR_SAMPLE, SCAN_PROGRESS_STRIDE,
        },
    },
    progress::{CancelToken, ProgressCallback, ScanPhase, ScanProgress},
    store::{FileRecord, SnapshotStore},
    utils,
};

#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub roots: Vec<PathBuf>,
    pub follow_symlinks: bool,
    pub include_hidden: bool,
    pub skip_prefixes: Vec<PathBuf>,
    pub skip_names: BTreeSet<String>,
    pub top_dir_depth: usize,
}

impl ScanConfig {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            roots,
            follow_symlinks: false,
            include_hidden: true,
            skip_prefixes: DEFAULT_SKIP_PREFIXES.iter().map(|p| PathBuf::from(*p)).collect(),
            skip_names: DEFAULT_SKIP_NAMES.iter().map(|s| s.to_string()).collect(),
            top_dir_depth: DEFAULT_TOP_DIR_DEPTH,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanError {
    pub path: PathBuf,
    pub error: String,
}

/// Outcome of one scan. I/O errors are non-fatal and sampled here; the
/// snapshot is finalized even when the scan was cancelled part-way.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub snapshot_id: i64,
    pub roots: Vec<PathBuf>,
    pub total_files: u64,
    pub total_bytes: u64,
    pub total_human: String,
    pub duration_sec: f64,
    pub dirs_visited: u64,
    pub cancelled: bool,
    pub errors_count: usize,
    pub errors_sample: Vec<ScanError>,
}

/// Depth-first filesystem scanner feeding batched rows into one snapshot.
///
/// The traversal keeps an explicit directory stack instead of recursing.
/// Children are evaluated in order: prefix skip, name skip, dir/file
/// classification (honoring follow-symlinks), hidden filter.
pub struct Scanner<'a> {
    config: &'a ScanConfig,
    classifier: &'a FileClassifier,
}

impl<'a> Scanner<'a> {
    pub fn new(config: &'a ScanConfig, classifier: &'a FileClassifier) -> Self {
        Self { config, classifier }
    }

    /// Canonicalize, deduplicate and validate the configured roots. A root
    /// that is missing, not a directory or protected rejects the scan
    /// before any snapshot row is created.
    pub fn validated_roots(&self) -> Result<Vec<PathBuf>> {
        if self.config.roots.is_empty() {
            bail!("No scan roots provided");
        }

        let mut roots = BTreeSet::new();
        for root in &self.config.roots {
            let canonical = std::fs::canonicalize(root)
                .with_context(|| format!("Invalid scan root '{}'", root.display()))?;
            if !canonical.is_dir() {
                bail!("Scan root '{}' is not a directory", canonical.display());
            }
            if global::is_protected_path(&canonical) {
                bail!("Scan root '{}' is a protected path", canonical.display());
            }
            roots.insert(canonical);
        }
        Ok(roots.into_iter().collect())
    }

    fn should_skip(&self, path: &Path) -> bool {
        if self
            .config
            .skip_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix))
        {
            return true;
        }
        path.file_name()
            .map(|name| name.to_string_lossy())
            .is_some_and(|name| self.config.skip_names.contains(name.as_ref()))
    }

    fn top_dir_key(root: &Path, dir_path: &Path, depth: usize) -> String {
        let rel = match dir_path.strip_prefix(root) {
            Ok(rel) => rel,
            Err(_) => return root.to_string_lossy().to_string(),
        };
        if rel.as_os_str().is_empty() {
            return root.to_string_lossy().to_string();
        }

        let mut key = root.to_path_buf();
        for component in rel.components().take(depth.max(1)) {
            key.push(component);
        }
        key.to_string_lossy().to_string()
    }

    /// Walk the validated roots and stream file rows into `snapshot_id`.
    /// Cancellation is checked after each directory; on cancel the
    /// snapshot is finalized with the partial totals.
    pub fn scan_to_store(
        &self,
        store: &mut SnapshotStore,
        snapshot_id: i64,
        roots: &[PathBuf],
        progress: Option<&ProgressCallback>,
        cancel: &CancelToken,
    ) -> Result<ScanReport> {
        let started = Instant::now();

        let mut total_files: u64 = 0;
        let mut total_bytes: u64 = 0;
        let mut dirs_visited: u64 = 0;
        let mut cancelled = false;
        let mut errors: Vec<ScanError> = Vec::new();
        let mut batch: Vec<FileRecord> = Vec::with_capacity(SCAN_BATCH_SIZE);
        let mut current_path: Option<PathBuf> = None;

        let report_progress = |phase: ScanPhase,
                               files: u64,
                               bytes: u64,
                               path: Option<PathBuf>,
                               dirs: u64| {
            if let Some(callback) = progress {
                callback(ScanProgress {
                    phase,
                    files_scanned: files,
                    bytes_scanned: bytes,
                    current_path: path,
                    dirs_visited: dirs,
                });
            }
        };

        report_progress(ScanPhase::Initializing, 0, 0, None, 0);

        'roots: for root in roots {
            if self.should_skip(root) {
                continue;
            }

            let mut stack = vec![root.clone()];
            while let Some(current) = stack.pop() {
                if cancel.is_cancelled() {
                    cancelled = true;
                    break 'roots;
                }
                dirs_visited += 1;

                let read_dir = match std::fs::read_dir(&current) {
                    Ok(read_dir) => read_dir,
                    Err(e) => {
                        errors.push(ScanError {
                            path: current,
                            error: e.to_string(),
                        });
                        continue;
                    }
                };

                for entry in read_dir {
                    let entry = match entry {
                        Ok(entry) => entry,
                        Err(e) => {
                            errors.push(ScanError {
                                path: current.clone(),
                                error: e.to_string(),
                            });
                            continue;
                        }
                    };

                    let path = entry.path();
                    if self.should_skip(&path) {
                        continue;
                    }

                    let name = entry.file_name().to_string_lossy().to_string();

                    let file_type = match entry.file_type() {
                        Ok(file_type) => file_type,
                        Err(e) => {
                            errors.push(ScanError {
                                path,
                                error: e.to_string(),
                            });
                            continue;
                        }
                    };
                    let is_symlink = file_type.is_symlink();

                    let (is_dir, is_file) = if is_symlink && self.config.follow_symlinks {
                        match std::fs::metadata(&path) {
                            Ok(meta) => (meta.is_dir(), meta.is_file()),
                            Err(e) => {
                                errors.push(ScanError {
                                    path,
                                    error: e.to_string(),
                                });
                                continue;
                            }
                        }
                    } else {
                        (file_type.is_dir(), file_type.is_file())
                    };

                    if !self.config.include_hidden && name.starts_with('.') {
                        continue;
                    }

                    if is_dir {
                        stack.push(path);
                        continue;
                    }
                    if !is_file {
                        // Broken symlinks, sockets, devices.
                        continue;
                    }

                    let metadata = if self.config.follow_symlinks {
                        std::fs::metadata(&path)
                    } else {
                        entry.metadata()
                    };
                    let metadata = match metadata {
                        Ok(metadata) => metadata,
                        Err(e) => {
                            errors.push(ScanError {
                                path,
                                error: e.to_string(),
                            });
                            continue;
                        }
                    };

                    let size = metadata.len();
                    let mtime = system_time_secs(metadata.modified().ok());
                    let atime = metadata
                        .accessed()
                        .ok()
                        .map_or(mtime, |t| system_time_secs(Some(t)));

                    let extension = path
                        .extension()
                        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
                        .unwrap_or_default();
                    let category = self.classifier.classify(&path, &extension);

                    let dir_path = path
                        .parent()
                        .unwrap_or(Path::new("/"))
                        .to_path_buf();
                    let top_dir = Self::top_dir_key(root, &dir_path, self.config.top_dir_depth);

                    batch.push(FileRecord {
                        path: path.to_string_lossy().to_string(),
                        dir_path: dir_path.to_string_lossy().to_string(),
                        top_dir,
                        size,
                        extension,
                        mtime,
                        atime,
                        permissions: permissions_octal(&metadata),
                        is_hidden: name.starts_with('.'),
                        is_symlink,
                        category,
                    });
                    total_files += 1;
                    total_bytes += size;
                    current_path = Some(path);

                    if total_files % SCAN_PROGRESS_STRIDE == 0 {
                        report_progress(
                            ScanPhase::Scanning,
                            total_files,
                            total_bytes,
                            current_path.clone(),
                            dirs_visited,
                        );
                    }

                    if batch.len() >= SCAN_BATCH_SIZE {
                        store.insert_file_batch(snapshot_id, &batch)?;
                        batch.clear();
                    }
                }
            }
        }

        if !batch.is_empty() {
            store.insert_file_batch(snapshot_id, &batch)?;
        }

        // Finalized rows are distinguished by a nonzero duration.
        let duration_sec = started.elapsed().as_secs_f64().max(1e-6);
        store.finalize_snapshot(snapshot_id, total_files, total_bytes, duration_sec)?;

        report_progress(
            ScanPhase::Completed,
            total_files,
            total_bytes,
            current_path,
            dirs_visited,
        );

        let errors_count = errors.len();
        errors.truncate(SCAN_ERROR_SAMPLE);

        Ok(ScanReport {
            snapshot_id,
            roots: roots.to_vec(),
            total_files,
            total_bytes,
            total_human: utils::format_size(total_bytes),
            duration_sec,
            dirs_visited,
            cancelled,
            errors_count,
            errors_sample: errors,
        })
    }
}

fn system_time_secs(time: Option<SystemTime>) -> i64 {
    time.and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(unix)]
fn permissions_octal(metadata: &std::fs::Metadata) -> String {
    use std::os::unix::fs::PermissionsExt;
    format!("{:o}", metadata.permissions().mode() & 0o777)
}

#[cfg(not(unix))]
fn permissions_octal(metadata: &std::fs::Metadata) -> String {
    if metadata.permissions().readonly() {
        "444".to_string()
    } else {
        "644".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use tempfile::tempdir;

    use super::*;
    use crate::progress::ScanPhase;

    fn scan(
        config: &ScanConfig,
        store: &mut SnapshotStore,
        progress: Option<&ProgressCallback>,
    ) -> Result<ScanReport> {
        let classifier = FileClassifier::new();
        let scanner = Scanner::new(config, &classifier);
        let roots = scanner.validated_roots()?;
        let snapshot_id = store.create_snapshot(&roots)?;
        scanner.scan_to_store(store, snapshot_id, &roots, progress, &CancelToken::new())
    }

    fn create_tree(root: &Path) -> Result<()> {
        std::fs::create_dir_all(root.join("a").join("deep"))?;
        std::fs::create_dir_all(root.join("b"))?;
        std::fs::create_dir_all(root.join(".git"))?;
        std::fs::write(root.join("a").join("x.txt"), b"hello")?;
        std::fs::write(root.join("a").join("deep").join("y.log"), vec![0u8; 100])?;
        std::fs::write(root.join("b").join("z.bin"), vec![1u8; 50])?;
        std::fs::write(root.join(".hidden"), b"dot")?;
        std::fs::write(root.join(".git").join("config"), b"skipped")?;
        Ok(())
    }

    #[test]
    fn test_scan_totals_match_rows() -> Result<()> {
        let tmp = tempdir()?;
        create_tree(tmp.path())?;

        let mut store = SnapshotStore::open_in_memory()?;
        let config = ScanConfig::new(vec![tmp.path().to_path_buf()]);
        let report = scan(&config, &mut store, None)?;

        // 3 regular files + 1 hidden; .git contents are skipped.
        assert_eq!(report.total_files, 4);
        assert_eq!(report.total_bytes, 5 + 100 + 50 + 3);
        assert!(!report.cancelled);
        assert_eq!(report.errors_count, 0);

        // Round-trip: the stored rows sum to the recorded totals.
        let sizes = store.file_sizes(report.snapshot_id)?;
        assert_eq!(sizes.iter().sum::<u64>(), report.total_bytes);
        assert_eq!(sizes.len() as u64, report.total_files);

        let row = store.snapshot_row(report.snapshot_id)?;
        assert!(row.is_finalized());
        assert_eq!(row.total_bytes, report.total_bytes);
        Ok(())
    }

    #[test]
    fn test_hidden_filter() -> Result<()> {
        let tmp = tempdir()?;
        create_tree(tmp.path())?;

        let mut store = SnapshotStore::open_in_memory()?;
        let mut config = ScanConfig::new(vec![tmp.path().to_path_buf()]);
        config.include_hidden = false;
        let report = scan(&config, &mut store, None)?;

        assert_eq!(report.total_files, 3);
        Ok(())
    }

    #[test]
    fn test_empty_root_finalizes_with_zero_totals() -> Result<()> {
        let tmp = tempdir()?;
        let mut store = SnapshotStore::open_in_memory()?;
        let config = ScanConfig::new(vec![tmp.path().to_path_buf()]);
        let report = scan(&config, &mut store, None)?;

        assert_eq!(report.total_files, 0);
        assert_eq!(report.total_bytes, 0);
        assert!(store.snapshot_row(report.snapshot_id)?.is_finalized());
        Ok(())
    }

    #[test]
    fn test_rejects_bad_roots() -> Result<()> {
        let tmp = tempdir()?;
        let file_root = tmp.path().join("file.txt");
        std::fs::write(&file_root, b"not a dir")?;

        let classifier = FileClassifier::new();

        let config = ScanConfig::new(vec![tmp.path().join("missing")]);
        assert!(Scanner::new(&config, &classifier).validated_roots().is_err());

        let config = ScanConfig::new(vec![file_root]);
        assert!(Scanner::new(&config, &classifier).validated_roots().is_err());

        let config = ScanConfig::new(vec![PathBuf::from("/etc")]);
        assert!(Scanner::new(&config, &classifier).validated_roots().is_err());
        Ok(())
    }

    #[test]
    fn test_progress_phases() -> Result<()> {
        let tmp = tempdir()?;
        create_tree(tmp.path())?;

        let phases: Arc<Mutex<Vec<ScanPhase>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = phases.clone();
        let callback: ProgressCallback = Arc::new(move |update| {
            sink.lock().unwrap().push(update.phase);
        });

        let mut store = SnapshotStore::open_in_memory()?;
        let config = ScanConfig::new(vec![tmp.path().to_path_buf()]);
        scan(&config, &mut store, Some(&callback))?;

        let phases = phases.lock().unwrap();
        assert_eq!(phases.first(), Some(&ScanPhase::Initializing));
        assert_eq!(phases.last(), Some(&ScanPhase::Completed));
        Ok(())
    }

    #[test]
    fn test_cancel_finalizes_partial() -> Result<()> {
        let tmp = tempdir()?;
        create_tree(tmp.path())?;

        let classifier = FileClassifier::new();
        let config = ScanConfig::new(vec![tmp.path().to_path_buf()]);
        let scanner = Scanner::new(&config, &classifier);
        let roots = scanner.validated_roots()?;

        let mut store = SnapshotStore::open_in_memory()?;
        let snapshot_id = store.create_snapshot(&roots)?;

        let cancel = CancelToken::new();
        cancel.cancel();
        let report = scanner.scan_to_store(&mut store, snapshot_id, &roots, None, &cancel)?;

        assert!(report.cancelled);
        assert_eq!(report.total_files, 0);
        assert!(store.snapshot_row(snapshot_id)?.is_finalized());
        Ok(())
    }

    #[test]
    fn test_top_dir_key_depth() {
        let root = Path::new("/data");
        assert_eq!(
            Scanner::top_dir_key(root, Path::new("/data/a/b/c"), 2),
            "/data/a/b"
        );
        assert_eq!(
            Scanner::top_dir_key(root, Path::new("/data/a"), 2),
            "/data/a"
        );
        assert_eq!(Scanner::top_dir_key(root, Path::new("/data"), 2), "/data");
        assert_eq!(
            Scanner::top_dir_key(root, Path::new("/elsewhere/x"), 2),
            "/data"
        );
    }
}
