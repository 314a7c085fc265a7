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
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{Context, Result, bail};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;

use crate::classify::Category;

/// SQLite persistence for snapshots, file rows, cleanup actions, cleanup
/// items and quarantine manifests. The store is the single owner of all
/// persisted state; every other component consumes plain values returned
/// from here.
pub struct SnapshotStore {
    conn: Connection,
    path: Option<PathBuf>,
}

/// One snapshot descriptor. A snapshot is finalized exactly once; rows
/// with `duration_sec == 0` are in progress or aborted.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotRow {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub roots: Vec<PathBuf>,
    pub total_files: u64,
    pub total_bytes: u64,
    pub duration_sec: f64,
}

impl SnapshotRow {
    pub fn is_finalized(&self) -> bool {
        self.duration_sec > 0.0
    }
}

/// One file observed by the scanner, prior to insertion.
#[derive(Debug, Clone)]
pub struct FileRecord {
    pub path: String,
    pub dir_path: String,
    pub top_dir: String,
    pub size: u64,
    pub extension: String,
    pub mtime: i64,
    pub atime: i64,
    pub permissions: String,
    pub is_hidden: bool,
    pub is_symlink: bool,
    pub category: Category,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoredFile {
    pub path: PathBuf,
    pub size: u64,
    pub mtime: i64,
    pub category: Category,
}

#[derive(Debug, Clone, Serialize)]
pub struct FolderUsage {
    pub folder: String,
    pub bytes: u64,
    pub file_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryUsage {
    pub category: Category,
    pub files: u64,
    pub bytes: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtensionUsage {
    pub extension: String,
    pub files: u64,
    pub bytes: u64,
}

/// Candidate handed to the duplicate detector's hashing phases.
#[derive(Debug, Clone)]
pub struct HashCandidate {
    pub path: PathBuf,
    pub size: u64,
    pub mtime: i64,
}

/// Facts about a stored file consulted by the cleanup engine.
#[derive(Debug, Clone)]
pub struct FileFacts {
    pub size: u64,
    pub extension: String,
    pub is_hidden: bool,
    pub category: Category,
}

#[derive(Debug, Clone, Default)]
pub struct ChurnCounts {
    pub added: u64,
    pub removed: u64,
    pub changed: u64,
}

#[derive(Debug, Clone)]
pub struct ManifestRow {
    pub id: i64,
    pub original_path: PathBuf,
    pub quarantine_path: PathBuf,
    pub restored_at: Option<DateTime<Utc>>,
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_timestamp(text: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(text)
        .with_context(|| format!("Invalid timestamp '{text}'"))?
        .with_timezone(&Utc))
}

impl SnapshotStore {
    /// Open (or create) the database at `db_path`, creating parent
    /// directories as needed.
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Could not create database directory '{}'", parent.display())
            })?;
        }

        let conn = Connection::open(db_path)
            .with_context(|| format!("Could not open database '{}'", db_path.display()))?;
        Self::init(conn, Some(db_path.to_path_buf()))
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;
             PRAGMA temp_store=MEMORY;
             PRAGMA foreign_keys=ON;",
        )?;
        Self::init_schema(&conn)?;
        Ok(Self { conn, path })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS snapshots (
               id INTEGER PRIMARY KEY AUTOINCREMENT,
               created_at TEXT NOT NULL,
               roots_json TEXT NOT NULL,
               total_files INTEGER DEFAULT 0,
               total_bytes INTEGER DEFAULT 0,
               duration_sec REAL DEFAULT 0
             );

             CREATE TABLE IF NOT EXISTS files (
               id INTEGER PRIMARY KEY AUTOINCREMENT,
               snapshot_id INTEGER NOT NULL,
               path TEXT NOT NULL,
               dir_path TEXT NOT NULL,
               top_dir TEXT NOT NULL,
               size INTEGER NOT NULL,
               extension TEXT NOT NULL,
               mtime INTEGER NOT NULL,
               atime INTEGER NOT NULL,
               permissions TEXT NOT NULL,
               is_hidden INTEGER NOT NULL,
               is_symlink INTEGER NOT NULL,
               category TEXT NOT NULL,
               FOREIGN KEY(snapshot_id) REFERENCES snapshots(id)
             );

             CREATE INDEX IF NOT EXISTS idx_files_snapshot ON files(snapshot_id);
             CREATE INDEX IF NOT EXISTS idx_files_size ON files(snapshot_id, size);
             CREATE INDEX IF NOT EXISTS idx_files_ext ON files(snapshot_id, extension);
             CREATE INDEX IF NOT EXISTS idx_files_category ON files(snapshot_id, category);
             CREATE INDEX IF NOT EXISTS idx_files_mtime ON files(snapshot_id, mtime);
             CREATE INDEX IF NOT EXISTS idx_files_path ON files(snapshot_id, path);
             CREATE INDEX IF NOT EXISTS idx_files_topdir ON files(snapshot_id, top_dir);

             CREATE TABLE IF NOT EXISTS cleanup_actions (
               action_id TEXT PRIMARY KEY,
               created_at TEXT NOT NULL,
               snapshot_id INTEGER,
               mode TEXT NOT NULL,
               dry_run INTEGER NOT NULL,
               details_json TEXT NOT NULL
             );

             CREATE TABLE IF NOT EXISTS cleanup_items (
               id INTEGER PRIMARY KEY AUTOINCREMENT,
               action_id TEXT NOT NULL,
               path TEXT NOT NULL,
               status TEXT NOT NULL,
               risk_level TEXT NOT NULL,
               risk_score INTEGER NOT NULL,
               reason TEXT NOT NULL,
               quarantine_path TEXT,
               error TEXT,
               FOREIGN KEY(action_id) REFERENCES cleanup_actions(action_id)
             );

             CREATE INDEX IF NOT EXISTS idx_cleanup_action ON cleanup_items(action_id);

             CREATE TABLE IF NOT EXISTS quarantine_manifest (
               id INTEGER PRIMARY KEY AUTOINCREMENT,
               action_id TEXT NOT NULL,
               original_path TEXT NOT NULL,
               quarantine_path TEXT NOT NULL,
               restored_at TEXT
             );",
        )?;
        Ok(())
    }

    /// Location of the backing database file, if any.
    pub fn db_path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    // -- Snapshot lifecycle --

    /// Register a new snapshot with empty totals and return its id.
    pub fn create_snapshot(&self, roots: &[PathBuf]) -> Result<i64> {
        let roots_json = serde_json::to_string(
            &roots
                .iter()
                .map(|r| r.to_string_lossy().to_string())
                .collect::<Vec<_>>(),
        )?;
        self.conn.execute(
            "INSERT INTO snapshots(created_at, roots_json) VALUES (?1, ?2)",
            params![now_rfc3339(), roots_json],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Bulk-insert file rows in a single transaction. The scanner calls
    /// this once per batch so a crash loses at most one batch.
    pub fn insert_file_batch(&mut self, snapshot_id: i64, records: &[FileRecord]) -> Result<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO files(
                   snapshot_id, path, dir_path, top_dir, size, extension, mtime, atime,
                   permissions, is_hidden, is_symlink, category
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            )?;
            for record in records {
                stmt.execute(params![
                    snapshot_id,
                    record.path,
                    record.dir_path,
                    record.top_dir,
                    record.size as i64,
                    record.extension,
                    record.mtime,
                    record.atime,
                    record.permissions,
                    record.is_hidden,
                    record.is_symlink,
                    record.category.as_str(),
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Stamp final totals and duration. Called exactly once per snapshot.
    pub fn finalize_snapshot(
        &self,
        snapshot_id: i64,
        total_files: u64,
        total_bytes: u64,
        duration_sec: f64,
    ) -> Result<()> {
        let updated = self.conn.execute(
            "UPDATE snapshots SET total_files=?1, total_bytes=?2, duration_sec=?3 WHERE id=?4",
            params![total_files as i64, total_bytes as i64, duration_sec, snapshot_id],
        )?;
        if updated != 1 {
            bail!("Snapshot not found: {snapshot_id}");
        }
        Ok(())
    }

    /// Most recent snapshot id regardless of finalization state.
    pub fn latest_snapshot(&self) -> Result<Option<i64>> {
        Ok(self
            .conn
            .query_row("SELECT id FROM snapshots ORDER BY id DESC LIMIT 1", [], |r| {
                r.get(0)
            })
            .optional()?)
    }

    /// Nearest older *finalized* snapshot. Growth never compares against
    /// an in-progress or aborted snapshot.
    pub fn previous_snapshot(&self, snapshot_id: i64) -> Result<Option<i64>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id FROM snapshots WHERE id < ?1 AND duration_sec > 0
                 ORDER BY id DESC LIMIT 1",
                params![snapshot_id],
                |r| r.get(0),
            )
            .optional()?)
    }

    pub fn snapshot_row(&self, snapshot_id: i64) -> Result<SnapshotRow> {
        let row = self
            .conn
            .query_row(
                "SELECT id, created_at, roots_json, total_files, total_bytes, duration_sec
                 FROM snapshots WHERE id=?1",
                params![snapshot_id],
                Self::map_snapshot_row,
            )
            .optional()?;
        row.ok_or_else(|| anyhow::anyhow!("Snapshot not found: {snapshot_id}"))?
    }

    /// All snapshots in insertion order.
    pub fn all_snapshots(&self) -> Result<Vec<SnapshotRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, created_at, roots_json, total_files, total_bytes, duration_sec
             FROM snapshots ORDER BY id ASC",
        )?;
        let rows = stmt.query_map([], Self::map_snapshot_row)?;
        rows.map(|r| r?).collect()
    }

    #[allow(clippy::type_complexity)]
    fn map_snapshot_row(
        row: &rusqlite::Row<'_>,
    ) -> rusqlite::Result<Result<SnapshotRow>> {
        let created_at: String = row.get(1)?;
        let roots_json: String = row.get(2)?;
        let id: i64 = row.get(0)?;
        let total_files: i64 = row.get(3)?;
        let total_bytes: i64 = row.get(4)?;
        let duration_sec: f64 = row.get(5)?;

        Ok((|| {
            let roots: Vec<String> = serde_json::from_str(&roots_json)?;
            Ok(SnapshotRow {
                id,
                created_at: parse_timestamp(&created_at)?,
                roots: roots.into_iter().map(PathBuf::from).collect(),
                total_files: total_files.max(0) as u64,
                total_bytes: total_bytes.max(0) as u64,
                duration_sec,
            })
        })())
    }

    // -- Analyzer queries --

    pub fn largest_files(&self, snapshot_id: i64, limit: usize) -> Result<Vec<StoredFile>> {
        self.query_files(
            "SELECT path, size, mtime, category FROM files
             WHERE snapshot_id=?1 ORDER BY size DESC, path ASC LIMIT ?2",
            params![snapshot_id, limit as i64],
        )
    }

    pub fn large_files(
        &self,
        snapshot_id: i64,
        min_size: u64,
        limit: usize,
    ) -> Result<Vec<StoredFile>> {
        self.query_files(
            "SELECT path, size, mtime, category FROM files
             WHERE snapshot_id=?1 AND size>=?2 ORDER BY size DESC, path ASC LIMIT ?3",
            params![snapshot_id, min_size as i64, limit as i64],
        )
    }

    pub fn old_files(
        &self,
        snapshot_id: i64,
        cutoff_mtime: i64,
        limit: usize,
    ) -> Result<Vec<StoredFile>> {
        self.query_files(
            "SELECT path, size, mtime, category FROM files
             WHERE snapshot_id=?1 AND mtime<=?2 ORDER BY mtime ASC, path ASC LIMIT ?3",
            params![snapshot_id, cutoff_mtime, limit as i64],
        )
    }

    pub fn large_and_old_files(
        &self,
        snapshot_id: i64,
        min_size: u64,
        cutoff_mtime: i64,
        limit: usize,
    ) -> Result<Vec<StoredFile>> {
        self.query_files(
            "SELECT path, size, mtime, category FROM files
             WHERE snapshot_id=?1 AND size>=?2 AND mtime<=?3
             ORDER BY size DESC, path ASC LIMIT ?4",
            params![snapshot_id, min_size as i64, cutoff_mtime, limit as i64],
        )
    }

    fn query_files(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<StoredFile>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, |row| {
            let path: String = row.get(0)?;
            let size: i64 = row.get(1)?;
            let mtime: i64 = row.get(2)?;
            let category: String = row.get(3)?;
            Ok((path, size, mtime, category))
        })?;

        let mut files = Vec::new();
        for row in rows {
            let (path, size, mtime, category) = row?;
            files.push(StoredFile {
                path: PathBuf::from(path),
                size: size.max(0) as u64,
                mtime,
                category: Category::from_str(&category).unwrap_or(Category::Other),
            });
        }
        Ok(files)
    }

    pub fn folder_sizes(&self, snapshot_id: i64, limit: usize) -> Result<Vec<FolderUsage>> {
        let mut stmt = self.conn.prepare(
            "SELECT top_dir, SUM(size) AS total, COUNT(*) AS file_count FROM files
             WHERE snapshot_id=?1 GROUP BY top_dir ORDER BY total DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![snapshot_id, limit as i64], |row| {
            let folder: String = row.get(0)?;
            let bytes: i64 = row.get(1)?;
            let file_count: i64 = row.get(2)?;
            Ok(FolderUsage {
                folder,
                bytes: bytes.max(0) as u64,
                file_count: file_count.max(0) as u64,
            })
        })?;
        rows.collect::<rusqlite::Result<_>>().map_err(Into::into)
    }

    pub fn type_distribution(&self, snapshot_id: i64) -> Result<Vec<CategoryUsage>> {
        let mut stmt = self.conn.prepare(
            "SELECT category, COUNT(*) AS file_count, SUM(size) AS total FROM files
             WHERE snapshot_id=?1 GROUP BY category ORDER BY total DESC",
        )?;
        let rows = stmt.query_map(params![snapshot_id], |row| {
            let category: String = row.get(0)?;
            let files: i64 = row.get(1)?;
            let bytes: i64 = row.get(2)?;
            Ok((category, files, bytes))
        })?;

        let mut usage = Vec::new();
        for row in rows {
            let (category, files, bytes) = row?;
            usage.push(CategoryUsage {
                category: Category::from_str(&category).unwrap_or(Category::Other),
                files: files.max(0) as u64,
                bytes: bytes.max(0) as u64,
            });
        }
        Ok(usage)
    }

    pub fn extension_frequency(
        &self,
        snapshot_id: i64,
        limit: usize,
    ) -> Result<Vec<ExtensionUsage>> {
        let mut stmt = self.conn.prepare(
            "SELECT extension, COUNT(*) AS file_count, SUM(size) AS total FROM files
             WHERE snapshot_id=?1 GROUP BY extension ORDER BY file_count DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![snapshot_id, limit as i64], |row| {
            let extension: String = row.get(0)?;
            let files: i64 = row.get(1)?;
            let bytes: i64 = row.get(2)?;
            Ok(ExtensionUsage {
                extension,
                files: files.max(0) as u64,
                bytes: bytes.max(0) as u64,
            })
        })?;
        rows.collect::<rusqlite::Result<_>>().map_err(Into::into)
    }

    /// All file sizes of a snapshot, for histogram binning.
    pub fn file_sizes(&self, snapshot_id: i64) -> Result<Vec<u64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT size FROM files WHERE snapshot_id=?1")?;
        let rows = stmt.query_map(params![snapshot_id], |row| row.get::<_, i64>(0))?;
        rows.map(|r| r.map(|s| s.max(0) as u64).map_err(Into::into))
            .collect()
    }

    /// Bytes per top-dir, for growth comparison.
    pub fn folder_usage_map(&self, snapshot_id: i64) -> Result<BTreeMap<String, i64>> {
        let mut stmt = self.conn.prepare(
            "SELECT top_dir, SUM(size) FROM files WHERE snapshot_id=?1 GROUP BY top_dir",
        )?;
        let rows = stmt.query_map(params![snapshot_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        rows.collect::<rusqlite::Result<_>>().map_err(Into::into)
    }

    /// Added/removed/changed counts between two snapshots, by path.
    pub fn churn_counts(&self, current: i64, previous: i64) -> Result<ChurnCounts> {
        let added: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM files c
             WHERE c.snapshot_id=?1
               AND NOT EXISTS (
                 SELECT 1 FROM files p WHERE p.snapshot_id=?2 AND p.path=c.path
               )",
            params![current, previous],
            |r| r.get(0),
        )?;

        let removed: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM files p
             WHERE p.snapshot_id=?1
               AND NOT EXISTS (
                 SELECT 1 FROM files c WHERE c.snapshot_id=?2 AND c.path=p.path
               )",
            params![previous, current],
            |r| r.get(0),
        )?;

        let changed: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM files c
             JOIN files p ON c.path=p.path
             WHERE c.snapshot_id=?1 AND p.snapshot_id=?2
               AND (c.size != p.size OR c.mtime != p.mtime)",
            params![current, previous],
            |r| r.get(0),
        )?;

        Ok(ChurnCounts {
            added: added.max(0) as u64,
            removed: removed.max(0) as u64,
            changed: changed.max(0) as u64,
        })
    }

    // -- Duplicate detector queries --

    /// Sizes with at least two non-empty files, largest buckets first.
    pub fn duplicate_size_buckets(&self, snapshot_id: i64) -> Result<Vec<(u64, u64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT size, COUNT(*) AS c FROM files
             WHERE snapshot_id=?1 AND size>0 GROUP BY size HAVING c>1 ORDER BY c DESC",
        )?;
        let rows = stmt.query_map(params![snapshot_id], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
        })?;
        let mut buckets = Vec::new();
        for row in rows {
            let (size, count) = row?;
            buckets.push((size.max(0) as u64, count.max(0) as u64));
        }
        Ok(buckets)
    }

    pub fn files_with_size(&self, snapshot_id: i64, size: u64) -> Result<Vec<HashCandidate>> {
        let mut stmt = self.conn.prepare(
            "SELECT path, size, mtime FROM files WHERE snapshot_id=?1 AND size=?2",
        )?;
        let rows = stmt.query_map(params![snapshot_id, size as i64], |row| {
            let path: String = row.get(0)?;
            let size: i64 = row.get(1)?;
            let mtime: i64 = row.get(2)?;
            Ok(HashCandidate {
                path: PathBuf::from(path),
                size: size.max(0) as u64,
                mtime,
            })
        })?;
        rows.collect::<rusqlite::Result<_>>().map_err(Into::into)
    }

    // -- Candidate selection queries --

    /// Log and temp files by extension or path marker, largest first.
    pub fn logs_temp_candidates(&self, snapshot_id: i64, limit: usize) -> Result<Vec<PathBuf>> {
        let mut stmt = self.conn.prepare(
            "SELECT path FROM files
             WHERE snapshot_id=?1 AND (
               extension IN ('.log', '.tmp', '.cache', '.trace', '.out', '.err')
               OR path LIKE '%/tmp/%' OR path LIKE '%/cache/%' OR path LIKE '%/var/tmp/%'
             )
             ORDER BY size DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![snapshot_id, limit as i64], |row| {
            row.get::<_, String>(0).map(PathBuf::from)
        })?;
        rows.collect::<rusqlite::Result<_>>().map_err(Into::into)
    }

    // -- Dev-waste queries --

    /// Folder aggregation over rows whose path matches any LIKE pattern.
    pub fn path_pattern_folders(
        &self,
        snapshot_id: i64,
        patterns: &[&str],
        limit: usize,
    ) -> Result<Vec<FolderUsage>> {
        if patterns.is_empty() {
            return Ok(Vec::new());
        }
        let clause = patterns
            .iter()
            .map(|_| "path LIKE ?")
            .collect::<Vec<_>>()
            .join(" OR ");
        let sql = format!(
            "SELECT top_dir, SUM(size) AS total, COUNT(*) AS file_count FROM files
             WHERE snapshot_id=?1 AND ({clause})
             GROUP BY top_dir ORDER BY total DESC LIMIT {limit}"
        );
        let mut stmt = self.conn.prepare(&sql)?;

        let mut values: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(snapshot_id)];
        for pattern in patterns {
            values.push(Box::new(pattern.to_string()));
        }
        let params = rusqlite::params_from_iter(values.iter().map(|v| v.as_ref()));

        let rows = stmt.query_map(params, |row| {
            let folder: String = row.get(0)?;
            let bytes: i64 = row.get(1)?;
            let file_count: i64 = row.get(2)?;
            Ok(FolderUsage {
                folder,
                bytes: bytes.max(0) as u64,
                file_count: file_count.max(0) as u64,
            })
        })?;
        rows.collect::<rusqlite::Result<_>>().map_err(Into::into)
    }

    /// Total bytes and file count over one LIKE pattern.
    pub fn path_pattern_totals(&self, snapshot_id: i64, pattern: &str) -> Result<(u64, u64)> {
        let (bytes, files): (Option<i64>, i64) = self.conn.query_row(
            "SELECT SUM(size), COUNT(*) FROM files WHERE snapshot_id=?1 AND path LIKE ?2",
            params![snapshot_id, pattern],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok((bytes.unwrap_or(0).max(0) as u64, files.max(0) as u64))
    }

    // -- Cleanup engine --

    /// Facts about one stored path, when the snapshot observed it.
    pub fn file_facts(&self, snapshot_id: i64, path: &str) -> Result<Option<FileFacts>> {
        let row = self
            .conn
            .query_row(
                "SELECT size, extension, is_hidden, category FROM files
                 WHERE snapshot_id=?1 AND path=?2 LIMIT 1",
                params![snapshot_id, path],
                |row| {
                    let size: i64 = row.get(0)?;
                    let extension: String = row.get(1)?;
                    let is_hidden: bool = row.get(2)?;
                    let category: String = row.get(3)?;
                    Ok((size, extension, is_hidden, category))
                },
            )
            .optional()?;

        Ok(row.map(|(size, extension, is_hidden, category)| FileFacts {
            size: size.max(0) as u64,
            extension,
            is_hidden,
            category: Category::from_str(&category).unwrap_or(Category::Other),
        }))
    }

    /// A deferred-commit transaction for multi-row cleanup writes.
    pub fn action_transaction(&self) -> Result<rusqlite::Transaction<'_>> {
        Ok(self.conn.unchecked_transaction()?)
    }

    pub fn insert_cleanup_action(
        &self,
        action_id: &str,
        snapshot_id: i64,
        mode: &str,
        dry_run: bool,
        details_json: &str,
    ) -> Result<()> {
        self.conn.execute(
            "INSERT INTO cleanup_actions(action_id, created_at, snapshot_id, mode, dry_run, details_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![action_id, now_rfc3339(), snapshot_id, mode, dry_run, details_json],
        )?;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn insert_cleanup_item(
        &self,
        action_id: &str,
        path: &str,
        status: &str,
        risk_level: &str,
        risk_score: u8,
        reason: &str,
        quarantine_path: Option<&str>,
        error: Option<&str>,
    ) -> Result<()> {
        self.conn.execute(
            "INSERT INTO cleanup_items(action_id, path, status, risk_level, risk_score, reason, quarantine_path, error)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                action_id,
                path,
                status,
                risk_level,
                risk_score as i64,
                reason,
                quarantine_path,
                error
            ],
        )?;
        Ok(())
    }

    pub fn insert_quarantine_entry(
        &self,
        action_id: &str,
        original_path: &str,
        quarantine_path: &str,
    ) -> Result<()> {
        self.conn.execute(
            "INSERT INTO quarantine_manifest(action_id, original_path, quarantine_path)
             VALUES (?1, ?2, ?3)",
            params![action_id, original_path, quarantine_path],
        )?;
        Ok(())
    }

    pub fn quarantine_entries(&self, action_id: &str) -> Result<Vec<ManifestRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, original_path, quarantine_path, restored_at
             FROM quarantine_manifest WHERE action_id=?1",
        )?;
        let rows = stmt.query_map(params![action_id], |row| {
            let id: i64 = row.get(0)?;
            let original: String = row.get(1)?;
            let quarantine: String = row.get(2)?;
            let restored_at: Option<String> = row.get(3)?;
            Ok((id, original, quarantine, restored_at))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (id, original, quarantine, restored_at) = row?;
            let restored_at = match restored_at {
                Some(text) => Some(parse_timestamp(&text)?),
                None => None,
            };
            entries.push(ManifestRow {
                id,
                original_path: PathBuf::from(original),
                quarantine_path: PathBuf::from(quarantine),
                restored_at,
            });
        }
        Ok(entries)
    }

    #[cfg(test)]
    pub(crate) fn set_snapshot_created_at(
        &self,
        snapshot_id: i64,
        when: DateTime<Utc>,
    ) -> Result<()> {
        self.conn.execute(
            "UPDATE snapshots SET created_at=?1 WHERE id=?2",
            params![when.to_rfc3339_opts(SecondsFormat::Secs, true), snapshot_id],
        )?;
        Ok(())
    }

    pub fn mark_restored(&self, manifest_id: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE quarantine_manifest SET restored_at=?1 WHERE id=?2",
            params![now_rfc3339(), manifest_id],
        )?;
        Ok(())
    }
}
