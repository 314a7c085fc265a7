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
    fs::{File, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;

use crate::global::APP_NAME;

/// Append-only audit log for cleanup actions. One line per event:
/// `<timestamp> <LEVEL> <message>`. Analysis operations never write here.
pub struct AuditLog {
    file: Mutex<File>,
    path: PathBuf,
}

impl AuditLog {
    /// Open the log at `path`, creating parent directories. Falls back to
    /// a process-local temp location when the parent is not writable.
    pub fn open(path: &Path) -> Result<Self> {
        match Self::try_open(path) {
            Ok(log) => Ok(log),
            Err(_) => {
                let fallback = std::env::temp_dir().join(APP_NAME).join("actions.log");
                Self::try_open(&fallback)
            }
        }
    }

    fn try_open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Could not create log directory '{}'", parent.display())
            })?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Could not open audit log '{}'", path.display()))?;
        Ok(Self {
            file: Mutex::new(file),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn info(&self, message: &str) {
        self.write_line("INFO", message);
    }

    pub fn error(&self, message: &str) {
        self.write_line("ERROR", message);
    }

    fn write_line(&self, level: &str, message: &str) {
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let mut file = self.file.lock();
        // A failed audit write must not abort the cleanup it describes.
        let _ = writeln!(file, "{timestamp} {level} {message}");
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_append_only_lines() -> Result<()> {
        let tmp = tempdir()?;
        let path = tmp.path().join("logs").join("actions.log");

        let log = AuditLog::open(&path)?;
        log.info("cleanup_success action=a1 path=/tmp/x risk=low");
        log.error("cleanup_failed action=a1 path=/tmp/y err=denied");

        let text = std::fs::read_to_string(&path)?;
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("INFO cleanup_success action=a1"));
        assert!(lines[1].contains("ERROR cleanup_failed action=a1"));

        // Reopening appends instead of truncating.
        let log = AuditLog::open(&path)?;
        log.info("undo_complete action=a1");
        assert_eq!(std::fs::read_to_string(&path)?.lines().count(), 3);
        Ok(())
    }
}
