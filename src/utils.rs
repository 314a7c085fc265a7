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
    path::{Component, Path, PathBuf},
    time::Duration,
};

use anyhow::{Result, bail};
use chrono::Utc;

/// Binary size units.
#[allow(non_upper_case_globals)]
pub mod size {
    pub const KiB: u64 = 1024;
    pub const MiB: u64 = 1024 * KiB;
    pub const GiB: u64 = 1024 * MiB;
    pub const TiB: u64 = 1024 * GiB;
}

const SIZE_UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];

/// Render a byte count with binary units. The bare `B` unit is rendered as
/// an integer, all others with two decimals: `format_size(524288000)` is
/// `"500.00 MB"`.
pub fn format_size(size: u64) -> String {
    let mut val = size as f64;
    for unit in SIZE_UNITS {
        if val < 1024.0 || unit == "PB" {
            if unit == "B" {
                return format!("{size} {unit}");
            }
            return format!("{val:.2} {unit}");
        }
        val /= 1024.0;
    }
    unreachable!()
}

/// Parse a size string with an optional `B/KB/MB/GB/TB` suffix (base 1024,
/// case-insensitive). Bare numbers are bytes.
pub fn parse_size(value: &str) -> Result<u64> {
    let text: String = value.trim().to_lowercase().replace(' ', "");
    if text.is_empty() {
        bail!("Empty size string");
    }

    for (suffix, factor) in [
        ("tb", size::TiB),
        ("gb", size::GiB),
        ("mb", size::MiB),
        ("kb", size::KiB),
        ("b", 1),
    ] {
        if let Some(number) = text.strip_suffix(suffix) {
            let number: f64 = if number.is_empty() {
                0.0
            } else {
                number
                    .parse()
                    .map_err(|_| anyhow::anyhow!("Invalid size '{value}'"))?
            };
            if number < 0.0 {
                bail!("Negative size '{value}'");
            }
            return Ok((number * factor as f64) as u64);
        }
    }

    let number: f64 = text
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid size '{value}'"))?;
    if number < 0.0 {
        bail!("Negative size '{value}'");
    }
    Ok(number as u64)
}

/// Format a duration as `2h 3m 4s`, dropping leading zero fields.
pub fn pretty_print_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else if total_secs > 0 {
        format!("{seconds}s")
    } else {
        format!("{}ms", duration.as_millis())
    }
}

pub fn format_count(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{count} {singular}")
    } else {
        format!("{count} {plural}")
    }
}

/// Whole days elapsed since a unix timestamp, clamped at zero.
pub fn days_since(mtime: i64) -> i64 {
    ((Utc::now().timestamp() - mtime) / 86_400).max(0)
}

/// Resolve a path to an absolute form. Canonicalizes when the path exists,
/// otherwise cleans it lexically against the working directory so missing
/// targets can still be matched against roots and protected paths.
pub fn normalize_path(path: &Path) -> PathBuf {
    if let Ok(canonical) = std::fs::canonicalize(path) {
        return canonical;
    }

    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("/"))
            .join(path)
    };

    let mut cleaned = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                cleaned.pop();
            }
            other => cleaned.push(other.as_os_str()),
        }
    }
    cleaned
}

/// Whether `path` equals `root` or lies under it, after normalization.
pub fn is_subpath(path: &Path, root: &Path) -> bool {
    let p = normalize_path(path);
    let r = normalize_path(root);
    p.starts_with(&r)
}

/// Total capacity of the filesystem holding `path`.
#[cfg(unix)]
pub fn disk_total_bytes(path: &Path) -> Result<u64> {
    use std::os::unix::ffi::OsStrExt;

    let c_path = std::ffi::CString::new(path.as_os_str().as_bytes())?;
    let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::statvfs(c_path.as_ptr(), &mut stat) };
    if rc != 0 {
        bail!(
            "statvfs failed for '{}': {}",
            path.display(),
            std::io::Error::last_os_error()
        );
    }
    Ok(stat.f_blocks as u64 * stat.f_frsize as u64)
}

#[cfg(not(unix))]
pub fn disk_total_bytes(path: &Path) -> Result<u64> {
    bail!(
        "Disk totals are not supported on this operating system: '{}'",
        path.display()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(4 * size::KiB), "4.00 KB");
        assert_eq!(format_size(size::GiB), "1.00 GB");
        assert_eq!(format_size(size::GiB + size::GiB / 2), "1.50 GB");
    }

    #[test]
    fn test_parse_size() -> Result<()> {
        assert_eq!(parse_size("1GB")?, 1_073_741_824);
        assert_eq!(parse_size("500MB")?, 500 * size::MiB);
        assert_eq!(parse_size("1.5 kb")?, 1536);
        assert_eq!(parse_size("123")?, 123);
        assert_eq!(parse_size("42B")?, 42);
        assert!(parse_size("twelve").is_err());
        Ok(())
    }

    #[test]
    fn test_format_parse_round_trip() -> Result<()> {
        assert_eq!(format_size(parse_size("500MB")?), "500.00 MB");
        Ok(())
    }

    #[test]
    fn test_pretty_print_duration() {
        assert_eq!(pretty_print_duration(Duration::from_secs(3725)), "1h 2m 5s");
        assert_eq!(pretty_print_duration(Duration::from_secs(65)), "1m 5s");
        assert_eq!(pretty_print_duration(Duration::from_secs(9)), "9s");
        assert_eq!(pretty_print_duration(Duration::from_millis(250)), "250ms");
    }

    #[test]
    fn test_is_subpath() {
        assert!(is_subpath(Path::new("/a/b/c"), Path::new("/a/b")));
        assert!(is_subpath(Path::new("/a/b"), Path::new("/a/b")));
        assert!(!is_subpath(Path::new("/a/bc"), Path::new("/a/b")));
        assert!(!is_subpath(Path::new("/etc/hosts"), Path::new("/tmp")));
    }

    #[test]
    fn test_normalize_missing_path() {
        let normalized = normalize_path(Path::new("/no/such/../such/dir"));
        assert_eq!(normalized, PathBuf::from("/no/such/dir"));
    }
}
