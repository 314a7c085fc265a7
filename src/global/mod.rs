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

pub mod defaults;

use std::path::{Path, PathBuf};

use parking_lot::{RwLock, RwLockReadGuard};

pub const APP_NAME: &str = "urraca";

/// Absolute paths that are never accepted as a scan root nor as a cleanup
/// target. Shared by the scanner, the risk scorer and the cleanup engine.
pub const PROTECTED_PATHS: [&str; 15] = [
    "/", "/bin", "/boot", "/dev", "/etc", "/lib", "/lib64", "/proc", "/root", "/run", "/sbin",
    "/srv", "/sys", "/usr", "/var",
];

/// Whether `path` equals one of the protected paths.
pub fn is_protected_path(path: &Path) -> bool {
    PROTECTED_PATHS.iter().any(|p| Path::new(p) == path)
}

/// Default database location: `~/.local/share/urraca/urraca.db`.
pub fn default_db_path() -> PathBuf {
    data_dir().join("urraca.db")
}

/// Default quarantine tree: `~/.local/share/urraca/quarantine`.
pub fn default_quarantine_dir() -> PathBuf {
    data_dir().join("quarantine")
}

/// Default audit log: `~/.local/share/urraca/actions.log`.
pub fn default_log_file() -> PathBuf {
    data_dir().join("actions.log")
}

fn data_dir() -> PathBuf {
    let home = std::env::var_os("HOME").map_or_else(std::env::temp_dir, PathBuf::from);
    home.join(".local").join("share").join(APP_NAME)
}

/// Process-wide output options, set once from the parsed CLI arguments.
#[derive(Debug, Clone)]
pub struct GlobalOpts {
    pub quiet: bool,
    pub verbosity: u32,
}

impl Default for GlobalOpts {
    fn default() -> Self {
        Self {
            quiet: false,
            verbosity: defaults::DEFAULT_VERBOSITY,
        }
    }
}

static GLOBAL_OPTS: RwLock<Option<GlobalOpts>> = RwLock::new(None);

pub fn set_global_opts(opts: GlobalOpts) {
    *GLOBAL_OPTS.write() = Some(opts);
}

pub fn global_opts() -> RwLockReadGuard<'static, Option<GlobalOpts>> {
    GLOBAL_OPTS.read()
}

/// Output options currently in effect, defaulting when `main` has not set
/// them (unit tests, embedders).
pub fn effective_opts() -> GlobalOpts {
    global_opts().clone().unwrap_or_default()
}
