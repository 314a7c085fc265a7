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

use crate::utils::size;

// -- Scanning --
/// Number of file rows buffered before a batch insert and commit.
pub const SCAN_BATCH_SIZE: usize = 2000;

/// The scanner reports progress at least every this many files.
pub const SCAN_PROGRESS_STRIDE: u64 = 500;

/// Aggregation depth for the top-dir key, counted from the scan root.
pub const DEFAULT_TOP_DIR_DEPTH: usize = 2;

/// Absolute prefixes never traversed (process/virtual/device filesystems).
pub const DEFAULT_SKIP_PREFIXES: [&str; 5] = ["/proc", "/sys", "/dev", "/run", "/snap"];

/// Directory names skipped anywhere in the tree.
pub const DEFAULT_SKIP_NAMES: [&str; 4] = [".git", "__pycache__", ".mypy_cache", ".pytest_cache"];

// -- Hashing --
/// Bytes of file prefix hashed during the partial phase.
pub const PARTIAL_HASH_BYTES: usize = 64 * size::KiB as usize;

/// Read buffer for the full-content hash phase.
pub const FULL_HASH_BUFFER: usize = size::MiB as usize;

/// Ceiling on duplicate candidates fetched from a snapshot.
pub const DEFAULT_CANDIDATE_CEILING: usize = 200_000;

/// Paths handed to a worker per partial-hash task.
pub const PARTIAL_HASH_CHUNK: usize = 64;

/// Paths handed to a worker per full-hash task.
pub const FULL_HASH_CHUNK: usize = 32;

// -- Reports --
/// Scan errors sampled into a scan report.
pub const SCAN_ERROR_SAMPLE: usize = 50;

/// Hash errors sampled into a duplicate report.
pub const HASH_ERROR_SAMPLE: usize = 200;

/// Folder-level rows sampled into growth and pareto reports.
pub const FOLDER_REPORT_SAMPLE: usize = 200;

pub const DEFAULT_TOP_N: usize = 50;
pub const DEFAULT_LIST_LIMIT: usize = 1000;
pub const DEFAULT_CLEAN_LIMIT: usize = 2000;

// -- Display --
pub const DEFAULT_VERBOSITY: u32 = 1;

// -- Carbon model --
// Rough blended factors for the storage footprint estimate. Approximate.
pub const DEFAULT_KWH_PER_GB_YEAR: f64 = 0.65;
pub const DEFAULT_CO2_KG_PER_KWH: f64 = 0.40;
pub const DEFAULT_LAPTOP_KWH_PER_HOUR: f64 = 0.06;
