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

pub mod cmd_analyze;
pub mod cmd_carbon;
pub mod cmd_clean;
pub mod cmd_dev_clean;
pub mod cmd_duplicates;
pub mod cmd_forensics;
pub mod cmd_growth;
pub mod cmd_large;
pub mod cmd_old;
pub mod cmd_scan;
pub mod cmd_undo;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use crate::{
    engine::{Engine, EngineConfig},
    global::{self, GlobalOpts, defaults::DEFAULT_VERBOSITY},
    progress::CancelToken,
    scanner::{ScanConfig, ScanReport},
    ui::{self, scan_progress::ScanProgressReporter},
};

#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// SQLite database path
    #[clap(long = "db", value_parser, global = true)]
    pub db: Option<PathBuf>,

    /// Custom classification JSON rule file
    #[clap(long = "classifier-rules", value_parser, global = true)]
    pub classifier_rules: Option<PathBuf>,

    /// Audit log file
    #[clap(long = "log-file", value_parser, global = true)]
    pub log_file: Option<PathBuf>,

    /// Suppress console output
    #[clap(short = 'q', long, default_value_t = false, global = true)]
    pub quiet: bool,

    /// Verbosity level
    #[clap(short = 'v', long, value_parser, global = true)]
    pub verbosity: Option<u32>,
}

pub fn set_global_opts_with_args(args: &GlobalArgs) {
    global::set_global_opts(GlobalOpts {
        quiet: args.quiet,
        verbosity: args.verbosity.unwrap_or(DEFAULT_VERBOSITY),
    });
}

pub fn engine_config(args: &GlobalArgs) -> EngineConfig {
    EngineConfig {
        db_path: args.db.clone().unwrap_or_else(global::default_db_path),
        classifier_rules: args.classifier_rules.clone(),
        log_file: args.log_file.clone().unwrap_or_else(global::default_log_file),
    }
}

pub fn open_engine(args: &GlobalArgs) -> Result<Engine> {
    Engine::open(&engine_config(args))
}

/// Scan-related options shared by the analysis subcommands.
#[derive(Args, Debug, Clone)]
pub struct ScanOpts {
    /// Root paths to scan or analyze: path[,path,...]
    #[clap(long = "roots", value_parser, value_delimiter = ',', default_value = ".")]
    pub roots: Vec<PathBuf>,

    /// Create a new snapshot before this command
    #[clap(long, default_value_t = false)]
    pub scan: bool,

    /// Use a specific snapshot ID instead of the latest
    #[clap(long = "snapshot-id", value_parser)]
    pub snapshot_id: Option<i64>,

    /// Follow symlink directories
    #[clap(long = "follow-symlinks", default_value_t = false)]
    pub follow_symlinks: bool,

    /// Skip hidden files during scan
    #[clap(long = "no-hidden", default_value_t = false)]
    pub no_hidden: bool,
}

impl ScanOpts {
    pub fn scan_config(&self) -> ScanConfig {
        let mut config = ScanConfig::new(self.roots.clone());
        config.follow_symlinks = self.follow_symlinks;
        config.include_hidden = !self.no_hidden;
        config
    }
}

/// Resolve the snapshot to operate on, scanning first when requested.
pub(crate) fn resolve_or_scan(
    engine: &mut Engine,
    opts: &ScanOpts,
    cancel: &CancelToken,
) -> Result<(i64, Option<ScanReport>)> {
    if opts.scan {
        let report = scan_with_spinner(engine, &opts.scan_config(), cancel)?;
        Ok((report.snapshot_id, Some(report)))
    } else {
        Ok((engine.resolve_snapshot(opts.snapshot_id)?, None))
    }
}

/// Run a scan with a console spinner fed from the progress callback.
pub(crate) fn scan_with_spinner(
    engine: &mut Engine,
    config: &ScanConfig,
    cancel: &CancelToken,
) -> Result<ScanReport> {
    let reporter = ScanProgressReporter::new();
    let callback = reporter.callback();
    let report = engine.scan(config, Some(&callback), cancel);
    reporter.finalize();
    report
}

/// Write a report as pretty-printed JSON, creating parent directories.
pub fn export_json(path: &Path, report: &impl Serialize) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).with_context(|| {
            format!("Could not create report directory '{}'", parent.display())
        })?;
    }
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)
        .with_context(|| format!("Could not write report to '{}'", path.display()))?;
    Ok(())
}

pub(crate) fn report_written(path: &Path) {
    ui::cli::log!("Report written to '{}'", path.display());
}
