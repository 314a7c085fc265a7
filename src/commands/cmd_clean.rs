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

use anyhow::{Result, bail};
use clap::{Args, ValueEnum};
use colored::Colorize;
use dialoguer::Confirm;
use serde::Serialize;

use crate::{
    candidates::{self, CandidateParams, CleanupMode},
    cleaner::{CleanupPolicy, CleanupReport, ItemStatus},
    commands::{self, GlobalArgs, ScanOpts},
    global::{self, defaults::DEFAULT_CLEAN_LIMIT},
    progress::CancelToken,
    ui,
    utils::{self, normalize_path},
};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Mode {
    Duplicates,
    LargeOld,
    LogsTemp,
    PathList,
}

impl From<Mode> for CleanupMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Duplicates => CleanupMode::Duplicates,
            Mode::LargeOld => CleanupMode::LargeOld,
            Mode::LogsTemp => CleanupMode::LogsTemp,
            Mode::PathList => CleanupMode::PathList,
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", CleanupMode::from(*self))
    }
}

#[derive(Args, Debug)]
#[clap(about = "Risk-scored cleanup with dry-run default")]
pub struct CmdArgs {
    #[clap(flatten)]
    pub scan_opts: ScanOpts,

    /// Candidate selection mode
    #[clap(long = "mode", value_parser, default_value_t = Mode::LargeOld)]
    pub mode: Mode,

    /// Size threshold for large-old mode, e.g. 1GB
    #[clap(long = "min-size", value_parser, default_value = "1GB")]
    pub min_size: String,

    /// Age threshold in days for large-old mode
    #[clap(long, value_parser, default_value_t = 180)]
    pub days: u32,

    /// Limit on selected candidates
    #[clap(long, value_parser, default_value_t = DEFAULT_CLEAN_LIMIT)]
    pub limit: usize,

    /// Path list file for path-list mode
    #[clap(long = "path-list", value_parser)]
    pub path_list: Option<PathBuf>,

    /// Actually perform the cleanup (otherwise dry-run)
    #[clap(long, default_value_t = false)]
    pub execute: bool,

    /// Required for destructive execution
    #[clap(long, default_value_t = false)]
    pub confirm: bool,

    /// Non-interactive yes for confirmations
    #[clap(long, default_value_t = false)]
    pub yes: bool,

    /// Allow acting on high-risk items
    #[clap(long = "force-high-risk", default_value_t = false)]
    pub force_high_risk: bool,

    /// Delete permanently instead of quarantining
    #[clap(long = "no-quarantine", default_value_t = false)]
    pub no_quarantine: bool,

    /// Root of the quarantine tree
    #[clap(long = "quarantine-dir", value_parser)]
    pub quarantine_dir: Option<PathBuf>,

    /// Report output path
    #[clap(long, value_parser, default_value = "urraca_reports/cleanup_report.json")]
    pub output: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct CleanCmdReport {
    pub mode: &'static str,
    pub snapshot_id: i64,
    pub status: &'static str,
    pub candidate_count: usize,
    pub cleanup: Option<CleanupReport>,
}

pub fn run(global_args: &GlobalArgs, args: &CmdArgs, cancel: &CancelToken) -> Result<()> {
    let mut engine = commands::open_engine(global_args)?;
    let (snapshot_id, _scan) = commands::resolve_or_scan(&mut engine, &args.scan_opts, cancel)?;

    let mode = CleanupMode::from(args.mode);
    let params = CandidateParams {
        min_size: utils::parse_size(&args.min_size)?,
        older_than_days: args.days,
        limit: args.limit,
        path_list: args.path_list.clone(),
    };
    let targets = candidates::collect(engine.store(), snapshot_id, mode, &params, cancel)?;

    let policy = CleanupPolicy {
        dry_run: !args.execute,
        force_high_risk: args.force_high_risk,
        quarantine_mode: !args.no_quarantine,
        confirm: args.confirm,
    };

    if !policy.dry_run {
        if !policy.confirm {
            bail!("Destructive mode requires --confirm");
        }
        let proceed = args.yes
            || Confirm::new()
                .with_prompt(format!(
                    "Proceed with cleanup of up to {}?",
                    utils::format_count(targets.len(), "item", "items")
                ))
                .default(false)
                .interact()?;
        if !proceed {
            ui::cli::log!("Cleanup cancelled.");
            let report = CleanCmdReport {
                mode: "clean",
                snapshot_id,
                status: "cancelled",
                candidate_count: targets.len(),
                cleanup: None,
            };
            commands::export_json(&args.output, &report)?;
            commands::report_written(&args.output);
            return Ok(());
        }
    }

    let allowed_roots: Vec<PathBuf> = args
        .scan_opts
        .roots
        .iter()
        .map(|r| normalize_path(r))
        .collect();
    let quarantine_dir = args
        .quarantine_dir
        .clone()
        .unwrap_or_else(global::default_quarantine_dir);

    let cleanup = engine
        .cleanup_engine(snapshot_id, quarantine_dir)
        .execute(&targets, mode.as_str(), &policy, &allowed_roots, cancel)?;

    let verb = if policy.dry_run {
        "would be reclaimed".to_string()
    } else {
        "reclaimed".to_string()
    };
    ui::cli::log!(
        "Action {}: {} {} ({} acted on, {} skipped, {} failed)",
        cleanup.action_id.clone().bold(),
        cleanup.estimated_freed_human.clone().bold().green(),
        verb,
        cleanup.deleted_or_quarantined,
        cleanup.skipped,
        cleanup.failed
    );
    for item in cleanup.items.iter().filter(|i| i.status == ItemStatus::Skipped) {
        ui::cli::verbose!(2, "skipped {} ({})", item.path.display(), item.reason);
    }

    if policy.dry_run {
        ui::cli::log!("Dry run only. Re-run with --execute --confirm to apply.");
    } else if policy.quarantine_mode {
        ui::cli::log!(
            "Quarantined items can be restored with: urraca undo --action-id {}",
            cleanup.action_id
        );
    }

    let report = CleanCmdReport {
        mode: "clean",
        snapshot_id,
        status: "ok",
        candidate_count: targets.len(),
        cleanup: Some(cleanup),
    };

    commands::export_json(&args.output, &report)?;
    commands::report_written(&args.output);
    Ok(())
}
