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
use chrono::{DateTime, Utc};
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use crate::{
    commands::{self, GlobalArgs, ScanOpts},
    duplicates::{DuplicateDetector, DuplicateReport},
    progress::CancelToken,
    scanner::ScanReport,
    ui, utils,
};

#[derive(Args, Debug)]
#[clap(about = "Find byte-identical files within a snapshot")]
pub struct CmdArgs {
    #[clap(flatten)]
    pub scan_opts: ScanOpts,

    /// Number of hashing workers (defaults to CPU count - 1)
    #[clap(long, value_parser)]
    pub workers: Option<usize>,

    /// Report output path
    #[clap(long, value_parser, default_value = "urraca_reports/duplicates_report.json")]
    pub output: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct DuplicatesCmdReport {
    pub mode: &'static str,
    pub generated_at: DateTime<Utc>,
    pub snapshot_id: i64,
    pub scan: Option<ScanReport>,
    pub duplicates: DuplicateReport,
}

pub fn run(global_args: &GlobalArgs, args: &CmdArgs, cancel: &CancelToken) -> Result<()> {
    let mut engine = commands::open_engine(global_args)?;
    let (snapshot_id, scan) = commands::resolve_or_scan(&mut engine, &args.scan_opts, cancel)?;

    let duplicates = DuplicateDetector::new(engine.store(), snapshot_id, args.workers)
        .find_duplicates(cancel)?;

    ui::cli::log!(
        "{} across {} clusters ({} sampled errors)",
        format!("{} reclaimable", duplicates.potential_waste_human)
            .bold()
            .yellow(),
        duplicates.cluster_count,
        duplicates.errors.len()
    );
    if duplicates.cancelled {
        ui::cli::warning!("Duplicate detection was cancelled; results are partial.");
    }
    if duplicates.errors_count > 0 {
        ui::cli::warning!(
            "{} could not be hashed",
            utils::format_count(duplicates.errors_count, "file", "files")
        );
    }

    let report = DuplicatesCmdReport {
        mode: "duplicates",
        generated_at: Utc::now(),
        snapshot_id,
        scan,
        duplicates,
    };

    commands::export_json(&args.output, &report)?;
    commands::report_written(&args.output);
    Ok(())
}
