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
use clap::Args;
use serde::Serialize;

use crate::{
    analyzer::FileEntry,
    commands::{self, GlobalArgs, ScanOpts},
    global::defaults::DEFAULT_LIST_LIMIT,
    progress::CancelToken,
    ui, utils,
};

#[derive(Args, Debug)]
#[clap(about = "Find files untouched for a number of days")]
pub struct CmdArgs {
    #[clap(flatten)]
    pub scan_opts: ScanOpts,

    /// Age threshold in whole days, based on mtime
    #[clap(long, value_parser, default_value_t = 180)]
    pub days: u32,

    /// Limit on the result list
    #[clap(long, value_parser, default_value_t = DEFAULT_LIST_LIMIT)]
    pub limit: usize,

    /// Report output path
    #[clap(long, value_parser, default_value = "urraca_reports/old_files_report.json")]
    pub output: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct OldFilesReport {
    pub mode: &'static str,
    pub snapshot_id: i64,
    pub older_than_days: u32,
    pub count: usize,
    pub items: Vec<FileEntry>,
}

pub fn run(global_args: &GlobalArgs, args: &CmdArgs, cancel: &CancelToken) -> Result<()> {
    let mut engine = commands::open_engine(global_args)?;
    let (snapshot_id, _scan) = commands::resolve_or_scan(&mut engine, &args.scan_opts, cancel)?;

    let items = engine.analyzer(snapshot_id).old_files(args.days, args.limit)?;

    ui::cli::log!(
        "{} older than {} days",
        utils::format_count(items.len(), "file", "files"),
        args.days
    );

    let report = OldFilesReport {
        mode: "old",
        snapshot_id,
        older_than_days: args.days,
        count: items.len(),
        items,
    };

    commands::export_json(&args.output, &report)?;
    commands::report_written(&args.output);
    Ok(())
}
