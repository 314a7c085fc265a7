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
#[clap(about = "Find large files")]
pub struct CmdArgs {
    #[clap(flatten)]
    pub scan_opts: ScanOpts,

    /// Threshold size, e.g. 500MB
    #[clap(long = "min-size", value_parser, default_value = "500MB")]
    pub min_size: String,

    /// Limit on the result list
    #[clap(long, value_parser, default_value_t = DEFAULT_LIST_LIMIT)]
    pub limit: usize,

    /// Report output path
    #[clap(long, value_parser, default_value = "urraca_reports/large_files_report.json")]
    pub output: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct LargeFilesReport {
    pub mode: &'static str,
    pub snapshot_id: i64,
    pub threshold_bytes: u64,
    pub threshold_human: String,
    pub count: usize,
    pub items: Vec<FileEntry>,
}

pub fn run(global_args: &GlobalArgs, args: &CmdArgs, cancel: &CancelToken) -> Result<()> {
    let min_size = utils::parse_size(&args.min_size)?;

    let mut engine = commands::open_engine(global_args)?;
    let (snapshot_id, _scan) = commands::resolve_or_scan(&mut engine, &args.scan_opts, cancel)?;

    let items = engine.analyzer(snapshot_id).large_files(min_size, args.limit)?;

    ui::cli::log!(
        "{} at or above {}",
        utils::format_count(items.len(), "file", "files"),
        utils::format_size(min_size)
    );

    let report = LargeFilesReport {
        mode: "large",
        snapshot_id,
        threshold_bytes: min_size,
        threshold_human: utils::format_size(min_size),
        count: items.len(),
        items,
    };

    commands::export_json(&args.output, &report)?;
    commands::report_written(&args.output);
    Ok(())
}
