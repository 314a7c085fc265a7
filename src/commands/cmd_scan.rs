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

use std::{path::PathBuf, time::Instant};

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use crate::{
    commands::{self, GlobalArgs},
    progress::CancelToken,
    scanner::ScanConfig,
    ui, utils,
};

#[derive(Args, Debug)]
#[clap(about = "Scan roots into a new snapshot")]
pub struct CmdArgs {
    /// Root paths to scan
    #[clap(value_parser, required = true)]
    pub roots: Vec<PathBuf>,

    /// Follow symlink directories
    #[clap(long = "follow-symlinks", default_value_t = false)]
    pub follow_symlinks: bool,

    /// Skip hidden files
    #[clap(long = "no-hidden", default_value_t = false)]
    pub no_hidden: bool,

    /// Report output path
    #[clap(long, value_parser, default_value = "urraca_reports/scan_report.json")]
    pub output: PathBuf,
}

pub fn run(global_args: &GlobalArgs, args: &CmdArgs, cancel: &CancelToken) -> Result<()> {
    let start = Instant::now();
    let mut engine = commands::open_engine(global_args)?;

    let mut config = ScanConfig::new(args.roots.clone());
    config.follow_symlinks = args.follow_symlinks;
    config.include_hidden = !args.no_hidden;

    let report = commands::scan_with_spinner(&mut engine, &config, cancel)?;

    ui::cli::log!(
        "Snapshot {} created: {} files, {}",
        report.snapshot_id.to_string().bold().green(),
        report.total_files,
        utils::format_size(report.total_bytes).bold()
    );
    if report.cancelled {
        ui::cli::warning!("Scan was cancelled; the snapshot holds partial totals.");
    }
    if report.errors_count > 0 {
        ui::cli::warning!(
            "{} could not be read",
            utils::format_count(report.errors_count, "path", "paths")
        );
    }

    commands::export_json(&args.output, &report)?;
    commands::report_written(&args.output);

    ui::cli::log!(
        "Finished in {}",
        utils::pretty_print_duration(start.elapsed())
    );
    Ok(())
}
