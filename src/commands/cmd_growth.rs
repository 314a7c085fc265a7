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
use colored::Colorize;
use serde::Serialize;

use crate::{
    analyzer::{GrowthReport, HistoryEntry, PredictionReport},
    commands::{self, GlobalArgs, ScanOpts},
    progress::CancelToken,
    ui, utils,
};

#[derive(Args, Debug)]
#[clap(about = "Growth, churn and fill prediction across snapshots")]
pub struct CmdArgs {
    #[clap(flatten)]
    pub scan_opts: ScanOpts,

    /// Report output path
    #[clap(long, value_parser, default_value = "urraca_reports/growth_report.json")]
    pub output: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct GrowthCmdReport {
    pub mode: &'static str,
    pub snapshot_id: i64,
    pub history: Vec<HistoryEntry>,
    pub comparison: GrowthReport,
    pub prediction: PredictionReport,
}

pub fn run(global_args: &GlobalArgs, args: &CmdArgs, cancel: &CancelToken) -> Result<()> {
    let mut engine = commands::open_engine(global_args)?;
    let (snapshot_id, _scan) = commands::resolve_or_scan(&mut engine, &args.scan_opts, cancel)?;

    let analyzer = engine.analyzer(snapshot_id);
    let comparison = analyzer.growth_compare_previous()?;
    let prediction = analyzer
        .predict_disk_fill()
        .unwrap_or_else(|e| PredictionReport::unavailable(0, &e.to_string()));

    if comparison.has_previous {
        ui::cli::log!(
            "{} since snapshot {}: {}",
            comparison.direction.bold(),
            comparison.previous_snapshot.unwrap_or_default(),
            utils::format_size(comparison.delta_bytes.unsigned_abs()).bold()
        );
        if let Some(churn) = &comparison.file_churn {
            ui::cli::log!(
                "Churn: {} added, {} removed, {} changed ({}%)",
                churn.added.to_string().green(),
                churn.removed.to_string().red(),
                churn.changed.to_string().yellow(),
                churn.churn_rate_pct
            );
        }
    } else {
        ui::cli::log!("No previous snapshot to compare against.");
    }

    let report = GrowthCmdReport {
        mode: "growth",
        snapshot_id,
        history: analyzer.growth_history()?,
        comparison,
        prediction,
    };

    commands::export_json(&args.output, &report)?;
    commands::report_written(&args.output);
    Ok(())
}
