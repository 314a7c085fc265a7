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
use serde::Serialize;

use crate::{
    commands::{self, GlobalArgs, ScanOpts},
    devwaste::{DevWasteAnalyzer, DevWasteReport},
    progress::CancelToken,
    ui,
};

#[derive(Args, Debug)]
#[clap(about = "Analyze development-environment waste (suggestions only)")]
pub struct CmdArgs {
    #[clap(flatten)]
    pub scan_opts: ScanOpts,

    /// Report output path
    #[clap(long, value_parser, default_value = "urraca_reports/dev_waste_report.json")]
    pub output: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct DevCleanReport {
    pub mode: &'static str,
    pub snapshot_id: i64,
    pub generated_at: DateTime<Utc>,
    pub analysis: DevWasteReport,
    pub note: &'static str,
}

pub fn run(global_args: &GlobalArgs, args: &CmdArgs, cancel: &CancelToken) -> Result<()> {
    let mut engine = commands::open_engine(global_args)?;
    let (snapshot_id, _scan) = commands::resolve_or_scan(&mut engine, &args.scan_opts, cancel)?;

    let analysis = DevWasteAnalyzer::new(engine.store(), snapshot_id).analyze()?;

    if analysis.suggestions.is_empty() {
        ui::cli::log!("No development waste patterns found.");
    } else {
        for suggestion in &analysis.suggestions {
            ui::cli::log!(
                "{}: ~{} ({})",
                suggestion.kind,
                suggestion.estimated_human,
                suggestion.recommendation
            );
        }
    }

    let report = DevCleanReport {
        mode: "dev-clean",
        snapshot_id,
        generated_at: Utc::now(),
        analysis,
        note: "Suggestions only. No deletion performed.",
    };

    commands::export_json(&args.output, &report)?;
    commands::report_written(&args.output);
    Ok(())
}
