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
use chrono::{DateTime, Utc};
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use crate::{
    analyzer::{
        ExtensionEntry, FileEntry, FolderEntry, GrowthReport, HistogramBucket, HistoryEntry,
        PredictionReport, SummaryReport, TypeEntry,
    },
    carbon::{self, CarbonFactors, CarbonReport},
    commands::{self, GlobalArgs},
    devwaste::{DevWasteAnalyzer, DevWasteReport},
    duplicates::{DuplicateDetector, DuplicateReport},
    progress::CancelToken,
    scanner::{ScanConfig, ScanReport},
    ui, utils,
};

#[derive(Args, Debug)]
#[clap(
    about = "Read-only full audit report",
    long_about = "Scan the given roots (hidden files included) and emit every analysis the\
                  engine knows: usage, types, growth, duplicates and dev waste. Strictly\
                  read-only; nothing is deleted or moved."
)]
pub struct CmdArgs {
    /// Root paths to audit
    #[clap(value_parser, required = true)]
    pub roots: Vec<PathBuf>,

    /// Limit for the result lists
    #[clap(long = "top-n", value_parser, default_value_t = 100)]
    pub top_n: usize,

    /// Follow symlink directories
    #[clap(long = "follow-symlinks", default_value_t = false)]
    pub follow_symlinks: bool,

    /// Report output path
    #[clap(long, value_parser, default_value = "urraca_reports/forensics_report.json")]
    pub output: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct ForensicsPolicyNote {
    pub deletion_performed: bool,
    pub note: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ForensicsReport {
    pub mode: &'static str,
    pub read_only: bool,
    pub generated_at: DateTime<Utc>,
    pub scan: ScanReport,
    pub summary: SummaryReport,
    pub largest_files: Vec<FileEntry>,
    pub folder_sizes: Vec<FolderEntry>,
    pub type_distribution: Vec<TypeEntry>,
    pub extension_frequency: Vec<ExtensionEntry>,
    pub size_histogram: Vec<HistogramBucket>,
    pub growth: GrowthReport,
    pub growth_history: Vec<HistoryEntry>,
    pub growth_prediction: PredictionReport,
    pub carbon_estimation: CarbonReport,
    pub duplicates: DuplicateReport,
    pub dev_waste: DevWasteReport,
    pub cleanup_policy: ForensicsPolicyNote,
}

pub fn run(global_args: &GlobalArgs, args: &CmdArgs, cancel: &CancelToken) -> Result<()> {
    let start = Instant::now();
    let mut engine = commands::open_engine(global_args)?;

    // Forensics always scans everything, dotfiles included.
    let mut config = ScanConfig::new(args.roots.clone());
    config.follow_symlinks = args.follow_symlinks;
    config.include_hidden = true;

    let scan = commands::scan_with_spinner(&mut engine, &config, cancel)?;
    let snapshot_id = scan.snapshot_id;

    let analyzer = engine.analyzer(snapshot_id);
    let summary = analyzer.summary()?;
    let growth_prediction = analyzer
        .predict_disk_fill()
        .unwrap_or_else(|e| PredictionReport::unavailable(0, &e.to_string()));

    let report = ForensicsReport {
        mode: "forensics",
        read_only: true,
        generated_at: Utc::now(),
        largest_files: analyzer.largest_files(args.top_n)?,
        folder_sizes: analyzer.folder_sizes(args.top_n)?,
        type_distribution: analyzer.type_distribution()?,
        extension_frequency: analyzer.extension_frequency(args.top_n)?,
        size_histogram: analyzer.size_histogram()?,
        growth: analyzer.growth_compare_previous()?,
        growth_history: analyzer.growth_history()?,
        growth_prediction,
        carbon_estimation: carbon::estimate(summary.total_bytes, &CarbonFactors::default()),
        duplicates: DuplicateDetector::new(engine.store(), snapshot_id, None)
            .find_duplicates(cancel)?,
        dev_waste: DevWasteAnalyzer::new(engine.store(), snapshot_id).analyze()?,
        cleanup_policy: ForensicsPolicyNote {
            deletion_performed: false,
            note: "Forensics mode is strictly read-only.",
        },
        summary,
        scan,
    };

    ui::cli::log!(
        "Forensics snapshot {}: {} files, {} clusters of duplicates",
        snapshot_id.to_string().bold().green(),
        report.summary.total_files,
        report.duplicates.cluster_count
    );

    commands::export_json(&args.output, &report)?;
    commands::report_written(&args.output);

    ui::cli::log!(
        "Finished in {}",
        utils::pretty_print_duration(start.elapsed())
    );
    Ok(())
}
