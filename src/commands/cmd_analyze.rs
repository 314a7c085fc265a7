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
        ExtensionEntry, FileEntry, FolderEntry, GrowthReport, HistogramBucket, ParetoReport,
        PredictionReport, SummaryReport, TypeEntry,
    },
    carbon::{self, CarbonFactors, CarbonReport},
    commands::{self, GlobalArgs},
    duplicates::{DuplicateDetector, DuplicateReport},
    global::defaults::DEFAULT_TOP_N,
    progress::CancelToken,
    scanner::{ScanConfig, ScanReport},
    ui, utils,
};

#[derive(Args, Debug)]
#[clap(about = "Scan roots and run the full disk usage analysis")]
pub struct CmdArgs {
    /// Root paths to analyze
    #[clap(value_parser, required = true)]
    pub roots: Vec<PathBuf>,

    /// Limit for the result lists
    #[clap(long = "top-n", value_parser, default_value_t = DEFAULT_TOP_N)]
    pub top_n: usize,

    /// Follow symlink directories
    #[clap(long = "follow-symlinks", default_value_t = false)]
    pub follow_symlinks: bool,

    /// Skip hidden files
    #[clap(long = "no-hidden", default_value_t = false)]
    pub no_hidden: bool,

    /// Skip the duplicate detection pass
    #[clap(long = "no-duplicates", default_value_t = false)]
    pub no_duplicates: bool,

    /// Report output path
    #[clap(long, value_parser, default_value = "urraca_reports/analyze_report.json")]
    pub output: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeReport {
    pub mode: &'static str,
    pub generated_at: DateTime<Utc>,
    pub scan: ScanReport,
    pub summary: SummaryReport,
    pub largest_files: Vec<FileEntry>,
    pub folder_sizes: Vec<FolderEntry>,
    pub type_distribution: Vec<TypeEntry>,
    pub extension_frequency: Vec<ExtensionEntry>,
    pub pareto: ParetoReport,
    pub size_histogram: Vec<HistogramBucket>,
    pub growth: GrowthReport,
    pub growth_prediction: PredictionReport,
    pub carbon_estimation: CarbonReport,
    pub duplicates: Option<DuplicateReport>,
}

pub fn run(global_args: &GlobalArgs, args: &CmdArgs, cancel: &CancelToken) -> Result<()> {
    let start = Instant::now();
    let mut engine = commands::open_engine(global_args)?;

    let mut config = ScanConfig::new(args.roots.clone());
    config.follow_symlinks = args.follow_symlinks;
    config.include_hidden = !args.no_hidden;

    let scan = commands::scan_with_spinner(&mut engine, &config, cancel)?;
    let snapshot_id = scan.snapshot_id;

    let analyzer = engine.analyzer(snapshot_id);
    let summary = analyzer.summary()?;

    let growth_prediction = analyzer
        .predict_disk_fill()
        .unwrap_or_else(|e| PredictionReport::unavailable(0, &e.to_string()));

    let duplicates = if args.no_duplicates {
        None
    } else {
        Some(
            DuplicateDetector::new(engine.store(), snapshot_id, None).find_duplicates(cancel)?,
        )
    };

    let report = AnalyzeReport {
        mode: "analyze",
        generated_at: Utc::now(),
        summary: summary.clone(),
        largest_files: analyzer.largest_files(args.top_n)?,
        folder_sizes: analyzer.folder_sizes(args.top_n)?,
        type_distribution: analyzer.type_distribution()?,
        extension_frequency: analyzer.extension_frequency(args.top_n)?,
        pareto: analyzer.pareto_top_consumers()?,
        size_histogram: analyzer.size_histogram()?,
        growth: analyzer.growth_compare_previous()?,
        growth_prediction,
        carbon_estimation: carbon::estimate(summary.total_bytes, &CarbonFactors::default()),
        duplicates,
        scan,
    };

    ui::cli::log!(
        "Snapshot {}: {} files, {}",
        snapshot_id.to_string().bold().green(),
        report.summary.total_files,
        utils::format_size(report.summary.total_bytes).bold()
    );
    if let Some(duplicates) = &report.duplicates {
        ui::cli::log!(
            "{} duplicate clusters, {} reclaimable",
            duplicates.cluster_count,
            duplicates.potential_waste_human.clone().bold().yellow()
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
