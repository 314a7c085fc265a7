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
    carbon::{self, CarbonFactors, CarbonReport},
    commands::{self, GlobalArgs, ScanOpts},
    global::defaults::{
        DEFAULT_CO2_KG_PER_KWH, DEFAULT_KWH_PER_GB_YEAR, DEFAULT_LAPTOP_KWH_PER_HOUR,
    },
    progress::CancelToken,
    ui,
};

#[derive(Args, Debug)]
#[clap(about = "Estimate the storage footprint of a snapshot (approximate)")]
pub struct CmdArgs {
    #[clap(flatten)]
    pub scan_opts: ScanOpts,

    /// Energy factor in kWh per GB-year
    #[clap(long = "kwh-per-gb-year", value_parser, default_value_t = DEFAULT_KWH_PER_GB_YEAR)]
    pub kwh_per_gb_year: f64,

    /// Grid carbon factor in kg CO2 per kWh
    #[clap(long = "co2-kg-per-kwh", value_parser, default_value_t = DEFAULT_CO2_KG_PER_KWH)]
    pub co2_kg_per_kwh: f64,

    /// Laptop energy draw in kWh per hour, for the context figure
    #[clap(long = "laptop-kwh-per-hour", value_parser, default_value_t = DEFAULT_LAPTOP_KWH_PER_HOUR)]
    pub laptop_kwh_per_hour: f64,

    /// Report output path
    #[clap(long, value_parser, default_value = "urraca_reports/carbon_report.json")]
    pub output: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct CarbonCmdReport {
    pub mode: &'static str,
    pub snapshot_id: i64,
    pub estimation: CarbonReport,
}

pub fn run(global_args: &GlobalArgs, args: &CmdArgs, cancel: &CancelToken) -> Result<()> {
    let mut engine = commands::open_engine(global_args)?;
    let (snapshot_id, _scan) = commands::resolve_or_scan(&mut engine, &args.scan_opts, cancel)?;

    let factors = CarbonFactors {
        kwh_per_gb_year: args.kwh_per_gb_year,
        co2_kg_per_kwh: args.co2_kg_per_kwh,
        laptop_kwh_per_hour: args.laptop_kwh_per_hour,
    };
    let total_bytes = engine.analyzer(snapshot_id).summary()?.total_bytes;
    let estimation = carbon::estimate(total_bytes, &factors);

    ui::cli::log!(
        "{} stored, about {} kWh and {} kg CO2 per year (estimated)",
        estimation.stored_human,
        estimation.estimated_annual_energy_kwh,
        estimation.estimated_annual_co2_kg
    );

    let report = CarbonCmdReport {
        mode: "carbon",
        snapshot_id,
        estimation,
    };

    commands::export_json(&args.output, &report)?;
    commands::report_written(&args.output);
    Ok(())
}
