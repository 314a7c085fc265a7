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
use dialoguer::Confirm;
use serde::Serialize;

use crate::{
    cleaner::UndoReport,
    commands::{self, GlobalArgs},
    global,
    progress::CancelToken,
    ui,
};

#[derive(Args, Debug)]
#[clap(about = "Restore the quarantined files of a cleanup action")]
pub struct CmdArgs {
    /// The cleanup action to undo
    #[clap(long = "action-id", value_parser, required = true)]
    pub action_id: String,

    /// Non-interactive yes for confirmations
    #[clap(long, default_value_t = false)]
    pub yes: bool,

    /// Report output path
    #[clap(long, value_parser, default_value = "urraca_reports/undo_report.json")]
    pub output: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct UndoCmdReport {
    pub mode: &'static str,
    pub status: &'static str,
    pub undo: Option<UndoReport>,
}

pub fn run(global_args: &GlobalArgs, args: &CmdArgs, _cancel: &CancelToken) -> Result<()> {
    let engine = commands::open_engine(global_args)?;

    let proceed = args.yes
        || Confirm::new()
            .with_prompt(format!(
                "Restore quarantined files for action {}?",
                args.action_id
            ))
            .default(false)
            .interact()?;
    if !proceed {
        ui::cli::log!("Undo cancelled.");
        let report = UndoCmdReport {
            mode: "undo",
            status: "cancelled",
            undo: None,
        };
        commands::export_json(&args.output, &report)?;
        commands::report_written(&args.output);
        return Ok(());
    }

    let snapshot_id = engine.store().latest_snapshot()?.unwrap_or(0);
    let undo = engine
        .cleanup_engine(snapshot_id, global::default_quarantine_dir())
        .undo(&args.action_id)?;

    if let Some(message) = &undo.message {
        ui::cli::warning!("{}", message);
    } else {
        ui::cli::log!(
            "{} restored, {} failed",
            undo.restored.to_string().bold().green(),
            undo.failed
        );
        for failure in &undo.failures {
            ui::cli::warning!("{}: {}", failure.original.display(), failure.error);
        }
    }

    let report = UndoCmdReport {
        mode: "undo",
        status: "ok",
        undo: Some(undo),
    };

    commands::export_json(&args.output, &report)?;
    commands::report_written(&args.output);
    Ok(())
}
