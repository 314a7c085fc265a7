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

use clap::{Parser, Subcommand};

use urraca::{
    commands::{
        self, GlobalArgs, cmd_analyze, cmd_carbon, cmd_clean, cmd_dev_clean, cmd_duplicates,
        cmd_forensics, cmd_growth, cmd_large, cmd_old, cmd_scan, cmd_undo,
    },
    progress::CancelToken,
    ui,
};

#[derive(Parser, Debug)]
#[clap(
    name = "urraca",
    version,
    about = "Local disk intelligence and cleanup engine"
)]
struct Cli {
    #[clap(flatten)]
    global: GlobalArgs,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Scan(cmd_scan::CmdArgs),
    Analyze(cmd_analyze::CmdArgs),
    Duplicates(cmd_duplicates::CmdArgs),
    Large(cmd_large::CmdArgs),
    Old(cmd_old::CmdArgs),
    Growth(cmd_growth::CmdArgs),
    Carbon(cmd_carbon::CmdArgs),
    DevClean(cmd_dev_clean::CmdArgs),
    Clean(cmd_clean::CmdArgs),
    Undo(cmd_undo::CmdArgs),
    Forensics(cmd_forensics::CmdArgs),
}

fn main() {
    let cli = Cli::parse();
    commands::set_global_opts_with_args(&cli.global);

    let cancel = CancelToken::new();
    {
        let handler_token = cancel.clone();
        let _ = ctrlc::set_handler(move || handler_token.cancel());
    }

    let result = match &cli.command {
        Command::Scan(args) => cmd_scan::run(&cli.global, args, &cancel),
        Command::Analyze(args) => cmd_analyze::run(&cli.global, args, &cancel),
        Command::Duplicates(args) => cmd_duplicates::run(&cli.global, args, &cancel),
        Command::Large(args) => cmd_large::run(&cli.global, args, &cancel),
        Command::Old(args) => cmd_old::run(&cli.global, args, &cancel),
        Command::Growth(args) => cmd_growth::run(&cli.global, args, &cancel),
        Command::Carbon(args) => cmd_carbon::run(&cli.global, args, &cancel),
        Command::DevClean(args) => cmd_dev_clean::run(&cli.global, args, &cancel),
        Command::Clean(args) => cmd_clean::run(&cli.global, args, &cancel),
        Command::Undo(args) => cmd_undo::run(&cli.global, args, &cancel),
        Command::Forensics(args) => cmd_forensics::run(&cli.global, args, &cancel),
    };

    if let Err(e) = result {
        ui::cli::error!("{e:#}");
        std::process::exit(1);
    }
}
