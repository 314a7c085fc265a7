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

mod test_cmd_clean;
mod test_cmd_duplicates;
mod test_cmd_growth;
mod test_cmd_scan;

use std::path::Path;

use urraca::commands::{self, GlobalArgs};

/// Global arguments pointing every persistent path into the test tempdir.
pub fn global_args(tmp: &Path) -> GlobalArgs {
    let args = GlobalArgs {
        db: Some(tmp.join("db").join("urraca.db")),
        classifier_rules: None,
        log_file: Some(tmp.join("actions.log")),
        quiet: true,
        verbosity: None,
    };
    commands::set_global_opts_with_args(&args);
    args
}
