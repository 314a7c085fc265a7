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

use colored::Colorize;

use crate::global;

pub fn emit(message: String) {
    if !global::effective_opts().quiet {
        println!("{message}");
    }
}

pub fn emit_warning(message: String) {
    if !global::effective_opts().quiet {
        eprintln!("{} {}", "Warning:".bold().yellow(), message);
    }
}

pub fn emit_error(message: String) {
    eprintln!("{} {}", "Error:".bold().red(), message);
}

#[macro_export]
macro_rules! log {
    () => { $crate::ui::cli::emit(String::new()) };
    ($($arg:tt)+) => { $crate::ui::cli::emit(format!($($arg)+)) };
}

#[macro_export]
macro_rules! warning {
    ($($arg:tt)+) => { $crate::ui::cli::emit_warning(format!($($arg)+)) };
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)+) => { $crate::ui::cli::emit_error(format!($($arg)+)) };
}

/// Log only when the configured verbosity reaches `level`.
#[macro_export]
macro_rules! verbose {
    ($level:expr, $($arg:tt)+) => {
        if $crate::global::effective_opts().verbosity >= $level {
            $crate::ui::cli::emit(format!($($arg)+));
        }
    };
}

pub use crate::{error, log, verbose, warning};
