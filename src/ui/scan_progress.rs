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

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use indicatif::{ProgressBar, ProgressStyle};

use crate::{
    progress::{ProgressCallback, ScanProgress},
    ui::{PROGRESS_REFRESH_RATE_HZ, SPINNER_TICK_CHARS, default_bar_draw_target},
    utils,
};

/// Console reporter for a running scan. Feeds a spinner from the
/// scanner's progress callback; safe to update from any thread.
pub struct ScanProgressReporter {
    spinner: ProgressBar,
    files_scanned: Arc<AtomicU64>,
    bytes_scanned: Arc<AtomicU64>,
}

impl ScanProgressReporter {
    pub fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_draw_target(default_bar_draw_target());
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} Scanning filesystem ({msg})")
                .expect("The scan spinner template should be valid")
                .tick_chars(SPINNER_TICK_CHARS),
        );
        spinner.enable_steady_tick(Duration::from_millis(
            (1000.0_f32 / PROGRESS_REFRESH_RATE_HZ as f32) as u64,
        ));

        Self {
            spinner,
            files_scanned: Arc::new(AtomicU64::new(0)),
            bytes_scanned: Arc::new(AtomicU64::new(0)),
        }
    }

    /// The callback handed to the scanner.
    pub fn callback(&self) -> ProgressCallback {
        let spinner = self.spinner.clone();
        let files_scanned = self.files_scanned.clone();
        let bytes_scanned = self.bytes_scanned.clone();

        Arc::new(move |update: ScanProgress| {
            files_scanned.store(update.files_scanned, Ordering::Relaxed);
            bytes_scanned.store(update.bytes_scanned, Ordering::Relaxed);
            spinner.set_message(format!(
                "{} files, {} dirs, {}",
                update.files_scanned,
                update.dirs_visited,
                utils::format_size(update.bytes_scanned)
            ));
        })
    }

    pub fn files_scanned(&self) -> u64 {
        self.files_scanned.load(Ordering::Relaxed)
    }

    pub fn bytes_scanned(&self) -> u64 {
        self.bytes_scanned.load(Ordering::Relaxed)
    }

    /// Remove the spinner from the console.
    pub fn finalize(&self) {
        self.spinner.finish_and_clear();
    }
}

impl Default for ScanProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}
