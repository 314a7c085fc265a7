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

#![cfg(test)]

mod tests {
    use anyhow::Result;
    use tempfile::tempdir;
    use urraca::{
        commands::{ScanOpts, cmd_growth, cmd_scan},
        progress::CancelToken,
        utils::size,
    };

    use crate::{integration_tests::global_args, test_utils};

    fn scan(global: &urraca::commands::GlobalArgs, root: &std::path::Path, output: &std::path::Path) -> Result<()> {
        cmd_scan::run(
            global,
            &cmd_scan::CmdArgs {
                roots: vec![root.to_path_buf()],
                follow_symlinks: false,
                no_hidden: false,
                output: output.to_path_buf(),
            },
            &CancelToken::new(),
        )
    }

    fn growth_opts(root: &std::path::Path, output: &std::path::Path) -> cmd_growth::CmdArgs {
        cmd_growth::CmdArgs {
            scan_opts: ScanOpts {
                roots: vec![root.to_path_buf()],
                scan: false,
                snapshot_id: None,
                follow_symlinks: false,
                no_hidden: false,
            },
            output: output.to_path_buf(),
        }
    }

    #[test]
    fn test_single_snapshot_has_no_previous() -> Result<()> {
        let tmp = tempdir()?;
        let root = tmp.path().join("data");
        test_utils::write_file(&root.join("base.bin"), &vec![0u8; 1024])?;

        let global = global_args(tmp.path());
        scan(&global, &root, &tmp.path().join("scan1.json"))?;

        let output = tmp.path().join("growth_report.json");
        cmd_growth::run(&global, &growth_opts(&root, &output), &CancelToken::new())?;

        let report = test_utils::read_report(&output)?;
        assert_eq!(report["comparison"]["has_previous"], false);
        assert_eq!(report["prediction"]["has_prediction"], false);
        assert_eq!(report["history"].as_array().unwrap().len(), 1);
        Ok(())
    }

    // A 1 MiB file created between two scans shows up as growth and as
    // exactly one added file.
    #[test]
    fn test_growth_between_two_scans() -> Result<()> {
        let tmp = tempdir()?;
        let root = tmp.path().join("data");
        test_utils::write_file(&root.join("base.bin"), &vec![0u8; 1024])?;

        let global = global_args(tmp.path());
        scan(&global, &root, &tmp.path().join("scan1.json"))?;

        test_utils::write_file(&root.join("fresh.bin"), &vec![1u8; size::MiB as usize])?;
        scan(&global, &root, &tmp.path().join("scan2.json"))?;

        let output = tmp.path().join("growth_report.json");
        cmd_growth::run(&global, &growth_opts(&root, &output), &CancelToken::new())?;

        let report = test_utils::read_report(&output)?;
        let comparison = &report["comparison"];
        assert_eq!(comparison["has_previous"], true);
        assert!(comparison["delta_bytes"].as_i64().unwrap() >= size::MiB as i64);
        assert_eq!(comparison["direction"], "growth");

        let churn = &comparison["file_churn"];
        assert_eq!(churn["added"], 1);
        assert_eq!(churn["removed"], 0);
        assert_eq!(churn["changed"], 0);

        assert_eq!(report["history"].as_array().unwrap().len(), 2);
        Ok(())
    }
}
