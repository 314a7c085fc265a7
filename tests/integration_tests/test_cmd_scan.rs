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
    use anyhow::{Context, Result};
    use tempfile::tempdir;
    use urraca::{
        commands::{cmd_large, cmd_old, cmd_scan, ScanOpts},
        progress::CancelToken,
        utils::size,
    };

    use crate::{integration_tests::global_args, test_utils};

    #[test]
    fn test_scan_writes_report_and_snapshot() -> Result<()> {
        let tmp = tempdir()?;
        let root = tmp.path().join("data");
        test_utils::write_file(&root.join("a").join("x.txt"), b"hello")?;
        test_utils::write_file(&root.join("b").join("y.bin"), &vec![0u8; 2048])?;

        let global = global_args(tmp.path());
        let output = tmp.path().join("scan_report.json");

        let args = cmd_scan::CmdArgs {
            roots: vec![root],
            follow_symlinks: false,
            no_hidden: false,
            output: output.clone(),
        };
        cmd_scan::run(&global, &args, &CancelToken::new())
            .with_context(|| "Failed to run cmd_scan")?;

        let report = test_utils::read_report(&output)?;
        assert_eq!(report["total_files"], 2);
        assert_eq!(report["total_bytes"], 5 + 2048);
        assert_eq!(report["cancelled"], false);
        assert_eq!(report["errors_count"], 0);
        assert!(report["snapshot_id"].as_i64().unwrap() >= 1);
        Ok(())
    }

    #[test]
    fn test_scan_empty_root_has_zero_totals() -> Result<()> {
        let tmp = tempdir()?;
        let root = tmp.path().join("empty");
        std::fs::create_dir_all(&root)?;

        let global = global_args(tmp.path());
        let output = tmp.path().join("scan_report.json");

        let args = cmd_scan::CmdArgs {
            roots: vec![root],
            follow_symlinks: false,
            no_hidden: false,
            output: output.clone(),
        };
        cmd_scan::run(&global, &args, &CancelToken::new())?;

        let report = test_utils::read_report(&output)?;
        assert_eq!(report["total_files"], 0);
        assert_eq!(report["total_bytes"], 0);
        Ok(())
    }

    #[test]
    fn test_scan_rejects_missing_root() -> Result<()> {
        let tmp = tempdir()?;
        let global = global_args(tmp.path());

        let args = cmd_scan::CmdArgs {
            roots: vec![tmp.path().join("does-not-exist")],
            follow_symlinks: false,
            no_hidden: false,
            output: tmp.path().join("scan_report.json"),
        };
        assert!(cmd_scan::run(&global, &args, &CancelToken::new()).is_err());
        Ok(())
    }

    // Large-old filter: a 5 MiB file aged 400 days qualifies, a fresh one
    // of the same size does not.
    #[test]
    fn test_large_and_old_selection() -> Result<()> {
        let tmp = tempdir()?;
        let root = tmp.path().join("data");
        let old_big = root.join("old.big");
        let new_big = root.join("new.big");
        test_utils::write_file(&old_big, &vec![1u8; 5 * size::MiB as usize])?;
        test_utils::write_file(&new_big, &vec![2u8; 5 * size::MiB as usize])?;
        test_utils::age_file(&old_big, 400)?;

        let global = global_args(tmp.path());

        let scan_output = tmp.path().join("scan_report.json");
        cmd_scan::run(
            &global,
            &cmd_scan::CmdArgs {
                roots: vec![root.clone()],
                follow_symlinks: false,
                no_hidden: false,
                output: scan_output,
            },
            &CancelToken::new(),
        )?;

        let old_output = tmp.path().join("old_report.json");
        cmd_old::run(
            &global,
            &cmd_old::CmdArgs {
                scan_opts: ScanOpts {
                    roots: vec![root.clone()],
                    scan: false,
                    snapshot_id: None,
                    follow_symlinks: false,
                    no_hidden: false,
                },
                days: 180,
                limit: 100,
                output: old_output.clone(),
            },
            &CancelToken::new(),
        )?;

        let report = test_utils::read_report(&old_output)?;
        assert_eq!(report["count"], 1);
        assert_eq!(
            report["items"][0]["path"],
            old_big.canonicalize()?.to_string_lossy().as_ref()
        );

        let large_output = tmp.path().join("large_report.json");
        cmd_large::run(
            &global,
            &cmd_large::CmdArgs {
                scan_opts: ScanOpts {
                    roots: vec![root],
                    scan: false,
                    snapshot_id: None,
                    follow_symlinks: false,
                    no_hidden: false,
                },
                min_size: "1MB".to_string(),
                limit: 100,
                output: large_output.clone(),
            },
            &CancelToken::new(),
        )?;

        let report = test_utils::read_report(&large_output)?;
        assert_eq!(report["count"], 2);
        assert_eq!(report["threshold_bytes"], size::MiB);
        Ok(())
    }
}
