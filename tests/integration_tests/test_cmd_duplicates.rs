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
        commands::{ScanOpts, cmd_duplicates},
        progress::CancelToken,
    };

    use crate::{integration_tests::global_args, test_utils};

    // Two files with identical 100 KiB content and one with different
    // content: exactly one cluster, keep is the older file.
    #[test]
    fn test_duplicates_end_to_end() -> Result<()> {
        let tmp = tempdir()?;
        let root = tmp.path().join("demo");

        let content = test_utils::patterned_bytes(102_400, 42);
        let keep = root.join("a").join("x.bin");
        let remove = root.join("b").join("x.bin");
        let other = root.join("c").join("y.bin");
        test_utils::write_file(&keep, &content)?;
        test_utils::write_file(&remove, &content)?;
        test_utils::write_file(&other, &test_utils::patterned_bytes(102_400, 7))?;
        test_utils::age_file(&keep, 30)?;

        let global = global_args(tmp.path());
        let output = tmp.path().join("duplicates_report.json");

        let args = cmd_duplicates::CmdArgs {
            scan_opts: ScanOpts {
                roots: vec![root],
                scan: true,
                snapshot_id: None,
                follow_symlinks: false,
                no_hidden: false,
            },
            workers: Some(2),
            output: output.clone(),
        };
        cmd_duplicates::run(&global, &args, &CancelToken::new())
            .with_context(|| "Failed to run cmd_duplicates")?;

        let report = test_utils::read_report(&output)?;
        let duplicates = &report["duplicates"];

        assert_eq!(duplicates["cluster_count"], 1);
        assert_eq!(duplicates["potential_waste_bytes"], 102_400);

        let cluster = &duplicates["clusters"][0];
        assert_eq!(cluster["file_count"], 2);
        assert_eq!(cluster["size_each"], 102_400);
        assert_eq!(cluster["potential_waste"], 102_400);
        assert_eq!(
            cluster["keep_path"],
            keep.canonicalize()?.to_string_lossy().as_ref()
        );
        assert_eq!(cluster["remove_paths"].as_array().unwrap().len(), 1);
        assert_eq!(
            cluster["remove_paths"][0],
            remove.canonicalize()?.to_string_lossy().as_ref()
        );
        Ok(())
    }

    #[test]
    fn test_no_duplicates_in_distinct_files() -> Result<()> {
        let tmp = tempdir()?;
        let root = tmp.path().join("demo");
        test_utils::write_file(&root.join("a.bin"), &test_utils::patterned_bytes(4096, 1))?;
        test_utils::write_file(&root.join("b.bin"), &test_utils::patterned_bytes(2048, 2))?;

        let global = global_args(tmp.path());
        let output = tmp.path().join("duplicates_report.json");

        let args = cmd_duplicates::CmdArgs {
            scan_opts: ScanOpts {
                roots: vec![root],
                scan: true,
                snapshot_id: None,
                follow_symlinks: false,
                no_hidden: false,
            },
            workers: Some(1),
            output: output.clone(),
        };
        cmd_duplicates::run(&global, &args, &CancelToken::new())?;

        let report = test_utils::read_report(&output)?;
        assert_eq!(report["duplicates"]["cluster_count"], 0);
        assert_eq!(report["duplicates"]["potential_waste_bytes"], 0);
        Ok(())
    }
}
