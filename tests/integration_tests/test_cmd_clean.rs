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
    use std::path::{Path, PathBuf};

    use anyhow::{Context, Result};
    use tempfile::tempdir;
    use urraca::{
        commands::{GlobalArgs, ScanOpts, cmd_clean, cmd_scan, cmd_undo},
        progress::CancelToken,
    };

    use crate::{integration_tests::global_args, test_utils};

    struct CleanFixture {
        root: PathBuf,
        quarantine: PathBuf,
        global: GlobalArgs,
        _tmp: tempfile::TempDir,
        report_dir: PathBuf,
    }

    fn fixture() -> Result<CleanFixture> {
        let tmp = tempdir()?;
        let root = tmp.path().join("demo");
        test_utils::write_file(&root.join("app.log"), b"line one\nline two\n")?;
        test_utils::write_file(&root.join("a.tmp"), b"scratch")?;
        test_utils::write_file(&root.join("notes.txt"), b"do not touch")?;

        let global = global_args(tmp.path());
        cmd_scan::run(
            &global,
            &cmd_scan::CmdArgs {
                roots: vec![root.clone()],
                follow_symlinks: false,
                no_hidden: false,
                output: tmp.path().join("scan_report.json"),
            },
            &CancelToken::new(),
        )
        .with_context(|| "Failed to run cmd_scan")?;

        Ok(CleanFixture {
            root,
            quarantine: tmp.path().join("quarantine"),
            global,
            report_dir: tmp.path().to_path_buf(),
            _tmp: tmp,
        })
    }

    fn clean_args(fix: &CleanFixture, output: &Path) -> cmd_clean::CmdArgs {
        cmd_clean::CmdArgs {
            scan_opts: ScanOpts {
                roots: vec![fix.root.clone()],
                scan: false,
                snapshot_id: None,
                follow_symlinks: false,
                no_hidden: false,
            },
            mode: cmd_clean::Mode::LogsTemp,
            min_size: "1GB".to_string(),
            days: 180,
            limit: 2000,
            path_list: None,
            execute: false,
            confirm: false,
            yes: true,
            force_high_risk: false,
            no_quarantine: false,
            quarantine_dir: Some(fix.quarantine.clone()),
            output: output.to_path_buf(),
        }
    }

    // Dry run counts the log and temp files but touches nothing.
    #[test]
    fn test_clean_dry_run() -> Result<()> {
        let fix = fixture()?;
        let output = fix.report_dir.join("cleanup_report.json");

        cmd_clean::run(&fix.global, &clean_args(&fix, &output), &CancelToken::new())?;

        let report = test_utils::read_report(&output)?;
        assert_eq!(report["status"], "ok");
        assert_eq!(report["candidate_count"], 2);

        let cleanup = &report["cleanup"];
        assert_eq!(cleanup["dry_run"], true);
        assert_eq!(cleanup["deleted_or_quarantined"], 2);
        assert_eq!(cleanup["failed"], 0);

        let items = cleanup["items"].as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i["status"] == "dry-run"));
        assert!(
            !items
                .iter()
                .any(|i| i["path"].as_str().unwrap().ends_with("notes.txt"))
        );

        assert!(fix.root.join("app.log").exists());
        assert!(fix.root.join("a.tmp").exists());
        assert!(fix.root.join("notes.txt").exists());
        assert!(!fix.quarantine.exists());
        Ok(())
    }

    // Destructive run quarantines exactly the dry-run's paths; undo
    // brings everything back intact.
    #[test]
    fn test_clean_execute_and_undo() -> Result<()> {
        let fix = fixture()?;
        let log_content = std::fs::read(fix.root.join("app.log"))?;

        let dry_output = fix.report_dir.join("dry_run_report.json");
        cmd_clean::run(&fix.global, &clean_args(&fix, &dry_output), &CancelToken::new())?;
        let dry_report = test_utils::read_report(&dry_output)?;
        let mut dry_paths: Vec<String> = dry_report["cleanup"]["items"]
            .as_array()
            .unwrap()
            .iter()
            .map(|i| i["path"].as_str().unwrap().to_string())
            .collect();
        dry_paths.sort();

        let output = fix.report_dir.join("cleanup_report.json");
        let mut args = clean_args(&fix, &output);
        args.execute = true;
        args.confirm = true;
        cmd_clean::run(&fix.global, &args, &CancelToken::new())?;

        let report = test_utils::read_report(&output)?;
        let cleanup = &report["cleanup"];

        let mut acted_paths: Vec<String> = cleanup["items"]
            .as_array()
            .unwrap()
            .iter()
            .map(|i| i["path"].as_str().unwrap().to_string())
            .collect();
        acted_paths.sort();
        assert_eq!(acted_paths, dry_paths);
        let action_id = cleanup["action_id"].as_str().unwrap().to_string();
        assert_eq!(cleanup["deleted_or_quarantined"], 2);

        assert!(!fix.root.join("app.log").exists());
        assert!(!fix.root.join("a.tmp").exists());
        assert!(fix.root.join("notes.txt").exists());

        // Quarantined copies live under <quarantine>/<action_id>/...
        let items = cleanup["items"].as_array().unwrap();
        for item in items {
            assert_eq!(item["status"], "quarantined");
            let quarantine_path = PathBuf::from(item["quarantine_path"].as_str().unwrap());
            assert!(quarantine_path.exists());
            assert!(quarantine_path.starts_with(fix.quarantine.join(&action_id)));
        }

        let undo_output = fix.report_dir.join("undo_report.json");
        cmd_undo::run(
            &fix.global,
            &cmd_undo::CmdArgs {
                action_id: action_id.clone(),
                yes: true,
                output: undo_output.clone(),
            },
            &CancelToken::new(),
        )?;

        let undo_report = test_utils::read_report(&undo_output)?;
        assert_eq!(undo_report["undo"]["restored"], 2);
        assert_eq!(undo_report["undo"]["failed"], 0);

        assert!(fix.root.join("app.log").exists());
        assert!(fix.root.join("a.tmp").exists());
        assert_eq!(std::fs::read(fix.root.join("app.log"))?, log_content);
        Ok(())
    }

    // Containment: a path outside the allowed roots is skipped unread.
    #[test]
    fn test_clean_skips_targets_outside_roots() -> Result<()> {
        let fix = fixture()?;
        let list_file = fix.report_dir.join("targets.txt");
        std::fs::write(&list_file, "/etc/hosts\n")?;

        let output = fix.report_dir.join("cleanup_report.json");
        let mut args = clean_args(&fix, &output);
        args.mode = cmd_clean::Mode::PathList;
        args.path_list = Some(list_file);
        cmd_clean::run(&fix.global, &args, &CancelToken::new())?;

        let report = test_utils::read_report(&output)?;
        let items = report["cleanup"]["items"].as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["status"], "skipped");
        assert_eq!(items[0]["reason"], "outside_allowed_roots");
        assert!(Path::new("/etc/hosts").exists());
        Ok(())
    }

    // Destructive mode without --confirm is rejected before any work.
    #[test]
    fn test_clean_execute_requires_confirm() -> Result<()> {
        let fix = fixture()?;
        let output = fix.report_dir.join("cleanup_report.json");
        let mut args = clean_args(&fix, &output);
        args.execute = true;
        args.confirm = false;

        assert!(cmd_clean::run(&fix.global, &args, &CancelToken::new()).is_err());
        assert!(fix.root.join("app.log").exists());
        Ok(())
    }
}
