mod helpers;

use std::fs;
use std::sync::Arc;

use anyhow::Result;
use camino::{Utf8Path, Utf8PathBuf};
use helpers::{MockExecutor, MountTable, context};
use instsource::cli::{
    ExportArgs, LogLevel, SetupArgs, SourceArgs, StatusArgs, TeardownArgs, ValidateArgs,
};
use instsource::config::load_profile;
use instsource::privilege::PrivilegeMethod;
use instsource::repo::RepoType;

const NFS_PROFILE: &str = "\
nfs:
  server: nfs.example.com
  dir: /export/data
  opts: vers=4
lang: en_US.UTF-8
";

struct Workspace {
    _dir: tempfile::TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        Self { _dir: dir, root }
    }

    fn profile(&self, text: &str) -> Utf8PathBuf {
        let path = self.root.join("profile.yaml");
        fs::write(&path, text).unwrap();
        path
    }

    fn source_args(&self, file: &Utf8Path) -> SourceArgs {
        SourceArgs {
            file: file.to_owned(),
            mount_point: Some(self.root.join("source")),
            mount_root: self.root.join("sources"),
            log_level: LogLevel::Info,
        }
    }
}

fn setup_args(source: SourceArgs) -> SetupArgs {
    SetupArgs {
        source,
        privilege: None,
        retries: 1,
        retry_delay: 0,
        dry_run: false,
    }
}

fn teardown_args(source: SourceArgs) -> TeardownArgs {
    TeardownArgs {
        source,
        privilege: None,
        retries: 1,
        retry_delay: 0,
        dry_run: false,
    }
}

#[test]
fn setup_status_teardown_round_trip() -> Result<()> {
    let ws = Workspace::new();
    let file = ws.profile(NFS_PROFILE);
    let table = Arc::new(MountTable::default());
    let executor = Arc::new(MockExecutor::new(table.clone()));

    let repo =
        instsource::run_setup(&setup_args(ws.source_args(&file)), context(&executor, &table))?;
    assert_eq!(repo.url, format!("file://{}", ws.root.join("source")));
    assert_eq!(repo.repo_type, RepoType::Base);

    let status = instsource::run_status(
        &StatusArgs {
            source: ws.source_args(&file),
        },
        context(&executor, &table),
    )?;
    assert_eq!(status.source_type, "NFS");
    assert_eq!(status.state, "READY");
    assert_eq!(status.address, "nfs:nfs.example.com:/export/data:vers=4");
    assert!(status.network_required);

    instsource::run_teardown(&teardown_args(ws.source_args(&file)), context(&executor, &table))?;
    assert!(!table.contains(&ws.root.join("source")));
    assert_eq!(executor.commands(), vec!["mount", "umount"]);
    Ok(())
}

#[test]
fn setup_failure_carries_context() {
    let ws = Workspace::new();
    let file = ws.profile(NFS_PROFILE);
    let table = Arc::new(MountTable::default());
    let executor = Arc::new(MockExecutor::unreachable(table.clone(), 32));

    let mut args = setup_args(ws.source_args(&file));
    args.retries = 2;
    let err = instsource::run_setup(&args, context(&executor, &table)).unwrap_err();
    let message = format!("{:#}", err);
    assert!(message.contains("failed to set up Source(type='NFS'"), "{}", message);
    assert!(message.contains("failed to mount"), "{}", message);
    assert_eq!(executor.commands().len(), 2);
}

#[test]
fn setup_uses_privilege_wrapper() -> Result<()> {
    let ws = Workspace::new();
    let file = ws.profile(NFS_PROFILE);
    let table = Arc::new(MountTable::default());
    let executor = Arc::new(MockExecutor::new(table.clone()));

    let mut args = setup_args(ws.source_args(&file));
    args.privilege = Some(PrivilegeMethod::Sudo);
    instsource::run_setup(&args, context(&executor, &table))?;

    let calls = executor.calls();
    assert_eq!(calls[0].privilege, Some(PrivilegeMethod::Sudo));
    assert_eq!(calls[0].argv().0, "sudo");
    Ok(())
}

#[test]
fn dry_run_setup_mounts_nothing() -> Result<()> {
    let ws = Workspace::new();
    let file = ws.profile(NFS_PROFILE);
    let table = Arc::new(MountTable::default());
    let executor = Arc::new(MockExecutor::dry_run(table.clone()));

    let mut args = setup_args(ws.source_args(&file));
    args.dry_run = true;
    instsource::run_setup(&args, context(&executor, &table))?;

    assert_eq!(executor.commands(), vec!["mount"]);
    assert!(!ws.root.join("source").exists(), "dry run must not create the mount point");
    assert!(!table.contains(&ws.root.join("source")));
    Ok(())
}

#[test]
fn allocated_mount_point_lives_under_mount_root() -> Result<()> {
    let ws = Workspace::new();
    let file = ws.profile("harddrive:\n  partition: sdb1\n  dir: /repo\n");
    let table = Arc::new(MountTable::default());
    let executor = Arc::new(MockExecutor::new(table.clone()));

    let mut source = ws.source_args(&file);
    source.mount_point = None;
    let status = instsource::run_status(&StatusArgs { source }, context(&executor, &table))?;

    assert_eq!(status.source_type, "HDD");
    assert_eq!(status.state, "UNAVAILABLE");
    assert!(status.mount_point.starts_with(ws.root.join("sources")));
    assert!(status.mount_point.as_str().ends_with("-hdd-device"), "{}", status.mount_point);
    Ok(())
}

#[test]
fn validate_reports_address_or_missing_server() -> Result<()> {
    let ws = Workspace::new();
    let file = ws.profile(NFS_PROFILE);
    let address = instsource::run_validate(&ValidateArgs {
        file: file.clone(),
        log_level: LogLevel::Info,
    })?;
    assert_eq!(address, "nfs:nfs.example.com:/export/data:vers=4");

    let file = ws.profile("nfs:\n  dir: /export\n");
    let err = instsource::run_validate(&ValidateArgs {
        file,
        log_level: LogLevel::Info,
    })
    .unwrap_err();
    assert!(format!("{:#}", err).contains("NFS server is missing"), "{:#}", err);
    Ok(())
}

#[test]
fn validate_rejects_profile_without_source() {
    let ws = Workspace::new();
    let file = ws.profile("lang: en_US.UTF-8\n");
    let err = instsource::run_validate(&ValidateArgs {
        file,
        log_level: LogLevel::Info,
    })
    .unwrap_err();
    assert!(format!("{:#}", err).contains("does not define an installation source"), "{:#}", err);
}

#[test]
fn export_marks_section_seen_and_keeps_other_keys() -> Result<()> {
    let ws = Workspace::new();
    let file = ws.profile(NFS_PROFILE);
    let output = ws.root.join("exported.yaml");

    let profile = instsource::run_export(&ExportArgs {
        file: file.clone(),
        output: Some(output.clone()),
        log_level: LogLevel::Info,
    })?;
    assert!(profile.nfs.as_ref().unwrap().seen);

    let written = load_profile(&output)?;
    assert_eq!(written, profile);
    let original = load_profile(&file)?;
    assert_eq!(written.extra, original.extra);
    let nfs = written.nfs.unwrap();
    assert_eq!(nfs.server, "nfs.example.com");
    assert_eq!(nfs.dir, "/export/data");
    assert_eq!(nfs.opts, "vers=4");
    Ok(())
}

#[test]
fn export_keeps_unknown_keys_inside_source_section() -> Result<()> {
    let ws = Workspace::new();
    let file = ws.profile("nfs:\n  server: s\n  dir: /e\n  mirror: keep-me\n");

    let profile = instsource::run_export(&ExportArgs {
        file,
        output: None,
        log_level: LogLevel::Info,
    })?;
    let text = profile.to_yaml()?;
    assert!(text.contains("mirror: keep-me"), "{}", text);
    assert!(text.contains("seen: true"), "{}", text);
    Ok(())
}
