//! Run the shim from throwaway installation trees and check what the target gets to see
//!
//! The target is a shell script printing its arguments (not argument 0, which the kernel replaces
//! when it starts an interpreter) and the exported prefix. The `test-runner` in
//! `integration-tests` covers argument 0 with a compiled target.

use std::fs;
use std::os::unix::fs::{symlink, PermissionsExt};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

const SHIM: &str = env!("CARGO_BIN_EXE_opal-shim");
const LOG_VAR: &str = "OPAL_SHIM_LOG";

const TARGET_NAME: &str = match option_env!("OPAL_SHIM_TARGET") {
    Some(name) => name,
    None => "opal_wrapper",
};
const PREFIX_VAR: &str = match option_env!("OPAL_SHIM_PREFIX_VAR") {
    Some(name) => name,
    None => "OPAL_PREFIX",
};

/// A `<prefix>/bin/` tree holding a copy of the shim named `mpicc`
struct Installation {
    root: TempDir,
    prefix: PathBuf,
}

/// What the target script reported
#[derive(Debug)]
struct Report {
    args: Vec<String>,
    prefix: String,
}

impl Installation {
    fn new() -> Self {
        let root = TempDir::new().unwrap();
        let prefix = root.path().join("ompi");
        let installation = Self { root, prefix };

        fs::create_dir_all(installation.bin_dir()).unwrap();
        fs::copy(SHIM, installation.shim()).unwrap();
        make_executable(&installation.shim());
        installation
    }

    fn with_target(self) -> Self {
        let script = format!(
            "#!/bin/sh\nfor arg in \"$@\"; do printf 'ARG:%s\\n' \"$arg\"; done\nprintf \
             'PREFIX:%s\\n' \"${{{PREFIX_VAR}-<unset>}}\"\n"
        );
        let target = self.bin_dir().join(TARGET_NAME);
        fs::write(&target, script).unwrap();
        make_executable(&target);
        self
    }

    fn bin_dir(&self) -> PathBuf {
        self.prefix.join("bin")
    }

    fn shim(&self) -> PathBuf {
        self.bin_dir().join("mpicc")
    }

    fn canonical_prefix(&self) -> String {
        fs::canonicalize(&self.prefix)
            .unwrap()
            .to_string_lossy()
            .into_owned()
    }
}

fn make_executable(path: &Path) {
    let mut perms = fs::metadata(path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).unwrap();
}

fn command(program: &Path) -> Command {
    let mut cmd = Command::new(program);
    cmd.env_remove(LOG_VAR);
    cmd
}

fn run(cmd: &mut Command) -> Report {
    let output = cmd.output().unwrap();
    assert!(
        output.status.success(),
        "shim failed with {}: {}",
        output.status,
        String::from_utf8_lossy(&output.stderr)
    );
    parse_report(&output)
}

fn parse_report(output: &Output) -> Report {
    let stdout = String::from_utf8(output.stdout.clone()).unwrap();
    let mut args = Vec::new();
    let mut prefix = None;

    for line in stdout.lines() {
        if let Some(arg) = line.strip_prefix("ARG:") {
            args.push(arg.to_owned());
        } else if let Some(value) = line.strip_prefix("PREFIX:") {
            prefix = Some(value.to_owned());
        }
    }

    Report {
        args,
        prefix: prefix.expect("target did not report the prefix"),
    }
}

#[test]
fn test_arguments_are_passed_through_unchanged() {
    let installation = Installation::new().with_target();
    let args = ["-O2", "hello world.c", "", "-DNAME=a b", "-o", "hello"];

    let report = run(command(&installation.shim()).args(args));

    assert_eq!(report.args, args);
}

#[test]
fn test_without_arguments() {
    let installation = Installation::new().with_target();

    let report = run(&mut command(&installation.shim()));

    assert!(report.args.is_empty());
}

#[test]
fn test_prefix_is_exported() {
    let installation = Installation::new().with_target();

    let report = run(&mut command(&installation.shim()));

    assert_eq!(report.prefix, installation.canonical_prefix());
}

#[test]
fn test_inherited_prefix_is_overwritten() {
    let installation = Installation::new().with_target();

    let report = run(command(&installation.shim()).env(PREFIX_VAR, "/stale/prefix"));

    assert_eq!(report.prefix, installation.canonical_prefix());
}

#[test]
fn test_symlinked_invocation_resolves_real_prefix() {
    let installation = Installation::new().with_target();
    let elsewhere = installation.root.path().join("elsewhere");
    fs::create_dir(&elsewhere).unwrap();
    let link = elsewhere.join("mpicc");
    symlink(installation.shim(), &link).unwrap();

    let report = run(command(&link).arg("--showme"));

    assert_eq!(report.prefix, installation.canonical_prefix());
    assert_eq!(report.args, ["--showme"]);
}

#[test]
fn test_moved_tree_follows_new_location() {
    let installation = Installation::new().with_target();
    let moved = installation.root.path().join("relocated");
    fs::rename(&installation.prefix, &moved).unwrap();

    let report = run(&mut command(&moved.join("bin/mpicc")));

    assert_eq!(
        report.prefix,
        fs::canonicalize(&moved).unwrap().to_string_lossy()
    );
}

#[test]
fn test_missing_target_fails_silently() {
    let installation = Installation::new();

    let output = command(&installation.shim()).arg("-c").output().unwrap();

    assert_eq!(output.status.code(), Some(255));
    assert!(output.stdout.is_empty());
    assert!(
        output.stderr.is_empty(),
        "unexpected stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn test_missing_target_is_logged_on_request() {
    let installation = Installation::new();
    let target = fs::canonicalize(installation.bin_dir())
        .unwrap()
        .join(TARGET_NAME);

    let output = command(&installation.shim())
        .env(LOG_VAR, "debug")
        .output()
        .unwrap();

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(output.status.code(), Some(255));
    assert!(stderr.contains("unable to execute"), "stderr: {stderr}");
    assert!(stderr.contains(&*target.to_string_lossy()), "stderr: {stderr}");
    assert!(stderr.contains(&format!("Exported {PREFIX_VAR}=")), "stderr: {stderr}");
}
