//! Test runner for opal-shim
//!
//! This test runner validates the shim against real binaries by:
//! 1. Laying out an installation tree `<prefix>/bin/` in a work directory
//! 2. Installing the shim under a tool name and `print-env` as the target
//! 3. Running the shim in various ways and checking what `print-env` reports
//!
//! Usage: test-runner --shim <path> --target <path> [--work-dir <dir>]
//!
//! Unlike the cargo integration tests of the shim, the target here is a compiled binary, so
//! argument 0 can be checked as well.

use std::collections::HashMap;
use std::fs;
use std::os::unix::fs::{symlink, PermissionsExt};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitCode};

use anyhow::{bail, ensure, Context, Result};
use clap::Parser;

/// Name of the shim inside the installation tree
const TOOL_NAME: &str = "mpicc";

/// Exit status of the shim when the target can't be executed
const EXEC_FAILURE_STATUS: i32 = 255;

/// Test configuration
#[derive(Debug, Parser)]
#[command(about = "End-to-end tests for opal-shim")]
struct TestConfig {
    /// Path to the opal-shim binary
    #[arg(long)]
    shim: PathBuf,
    /// Path to the print-env binary, installed as the target
    #[arg(long)]
    target: PathBuf,
    /// File name the shim was built to launch
    #[arg(long, default_value = "opal_wrapper")]
    target_name: String,
    /// Environment variable the shim was built to export
    #[arg(long, default_value = "OPAL_PREFIX")]
    prefix_var: String,
    /// Working directory for test artifacts (default: temp dir)
    #[arg(long)]
    work_dir: Option<PathBuf>,
}

/// An installation tree for a test
struct Installation {
    /// The installation prefix, containing `bin/`
    prefix: PathBuf,
}

/// What `print-env` saw
struct TargetReport {
    argv: Vec<String>,
    env: HashMap<String, String>,
}

impl TestConfig {
    fn validate(&self) -> Result<()> {
        ensure!(self.shim.exists(), "Shim not found: {}", self.shim.display());
        ensure!(self.target.exists(), "Target not found: {}", self.target.display());
        Ok(())
    }

    fn work_dir(&self) -> PathBuf {
        self.work_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("opal-shim-tests"))
    }
}

impl Installation {
    /// Create `<base_dir>/<name>/bin/` holding the shim and, if requested, the target
    fn new(config: &TestConfig, base_dir: &Path, name: &str, with_target: bool) -> Result<Self> {
        let installation = Self {
            prefix: base_dir.join(name),
        };
        let bin_dir = installation.bin_dir();
        fs::create_dir_all(&bin_dir)
            .with_context(|| format!("Failed to create {}", bin_dir.display()))?;

        install_executable(&config.shim, &installation.shim())?;
        if with_target {
            install_executable(&config.target, &bin_dir.join(&config.target_name))?;
        }

        Ok(installation)
    }

    fn bin_dir(&self) -> PathBuf {
        self.prefix.join("bin")
    }

    fn shim(&self) -> PathBuf {
        self.bin_dir().join(TOOL_NAME)
    }

    fn canonical_prefix(&self) -> Result<String> {
        canonical_string(&self.prefix)
    }
}

impl TargetReport {
    fn parse(stdout: &str) -> Result<Self> {
        let mut argc = None;
        let mut argv = Vec::new();
        let mut env = HashMap::new();

        for line in stdout.lines() {
            if let Some(value) = line.strip_prefix("ARGC:") {
                argc = Some(value.parse::<usize>().context("Invalid ARGC line")?);
            } else if let Some(entry) = line.strip_prefix("ALL_ENV:") {
                if let Some((key, value)) = entry.split_once('=') {
                    env.insert(key.to_owned(), value.to_owned());
                }
            } else if let Some(rest) = line.strip_prefix("ARG") {
                if let Some((_, arg)) = rest.split_once(':') {
                    argv.push(arg.to_owned());
                }
            }
        }

        match argc {
            Some(argc) if argc == argv.len() => Ok(Self { argv, env }),
            Some(argc) => bail!("Target reported ARGC:{argc} but {} arguments", argv.len()),
            None => bail!("Target output has no ARGC line: {stdout}"),
        }
    }

    fn var(&self, name: &str) -> Option<&str> {
        self.env.get(name).map(String::as_str)
    }
}

fn install_executable(source: &Path, dest: &Path) -> Result<()> {
    fs::copy(source, dest)
        .with_context(|| format!("Failed to copy {} to {}", source.display(), dest.display()))?;

    let mut perms = fs::metadata(dest)
        .with_context(|| format!("Failed to get permissions of {}", dest.display()))?
        .permissions();
    perms.set_mode(0o755);
    fs::set_permissions(dest, perms)
        .with_context(|| format!("Failed to set permissions of {}", dest.display()))
}

fn canonical_string(path: &Path) -> Result<String> {
    let canonical = fs::canonicalize(path)
        .with_context(|| format!("Failed to canonicalize {}", path.display()))?;
    Ok(canonical.to_string_lossy().into_owned())
}

/// Run the shim and capture what the target reported
fn run_shim(program: &Path, args: &[&str], env: &[(&str, &str)]) -> Result<TargetReport> {
    let mut cmd = Command::new(program);
    cmd.args(args);
    for (key, value) in env {
        cmd.env(key, value);
    }

    let output = cmd
        .output()
        .with_context(|| format!("Failed to run {}", program.display()))?;
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    if !output.status.success() {
        bail!("Shim failed with {}: {}", output.status, stderr);
    }

    TargetReport::parse(&stdout)
}

fn expect_prefix(config: &TestConfig, report: &TargetReport, expected: &str) -> Result<()> {
    match report.var(&config.prefix_var) {
        Some(actual) if actual == expected => Ok(()),
        Some(actual) => bail!(
            "{} is '{}', expected '{}'",
            config.prefix_var,
            actual,
            expected
        ),
        None => bail!("{} is not set in the target", config.prefix_var),
    }
}

/// Test: argument vector arrives verbatim, argument 0 included
fn test_argument_passthrough(config: &TestConfig, work_dir: &Path) -> Result<()> {
    println!("  Running test: argument_passthrough");

    let installation = Installation::new(config, work_dir, "passthrough", true)?;
    let shim = installation.shim();
    let args = ["-O2", "hello world.c", "", "--flag=a=b", "-o", "hello"];

    let report = run_shim(&shim, &args, &[])?;

    let mut expected = vec![shim.to_string_lossy().into_owned()];
    expected.extend(args.iter().map(|arg| arg.to_string()));
    ensure!(
        report.argv == expected,
        "Unexpected argv {:?}, expected {:?}",
        report.argv,
        expected
    );

    println!("    PASS");
    Ok(())
}

/// Test: the prefix variable points at the canonical installation prefix
fn test_prefix_export(config: &TestConfig, work_dir: &Path) -> Result<()> {
    println!("  Running test: prefix_export");

    let installation = Installation::new(config, work_dir, "export", true)?;

    let report = run_shim(&installation.shim(), &[], &[])?;
    expect_prefix(config, &report, &installation.canonical_prefix()?)?;

    println!("    PASS");
    Ok(())
}

/// Test: a stale value from the parent environment is replaced
fn test_stale_prefix_override(config: &TestConfig, work_dir: &Path) -> Result<()> {
    println!("  Running test: stale_prefix_override");

    let installation = Installation::new(config, work_dir, "stale", true)?;

    let report = run_shim(
        &installation.shim(),
        &[],
        &[(config.prefix_var.as_str(), "/stale/prefix")],
    )?;
    expect_prefix(config, &report, &installation.canonical_prefix()?)?;

    println!("    PASS");
    Ok(())
}

/// Test: invoking through a symlink from elsewhere still finds the real prefix
fn test_symlinked_invocation(config: &TestConfig, work_dir: &Path) -> Result<()> {
    println!("  Running test: symlinked_invocation");

    let installation = Installation::new(config, work_dir, "symlinked", true)?;
    let link_dir = work_dir.join("symlinked-links");
    fs::create_dir_all(&link_dir).context("Failed to create link dir")?;
    let link = link_dir.join(TOOL_NAME);
    symlink(installation.shim(), &link).context("Failed to create symlink")?;

    let report = run_shim(&link, &["--showme"], &[])?;
    expect_prefix(config, &report, &installation.canonical_prefix()?)?;

    // Argument 0 is the name we were invoked as, not the resolved path
    let expected = [link.to_string_lossy().into_owned(), "--showme".to_owned()];
    ensure!(
        report.argv == expected,
        "Unexpected argv {:?}, expected {:?}",
        report.argv,
        expected
    );

    println!("    PASS");
    Ok(())
}

/// Test: moving the whole tree moves the exported prefix with it
fn test_relocated_tree(config: &TestConfig, work_dir: &Path) -> Result<()> {
    println!("  Running test: relocated_tree");

    let installation = Installation::new(config, work_dir, "before-move", true)?;
    let moved = work_dir.join("after-move");
    fs::rename(&installation.prefix, &moved).context("Failed to move installation")?;
    let installation = Installation { prefix: moved };

    let report = run_shim(&installation.shim(), &[], &[])?;
    expect_prefix(config, &report, &installation.canonical_prefix()?)?;

    println!("    PASS");
    Ok(())
}

/// Test: a missing target makes the shim fail
fn test_missing_target(config: &TestConfig, work_dir: &Path) -> Result<()> {
    println!("  Running test: missing_target");

    let installation = Installation::new(config, work_dir, "missing", false)?;

    let output = Command::new(installation.shim())
        .arg("-c")
        .output()
        .context("Failed to run shim")?;

    ensure!(
        output.status.code() == Some(EXEC_FAILURE_STATUS),
        "Expected exit code {}, got {}",
        EXEC_FAILURE_STATUS,
        output.status
    );

    println!("    PASS");
    Ok(())
}

fn main() -> ExitCode {
    println!("=== opal-shim Test Suite ===");
    println!();

    let config = TestConfig::parse();
    if let Err(e) = config.validate() {
        eprintln!("Error: {:#}", e);
        return ExitCode::from(1);
    }
    let work_dir = config.work_dir();

    // Clean and recreate work directory
    if work_dir.exists() {
        if let Err(e) = fs::remove_dir_all(&work_dir) {
            eprintln!("Warning: Failed to clean work dir: {}", e);
        }
    }
    if let Err(e) = fs::create_dir_all(&work_dir) {
        eprintln!("Error: Failed to create work dir: {}", e);
        return ExitCode::from(1);
    }

    println!("Configuration:");
    println!("  Shim:        {}", config.shim.display());
    println!("  Target:      {}", config.target.display());
    println!("  Target name: {}", config.target_name);
    println!("  Prefix var:  {}", config.prefix_var);
    println!("  Work dir:    {}", work_dir.display());
    println!();

    let tests: Vec<(&str, fn(&TestConfig, &Path) -> Result<()>)> = vec![
        ("argument_passthrough", test_argument_passthrough),
        ("prefix_export", test_prefix_export),
        ("stale_prefix_override", test_stale_prefix_override),
        ("symlinked_invocation", test_symlinked_invocation),
        ("relocated_tree", test_relocated_tree),
        ("missing_target", test_missing_target),
    ];

    let mut passed = 0;
    let mut failed = 0;

    println!("Running {} tests...", tests.len());
    println!();

    for (name, test_fn) in &tests {
        match test_fn(&config, &work_dir) {
            Ok(()) => {
                passed += 1;
            }
            Err(e) => {
                println!("  FAILED ({}): {:#}", name, e);
                failed += 1;
            }
        }
    }

    println!();
    println!("=== Results ===");
    println!("Passed: {}", passed);
    println!("Failed: {}", failed);
    println!();

    if failed > 0 {
        ExitCode::from(1)
    } else {
        println!("All tests passed!");
        ExitCode::SUCCESS
    }
}
