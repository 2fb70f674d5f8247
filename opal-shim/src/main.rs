//! `opal-shim`: a relocatable launcher for an installed MPI tree
//!
//! Installed as `<prefix>/bin/<tool>`, the shim finds its own executable, derives `<prefix>` from
//! it, exports it as `OPAL_PREFIX` and replaces itself with `<prefix>/bin/opal_wrapper`, passing
//! all arguments through unchanged. The tree can therefore be moved anywhere without
//! reconfiguration. See [`config`] for the build-time settings.
//!
//! Only a failure to execute the target changes the outcome. Failures of the earlier steps are
//! logged (set `OPAL_SHIM_LOG=debug` to see them) and the next step runs on whatever was obtained.

// Self-path discovery, one backend per platform
#[cfg(any(target_os = "linux", target_os = "android"))]
#[path = "linux.rs"]
mod platform;

#[cfg(any(target_os = "macos", target_os = "ios"))]
#[path = "macos.rs"]
mod platform;

#[cfg(target_os = "freebsd")]
#[path = "freebsd.rs"]
mod platform;

#[cfg(any(target_os = "netbsd", target_os = "dragonfly"))]
#[path = "netbsd.rs"]
mod platform;

#[cfg(any(target_os = "solaris", target_os = "illumos"))]
#[path = "solaris.rs"]
mod platform;

#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "dragonfly",
    target_os = "solaris",
    target_os = "illumos",
)))]
compile_error!("opal-shim cannot determine its own executable path on this platform");

#[cfg(any(
    target_os = "linux",
    target_os = "android",
    target_os = "netbsd",
    target_os = "dragonfly"
))]
mod proc_link;

mod config;
mod dispatch;
mod error;
mod path_buf;
mod prefix;

use std::io::Write;

use env_logger::Env;
use log::{debug, error, warn};

use crate::path_buf::PathBuffer;

fn init_logging() {
    env_logger::Builder::from_env(Env::default().filter_or(config::LOG_VAR, config::LOG_DEFAULT))
        .format(|buf, record| {
            writeln!(
                buf,
                "{}: {:<5}: {}",
                record.module_path().unwrap_or("opal_shim"),
                record.level(),
                record.args()
            )
        })
        .init();
}

fn main() {
    init_logging();

    let mut exe = PathBuffer::new();
    match platform::current_exe(&mut exe) {
        Ok(()) => debug!("Running as '{}'", exe.as_path().display()),
        Err(error) => warn!("{error}"),
    }

    let mut install_prefix = PathBuffer::new();
    match prefix::resolve(&exe, &mut install_prefix) {
        Ok(()) => debug!(
            "Installation prefix is '{}'",
            install_prefix.as_path().display()
        ),
        Err(error) => warn!("{error}"),
    }
    if install_prefix.is_empty() {
        warn!("Installation prefix is empty");
    }

    // Still single-threaded here, which setenv requires
    match prefix::publish(config::PREFIX_VAR, &install_prefix) {
        Ok(()) => debug!(
            "Exported {}={}",
            config::PREFIX_VAR,
            install_prefix.as_path().display()
        ),
        Err(error) => warn!("{error}"),
    }

    let error = dispatch::exec_target(&install_prefix, config::TARGET_NAME, std::env::args_os());
    error!("{error}");
    std::process::exit(config::EXEC_FAILURE_STATUS);
}
