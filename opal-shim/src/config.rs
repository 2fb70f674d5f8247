//! Build-time configuration
//!
//! The shim takes no options at runtime. What it launches and which variable it exports are baked
//! in when it is compiled:
//!
//! * `OPAL_SHIM_TARGET`: file name of the real executable in `<prefix>/bin/` (default
//!   `opal_wrapper`)
//! * `OPAL_SHIM_PREFIX_VAR`: name of the exported installation prefix variable (default
//!   `OPAL_PREFIX`)
//!
//! For example `OPAL_SHIM_TARGET=mpicc-real cargo build --release` produces a shim that launches
//! `<prefix>/bin/mpicc-real`.

/// The executable in `<prefix>/bin/` the shim replaces itself with
pub const TARGET_NAME: &str = match option_env!("OPAL_SHIM_TARGET") {
    Some(name) => name,
    None => "opal_wrapper",
};

/// The environment variable receiving the installation prefix
pub const PREFIX_VAR: &str = match option_env!("OPAL_SHIM_PREFIX_VAR") {
    Some(name) => name,
    None => "OPAL_PREFIX",
};

/// The `env_logger` filter variable. Logging is off unless this is set.
pub const LOG_VAR: &str = "OPAL_SHIM_LOG";
pub const LOG_DEFAULT: &str = "off";

/// Appended to the directory of the running executable to reach the installation prefix
pub const PARENT_SEGMENT: &str = "/..";
/// Joins the installation prefix and [`TARGET_NAME`]
pub const BIN_SEGMENT: &str = "/bin/";

/// Our exit status if the target could not be executed (`execv` returning `-1`)
pub const EXEC_FAILURE_STATUS: i32 = 255;

/// Return true if `name` is non-empty and contains neither NUL nor any of the `forbidden` bytes
pub const fn is_valid_name(name: &str, forbidden: &[u8]) -> bool {
    let bytes = name.as_bytes();
    if bytes.is_empty() {
        return false;
    }

    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == 0 {
            return false;
        }
        let mut j = 0;
        while j < forbidden.len() {
            if bytes[i] == forbidden[j] {
                return false;
            }
            j += 1;
        }
        i += 1;
    }
    true
}

const _: () = assert!(
    is_valid_name(TARGET_NAME, b"/"),
    "OPAL_SHIM_TARGET must be a non-empty file name without '/'"
);
const _: () = assert!(
    is_valid_name(PREFIX_VAR, b"="),
    "OPAL_SHIM_PREFIX_VAR must be a non-empty variable name without '='"
);
