//! Replacing the shim with the real executable

use std::ffi::{CString, OsString};
use std::io;
use std::os::unix::ffi::OsStringExt;
use std::ptr;

use libc::c_char;
use log::debug;

use crate::config::BIN_SEGMENT;
use crate::error::ShimError;
use crate::path_buf::PathBuffer;

/// Build `<prefix>/bin/<target>` into `out`
pub fn target_path(prefix: &PathBuffer, target: &str, out: &mut PathBuffer) -> Result<(), ShimError> {
    out.replace(prefix.as_bytes())?;
    out.push(BIN_SEGMENT.as_bytes())?;
    out.push(target.as_bytes())
}

/// Replace the current process image with `<prefix>/bin/<target>`
///
/// `args` is handed over verbatim as the new argument vector, argument 0 included, and the
/// current environment is inherited. Like [`std::os::unix::process::CommandExt::exec`] this only
/// returns if something went wrong.
pub fn exec_target<I>(prefix: &PathBuffer, target: &str, args: I) -> ShimError
where
    I: IntoIterator<Item = OsString>,
{
    let mut path = PathBuffer::new();
    if let Err(error) = target_path(prefix, target, &mut path) {
        return error;
    }

    match to_c_strings(args) {
        Ok(argv) => exec(&path, &argv),
        Err(error) => error,
    }
}

fn to_c_strings<I>(args: I) -> Result<Vec<CString>, ShimError>
where
    I: IntoIterator<Item = OsString>,
{
    args.into_iter()
        .map(|arg| CString::new(arg.into_vec()).map_err(|_| ShimError::InteriorNul))
        .collect()
}

fn exec(path: &PathBuffer, argv: &[CString]) -> ShimError {
    let mut pointers: Vec<*const c_char> = argv.iter().map(|arg| arg.as_ptr()).collect();
    pointers.push(ptr::null());

    debug!(
        "Executing '{}' with arguments {:?}",
        path.as_path().display(),
        argv
    );

    // SAFETY: `path` and every entry of `pointers` are NUL-terminated strings that outlive the
    // call, and `pointers` ends with a null pointer
    unsafe { libc::execv(path.as_c_str().as_ptr(), pointers.as_ptr()) };

    ShimError::Exec {
        path: path.as_path().to_path_buf(),
        source: io::Error::last_os_error(),
    }
}
