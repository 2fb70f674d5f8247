//! Installation prefix resolution and export

use std::ffi::CString;
use std::io;

use crate::config::PARENT_SEGMENT;
use crate::error::ShimError;
use crate::path_buf::{PathBuffer, Written};

/// The directory part of `path` with POSIX `dirname(3)` semantics
///
/// Trailing slashes are ignored and the last segment is removed. A path without any slash yields
/// `.`, a path directly below the root yields `/`.
pub fn dirname(path: &[u8]) -> &[u8] {
    let mut end = path.len();
    while end > 1 && path[end - 1] == b'/' {
        end -= 1;
    }
    let path = &path[..end];

    match path.iter().rposition(|&b| b == b'/') {
        None => b".",
        Some(slash) => {
            let mut end = slash;
            while end > 0 && path[end - 1] == b'/' {
                end -= 1;
            }
            if end == 0 {
                b"/"
            } else {
                &path[..end]
            }
        }
    }
}

/// Compute the installation prefix of the executable at `exe` into `out`
///
/// This is the canonical form of `dirname(exe)/..`. If canonicalization fails, `out` holds the
/// joined but unresolved path and the error is returned.
pub fn resolve(exe: &PathBuffer, out: &mut PathBuffer) -> Result<(), ShimError> {
    let mut parent = PathBuffer::new();
    parent.push(dirname(exe.as_bytes()))?;
    parent.push(PARENT_SEGMENT.as_bytes())?;

    canonicalize(&parent, out)
}

/// Resolve `.`, `..` and symbolic links in `path` with `realpath(3)`
pub fn canonicalize(path: &PathBuffer, out: &mut PathBuffer) -> Result<(), ShimError> {
    let result = out.fill_with(|resolved, _| {
        // SAFETY: `resolved` is valid for CAPACITY > PATH_MAX bytes as realpath requires
        let ret = unsafe { libc::realpath(path.as_c_str().as_ptr(), resolved) };
        if ret.is_null() {
            Err(ShimError::Canonicalize {
                path: path.as_path().to_path_buf(),
                source: io::Error::last_os_error(),
            })
        } else {
            Ok(Written::NulTerminated)
        }
    });

    if result.is_err() {
        out.replace(path.as_bytes())?;
    }
    result
}

/// Export `prefix` as the environment variable `name`, overwriting any inherited value
///
/// Must only be called while the process is single-threaded.
pub fn publish(name: &str, prefix: &PathBuffer) -> Result<(), ShimError> {
    let key = CString::new(name).map_err(|_| ShimError::InteriorNul)?;

    // SAFETY: both strings are NUL-terminated and no other thread reads the environment
    let ret = unsafe { libc::setenv(key.as_ptr(), prefix.as_c_str().as_ptr(), 1) };
    if ret != 0 {
        return Err(ShimError::SetEnv {
            name: name.to_owned(),
            source: io::Error::last_os_error(),
        });
    }
    Ok(())
}
