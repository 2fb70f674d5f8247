//! Solaris and illumos: `getexecname(3C)` returns the name the image was executed as
//!
//! The name can be relative to the working directory at startup. We never change directory, so
//! [`crate::prefix::resolve`] still canonicalizes it correctly.

use std::ffi::CStr;
use std::io;

use crate::error::ShimError;
use crate::path_buf::PathBuffer;

pub fn current_exe(buf: &mut PathBuffer) -> Result<(), ShimError> {
    // SAFETY: getexecname has no preconditions
    let name = unsafe { libc::getexecname() };
    if name.is_null() {
        buf.clear();
        return Err(ShimError::SelfPath(io::Error::new(
            io::ErrorKind::NotFound,
            "getexecname returned no name",
        )));
    }

    // SAFETY: a non-null result points to a NUL-terminated string owned by the runtime linker
    let name = unsafe { CStr::from_ptr(name) };
    buf.replace(name.to_bytes())
}
