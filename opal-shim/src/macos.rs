//! macOS and iOS: dyld knows the path the executable was loaded from

use crate::error::ShimError;
use crate::path_buf::{PathBuffer, Written};

/// The path may still contain symbolic links or `..`; [`crate::prefix::resolve`] cleans it up.
pub fn current_exe(buf: &mut PathBuffer) -> Result<(), ShimError> {
    buf.fill_with(|dest, capacity| {
        let mut size = u32::try_from(capacity).unwrap_or(u32::MAX);
        // SAFETY: `dest` is valid for `capacity` >= `size` bytes
        let ret = unsafe { libc::_NSGetExecutablePath(dest, &mut size) };
        if ret != 0 {
            // `size` now holds the required length
            return Err(ShimError::PathTooLong { capacity });
        }
        Ok(Written::NulTerminated)
    })
}
