//! FreeBSD: ask the kernel process table for our own image path

use std::io;
use std::ptr;

use crate::error::ShimError;
use crate::path_buf::{PathBuffer, Written};

pub fn current_exe(buf: &mut PathBuffer) -> Result<(), ShimError> {
    // -1 selects the calling process
    let mib = [libc::CTL_KERN, libc::KERN_PROC, libc::KERN_PROC_PATHNAME, -1];

    buf.fill_with(|dest, capacity| {
        let mut size: libc::size_t = capacity;
        // SAFETY: `dest` is valid for `size` bytes and `mib` for its length
        let ret = unsafe {
            libc::sysctl(
                mib.as_ptr(),
                mib.len() as libc::c_uint,
                dest.cast(),
                &mut size,
                ptr::null(),
                0,
            )
        };
        if ret != 0 {
            return Err(ShimError::SelfPath(io::Error::last_os_error()));
        }
        Ok(Written::NulTerminated)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_exe_is_the_test_binary() {
        let mut buf = PathBuffer::new();
        current_exe(&mut buf).unwrap();

        assert_eq!(buf.as_path(), std::env::current_exe().unwrap());
    }
}
