//! Self-path discovery through a procfs symlink to the running image

use std::ffi::CStr;
use std::io;

use crate::error::ShimError;
use crate::path_buf::{PathBuffer, Written};

/// Read the target of `link` into `buf`
///
/// A target filling the whole buffer may have been truncated by `readlink` and is rejected.
pub fn read_link(link: &CStr, buf: &mut PathBuffer) -> Result<(), ShimError> {
    buf.fill_with(|dest, capacity| {
        // SAFETY: `dest` is valid for `capacity` bytes
        let len = unsafe { libc::readlink(link.as_ptr(), dest, capacity) };
        match usize::try_from(len) {
            Err(_) => Err(ShimError::SelfPath(io::Error::last_os_error())),
            Ok(len) if len >= capacity => Err(ShimError::PathTooLong { capacity }),
            Ok(len) => Ok(Written::Bytes(len)),
        }
    })
}

#[cfg(test)]
mod tests {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;
    use std::os::unix::fs::symlink;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_read_link() {
        let root = TempDir::new().unwrap();
        let link = root.path().join("exe");
        symlink("/usr/local/ompi/bin/mpicc", &link).unwrap();
        let link = CString::new(link.as_os_str().as_bytes()).unwrap();

        let mut buf = PathBuffer::new();
        read_link(&link, &mut buf).unwrap();

        assert_eq!(buf.as_bytes(), b"/usr/local/ompi/bin/mpicc");
    }

    #[test]
    fn test_read_link_of_missing_link() {
        let mut buf = PathBuffer::new();

        let error = read_link(c"/this/link/does/not/exist", &mut buf).unwrap_err();

        assert!(matches!(error, ShimError::SelfPath(ref e) if e.kind() == io::ErrorKind::NotFound));
        assert!(buf.is_empty());
    }
}
