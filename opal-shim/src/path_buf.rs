//! A fixed-capacity, always NUL-terminated path buffer
//!
//! Every path the shim handles lives in a [`PathBuffer`]. The storage is an inline array sized to
//! the platform's `PATH_MAX` plus [`HEADROOM`], so the suffixes we append (`/..`, `/bin/` and the
//! target name) always fit behind a base path of `PATH_MAX` bytes. Nothing is ever reallocated.

use std::ffi::{CStr, OsStr};
use std::fmt;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use libc::c_char;

use crate::config::{BIN_SEGMENT, PARENT_SEGMENT, TARGET_NAME};
use crate::error::ShimError;

const fn max(a: usize, b: usize) -> usize {
    if a > b {
        a
    } else {
        b
    }
}

/// Room reserved beyond `PATH_MAX` for the segments appended to a path
pub const HEADROOM: usize = max(32, BIN_SEGMENT.len() + TARGET_NAME.len());

/// The maximum number of path bytes, not counting the NUL terminator
pub const CAPACITY: usize = libc::PATH_MAX as usize + HEADROOM;

const _: () = assert!(PARENT_SEGMENT.len() <= HEADROOM);
const _: () = assert!(BIN_SEGMENT.len() + TARGET_NAME.len() <= HEADROOM);

/// How an OS call handed to [`PathBuffer::fill_with`] left the storage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Written {
    /// Exactly this many bytes, without a terminator (`readlink`)
    Bytes(usize),
    /// A NUL-terminated string (`realpath`, `sysctl`, ...)
    NulTerminated,
}

pub struct PathBuffer {
    // Invariant: bytes[len] == 0 and bytes[CAPACITY] == 0
    bytes: [u8; CAPACITY + 1],
    len: usize,
}

impl PathBuffer {
    pub const fn new() -> Self {
        Self {
            bytes: [0; CAPACITY + 1],
            len: 0,
        }
    }

    #[cfg(test)]
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ShimError> {
        let mut buffer = Self::new();
        buffer.push(bytes)?;
        Ok(buffer)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    pub fn as_c_str(&self) -> &CStr {
        CStr::from_bytes_until_nul(&self.bytes[..=self.len]).unwrap_or_default()
    }

    pub fn as_path(&self) -> &Path {
        Path::new(OsStr::from_bytes(self.as_bytes()))
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.len = 0;
        self.bytes[0] = 0;
    }

    /// Append `bytes`
    ///
    /// On error the buffer is left unchanged.
    pub fn push(&mut self, bytes: &[u8]) -> Result<(), ShimError> {
        if bytes.contains(&0) {
            return Err(ShimError::InteriorNul);
        }
        let end = self.len + bytes.len();
        if end > CAPACITY {
            return Err(ShimError::PathTooLong { capacity: CAPACITY });
        }

        self.bytes[self.len..end].copy_from_slice(bytes);
        self.bytes[end] = 0;
        self.len = end;
        Ok(())
    }

    /// Replace the contents with `bytes`
    ///
    /// On error the buffer is left unchanged.
    pub fn replace(&mut self, bytes: &[u8]) -> Result<(), ShimError> {
        if bytes.contains(&0) {
            return Err(ShimError::InteriorNul);
        }
        if bytes.len() > CAPACITY {
            return Err(ShimError::PathTooLong { capacity: CAPACITY });
        }

        self.clear();
        self.push(bytes)
    }

    /// Let an OS call write a path straight into the storage
    ///
    /// `write` receives a pointer valid for `CAPACITY` bytes together with that capacity and
    /// reports how it left the storage. If it fails, the buffer is empty afterwards.
    pub fn fill_with<F>(&mut self, write: F) -> Result<(), ShimError>
    where
        F: FnOnce(*mut c_char, usize) -> Result<Written, ShimError>,
    {
        self.clear();
        let result = write(self.bytes.as_mut_ptr().cast(), CAPACITY);
        // Whatever was written, the final byte stays a terminator
        self.bytes[CAPACITY] = 0;

        let len = match result {
            Ok(Written::Bytes(len)) if len <= CAPACITY => len,
            Ok(Written::Bytes(_)) => {
                self.clear();
                return Err(ShimError::PathTooLong { capacity: CAPACITY });
            }
            Ok(Written::NulTerminated) => self
                .bytes
                .iter()
                .position(|&b| b == 0)
                .unwrap_or(CAPACITY),
            Err(error) => {
                self.clear();
                return Err(error);
            }
        };

        self.len = len;
        self.bytes[len] = 0;
        Ok(())
    }
}

impl Default for PathBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PathBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PathBuffer").field(&self.as_path()).finish()
    }
}
