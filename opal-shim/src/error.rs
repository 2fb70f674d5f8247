//! The shim's error type

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Everything that can go wrong between locating ourselves and replacing the process image
#[derive(Debug, Error)]
pub enum ShimError {
    /// The platform could not tell us where the running executable lives
    #[error("unable to determine the path of the running executable: {0}")]
    SelfPath(#[source] io::Error),
    /// A path did not fit into a [`crate::path_buf::PathBuffer`]
    #[error("path exceeds the buffer capacity of {capacity} bytes")]
    PathTooLong { capacity: usize },
    /// A path or argument contained a NUL byte and can't be handed to the OS
    #[error("unexpected NUL byte in path or argument")]
    InteriorNul,
    #[error("unable to canonicalize '{}': {source}", path.display())]
    Canonicalize {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unable to set environment variable {name}: {source}")]
    SetEnv {
        name: String,
        #[source]
        source: io::Error,
    },
    /// `execv` returned, so the target was never started
    #[error("unable to execute '{}': {source}", path.display())]
    Exec {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
