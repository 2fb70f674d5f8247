//! NetBSD and DragonFly: procfs exposes the running image as `/proc/curproc/file`

use crate::error::ShimError;
use crate::path_buf::PathBuffer;
use crate::proc_link::read_link;

pub fn current_exe(buf: &mut PathBuffer) -> Result<(), ShimError> {
    read_link(c"/proc/curproc/file", buf)
}
