//! Linux and Android: the kernel keeps `/proc/self/exe` pointing at the running image

use crate::error::ShimError;
use crate::path_buf::PathBuffer;
use crate::proc_link::read_link;

pub fn current_exe(buf: &mut PathBuffer) -> Result<(), ShimError> {
    read_link(c"/proc/self/exe", buf)
}
