//! Native system implementations of chunkpipe protocols.

mod file;
mod system;

pub use self::{file::open_system_file, system::start_system_fs};
