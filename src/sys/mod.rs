pub mod alloc;
pub mod fixed;
pub mod host;
pub mod hw;
pub mod io;
pub mod video;
