//! Runtime helpers shared by the binaries

pub mod logging;
pub mod shutdown;

pub use logging::init_tracing;
pub use shutdown::ShutdownManager;
