//! Services shared by the CLI and the tasks

pub mod credentials;
pub mod logging;

pub use credentials::*;
pub use logging::*;
