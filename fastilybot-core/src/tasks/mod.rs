//! Bot and report tasks, and the runner which executes them

pub mod bots;
pub mod constants;
pub mod context;
pub mod reports;
pub mod runner;

pub use bots::Bots;
pub use context::{Source, TaskContext};
pub use reports::Reports;
pub use runner::{RunSummary, Selection, TaskRunner};
