//! Data models for fastilybot

pub mod configuration;
pub mod task;

pub use configuration::*;
pub use task::*;
