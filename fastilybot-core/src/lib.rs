//! # FastilyBot Core Library
//!
//! Wiki client, disk cache, configuration and the bot and report tasks run by the
//! `fastilybot` CLI.

pub mod cache;
pub mod models;
pub mod services;
pub mod tasks;
pub mod wiki;
