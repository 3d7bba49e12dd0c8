//! Operator tool for stashlog stores
//!
//! Works on a store file pulled from a device: show the window a device
//! would load, append or acknowledge records, cut a torn tail, or check the
//! whole file for corruption.

pub mod commands;
pub mod config;

pub use commands::{CliValue, execute};
pub use config::{Cli, Command, LogKind, Settings};
