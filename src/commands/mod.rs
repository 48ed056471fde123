//! CLI command implementations

pub mod flash;
mod list;

pub use list::{list_programmers, list_targets};
