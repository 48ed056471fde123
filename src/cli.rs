//! CLI argument parsing

use clap::{Parser, Subcommand};
use opflasher_core::FlashTarget;
use std::path::PathBuf;

/// Generate dynamic help text for the target argument
fn target_help() -> String {
    let names: Vec<&str> = FlashTarget::all().iter().map(|t| t.name).collect();
    format!("Flash target [available: {}]", names.join(", "))
}

#[derive(Parser)]
#[command(name = "opflasher")]
#[command(author, version, about = "Erase and program firmware images onto MTD flash", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Erase a target and program an image onto it
    Flash {
        #[arg(help = target_help())]
        target: String,

        /// Image file to write
        image: PathBuf,

        /// Caller/session identifier the final status is routed to
        session: String,

        /// Backend to use (e.g. "linux_mtd" or "dummy:size=0x100000")
        #[arg(short, long, default_value = "linux_mtd")]
        programmer: String,

        /// Job options (e.g. "chunk=64K,short=accept")
        #[arg(short, long)]
        options: Option<String>,
    },

    /// List flash targets and their devices
    Targets,

    /// List available backends
    ListProgrammers,
}
