//! opflasher - Erase-then-program firmware flasher
//!
//! Writes a raw image onto a named MTD target. The whole device is erased,
//! the image is copied in chunks with percent progress, and a single
//! success/error status is reported at the end. The process exit code
//! mirrors that status: 0 on success, 1 on any failure.

mod cli;
mod commands;
mod programmers;

use clap::Parser;
use cli::{Cli, Commands};
use log::LevelFilter;
use opflasher_core::{FlashError, FlashRequest};

/// Log level for a `-v` count
fn log_level(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Whether the notification sink already reported this error
fn already_reported(err: &(dyn std::error::Error + 'static)) -> bool {
    err.is::<FlashError>()
}

fn main() {
    let cli = Cli::parse();

    // RUST_LOG still wins when set
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(log_level(cli.verbose).as_str()),
    )
    .init();

    let result = match cli.command {
        Commands::Flash {
            target,
            image,
            session,
            programmer,
            options,
        } => {
            log::info!("Starting flasher: {}, {}, {}", target, image.display(), session);
            let request = FlashRequest::new(target, image, session);
            commands::flash::run(&programmer, options.as_deref(), &request)
        }
        Commands::Targets => {
            commands::list_targets();
            Ok(())
        }
        Commands::ListProgrammers => {
            commands::list_programmers();
            Ok(())
        }
    };

    if let Err(e) = result {
        if !already_reported(&*e) {
            eprintln!("Error: {}", e);
        }
        std::process::exit(1);
    }
}
