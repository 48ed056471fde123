//! Writes opflasher man pages: `opflasher.1` plus one `opflasher-<command>.1`
//! per subcommand
//!
//! Usage: gen-manpage [output-dir]  (default: ./man)

use clap::CommandFactory;
use clap_mangen::Man;
use std::io;
use std::path::{Path, PathBuf};

#[path = "../cli.rs"]
mod cli;

fn render(man: Man, path: &Path) -> io::Result<()> {
    let mut page = Vec::new();
    man.render(&mut page)?;
    std::fs::write(path, page)?;
    println!("wrote {}", path.display());
    Ok(())
}

fn main() -> io::Result<()> {
    let out_dir = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("man"));
    std::fs::create_dir_all(&out_dir)?;

    let cmd = cli::Cli::command();
    for sub in cmd.get_subcommands().filter(|s| s.get_name() != "help") {
        let title = format!("opflasher-{}", sub.get_name());
        let path = out_dir.join(format!("{}.1", title));
        render(Man::new(sub.clone()).title(title), &path)?;
    }
    render(Man::new(cmd), &out_dir.join("opflasher.1"))
}
