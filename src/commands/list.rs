//! List commands implementation

use crate::programmers::available_programmers;
use opflasher_core::FlashTarget;

/// List all flash targets with their device nodes
pub fn list_targets() {
    println!(
        "{:<14} {:<14} {:<11} {:<10} Description",
        "Target", "Aliases", "Device", "Size"
    );
    println!("{}", "-".repeat(72));

    for info in FlashTarget::all() {
        println!(
            "{:<14} {:<14} {:<11} {:<10} {}",
            info.name,
            info.aliases.join(","),
            info.device_path,
            device_size(info.device_path),
            info.description
        );
    }
}

#[cfg(feature = "linux-mtd")]
fn device_size(device_path: &str) -> String {
    use opflasher_linux_mtd::{read_sysfs_info, MTD_SYSFS_ROOT};
    use std::path::Path;

    match read_sysfs_info(Path::new(MTD_SYSFS_ROOT), Path::new(device_path)) {
        Ok(info) => format_size(info.total_size),
        Err(e) => {
            log::debug!("No sysfs info for {}: {}", device_path, e);
            "-".to_string()
        }
    }
}

#[cfg(not(feature = "linux-mtd"))]
fn device_size(_device_path: &str) -> String {
    "-".to_string()
}

/// List all available backends
pub fn list_programmers() {
    println!("Available programmers:");
    println!();
    for p in available_programmers() {
        if p.aliases.is_empty() {
            println!("  {:<10} - {}", p.name, p.description);
        } else {
            println!(
                "  {:<10} - {} (aliases: {})",
                p.name,
                p.description,
                p.aliases.join(", ")
            );
        }
    }
}

#[allow(dead_code)]
fn format_size(bytes: u64) -> String {
    if bytes >= 1024 * 1024 {
        format!("{} MiB", bytes / (1024 * 1024))
    } else if bytes >= 1024 {
        format!("{} KiB", bytes / 1024)
    } else {
        format!("{} B", bytes)
    }
}
