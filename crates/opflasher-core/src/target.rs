//! Logical flash targets and their device nodes
//!
//! Targets are resolved through a static table. Adding a target means adding
//! a variant and a table row; no control flow changes.

use crate::error::UnknownTarget;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// A named storage region that can be flashed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlashTarget {
    /// Primary BMC firmware image
    Primary,
    /// Kernel partition
    Kernel,
    /// Initial ramdisk partition
    Ramdisk,
    /// Alternate (host) firmware, historically the PNOR
    AltFirmware,
}

/// Static description of a target
#[derive(Debug, Clone, Copy)]
pub struct TargetInfo {
    /// Target this row describes
    pub target: FlashTarget,
    /// Canonical name (used for matching and display)
    pub name: &'static str,
    /// Alternative names
    pub aliases: &'static [&'static str],
    /// Device node the target is written to
    pub device_path: &'static str,
    /// Short description
    pub description: &'static str,
}

static TARGETS: [TargetInfo; 4] = [
    TargetInfo {
        target: FlashTarget::Primary,
        name: "primary",
        aliases: &["bmc"],
        device_path: "/dev/mtd0",
        description: "Full BMC flash image",
    },
    TargetInfo {
        target: FlashTarget::Kernel,
        name: "kernel",
        aliases: &["bmc_kernel"],
        device_path: "/dev/mtd2",
        description: "BMC kernel partition",
    },
    TargetInfo {
        target: FlashTarget::Ramdisk,
        name: "ramdisk",
        aliases: &["bmc_ramdisk"],
        device_path: "/dev/mtd3",
        description: "BMC initramfs partition",
    },
    TargetInfo {
        target: FlashTarget::AltFirmware,
        name: "alt-firmware",
        aliases: &["pnor"],
        device_path: "/dev/mtd7",
        description: "Host firmware (PNOR) flash",
    },
];

/// Resolve a target name (canonical or alias) to a target
///
/// Pure lookup: no device is touched. Names are case-sensitive.
pub fn resolve(name: &str) -> Result<FlashTarget, UnknownTarget> {
    TARGETS
        .iter()
        .find(|info| info.name == name || info.aliases.contains(&name))
        .map(|info| info.target)
        .ok_or_else(|| UnknownTarget(name.to_string()))
}

impl FlashTarget {
    /// All known targets in table order
    pub fn all() -> &'static [TargetInfo] {
        &TARGETS
    }

    /// Table row for this target
    pub fn info(self) -> &'static TargetInfo {
        // Every variant has exactly one row; rows are kept in variant order.
        &TARGETS[self as usize]
    }

    /// Canonical name
    pub fn name(self) -> &'static str {
        self.info().name
    }

    /// Device node this target maps to
    pub fn device_path(self) -> &'static Path {
        Path::new(self.info().device_path)
    }
}

impl fmt::Display for FlashTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FlashTarget {
    type Err = UnknownTarget;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        resolve(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_order_matches_variants() {
        for info in FlashTarget::all() {
            assert_eq!(info.target.info().name, info.name);
        }
    }

    #[test]
    fn test_resolve_canonical_names() {
        assert_eq!(resolve("primary"), Ok(FlashTarget::Primary));
        assert_eq!(resolve("kernel"), Ok(FlashTarget::Kernel));
        assert_eq!(resolve("ramdisk"), Ok(FlashTarget::Ramdisk));
        assert_eq!(resolve("alt-firmware"), Ok(FlashTarget::AltFirmware));
    }

    #[test]
    fn test_resolve_aliases() {
        assert_eq!(resolve("bmc"), Ok(FlashTarget::Primary));
        assert_eq!(resolve("bmc_kernel"), Ok(FlashTarget::Kernel));
        assert_eq!(resolve("bmc_ramdisk"), Ok(FlashTarget::Ramdisk));
        assert_eq!(resolve("pnor"), Ok(FlashTarget::AltFirmware));
    }

    #[test]
    fn test_device_paths() {
        assert_eq!(FlashTarget::Primary.device_path(), Path::new("/dev/mtd0"));
        assert_eq!(FlashTarget::Kernel.device_path(), Path::new("/dev/mtd2"));
        assert_eq!(FlashTarget::Ramdisk.device_path(), Path::new("/dev/mtd3"));
        assert_eq!(
            FlashTarget::AltFirmware.device_path(),
            Path::new("/dev/mtd7")
        );
    }

    #[test]
    fn test_resolve_is_deterministic() {
        for info in FlashTarget::all() {
            let first = resolve(info.name).unwrap();
            let second = resolve(info.name).unwrap();
            assert_eq!(first, second);
            assert_eq!(first.device_path(), second.device_path());
        }
    }

    #[test]
    fn test_unknown_target() {
        assert_eq!(
            resolve("unknown-widget"),
            Err(UnknownTarget("unknown-widget".to_string()))
        );
        assert!(resolve("").is_err());
        assert!(resolve("Kernel").is_err());
    }

    #[test]
    fn test_from_str_and_display() {
        let target: FlashTarget = "pnor".parse().unwrap();
        assert_eq!(target.to_string(), "alt-firmware");
    }
}
