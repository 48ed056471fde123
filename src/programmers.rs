//! Backend registration and dispatch
//!
//! Backends are selected with a programmer string of the form
//! `name` or `name:key1=value1,key2=value2`.

/// Information about a backend
pub struct ProgrammerInfo {
    /// Primary name (used for matching)
    pub name: &'static str,
    /// Alternative names/aliases
    pub aliases: &'static [&'static str],
    /// Short description
    pub description: &'static str,
}

/// Get information about all available backends (enabled at compile time)
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_programmers() -> Vec<ProgrammerInfo> {
    let mut programmers = Vec::new();

    #[cfg(feature = "linux-mtd")]
    programmers.push(ProgrammerInfo {
        name: "linux_mtd",
        aliases: &["linux-mtd", "mtd"],
        description: "Linux MTD character devices (/dev/mtdN) - requires root",
    });

    #[cfg(feature = "dummy")]
    programmers.push(ProgrammerInfo {
        name: "dummy",
        aliases: &[],
        description:
            "In-memory flash emulator (size=<n>,fail_info=<bool>,fail_erase=<bool>,fail_write_after=<n>)",
    });

    programmers
}

/// Comma-separated list of backend names
pub fn programmer_names_short() -> String {
    available_programmers()
        .iter()
        .map(|p| p.name)
        .collect::<Vec<_>>()
        .join(", ")
}

/// An opened backend
pub enum Backend {
    #[cfg(feature = "linux-mtd")]
    LinuxMtd(opflasher_linux_mtd::LinuxMtdOpener),
    #[cfg(feature = "dummy")]
    Dummy(opflasher_dummy::DummyOpener),
}

/// Split a comma-separated `key=value` list
pub fn parse_option_list(s: &str) -> Result<Vec<(&str, &str)>, Box<dyn std::error::Error>> {
    let mut options = Vec::new();
    for opt in s.split(',').filter(|opt| !opt.is_empty()) {
        match opt.split_once('=') {
            Some(pair) => options.push(pair),
            None => {
                return Err(
                    format!("Invalid parameter format: '{}' (expected key=value)", opt).into(),
                )
            }
        }
    }
    Ok(options)
}

/// Parse a programmer string into name and options
///
/// Format: "name" or "name:option1=value1,option2=value2"
pub fn parse_programmer_string(
    s: &str,
) -> Result<(&str, Vec<(&str, &str)>), Box<dyn std::error::Error>> {
    let (name, opts) = s.split_once(':').unwrap_or((s, ""));
    Ok((name, parse_option_list(opts)?))
}

/// Open the backend named by a programmer string
pub fn open_backend(programmer: &str) -> Result<Backend, Box<dyn std::error::Error>> {
    let (name, options) = parse_programmer_string(programmer)?;

    match name {
        #[cfg(feature = "linux-mtd")]
        "linux_mtd" | "linux-mtd" | "mtd" => {
            for (key, value) in &options {
                log::warn!("Unknown linux_mtd option: {}={}", key, value);
            }
            Ok(Backend::LinuxMtd(opflasher_linux_mtd::LinuxMtdOpener))
        }

        #[cfg(feature = "dummy")]
        "dummy" => {
            let config = opflasher_dummy::parse_options(&options)?;
            log::info!("Using dummy flash ({} bytes)", config.size);
            Ok(Backend::Dummy(opflasher_dummy::DummyOpener::new(config)))
        }

        _ => Err(unknown_programmer_error(name)),
    }
}

fn unknown_programmer_error(name: &str) -> Box<dyn std::error::Error> {
    let mut msg = format!("Unknown programmer: {}\n\n", name);
    msg.push_str(&format!("Available: {}", programmer_names_short()));
    msg.push_str("\nUse 'opflasher list-programmers' for more details");
    msg.into()
}
