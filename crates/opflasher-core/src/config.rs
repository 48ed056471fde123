//! Flash job configuration

use crate::copy::DEFAULT_CHUNK_SIZE;
use log::warn;
use thiserror::Error;

/// Largest accepted copy chunk (16 MiB)
pub const MAX_CHUNK_SIZE: usize = 16 * 1024 * 1024;

/// What to do when the image ends before its reported size was copied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShortSourcePolicy {
    /// Fail the job with `FlashError::ShortSource`
    #[default]
    Error,
    /// Log a warning and report success with the short count
    Accept,
}

/// Tunables for a flash job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashConfig {
    /// Bytes per read/write during the copy
    pub chunk_size: usize,
    /// Short image handling
    pub short_source: ShortSourcePolicy,
}

impl Default for FlashConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            short_source: ShortSourcePolicy::default(),
        }
    }
}

/// Configuration parsing errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Invalid parameter value
    #[error("Invalid parameter '{name}': {message}")]
    InvalidParameter { name: &'static str, message: String },
}

/// Parse a size as hex (`0x...`) or decimal, with an optional `K`/`M` suffix
pub fn parse_size(s: &str) -> Option<usize> {
    let (digits, multiplier) = match s.as_bytes().last() {
        Some(b'K') | Some(b'k') => (&s[..s.len() - 1], 1024),
        Some(b'M') | Some(b'm') => (&s[..s.len() - 1], 1024 * 1024),
        _ => (s, 1),
    };

    let value = if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        usize::from_str_radix(hex, 16).ok()?
    } else {
        digits.parse::<usize>().ok()?
    };

    value.checked_mul(multiplier)
}

/// Build a configuration from key-value pairs
///
/// # Supported options
/// - `chunk=N` - copy chunk size, hex or decimal, `K`/`M` suffix allowed
/// - `short=error|accept` - short image policy
///
/// Unknown keys are logged and ignored.
///
/// # Example
/// ```ignore
/// let config = parse_options(&[("chunk", "0x1000"), ("short", "accept")])?;
/// ```
pub fn parse_options(options: &[(&str, &str)]) -> Result<FlashConfig, ConfigError> {
    let mut config = FlashConfig::default();

    for (key, value) in options {
        match *key {
            "chunk" => {
                let size = parse_size(value).ok_or_else(|| ConfigError::InvalidParameter {
                    name: "chunk",
                    message: format!("'{}' is not a valid size", value),
                })?;
                if size == 0 || size > MAX_CHUNK_SIZE {
                    return Err(ConfigError::InvalidParameter {
                        name: "chunk",
                        message: format!(
                            "{} is out of range (1..={} bytes)",
                            size, MAX_CHUNK_SIZE
                        ),
                    });
                }
                config.chunk_size = size;
            }
            "short" => {
                config.short_source = match *value {
                    "error" => ShortSourcePolicy::Error,
                    "accept" => ShortSourcePolicy::Accept,
                    _ => {
                        return Err(ConfigError::InvalidParameter {
                            name: "short",
                            message: format!("'{}' is not one of: error, accept", value),
                        })
                    }
                };
            }
            _ => {
                warn!("Unknown flash option: {}={}", key, value);
            }
        }
    }

    Ok(config)
}
