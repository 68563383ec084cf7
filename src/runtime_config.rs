//! # Runtime Configuration Module
//!
//! Environment-driven settings for the coroutine runtime.
//!
//! ## Environment Variables
//!
//! ### `BRRTCHAIN_STACK_SIZE`
//!
//! Stack size of the coroutines that deliver chain completions. Accepts:
//! - Decimal: `65536`
//! - Hexadecimal: `0x10000`
//!
//! Default: `0x10000` (64 KB). Completion callbacks usually run the rest of the
//! dispatch (the router, the next route chain), so they need more room than a
//! single handler.
//!
//! ### Boolean flags
//!
//! `BRRTCHAIN_ONCE_NEXT`, `BRRTCHAIN_STRICT_NEXT` and
//! `BRRTCHAIN_IGNORE_TRAILING_SLASH` are read by
//! [`RouterOptions::from_env`](crate::router::RouterOptions::from_env).
//! `1`, `true`, `yes` and `on` (any case) enable a flag; anything else leaves
//! it off.
//!
//! ## Usage
//!
//! ```rust
//! use brrtchain::runtime_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_env();
//! println!("Stack size: {} bytes", config.stack_size);
//! ```

use std::env;

use once_cell::sync::Lazy;

/// Default coroutine stack size (64 KB)
pub const DEFAULT_STACK_SIZE: usize = 0x10000;

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Stack size for completion coroutines in bytes (default: 64 KB / 0x10000)
    pub stack_size: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            stack_size: DEFAULT_STACK_SIZE,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let stack_size = env::var("BRRTCHAIN_STACK_SIZE")
            .ok()
            .and_then(|val| parse_size(&val))
            .unwrap_or(DEFAULT_STACK_SIZE);
        RuntimeConfig { stack_size }
    }
}

static GLOBAL: Lazy<RuntimeConfig> = Lazy::new(RuntimeConfig::from_env);

/// Process-wide configuration, read from the environment on first use
pub fn global() -> &'static RuntimeConfig {
    &GLOBAL
}

fn parse_size(val: &str) -> Option<usize> {
    let val = val.trim();
    let size = match val.strip_prefix("0x").or_else(|| val.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16).ok()?,
        None => val.parse().ok()?,
    };
    (size > 0).then_some(size)
}

fn parse_flag(val: &str) -> bool {
    matches!(
        val.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Read a boolean flag from the environment; unset means `false`
pub(crate) fn env_flag(name: &str) -> bool {
    env::var(name).map(|v| parse_flag(&v)).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size_decimal_and_hex() {
        assert_eq!(parse_size("32768"), Some(32768));
        assert_eq!(parse_size("0x8000"), Some(0x8000));
        assert_eq!(parse_size("0X4000"), Some(0x4000));
        assert_eq!(parse_size(" 4096 "), Some(4096));
    }

    #[test]
    fn test_parse_size_rejects_garbage() {
        assert_eq!(parse_size("big"), None);
        assert_eq!(parse_size("0xZZ"), None);
        assert_eq!(parse_size("0"), None);
    }

    #[test]
    fn test_parse_flag() {
        for on in ["1", "true", "TRUE", "yes", "On"] {
            assert!(parse_flag(on), "{on} should enable");
        }
        for off in ["0", "false", "", "nope"] {
            assert!(!parse_flag(off), "{off} should not enable");
        }
    }

    #[test]
    fn test_default_stack_size() {
        assert_eq!(RuntimeConfig::default().stack_size, 0x10000);
        assert!(global().stack_size > 0);
    }
}
