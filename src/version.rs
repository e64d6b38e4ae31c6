//! Harness version information.
//!
//! ## Notes
//!
//! - The value is taken from Cargo metadata (`CARGO_PKG_VERSION`) at compile time.
//! - The CLI `--version` flag and the report footer both read this constant.

/// The minefield version string (for example, `0.1.0`).
pub const MINEFIELD_VERSION: &str = env!("CARGO_PKG_VERSION");
