// Package identity baked in at build time

/// Crate version from Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name from Cargo.toml; reported by GET /version.
pub const NAME: &str = env!("CARGO_PKG_NAME");
