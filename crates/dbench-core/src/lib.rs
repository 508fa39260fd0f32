//! # dbench-core - Core Domain Types
//!
//! Foundation crate for droid-bench. Provides the device record, the
//! user-visible console log, error handling, and tracing setup.
//!
//! This crate has **zero internal dependencies** -- it only depends on
//! external crates (serde, chrono, thiserror, tracing).
//!
//! ## Public API
//!
//! ### Devices (`device`)
//! - [`Device`] - A device reported by backend enumeration, joined by serial
//!   with the cached detail record of the current selection
//!
//! ### Console (`console`)
//! - [`ConsoleLog`] - Bounded, append-only activity log shared by the stores
//! - [`ConsoleEntry`], [`ConsoleKind`] - Typed, timestamped entries
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Custom error enum with `fatal` vs `recoverable` classification
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//!
//! ## Prelude
//!
//! Import commonly used types with:
//! ```rust
//! use dbench_core::prelude::*;
//! ```

pub mod console;
pub mod device;
pub mod error;
pub mod logging;

/// Prelude for common imports used throughout all droid-bench crates
pub mod prelude {
    pub use super::error::{Error, Result};
    pub use tracing::{debug, error, info, trace, warn};
}

// Re-export commonly used types at crate root for convenience
pub use console::{ConsoleEntry, ConsoleKind, ConsoleLog, MAX_ENTRIES};
pub use device::{Device, UNKNOWN_PROPERTY};
pub use error::{Error, Result};
