//! Client-side state stores
//!
//! Constructed once at application start and shared by reference; each
//! store exclusively owns the state it exposes.

pub mod device;
pub mod output_dirs;

pub use device::{DeviceStore, DEFAULT_REFRESH_INTERVAL_MS};
pub use output_dirs::{timestamped_name, OutputCategory, OutputDirs, FALLBACK_OUTPUT_DIR};
