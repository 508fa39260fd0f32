//! # dbench-app - Application State and Configuration
//!
//! The stores the shell's views consume, plus settings and the
//! navigation table.
//!
//! ## Public API
//!
//! ### Stores (`store`)
//! - [`DeviceStore`] - Device list, current selection, cached detail
//!   record, and the polling monitor that keeps them fresh
//! - [`OutputDirs`] - Output root resolution and the fixed category
//!   subdirectories; [`timestamped_name`] for generated files
//!
//! ### Configuration (`config`)
//! - [`Settings`] - `config.toml` under the platform config dir
//!
//! ### Navigation (`nav`)
//! - [`nav::NAV_ENTRIES`] - Static path -> view table with menu metadata

pub mod config;
pub mod nav;
pub mod store;

pub use config::Settings;
pub use store::{
    timestamped_name, DeviceStore, OutputCategory, OutputDirs, DEFAULT_REFRESH_INTERVAL_MS,
};
