//! # dbench-rpc - Backend Daemon RPC
//!
//! Spawns the native backend daemon and forwards name-and-argument
//! invocations to it over newline-delimited JSON on stdio. All actual
//! ADB/Fastboot protocol work happens inside the daemon; this crate is
//! the plumbing and the typed call surface.
//!
//! Depends on [`dbench_core`] for domain types and error handling.
//!
//! ## Public API
//!
//! ### Capability surface
//! - [`Backend`] - One method per backend operation; the seam the stores
//!   depend on (implement it to substitute the daemon in tests)
//! - [`RpcBackend`] - Production implementation mapping each operation
//!   onto the generic invoke mechanism; `adb_connect` carries a bounded
//!   retry, nothing else does
//!
//! ### Invoke mechanism
//! - [`InvokeClient`] - `invoke(method, params)` with timeout handling
//! - [`RequestTracker`] - Pending request/response matching
//! - [`retry_with_delay`] - Bounded retry helper
//!
//! ### Process management
//! - [`BackendProcess`] - Spawn and manage the daemon child process
//! - [`locate_backend`] - Resolve the daemon executable

pub mod backend;
pub mod invoke;
pub mod process;
pub mod protocol;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_utils;

// Public API re-exports
pub use backend::{Backend, LocalBackend, RpcBackend, CONNECT_ATTEMPTS, CONNECT_RETRY_DELAY};
pub use invoke::{retry_with_delay, InvokeClient, InvokeOutcome, RequestTracker};
pub use process::{locate_backend, BackendProcess, BACKEND_PROGRAM};
pub use protocol::{build_request, Response};
