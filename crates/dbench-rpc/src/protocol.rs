//! JSON-RPC protocol handling for the backend daemon
//!
//! The daemon speaks newline-delimited JSON on stdio. Requests carry a
//! numeric id, a method name, and an argument record; every request is
//! answered by exactly one response line carrying the same id and either
//! a `result` or an `error` value.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// A response line from the backend daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl Response {
    /// Parse a line of daemon stdout into a response.
    ///
    /// Returns `None` for lines that are not valid responses (partial
    /// output, diagnostics the daemon writes outside the protocol).
    pub fn parse(line: &str) -> Option<Self> {
        serde_json::from_str(line.trim()).ok()
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Get a human-readable summary of this response
    pub fn summary(&self) -> String {
        if self.is_error() {
            format!("Response #{}: error", self.id)
        } else {
            format!("Response #{}: ok", self.id)
        }
    }
}

/// Build a request line for the given invocation.
///
/// The argument record uses the camelCase keys of the operation catalog
/// (`apkPath`, `outputDir`, ...); absent optional arguments are `null`.
pub fn build_request(id: u64, method: &str, params: Value) -> String {
    json!({
        "id": id,
        "method": method,
        "params": params,
    })
    .to_string()
}
