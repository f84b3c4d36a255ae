//! Error types and sandbox message decoding.
//!
//! The pipeline stages themselves are best-effort and never fail; this module
//! covers the two places errors actually surface:
//! - host-side fallible operations (snapshot loading, message decoding),
//! - the structured events the sandbox posts back to the host.

use serde::{Deserialize, Serialize};

/// Host-side failures. Pipeline stages degrade instead of erroring, so this
/// stays small.
#[derive(Debug, thiserror::Error)]
pub enum PreviewError {
    /// The snapshot had no files and no fallback source. Caller error per the
    /// assembly contract.
    #[error("empty snapshot: no files and no fallback source")]
    EmptySnapshot,

    /// Reading a snapshot from disk failed.
    #[error("failed to read snapshot entry {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A sandbox message could not be decoded.
    #[error("invalid sandbox message: {0}")]
    InvalidMessage(#[from] serde_json::Error),
}

/// Payload of a `preview-error` event. `source` is one of `compile`, `mount`
/// or `runtime`; position fields are present only when the failure carries
/// them (Babel compile errors do, most runtime faults do not).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PreviewErrorDetail {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

/// Fault source tags used by the embedded bootstrap.
pub const FAULT_SOURCE_COMPILE: &str = "compile";
pub const FAULT_SOURCE_MOUNT: &str = "mount";
pub const FAULT_SOURCE_RUNTIME: &str = "runtime";

/// Every message the sandbox can post across the channel. Unknown `type`
/// values decode to an explicit variant rather than an error or a silent
/// drop: the host must tolerate zero, one or many messages per load.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PreviewMessage {
    #[serde(rename = "preview-error")]
    Error { error: PreviewErrorDetail },

    /// Informational only: the routing shim observed a navigation.
    #[serde(rename = "preview-navigation")]
    Navigation { path: String },

    #[serde(other)]
    Unknown,
}

/// Decode one raw message from the sandbox channel.
pub fn parse_preview_message(raw: &str) -> Result<PreviewMessage, PreviewError> {
    Ok(serde_json::from_str(raw)?)
}
