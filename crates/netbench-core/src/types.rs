use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::network::NetworkProfile;

// ─── Trial Matrix ───────────────────────────────────
//
//  run → profile → mode → size
//
//  Iterated in exactly that nesting order. Later trials reuse the
//  same download directory, so ordering is part of the contract.

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransferMode {
    Direct,
    Streamed,
}

impl TransferMode {
    /// URL path segment the file server exposes for this mode.
    pub fn path_segment(&self) -> &'static str {
        match self {
            Self::Direct => "download",
            Self::Streamed => "stream",
        }
    }
}

/// One (run, profile, mode, size) combination.
#[derive(Debug, Clone)]
pub struct TrialSpec {
    /// Zero-based run index.
    pub run_index: u32,
    pub profile: NetworkProfile,
    pub mode: TransferMode,
    pub size_label: String,
}

impl TrialSpec {
    /// File name of the artifact the browser saves for this trial.
    pub fn artifact_name(&self) -> String {
        format!("{}.bin", self.size_label)
    }

    /// Resource URL for this trial: `{base}/{mode}/{size}.bin`.
    pub fn resource_url(&self, base_url: &str) -> String {
        format!(
            "{}/{}/{}",
            base_url.trim_end_matches('/'),
            self.mode.path_segment(),
            self.artifact_name()
        )
    }
}

/// Measured outcome of one successful trial.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialRecord {
    pub url: String,
    pub speed: String,
    /// One-based run number as it appears in the report.
    pub run: u32,
    pub duration_secs: f64,
}

/// Byte-range slice of a resource tagged with its sequence position.
#[derive(Debug, Clone)]
pub struct RangeChunk {
    pub index: u64,
    pub payload: bytes::Bytes,
}

/// Result returned after a successful chunked download
#[derive(Debug, Clone)]
pub struct DownloadResult {
    pub downloaded_bytes: u64,
    pub chunk_count: u64,
    pub elapsed_ms: u64,
    pub final_path: PathBuf,
}

// ─── Error Types ────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum BenchError {
    #[error("chunk {index} failed: HTTP {status}: {body}")]
    Fetch {
        index: u64,
        status: u16,
        body: String,
    },

    #[error("chunk {index} failed: {source}")]
    FetchTransport {
        index: u64,
        #[source]
        source: reqwest::Error,
    },

    #[error("chunk {index} returned {actual} bytes, expected {expected}")]
    RangeMismatch {
        index: u64,
        expected: u64,
        actual: u64,
    },

    #[error("cannot determine size of {url}: {reason}")]
    SizeUnavailable { url: String, reason: String },

    #[error("chunk {index} has an empty range {start}-{end}")]
    InvalidRange { index: u64, start: u64, end: u64 },

    #[error("{path} did not appear within {timeout_ms}ms")]
    Timeout { path: String, timeout_ms: u64 },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Report error: {0}")]
    Report(String),

    #[error("Task error: {0}")]
    Task(String),
}
