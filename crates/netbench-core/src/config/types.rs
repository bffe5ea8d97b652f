use serde::{Deserialize, Serialize};

use crate::types::{BenchError, TransferMode};

pub const DEFAULT_CHUNK_SIZE: u64 = 10 * 1_048_576;
pub const DEFAULT_TIMEOUT_MS: u64 = 600_000;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;

// ─── Config Structs ─────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    pub server: ServerConfig,
    pub matrix: MatrixConfig,
    pub speed_range: SpeedRangeConfig,
    pub downloads: DownloadsConfig,
    pub chunked: ChunkedConfig,
    pub browser: BrowserConfig,
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub base_url: String,
    pub accept_invalid_certs: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "https://13.59.58.254/files".to_string(),
            accept_invalid_certs: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatrixConfig {
    pub runs: u32,
    pub file_sizes: Vec<String>,
    pub modes: Vec<TransferMode>,
}

impl Default for MatrixConfig {
    fn default() -> Self {
        Self {
            runs: 10,
            file_sizes: ["100MB", "250MB", "500MB", "1GB"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            modes: vec![TransferMode::Direct, TransferMode::Streamed],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedRangeConfig {
    pub max_mbps: u32,
    pub min_mbps: u32,
    pub step_mbps: u32,
    pub base_latency_ms: f64,
}

impl Default for SpeedRangeConfig {
    fn default() -> Self {
        Self {
            max_mbps: 500,
            min_mbps: 10,
            step_mbps: 50,
            base_latency_ms: 20.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadsConfig {
    pub download_dir: String,
    pub timeout_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for DownloadsConfig {
    fn default() -> Self {
        Self {
            download_dir: "downloads".to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkedConfig {
    pub chunk_size_bytes: u64,
    /// Cap on simultaneous range requests. Unset means every chunk is
    /// requested at once.
    pub max_in_flight: Option<usize>,
}

impl Default for ChunkedConfig {
    fn default() -> Self {
        Self {
            chunk_size_bytes: DEFAULT_CHUNK_SIZE,
            max_in_flight: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub headless: bool,
    pub ignore_certificate_errors: bool,
    pub executable: Option<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            ignore_certificate_errors: true,
            executable: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub path: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            path: "download_times.csv".to_string(),
        }
    }
}

// ─── Validation ─────────────────────────────────────

/// Report fields are joined without escaping, so anything that ends up in
/// a CSV cell must be free of separators.
pub(crate) fn has_separator(value: &str) -> bool {
    value.contains([',', '\n', '\r'])
}

impl BenchConfig {
    /// Reject values the harness cannot run with.
    pub fn validate(&self) -> Result<(), BenchError> {
        let base = url::Url::parse(&self.server.base_url)?;
        match base.scheme() {
            "http" | "https" => {}
            scheme => {
                return Err(BenchError::Config(format!(
                    "unsupported base_url scheme: {scheme}"
                )))
            }
        }
        if has_separator(&self.server.base_url) {
            return Err(BenchError::Config(
                "base_url must not contain commas or newlines".to_string(),
            ));
        }

        if self.matrix.runs == 0 {
            return Err(BenchError::Config("matrix.runs must be positive".to_string()));
        }
        if self.matrix.file_sizes.is_empty() {
            return Err(BenchError::Config("matrix.file_sizes is empty".to_string()));
        }
        if self.matrix.modes.is_empty() {
            return Err(BenchError::Config("matrix.modes is empty".to_string()));
        }
        for label in &self.matrix.file_sizes {
            if label.is_empty() || has_separator(label) || label.contains(['/', '\\']) {
                return Err(BenchError::Config(format!("invalid file size label: {label:?}")));
            }
        }

        let range = &self.speed_range;
        if range.step_mbps == 0 {
            return Err(BenchError::Config("speed_range.step_mbps must be positive".to_string()));
        }
        if range.min_mbps == 0 {
            return Err(BenchError::Config("speed_range.min_mbps must be positive".to_string()));
        }
        if range.min_mbps > range.max_mbps {
            return Err(BenchError::Config(format!(
                "speed_range.min_mbps ({}) exceeds max_mbps ({})",
                range.min_mbps, range.max_mbps
            )));
        }

        if self.downloads.timeout_ms == 0 || self.downloads.poll_interval_ms == 0 {
            return Err(BenchError::Config(
                "downloads.timeout_ms and poll_interval_ms must be positive".to_string(),
            ));
        }

        if self.chunked.chunk_size_bytes == 0 {
            return Err(BenchError::Config("chunked.chunk_size_bytes must be positive".to_string()));
        }
        if self.chunked.max_in_flight == Some(0) {
            return Err(BenchError::Config("chunked.max_in_flight must be positive".to_string()));
        }

        Ok(())
    }
}
