// Range-chunked downloader: probe size, fan out range fetches, reassemble in order.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use reqwest::header::CONTENT_LENGTH;
use tokio::io::AsyncWriteExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::range::RangeFetcher;
use crate::config::DEFAULT_CHUNK_SIZE;
use crate::types::{BenchError, DownloadResult, RangeChunk};

/// Inclusive byte range of one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ChunkPlan {
    index: u64,
    range_start: u64,
    range_end: u64,
}

/// Split `total_size` bytes into `chunk_size` ranges; the last one may be short.
fn plan_chunks(total_size: u64, chunk_size: u64) -> Vec<ChunkPlan> {
    let count = total_size.div_ceil(chunk_size);
    (0..count)
        .map(|index| {
            let range_start = index * chunk_size;
            ChunkPlan {
                index,
                range_start,
                range_end: (range_start + chunk_size).min(total_size) - 1,
            }
        })
        .collect()
}

/// Build the in-progress path by appending `.part`.
fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}

/// Downloads a resource as concurrently fetched byte ranges.
///
/// Every chunk is held in memory until all of them have arrived; only then is
/// anything written. With no `max_in_flight` cap every range is requested at
/// once, which for large resources and small chunks can exhaust memory and
/// sockets.
pub struct ChunkedDownloader {
    client: reqwest::Client,
    chunk_size: u64,
    max_in_flight: Option<usize>,
}

impl ChunkedDownloader {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_in_flight: None,
        }
    }

    /// Set the chunk size in bytes. Zero is clamped to one byte.
    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Cap the number of simultaneous range requests.
    pub fn with_max_in_flight(mut self, max: Option<usize>) -> Self {
        self.max_in_flight = max.map(|m| m.max(1));
        self
    }

    /// HEAD the resource and read its size from `Content-Length`.
    ///
    /// Any failure here is a `SizeUnavailable`: transport errors, error
    /// statuses and a missing or unparsable length alike.
    pub async fn probe_size(&self, url: &str) -> Result<u64, BenchError> {
        let unavailable = |reason: String| BenchError::SizeUnavailable {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .head(url)
            .send()
            .await
            .map_err(|e| unavailable(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(unavailable(format!(
                "HEAD returned {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .ok_or_else(|| unavailable("no usable Content-Length".to_string()))
    }

    /// Download `url` to `dest`.
    ///
    /// Any chunk failure aborts the whole transfer before a single byte is
    /// written. Payloads go to `<dest>.part` and are renamed over `dest` only
    /// once fully written, so `dest` is never left partially filled.
    pub async fn download(&self, url: &str, dest: &Path) -> Result<DownloadResult, BenchError> {
        let start_time = Instant::now();
        let total_size = self.probe_size(url).await?;
        let plan = plan_chunks(total_size, self.chunk_size);

        tracing::info!(
            url,
            total_size,
            chunks = plan.len(),
            chunk_size = self.chunk_size,
            "starting chunked download"
        );

        let mut chunks = self.fetch_all(url, &plan).await?;
        chunks.sort_by_key(|c| c.index);

        let written = write_in_order(dest, &chunks).await?;
        if written != total_size {
            let _ = tokio::fs::remove_file(dest).await;
            return Err(BenchError::Task(format!(
                "reassembly size mismatch: expected {total_size}, wrote {written}"
            )));
        }

        let elapsed = start_time.elapsed();
        tracing::info!(
            url,
            path = %dest.display(),
            bytes = written,
            elapsed_ms = elapsed.as_millis() as u64,
            "chunked download complete"
        );

        Ok(DownloadResult {
            downloaded_bytes: written,
            chunk_count: plan.len() as u64,
            elapsed_ms: elapsed.as_millis() as u64,
            final_path: dest.to_path_buf(),
        })
    }

    /// Fetch every planned chunk concurrently. Results come back in
    /// completion order, not plan order.
    async fn fetch_all(&self, url: &str, plan: &[ChunkPlan]) -> Result<Vec<RangeChunk>, BenchError> {
        let fetcher = RangeFetcher::new(self.client.clone(), url);
        let gate = self.max_in_flight.map(|n| Arc::new(Semaphore::new(n)));
        let mut join_set = JoinSet::new();

        for chunk in plan.iter().copied() {
            let fetcher = fetcher.clone();
            let gate = gate.clone();
            join_set.spawn(async move {
                let _permit = match gate {
                    Some(sem) => Some(
                        sem.acquire_owned()
                            .await
                            .map_err(|_| BenchError::Task("semaphore closed".to_string()))?,
                    ),
                    None => None,
                };
                fetcher
                    .fetch(chunk.range_start, chunk.range_end, chunk.index)
                    .await
            });
        }

        let mut chunks = Vec::with_capacity(plan.len());
        while let Some(result) = join_set.join_next().await {
            let outcome = match result {
                Ok(outcome) => outcome,
                Err(e) => Err(BenchError::Task(format!("task join error: {e}"))),
            };
            match outcome {
                Ok(chunk) => chunks.push(chunk),
                Err(err) => {
                    tracing::error!(url, error = %err, "chunk failed; aborting download");
                    join_set.abort_all();
                    return Err(err);
                }
            }
        }

        Ok(chunks)
    }
}

/// Write sorted chunks to `<dest>.part`, then rename over `dest`.
async fn write_in_order(dest: &Path, chunks: &[RangeChunk]) -> Result<u64, BenchError> {
    if let Some(parent) = dest.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let tmp = part_path(dest);
    let result = async {
        let mut file = tokio::fs::File::create(&tmp).await?;
        let mut written: u64 = 0;
        for chunk in chunks {
            file.write_all(&chunk.payload).await?;
            written += chunk.payload.len() as u64;
        }
        file.flush().await?;
        file.shutdown().await?;
        Ok::<u64, std::io::Error>(written)
    }
    .await;

    match result {
        Ok(written) => {
            tokio::fs::rename(&tmp, dest).await?;
            Ok(written)
        }
        Err(e) => {
            let _ = tokio::fs::remove_file(&tmp).await;
            Err(BenchError::FileSystem(e))
        }
    }
}
