use reqwest::header::{ACCEPT, CACHE_CONTROL, RANGE};

use crate::types::{BenchError, RangeChunk};

/// Fetches byte ranges of a single remote resource.
#[derive(Clone)]
pub struct RangeFetcher {
    client: reqwest::Client,
    url: String,
}

impl RangeFetcher {
    pub fn new(client: reqwest::Client, url: &str) -> Self {
        Self {
            client,
            url: url.to_string(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// GET `start..=end` and tag the payload with `index`.
    ///
    /// No retry: any failure is returned to the caller as-is. A success
    /// response whose length does not match the requested range (a server
    /// that ignored `Range`) is rejected rather than silently corrupting the
    /// reassembled file.
    pub async fn fetch(&self, start: u64, end: u64, index: u64) -> Result<RangeChunk, BenchError> {
        if end < start {
            return Err(BenchError::InvalidRange { index, start, end });
        }
        tracing::debug!(index, start, end, url = %self.url, "requesting chunk");

        let response = self
            .client
            .get(&self.url)
            .header(ACCEPT, "*/*")
            .header(CACHE_CONTROL, "no-cache")
            .header(RANGE, format!("bytes={start}-{end}"))
            .send()
            .await
            .map_err(|source| BenchError::FetchTransport { index, source })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(index, status = status.as_u16(), %body, "chunk request rejected");
            return Err(BenchError::Fetch {
                index,
                status: status.as_u16(),
                body,
            });
        }

        let payload = response
            .bytes()
            .await
            .map_err(|source| BenchError::FetchTransport { index, source })?;

        let expected = end - start + 1;
        if payload.len() as u64 != expected {
            return Err(BenchError::RangeMismatch {
                index,
                expected,
                actual: payload.len() as u64,
            });
        }

        tracing::debug!(index, status = status.as_u16(), "chunk downloaded");
        Ok(RangeChunk { index, payload })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::build_client;
    use crate::engine::chaos_responders::{RangeIgnoringResponder, RangeResponder};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn body() -> Vec<u8> {
        (0..4096u32).map(|i| (i % 251) as u8).collect()
    }

    #[tokio::test]
    async fn test_fetch_returns_requested_slice() {
        let server = MockServer::start().await;
        let body = body();
        Mock::given(method("GET"))
            .and(path("/download/4KB.bin"))
            .and(header("Range", "bytes=1000-1999"))
            .and(header("Cache-Control", "no-cache"))
            .respond_with(RangeResponder { body: body.clone() })
            .mount(&server)
            .await;

        let fetcher = RangeFetcher::new(
            build_client(false).unwrap(),
            &format!("{}/download/4KB.bin", server.uri()),
        );
        let chunk = fetcher.fetch(1000, 1999, 1).await.unwrap();

        assert_eq!(chunk.index, 1);
        assert_eq!(&chunk.payload[..], &body[1000..2000]);
    }

    #[tokio::test]
    async fn test_fetch_error_carries_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/download/4KB.bin"))
            .respond_with(ResponseTemplate::new(416).set_body_string("bad range"))
            .mount(&server)
            .await;

        let fetcher = RangeFetcher::new(
            build_client(false).unwrap(),
            &format!("{}/download/4KB.bin", server.uri()),
        );
        let err = fetcher.fetch(0, 99, 7).await.unwrap_err();

        match err {
            BenchError::Fetch { index, status, body } => {
                assert_eq!(index, 7);
                assert_eq!(status, 416);
                assert_eq!(body, "bad range");
            }
            other => panic!("expected Fetch error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_transport_error() {
        // Nothing listens on the discard port.
        let fetcher = RangeFetcher::new(build_client(false).unwrap(), "http://127.0.0.1:9/x.bin");
        let err = fetcher.fetch(0, 9, 2).await.unwrap_err();
        assert!(matches!(err, BenchError::FetchTransport { index: 2, .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn test_fetch_rejects_inverted_range() {
        let fetcher = RangeFetcher::new(build_client(false).unwrap(), "http://127.0.0.1:9/x.bin");
        let err = fetcher.fetch(100, 99, 4).await.unwrap_err();
        assert!(
            matches!(err, BenchError::InvalidRange { index: 4, start: 100, end: 99 }),
            "got {err:?}"
        );
    }

    #[tokio::test]
    async fn test_fetch_rejects_ignored_range() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/download/4KB.bin"))
            .respond_with(RangeIgnoringResponder { body: body() })
            .mount(&server)
            .await;

        let fetcher = RangeFetcher::new(
            build_client(false).unwrap(),
            &format!("{}/download/4KB.bin", server.uri()),
        );
        let err = fetcher.fetch(0, 1023, 0).await.unwrap_err();
        assert!(
            matches!(
                err,
                BenchError::RangeMismatch {
                    index: 0,
                    expected: 1024,
                    actual: 4096
                }
            ),
            "got {err:?}"
        );
    }
}
