// Wiremock responders for the range-fetch path.
//
// Each one serves a fixed body and misbehaves in one specific way:
// ignoring ranges, answering some ranges late, or failing one range.

#![cfg(test)]

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Parse `bytes=<start>-<end>` from the request, if present.
fn requested_range(request: &wiremock::Request) -> Option<(usize, usize)> {
    let value = request.headers.get(&reqwest::header::RANGE)?.to_str().ok()?;
    let (start, end) = value.trim_start_matches("bytes=").split_once('-')?;
    Some((start.parse().ok()?, end.parse().ok()?))
}

fn partial_content(body: &[u8], start: usize, end: usize) -> wiremock::ResponseTemplate {
    let slice = &body[start..=end];
    wiremock::ResponseTemplate::new(206)
        .set_body_bytes(slice.to_vec())
        .insert_header("Content-Length", slice.len().to_string().as_str())
        .insert_header(
            "Content-Range",
            format!("bytes {start}-{end}/{}", body.len()).as_str(),
        )
}

fn full_content(body: &[u8]) -> wiremock::ResponseTemplate {
    wiremock::ResponseTemplate::new(200)
        .set_body_bytes(body.to_vec())
        .insert_header("Content-Length", body.len().to_string().as_str())
}

/// Honors `Range` with a 206 slice; full body otherwise.
pub struct RangeResponder {
    pub body: Vec<u8>,
}

impl wiremock::Respond for RangeResponder {
    fn respond(&self, request: &wiremock::Request) -> wiremock::ResponseTemplate {
        match requested_range(request) {
            Some((start, end)) => partial_content(&self.body, start, end),
            None => full_content(&self.body),
        }
    }
}

/// Ignores the `Range` header and always returns the full body with a 200.
pub struct RangeIgnoringResponder {
    pub body: Vec<u8>,
}

impl wiremock::Respond for RangeIgnoringResponder {
    fn respond(&self, _request: &wiremock::Request) -> wiremock::ResponseTemplate {
        full_content(&self.body)
    }
}

/// Serves ranges correctly, but delays the ranges starting at earlier
/// offsets the most, so responses complete in reverse request order.
pub struct ReverseOrderResponder {
    pub body: Vec<u8>,
    pub chunk_size: usize,
    pub step: Duration,
}

impl wiremock::Respond for ReverseOrderResponder {
    fn respond(&self, request: &wiremock::Request) -> wiremock::ResponseTemplate {
        let Some((start, end)) = requested_range(request) else {
            return full_content(&self.body);
        };
        let chunks = self.body.len().div_ceil(self.chunk_size);
        let index = start / self.chunk_size;
        let delay = self.step * (chunks - index) as u32;
        partial_content(&self.body, start, end).set_delay(delay)
    }
}

/// Serves ranges correctly except the one starting at `fail_range_start`,
/// which gets a 500.
pub struct SelectiveFailRangeResponder {
    pub body: Vec<u8>,
    pub fail_range_start: usize,
}

impl wiremock::Respond for SelectiveFailRangeResponder {
    fn respond(&self, request: &wiremock::Request) -> wiremock::ResponseTemplate {
        match requested_range(request) {
            Some((start, _)) if start == self.fail_range_start => {
                wiremock::ResponseTemplate::new(500).set_body_string("chunk unavailable")
            }
            Some((start, end)) => partial_content(&self.body, start, end),
            None => full_content(&self.body),
        }
    }
}

/// Serves ranges after a fixed delay and records when each request arrived.
#[derive(Clone)]
pub struct ArrivalRecordingResponder {
    pub body: Vec<u8>,
    pub delay: Duration,
    pub arrivals: Arc<Mutex<Vec<Instant>>>,
}

impl ArrivalRecordingResponder {
    pub fn new(body: Vec<u8>, delay: Duration) -> Self {
        Self {
            body,
            delay,
            arrivals: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Largest number of requests that arrived within any `window`. With a
    /// window shorter than `delay`, that is the peak number in flight.
    pub fn peak_within(&self, window: Duration) -> usize {
        let mut arrivals = self.arrivals.lock().unwrap().clone();
        arrivals.sort();
        (0..arrivals.len())
            .map(|i| {
                arrivals[i..]
                    .iter()
                    .take_while(|t| t.duration_since(arrivals[i]) < window)
                    .count()
            })
            .max()
            .unwrap_or(0)
    }
}

impl wiremock::Respond for ArrivalRecordingResponder {
    fn respond(&self, request: &wiremock::Request) -> wiremock::ResponseTemplate {
        self.arrivals.lock().unwrap().push(Instant::now());
        match requested_range(request) {
            Some((start, end)) => partial_content(&self.body, start, end),
            None => full_content(&self.body),
        }
        .set_delay(self.delay)
    }
}
