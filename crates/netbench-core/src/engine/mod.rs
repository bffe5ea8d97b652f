// Direct-HTTP transfer path: range fetches and chunked reassembly.

pub mod chunked;
pub mod range;

#[cfg(test)]
pub(crate) mod chaos_responders;

use crate::types::BenchError;

pub(crate) const USER_AGENT: &str = "netbench/0.1.0";

/// Build the HTTP client shared by every range request of one download.
pub fn build_client(accept_invalid_certs: bool) -> Result<reqwest::Client, BenchError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .danger_accept_invalid_certs(accept_invalid_certs)
        .build()
        .map_err(BenchError::Network)
}
