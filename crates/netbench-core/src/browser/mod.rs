pub mod chrome;

use std::path::Path;

use async_trait::async_trait;

use crate::network::NetworkConditions;
use crate::types::BenchError;

/// What the browser does with responses it would otherwise render or
/// prompt for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadBehavior {
    /// Save to the configured directory without prompting.
    Allow,
    Deny,
}

/// A single page session that can emulate network conditions and trigger
/// downloads. The trial runner owns it exclusively for the whole run.
#[async_trait]
pub trait BrowserSession: Send {
    async fn emulate_network_conditions(
        &mut self,
        conditions: &NetworkConditions,
    ) -> Result<(), BenchError>;

    async fn set_download_behavior(
        &mut self,
        behavior: DownloadBehavior,
        download_dir: &Path,
    ) -> Result<(), BenchError>;

    async fn clear_browser_cache(&mut self) -> Result<(), BenchError>;

    /// Stop network emulation.
    async fn disable_network(&mut self) -> Result<(), BenchError>;

    /// Same-origin navigation to `url`. Returns once the navigation has been
    /// issued, not when any resulting download finishes.
    async fn navigate(&mut self, url: &str) -> Result<(), BenchError>;
}
