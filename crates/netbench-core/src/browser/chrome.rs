//! Chrome DevTools Protocol implementation of [`BrowserSession`].

#![allow(deprecated)] // EmulateNetworkConditionsParams is deprecated upstream but still honored

use std::path::Path;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as CdpBrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::{
    SetDownloadBehaviorBehavior, SetDownloadBehaviorParams,
};
use chromiumoxide::cdp::browser_protocol::network::{
    ClearBrowserCacheParams, DisableParams, EmulateNetworkConditionsParams,
};
use chromiumoxide::Page;
use futures_util::StreamExt;
use tokio::task::JoinHandle;

use super::{BrowserSession, DownloadBehavior};
use crate::config::BrowserConfig;
use crate::network::NetworkConditions;
use crate::types::BenchError;

fn cdp_err(context: &str, err: impl std::fmt::Display) -> BenchError {
    BenchError::Browser(format!("{context}: {err}"))
}

/// One headless Chrome instance driving a single blank page.
pub struct ChromeSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
}

impl ChromeSession {
    /// Launch Chrome and open the page all trials run in.
    pub async fn launch(config: &BrowserConfig) -> Result<Self, BenchError> {
        let mut builder = CdpBrowserConfig::builder();
        if !config.headless {
            builder = builder.with_head();
        }
        if config.ignore_certificate_errors {
            builder = builder.arg("--ignore-certificate-errors");
        }
        if let Some(ref exe) = config.executable {
            builder = builder.chrome_executable(exe);
        }
        let cdp_config = builder
            .build()
            .map_err(|e| cdp_err("invalid browser config", e))?;

        let (browser, mut events) = Browser::launch(cdp_config)
            .await
            .map_err(|e| cdp_err("failed to launch browser", e))?;

        // The CDP connection only makes progress while its event stream is polled.
        let handler = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if let Err(e) = event {
                    tracing::debug!(error = %e, "browser event stream error");
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| cdp_err("failed to open page", e))?;

        tracing::info!(headless = config.headless, "browser session ready");
        Ok(Self {
            browser,
            page,
            handler,
        })
    }

    /// Close the browser and wait for the process to exit.
    pub async fn shutdown(mut self) -> Result<(), BenchError> {
        self.browser
            .close()
            .await
            .map_err(|e| cdp_err("failed to close browser", e))?;
        let _ = self.browser.wait().await;
        self.handler.abort();
        Ok(())
    }
}

#[async_trait]
impl BrowserSession for ChromeSession {
    async fn emulate_network_conditions(
        &mut self,
        conditions: &NetworkConditions,
    ) -> Result<(), BenchError> {
        let params = EmulateNetworkConditionsParams::builder()
            .offline(conditions.offline)
            .latency(conditions.latency)
            .download_throughput(conditions.download_throughput)
            .upload_throughput(conditions.upload_throughput)
            .build()
            .map_err(|e| cdp_err("invalid network conditions", e))?;
        self.page
            .execute(params)
            .await
            .map_err(|e| cdp_err("Network.emulateNetworkConditions", e))?;
        Ok(())
    }

    async fn set_download_behavior(
        &mut self,
        behavior: DownloadBehavior,
        download_dir: &Path,
    ) -> Result<(), BenchError> {
        let behavior = match behavior {
            DownloadBehavior::Allow => SetDownloadBehaviorBehavior::Allow,
            DownloadBehavior::Deny => SetDownloadBehaviorBehavior::Deny,
        };
        let params = SetDownloadBehaviorParams::builder()
            .behavior(behavior)
            .download_path(download_dir.to_string_lossy().into_owned())
            .events_enabled(true)
            .build()
            .map_err(|e| cdp_err("invalid download behavior", e))?;
        self.page
            .execute(params)
            .await
            .map_err(|e| cdp_err("Browser.setDownloadBehavior", e))?;
        Ok(())
    }

    async fn clear_browser_cache(&mut self) -> Result<(), BenchError> {
        self.page
            .execute(ClearBrowserCacheParams::default())
            .await
            .map_err(|e| cdp_err("Network.clearBrowserCache", e))?;
        Ok(())
    }

    async fn disable_network(&mut self) -> Result<(), BenchError> {
        self.page
            .execute(DisableParams::default())
            .await
            .map_err(|e| cdp_err("Network.disable", e))?;
        Ok(())
    }

    async fn navigate(&mut self, url: &str) -> Result<(), BenchError> {
        // Assigning location.href instead of a CDP Page.navigate: a download
        // response aborts the navigation, which Page.navigate reports as an error.
        let target = serde_json::to_string(url)
            .map_err(|e| cdp_err("cannot encode navigation target", e))?;
        self.page
            .evaluate(format!("location.href = {target}; undefined"))
            .await
            .map_err(|e| cdp_err("navigation failed", e))?;
        Ok(())
    }
}
