// Sequential trial scheduler driving one browser session through the matrix.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::browser::{BrowserSession, DownloadBehavior};
use crate::config::BenchConfig;
use crate::network::ProfileCatalog;
use crate::report;
use crate::types::{BenchError, TransferMode, TrialRecord, TrialSpec};
use crate::watcher::CompletionWatcher;

/// The parts of the configuration that define the trial matrix.
#[derive(Debug, Clone)]
pub struct TrialPlan {
    pub base_url: String,
    pub runs: u32,
    pub modes: Vec<TransferMode>,
    pub file_sizes: Vec<String>,
    pub download_dir: PathBuf,
}

impl TrialPlan {
    pub fn from_config(config: &BenchConfig) -> Self {
        Self {
            base_url: config.server.base_url.clone(),
            runs: config.matrix.runs,
            modes: config.matrix.modes.clone(),
            file_sizes: config.matrix.file_sizes.clone(),
            download_dir: PathBuf::from(&config.downloads.download_dir),
        }
    }
}

/// Runs every (run, profile, mode, size) combination one at a time.
///
/// Network emulation is applied to the single shared session, so trials must
/// never overlap. A failed trial is logged and left out of the results; the
/// run carries on with the next combination.
pub struct TrialRunner<S: BrowserSession> {
    session: S,
    catalog: ProfileCatalog,
    plan: TrialPlan,
    watcher: CompletionWatcher,
}

impl<S: BrowserSession> TrialRunner<S> {
    pub fn new(session: S, catalog: ProfileCatalog, plan: TrialPlan, watcher: CompletionWatcher) -> Self {
        Self {
            session,
            catalog,
            plan,
            watcher,
        }
    }

    /// Every trial in execution order: run, then profile, then mode, then size.
    pub fn trials(&self) -> impl Iterator<Item = TrialSpec> + '_ {
        (0..self.plan.runs).flat_map(move |run_index| {
            self.catalog.iter().flat_map(move |profile| {
                self.plan.modes.iter().flat_map(move |&mode| {
                    self.plan.file_sizes.iter().map(move |size| TrialSpec {
                        run_index,
                        profile: profile.clone(),
                        mode,
                        size_label: size.clone(),
                    })
                })
            })
        })
    }

    pub fn plan(&self) -> &TrialPlan {
        &self.plan
    }

    /// Hand the session back, e.g. to shut the browser down.
    pub fn into_session(self) -> S {
        self.session
    }

    /// Execute the whole matrix, appending one record per successful trial.
    pub async fn run(&mut self, records: &mut Vec<TrialRecord>) -> Result<(), BenchError> {
        tokio::fs::create_dir_all(&self.plan.download_dir).await?;
        let download_dir = std::path::absolute(&self.plan.download_dir)?;

        let trials: Vec<TrialSpec> = self.trials().collect();
        let total = trials.len();
        tracing::info!(
            trials = total,
            runs = self.plan.runs,
            profiles = self.catalog.len(),
            dir = %download_dir.display(),
            "starting trial matrix"
        );

        for (n, spec) in trials.iter().enumerate() {
            let url = spec.resource_url(&self.plan.base_url);
            let artifact = download_dir.join(spec.artifact_name());
            tracing::info!(
                trial = n + 1,
                of = total,
                run = spec.run_index + 1,
                runs = self.plan.runs,
                profile = %spec.profile.label,
                %url,
                "testing network condition"
            );

            let outcome = self.run_trial(spec, &url, &download_dir, &artifact).await;

            // Emulation is always switched off, whatever happened above.
            if let Err(e) = self.session.disable_network().await {
                tracing::error!(error = %e, "failed to disable network emulation");
            }

            match outcome {
                Ok(duration) => {
                    let record = TrialRecord {
                        url: url.clone(),
                        speed: spec.profile.label.clone(),
                        run: spec.run_index + 1,
                        duration_secs: duration_secs(duration),
                    };
                    tracing::info!(
                        %url,
                        profile = %record.speed,
                        duration_s = record.duration_secs,
                        "download completed"
                    );
                    records.push(record);

                    match tokio::fs::remove_file(&artifact).await {
                        Ok(()) => tracing::debug!(path = %artifact.display(), "deleted artifact"),
                        Err(e) => tracing::error!(
                            path = %artifact.display(),
                            error = %e,
                            "failed to delete artifact"
                        ),
                    }
                }
                Err(e) => {
                    tracing::error!(%url, profile = %spec.profile.label, error = %e, "trial failed");
                }
            }
        }

        tracing::info!(completed = records.len(), of = total, "trial matrix finished");
        Ok(())
    }

    /// Apply conditions, trigger the download and time it.
    async fn run_trial(
        &mut self,
        spec: &TrialSpec,
        url: &str,
        download_dir: &Path,
        artifact: &Path,
    ) -> Result<Duration, BenchError> {
        // A leftover file would satisfy the watcher before the download starts.
        if tokio::fs::try_exists(artifact).await? {
            tracing::warn!(path = %artifact.display(), "removing stale artifact");
            tokio::fs::remove_file(artifact).await?;
        }

        self.session
            .emulate_network_conditions(&spec.profile.conditions)
            .await?;
        self.session
            .set_download_behavior(DownloadBehavior::Allow, download_dir)
            .await?;
        self.session.clear_browser_cache().await?;

        let start = Instant::now();
        self.session.navigate(url).await?;
        self.watcher.wait_for(artifact).await?;
        Ok(start.elapsed())
    }
}

/// Seconds at millisecond resolution.
fn duration_secs(d: Duration) -> f64 {
    d.as_millis() as f64 / 1000.0
}

/// Run the full matrix against `session` and write the report.
///
/// The config is validated first. Once the matrix has started, the report is
/// written from whatever was collected, even if the matrix stopped early. The
/// session is handed back on every path so the caller can shut it down.
pub async fn run_benchmark<S: BrowserSession>(
    config: &BenchConfig,
    session: S,
) -> (S, Result<Vec<TrialRecord>, BenchError>) {
    if let Err(e) = config.validate() {
        return (session, Err(e));
    }

    let catalog = ProfileCatalog::generate(&config.speed_range);
    let watcher = CompletionWatcher::new(
        Duration::from_millis(config.downloads.timeout_ms),
        Duration::from_millis(config.downloads.poll_interval_ms),
    );
    let mut runner = TrialRunner::new(session, catalog, TrialPlan::from_config(config), watcher);

    let mut records = Vec::new();
    let outcome = runner.run(&mut records).await;
    if let Err(ref e) = outcome {
        tracing::error!(error = %e, "trial matrix aborted");
    }

    let report_path = Path::new(&config.report.path);
    let written = report::write(report_path, &records);
    if written.is_ok() {
        tracing::info!(path = %report_path.display(), rows = records.len(), "results saved");
    }

    let session = runner.into_session();
    (session, outcome.and(written).map(|()| records))
}
