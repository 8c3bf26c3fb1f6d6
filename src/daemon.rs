//! The polling loop.
//!
//! One cycle refreshes stale credentials, then walks every source in order:
//! fetch the catalog, normalize, skip what the ledger already knows, record
//! and deliver the rest. Cycles never overlap, which is what keeps the
//! ledger's check-then-insert safe without further locking.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Notify;
use tracing::{error, info, warn};

use crate::app::{run_isolated, AppContext, Result};
use crate::domain::{SessionCredential, SourceKind};
use crate::sources::{RawRecord, SourceAdapter};
use crate::store::Store;
use crate::transport::truncate_caption;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Sleep between cycles in seconds (default: 300 = 5 minutes)
    pub interval_secs: u64,
    /// Whether to run a cycle immediately on start
    pub update_on_start: bool,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            interval_secs: 300,
            update_on_start: true,
        }
    }
}

impl DaemonConfig {
    /// Parse interval string like "1h", "30m", "6h", "1d"
    pub fn parse_interval(s: &str) -> std::result::Result<u64, String> {
        let s = s.trim().to_lowercase();

        let (value, unit_secs, unit) = if let Some(hours) = s.strip_suffix('h') {
            (hours, 3600, "hours")
        } else if let Some(minutes) = s.strip_suffix('m') {
            (minutes, 60, "minutes")
        } else if let Some(days) = s.strip_suffix('d') {
            (days, 86400, "days")
        } else if let Some(secs) = s.strip_suffix('s') {
            (secs, 1, "seconds")
        } else {
            (s.as_str(), 1, "interval")
        };

        let count = value.parse::<u64>().map_err(|_| {
            format!(
                "Invalid {}: {}. Use format like '5m', '1h', '1d'",
                unit, value
            )
        })?;
        let secs = count
            .checked_mul(unit_secs)
            .ok_or_else(|| format!("Interval too large: {}", s))?;

        if secs == 0 {
            return Err("Interval must be positive".to_string());
        }
        Ok(secs)
    }

    /// Format interval for display
    pub fn format_interval(secs: u64) -> String {
        if secs >= 86400 && secs.is_multiple_of(86400) {
            format!("{}d", secs / 86400)
        } else if secs >= 3600 && secs.is_multiple_of(3600) {
            format!("{}h", secs / 3600)
        } else if secs >= 60 && secs.is_multiple_of(60) {
            format!("{}m", secs / 60)
        } else {
            format!("{}s", secs)
        }
    }
}

/// What one cycle did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Raw records returned by all adapters
    pub fetched: usize,
    /// Records newly written to the ledger
    pub new_comics: usize,
    pub delivered: usize,
    pub degraded: usize,
    /// Records the ledger already had
    pub known: usize,
    /// Records the normalizer rejected
    pub dropped: usize,
    pub credential_refreshed: bool,
    /// Recoverable failures, already reported to the operator
    pub failures: Vec<String>,
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} new ({} delivered, {} degraded), {} known, {} dropped, {} failures",
            self.new_comics,
            self.delivered,
            self.degraded,
            self.known,
            self.dropped,
            self.failures.len()
        )
    }
}

/// Daemon runner
pub struct Daemon {
    ctx: Arc<AppContext>,
    config: DaemonConfig,
    running: Arc<AtomicBool>,
    wake: Arc<Notify>,
}

impl Daemon {
    pub fn new(ctx: Arc<AppContext>, config: DaemonConfig) -> Self {
        Self {
            ctx,
            config,
            running: Arc::new(AtomicBool::new(true)),
            wake: Arc::new(Notify::new()),
        }
    }

    /// Run cycles until stopped. Only a ledger failure ends the loop with
    /// an error.
    pub async fn run(&self) -> Result<()> {
        self.install_signal_handler();

        info!(
            "panelcast started (interval: {}, subscribers: {}, PID: {})",
            DaemonConfig::format_interval(self.config.interval_secs),
            self.ctx.config.telegram.subscribers.len(),
            std::process::id()
        );

        self.sweep();

        if self.config.update_on_start {
            self.run_and_report().await?;
        }

        let interval = Duration::from_secs(self.config.interval_secs);

        while self.running.load(Ordering::SeqCst) {
            info!(
                "Sleeping for {}",
                DaemonConfig::format_interval(self.config.interval_secs)
            );
            tokio::select! {
                _ = tokio::time::sleep(interval) => {},
                _ = self.wake.notified() => {},
            }

            if !self.running.load(Ordering::SeqCst) {
                break;
            }

            self.run_and_report().await?;
        }

        info!("Daemon shutting down...");
        Ok(())
    }

    /// Stop after the in-flight cycle, if any.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.wake.notify_one();
    }

    /// One cycle plus its boundary handling: errors are logged and sent to
    /// the operator, and the scratch directory is swept whatever happened.
    pub async fn run_and_report(&self) -> Result<()> {
        let start = Utc::now();
        let result = self.run_cycle(start).await;
        self.sweep();

        match result {
            Ok(report) => {
                let elapsed = Utc::now().signed_duration_since(start);
                info!(
                    "Cycle complete: {} ({:.1}s)",
                    report,
                    elapsed.num_milliseconds() as f64 / 1000.0
                );
                Ok(())
            }
            Err(e) if e.is_fatal() => {
                error!("Fatal ledger error: {}", e);
                self.notify_operator(&format!("Fatal error, stopping: {}", e))
                    .await;
                Err(e)
            }
            Err(e) => {
                error!("Cycle failed: {}", e);
                self.notify_operator(&format!("Error: {}", e)).await;
                Ok(())
            }
        }
    }

    /// Run a single cycle as of `now`.
    pub async fn run_cycle(&self, now: DateTime<Utc>) -> Result<CycleReport> {
        let mut report = CycleReport::default();
        let credentials = self.refresh_credentials(now, &mut report).await?;

        for adapter in &self.ctx.sources {
            let kind = adapter.kind();
            let source = self.ctx.source(kind)?;
            let credential = credentials.get(&kind).cloned();

            let records = match self.fetch_catalog(adapter, credential).await {
                Ok(records) => records,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    self.record_failure(&mut report, format!("{}: {}", source.name, e))
                        .await;
                    continue;
                }
            };

            for record in records {
                report.fetched += 1;

                let mut comic = match self.ctx.normalizer.normalize(&source, &record) {
                    Ok(comic) => comic,
                    Err(e) => {
                        report.dropped += 1;
                        warn!("Dropped {} record: {}", source.name, e);
                        continue;
                    }
                };

                if self.ctx.store.comic_exists(source.id, &comic.native_id)? {
                    report.known += 1;
                    continue;
                }

                if let Err(e) = adapter.enrich(&mut comic).await {
                    warn!("Could not fetch details for {}: {}", comic.title, e);
                }

                let record = self.ctx.store.insert_comic(&comic)?;
                report.new_comics += 1;
                info!("New comic on {}: {}", source.name, record.title);

                let delivery = self.ctx.delivery.deliver(&record).await?;
                if delivery.is_degraded() {
                    report.degraded += 1;
                } else {
                    report.delivered += 1;
                }
            }
        }

        Ok(report)
    }

    async fn refresh_credentials(
        &self,
        now: DateTime<Utc>,
        report: &mut CycleReport,
    ) -> Result<HashMap<SourceKind, SessionCredential>> {
        let mut credentials = HashMap::new();

        for adapter in &self.ctx.sources {
            let kind = adapter.kind();
            if !kind.requires_credential() {
                continue;
            }
            let source = self.ctx.source(kind)?;

            match self
                .ctx
                .credentials
                .ensure_fresh(self.ctx.store.as_ref(), &source, now)
                .await
            {
                Ok(status) => {
                    if status.was_refreshed() {
                        info!("Refreshed session credential for {}", source.name);
                        report.credential_refreshed = true;
                    }
                    credentials.insert(kind, status.into_credential());
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    self.record_failure(
                        report,
                        format!("{} credential refresh: {}", source.name, e),
                    )
                    .await;
                    // Keep polling with the stale token.
                    if let Some(stale) = self.ctx.store.get_credential(source.id)? {
                        credentials.insert(kind, stale);
                    }
                }
            }
        }

        Ok(credentials)
    }

    async fn fetch_catalog(
        &self,
        adapter: &Arc<dyn SourceAdapter>,
        credential: Option<SessionCredential>,
    ) -> Result<Vec<RawRecord>> {
        let adapter = adapter.clone();
        let label = format!("{} catalog fetch", adapter.kind().name());

        run_isolated(&label, self.ctx.config.poll.fetch_timeout(), async move {
            adapter.fetch_catalog(credential.as_ref()).await
        })
        .await
    }

    async fn record_failure(&self, report: &mut CycleReport, message: String) {
        warn!("{}", message);
        self.notify_operator(&format!("Error: {}", message)).await;
        report.failures.push(message);
    }

    /// Best effort: a failed report is only logged.
    async fn notify_operator(&self, message: &str) {
        let Some(operator) = self.ctx.operator_id() else {
            return;
        };
        let text = truncate_caption(message, self.ctx.config.delivery.caption_limit);
        if let Err(e) = self.ctx.transport.send_text(operator, &text).await {
            error!("Failed to send error report to operator: {}", e);
        }
    }

    fn sweep(&self) {
        if let Err(e) = self.ctx.delivery.sweep_scratch_dir() {
            warn!("Failed to sweep scratch directory: {}", e);
        }
    }

    fn install_signal_handler(&self) {
        let running = self.running.clone();
        let wake = self.wake.clone();

        tokio::spawn(async move {
            wait_for_shutdown_signal().await;
            info!("Shutdown requested, finishing current cycle");
            running.store(false, Ordering::SeqCst);
            wake.notify_one();
        });
    }
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {},
                _ = sigint.recv() => {},
            }
        }
        _ => {
            warn!("Could not install signal handlers, falling back to Ctrl-C");
            if tokio::signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}
