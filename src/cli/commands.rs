use std::sync::Arc;

use chrono::Utc;

use crate::app::{AppContext, PanelcastError, Result};
use crate::daemon::{CycleReport, Daemon, DaemonConfig};
use crate::domain::SourceKind;
use crate::store::Store;

pub fn init(ctx: &AppContext) -> Result<()> {
    if ctx.bootstrap()? {
        println!("Initialized database with {} sources", SourceKind::ALL.len());
    } else {
        println!("Database already initialized");
    }
    Ok(())
}

pub async fn run(
    ctx: Arc<AppContext>,
    interval: Option<&str>,
    no_initial_update: bool,
) -> Result<()> {
    check_delivery_config(&ctx)?;
    ctx.bootstrap()?;

    let interval_secs = match interval {
        Some(s) => DaemonConfig::parse_interval(s).map_err(PanelcastError::Other)?,
        None => ctx.config.poll.interval_secs,
    };

    let daemon = Daemon::new(
        ctx,
        DaemonConfig {
            interval_secs,
            update_on_start: !no_initial_update,
        },
    );
    daemon.run().await
}

pub async fn once(ctx: Arc<AppContext>) -> Result<CycleReport> {
    check_delivery_config(&ctx)?;
    ctx.bootstrap()?;

    let daemon = Daemon::new(ctx.clone(), DaemonConfig::default());
    let report = daemon.run_cycle(Utc::now()).await;
    if let Err(e) = ctx.delivery.sweep_scratch_dir() {
        tracing::warn!("Failed to sweep scratch directory: {}", e);
    }
    let report = report?;

    println!("Cycle complete: {}", report);
    for failure in &report.failures {
        eprintln!("  ! {}", failure);
    }
    Ok(report)
}

pub fn list_comics(ctx: &AppContext, source: Option<&str>, limit: usize) -> Result<()> {
    let sources = ctx.store.get_sources()?;

    let source_id = match source {
        Some(name) => {
            let kind = SourceKind::from_name(name)
                .ok_or_else(|| PanelcastError::SourceNotFound(name.to_string()))?;
            Some(ctx.source(kind)?.id)
        }
        None => None,
    };

    let comics = ctx.store.list_comics(source_id, limit)?;
    if comics.is_empty() {
        println!("No comics");
        return Ok(());
    }

    for comic in comics {
        let source_name = sources
            .iter()
            .find(|s| s.id == comic.source_id)
            .map(|s| s.name.as_str())
            .unwrap_or("?");
        println!(
            "{} [{}] {}\n  {}",
            comic.discovered_at.format("%Y-%m-%d %H:%M"),
            source_name,
            comic.title,
            comic.url
        );
    }

    Ok(())
}

pub fn status(ctx: &AppContext) -> Result<()> {
    let sources = ctx.store.get_sources()?;
    if sources.is_empty() {
        println!("Database not initialized, run `panelcast init`");
        return Ok(());
    }

    let now = Utc::now();
    let max_age = ctx.credentials.max_age();

    for source in sources {
        let count = ctx.store.count_comics(source.id)?;
        println!("{} ({} comics)\n  {}", source.name, count, source.url);

        if let Some(credential) = ctx.store.get_credential(source.id)? {
            let state = if credential.is_stale(now, max_age) {
                "stale"
            } else {
                "fresh"
            };
            println!(
                "  credential: {}, {} days old",
                state,
                credential.age(now).num_days()
            );
        }
    }

    println!(
        "Subscribers: {}, operator: {}",
        ctx.config.telegram.subscribers.len(),
        ctx.operator_id()
            .map(|id| id.to_string())
            .unwrap_or_else(|| "none".to_string())
    );
    Ok(())
}

fn check_delivery_config(ctx: &AppContext) -> Result<()> {
    if ctx.config.telegram.bot_token.trim().is_empty() {
        return Err(PanelcastError::Other(
            "No bot token configured: set telegram.bot_token or PANELCAST_BOT_TOKEN".to_string(),
        ));
    }
    if ctx.config.telegram.subscribers.is_empty() {
        tracing::warn!("No subscribers configured, new comics will only be recorded");
    }
    Ok(())
}
