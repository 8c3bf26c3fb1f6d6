//! # Panelcast
//!
//! Polls Chinese comic platforms for newly listed titles and announces each
//! one exactly once to a set of Telegram chats.
//!
//! ## Architecture
//!
//! One cycle runs the pipeline below for every source, in order:
//!
//! ```text
//! Credential → Source adapter → Normalizer → Ledger → Delivery → Transport
//! ```
//!
//! - [`credential`]: keeps the Bilibili session token younger than 20 days
//! - [`sources`]: per-platform catalog fetching
//! - [`normalizer`]: raw records to canonical comic descriptors
//! - [`store`]: SQLite ledger of everything already delivered
//! - [`delivery`]: cover download, JPEG re-encode and fan-out
//! - [`transport`]: Telegram Bot API
//!
//! ## Quick Start
//!
//! ```bash
//! # Seed the ledger
//! panelcast init
//!
//! # Poll every five minutes
//! PANELCAST_BOT_TOKEN=123:ABC panelcast run --interval 5m
//!
//! # What has been announced so far
//! panelcast list --limit 10
//! ```

/// Application context, task isolation and error types.
///
/// The [`AppContext`](app::AppContext) struct wires together all components.
pub mod app;

/// Command-line interface using clap.
///
/// - `init` - Create the database and seed sources
/// - `run` - Poll until stopped
/// - `once` - Run a single cycle
/// - `list` - Show delivered comics
/// - `status` - Show sources and credential age
pub mod cli;

/// Configuration loaded from `~/.config/panelcast/config.toml`.
pub mod config;

/// Session credential freshness for sources that need one.
pub mod credential;

/// The polling loop and its per-cycle report.
pub mod daemon;

/// Cover download, re-encode and per-subscriber delivery.
pub mod delivery;

/// Core domain models.
///
/// - [`Source`](domain::Source): a polled platform
/// - [`ComicRecord`](domain::ComicRecord): a delivered comic
/// - [`SessionCredential`](domain::SessionCredential): per-source session token
pub mod domain;

/// HTTP fetching of cover images.
pub mod fetcher;

/// Raw catalog records to canonical descriptors.
pub mod normalizer;

/// Per-platform catalog adapters.
pub mod sources;

/// SQLite persistence layer.
///
/// - [`Store`](store::Store): Trait defining storage operations
/// - [`SqliteStore`](store::SqliteStore): SQLite implementation
pub mod store;

/// Outbound chat messages.
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;
