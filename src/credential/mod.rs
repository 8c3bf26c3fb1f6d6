//! Session credential lifecycle for sources that sign their requests.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::app::{run_isolated, PanelcastError, Result};
use crate::domain::{SessionCredential, Source};
use crate::store::Store;

/// Credentials this old or older are replaced before polling.
pub const MAX_CREDENTIAL_AGE_DAYS: i64 = 20;

#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// One outbound call returning a new opaque session token.
    async fn fetch_fresh_token(&self) -> Result<String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialStatus {
    /// Still within its lifetime, used as stored
    Fresh(SessionCredential),
    /// Replaced this cycle
    Refreshed(SessionCredential),
}

impl CredentialStatus {
    pub fn credential(&self) -> &SessionCredential {
        match self {
            Self::Fresh(c) | Self::Refreshed(c) => c,
        }
    }

    pub fn into_credential(self) -> SessionCredential {
        match self {
            Self::Fresh(c) | Self::Refreshed(c) => c,
        }
    }

    pub fn was_refreshed(&self) -> bool {
        matches!(self, Self::Refreshed(_))
    }
}

pub struct CredentialManager {
    provider: Arc<dyn TokenProvider>,
    max_age: Duration,
    timeout: std::time::Duration,
}

impl CredentialManager {
    pub fn new(provider: Arc<dyn TokenProvider>, timeout: std::time::Duration) -> Self {
        Self {
            provider,
            max_age: Duration::days(MAX_CREDENTIAL_AGE_DAYS),
            timeout,
        }
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Return the source's credential, refreshing it first when stale.
    ///
    /// A failed refresh leaves the stored credential untouched and returns
    /// the error; the caller may keep polling with the stale token.
    pub async fn ensure_fresh<S: Store + ?Sized>(
        &self,
        store: &S,
        source: &Source,
        now: DateTime<Utc>,
    ) -> Result<CredentialStatus> {
        let credential = store
            .get_credential(source.id)?
            .ok_or_else(|| PanelcastError::CredentialMissing(source.name.clone()))?;

        if !credential.is_stale(now, self.max_age) {
            return Ok(CredentialStatus::Fresh(credential));
        }

        tracing::info!(
            "Credential for {} is {} days old, refreshing",
            source.name,
            credential.age(now).num_days()
        );

        let provider = self.provider.clone();
        let token = run_isolated(
            &format!("{} token refresh", source.name),
            self.timeout,
            async move { provider.fetch_fresh_token().await },
        )
        .await?;

        store.update_credential(source.id, &token, now)?;

        Ok(CredentialStatus::Refreshed(SessionCredential {
            token,
            created_at: now,
            ..credential
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    use crate::domain::{SourceKind, SourceSeed};
    use crate::store::SqliteStore;
    use crate::testing::FakeTokenProvider;

    fn store_with_credential(created_at: DateTime<Utc>) -> (SqliteStore, Source) {
        let store = SqliteStore::in_memory().unwrap();
        store
            .initialize(
                &[
                    SourceSeed::new(SourceKind::Bilibili, "https://manga.bilibili.com"),
                    SourceSeed::new(SourceKind::Kuaikan, "https://www.kuaikanmanhua.com"),
                ],
                "Mozilla/5.0",
            )
            .unwrap();
        let source = store.get_source("Bilibili").unwrap().unwrap();
        store
            .update_credential(source.id, "B-seeded", created_at)
            .unwrap();
        (store, source)
    }

    fn manager(provider: Arc<FakeTokenProvider>) -> CredentialManager {
        CredentialManager::new(provider, std::time::Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_no_refresh_before_twenty_days() {
        let created = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let (store, source) = store_with_credential(created);
        let provider = FakeTokenProvider::new();
        let manager = manager(provider.clone());

        for now in [
            created,
            created + Duration::days(10),
            created + Duration::days(20) - Duration::seconds(1),
        ] {
            let status = manager.ensure_fresh(&store, &source, now).await.unwrap();
            assert!(!status.was_refreshed());
            assert_eq!(status.credential().token, "B-seeded");
        }
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_refresh_at_twenty_days() {
        let created = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let (store, source) = store_with_credential(created);
        let provider = FakeTokenProvider::new();
        let manager = manager(provider.clone());

        let now = created + Duration::days(20);
        let status = manager.ensure_fresh(&store, &source, now).await.unwrap();

        assert!(status.was_refreshed());
        assert_eq!(status.credential().token, "fresh-1");
        assert_eq!(status.credential().created_at, now);
        assert_eq!(provider.calls(), 1);

        let stored = store.get_credential(source.id).unwrap().unwrap();
        assert_eq!(stored.token, "fresh-1");
        assert_eq!(stored.created_at, now);
        assert_eq!(stored.user_agent, "Mozilla/5.0");

        // The new stamp restarts the clock.
        let later = now + Duration::days(1);
        let status = manager.ensure_fresh(&store, &source, later).await.unwrap();
        assert!(!status.was_refreshed());
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_stale_credential() {
        let created = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let (store, source) = store_with_credential(created);
        let provider = FakeTokenProvider::failing();
        let manager = manager(provider.clone());

        let now = created + Duration::days(30);
        let err = manager.ensure_fresh(&store, &source, now).await.unwrap_err();
        assert!(!err.is_fatal());

        let stored = store.get_credential(source.id).unwrap().unwrap();
        assert_eq!(stored.token, "B-seeded");
        assert_eq!(stored.created_at, created);
    }

    #[tokio::test]
    async fn test_missing_credential() {
        let (store, _) = store_with_credential(Utc::now());
        let kuaikan = store.get_source("Kuaikan").unwrap().unwrap();
        let manager = manager(FakeTokenProvider::new());

        let err = manager
            .ensure_fresh(&store, &kuaikan, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, PanelcastError::CredentialMissing(_)));
    }
}
