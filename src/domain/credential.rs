use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Rotating auth material for a source that signs its requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCredential {
    pub source_id: i64,
    pub token: String,
    pub user_agent: String,
    pub created_at: DateTime<Utc>,
}

impl SessionCredential {
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.created_at)
    }

    pub fn is_stale(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        self.age(now) >= max_age
    }

    /// Cookie header value for signed catalog requests.
    pub fn cookie(&self) -> String {
        format!("buvid3={};", self.token)
    }
}
