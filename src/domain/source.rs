use serde::{Deserialize, Serialize};

/// A catalog site known to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub id: i64,
    pub name: String,
    pub url: String,
}

/// The catalog sites panelcast knows how to poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Bilibili,
    Kuaikan,
}

impl SourceKind {
    /// Polling order of a cycle.
    pub const ALL: [SourceKind; 2] = [SourceKind::Bilibili, SourceKind::Kuaikan];

    pub fn name(self) -> &'static str {
        match self {
            SourceKind::Bilibili => "Bilibili",
            SourceKind::Kuaikan => "Kuaikan",
        }
    }

    /// Whether catalog requests must carry a session credential.
    pub fn requires_credential(self) -> bool {
        matches!(self, SourceKind::Bilibili)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name))
    }
}

/// Row inserted by the ledger bootstrap.
#[derive(Debug, Clone)]
pub struct SourceSeed {
    pub name: String,
    pub url: String,
    pub credentialed: bool,
}

impl SourceSeed {
    pub fn new(kind: SourceKind, url: impl Into<String>) -> Self {
        Self {
            name: kind.name().to_string(),
            url: url.into(),
            credentialed: kind.requires_credential(),
        }
    }
}
