use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateKind {
    New,
    Updated,
    Failed,
}

impl fmt::Display for UpdateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            UpdateKind::New => "new",
            UpdateKind::Updated => "update",
            UpdateKind::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// One notification-worthy change. Handlers receive these read-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateEvent {
    pub subject_name: String,
    pub pkgbase: String,
    /// Provided names that are notification subjects in their own right.
    pub alias_names: Vec<String>,
    pub kind: UpdateKind,
    pub old_version: Option<String>,
    pub new_version: Option<String>,
    pub architecture: Option<String>,
    pub repository: Option<String>,
    pub log_file: Option<String>,
    pub human_message: String,
}

impl UpdateEvent {
    pub fn dedup_key(&self) -> DedupKey {
        DedupKey::new(&self.subject_name, self.kind)
    }

    /// Copy of this event re-addressed to an implied recipient (pkgbase or alias).
    pub fn readdressed(&self, identity: &str) -> Self {
        Self {
            subject_name: identity.to_string(),
            alias_names: Vec::new(),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub identity: String,
    pub kind: UpdateKind,
}

impl DedupKey {
    pub fn new(identity: &str, kind: UpdateKind) -> Self {
        Self {
            identity: identity.to_string(),
            kind,
        }
    }
}

/// Keys already emitted in the current cycle.
#[derive(Debug, Default)]
pub struct DedupSet {
    seen: HashSet<DedupKey>,
}

impl DedupSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` the first time a key is offered.
    pub fn first_sighting(&mut self, identity: &str, kind: UpdateKind) -> bool {
        self.seen.insert(DedupKey::new(identity, kind))
    }
}
