use serde::{Deserialize, Serialize};

/// Which groups a run should execute, by description. Empty means all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Selection {
    groups: Vec<String>,
}

impl Selection {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn groups<I, S>(groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            groups: groups.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_all(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn matches(&self, description: &str) -> bool {
        self.is_all() || self.groups.iter().any(|g| g == description)
    }

    pub fn names(&self) -> &[String] {
        &self.groups
    }

    /// Encode for handing to a child process. Descriptions are free text, so
    /// a JSON array is used rather than a separator.
    pub fn to_env(&self) -> String {
        serde_json::to_string(&self.groups).unwrap_or_else(|_| "[]".into())
    }

    pub fn from_env(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}
