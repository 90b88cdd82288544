//! Work items and group-key resolution

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SchedulerError;

/// Separator between the file part and the name part of a node id
const NODE_ID_SEPARATOR: &str = "::";

/// A single unit of work handed over by the host framework
///
/// Only `id` and `group_key` are read by the scheduler. An empty group key
/// is the same as no group key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: String,
    #[serde(default, alias = "group", skip_serializing_if = "Option::is_none")]
    pub group_key: Option<String>,
}

impl WorkItem {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            group_key: None,
        }
    }

    pub fn with_group(mut self, key: impl Into<String>) -> Self {
        self.group_key = Some(key.into());
        self
    }

    /// Explicit group key, if any
    pub fn group_key(&self) -> Option<&str> {
        self.group_key.as_deref().filter(|key| !key.is_empty())
    }

    /// Group key under a grouping mode
    ///
    /// Explicit keys win. Otherwise a key is derived only from ids in the
    /// `path::name` node-id form; any other id has no group affinity.
    pub fn resolve_group_key(&self, mode: GroupingMode) -> Option<ResolvedGroup> {
        if mode == GroupingMode::None {
            return None;
        }
        if let Some(key) = self.group_key() {
            return Some(ResolvedGroup::Explicit(key.to_string()));
        }

        let (file_path, _) = self.id.split_once(NODE_ID_SEPARATOR)?;
        if file_path.is_empty() {
            return None;
        }

        match mode {
            GroupingMode::File => Some(ResolvedGroup::Derived(file_path.to_string())),
            GroupingMode::Package => {
                let package = file_path
                    .rsplit_once('/')
                    .map(|(dir, _)| dir)
                    .filter(|dir| !dir.is_empty())
                    .unwrap_or(".");
                Some(ResolvedGroup::Derived(package.to_string()))
            }
            GroupingMode::None => None,
        }
    }
}

/// Where a resolved group key came from
///
/// Derived and explicit keys live in separate namespaces: an explicit group
/// `"db"` never merges with items whose file happens to be `db`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResolvedGroup {
    Explicit(String),
    Derived(String),
}

impl ResolvedGroup {
    pub fn key(&self) -> &str {
        match self {
            ResolvedGroup::Explicit(key) | ResolvedGroup::Derived(key) => key,
        }
    }

    pub fn into_key(self) -> String {
        match self {
            ResolvedGroup::Explicit(key) | ResolvedGroup::Derived(key) => key,
        }
    }
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.group_key() {
            Some(key) => write!(f, "{} [{}]", self.id, key),
            None => write!(f, "{}", self.id),
        }
    }
}

/// How items are bucketed into groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupingMode {
    #[default]
    None,
    File,
    Package,
}

impl GroupingMode {
    pub fn is_enabled(&self) -> bool {
        *self != GroupingMode::None
    }

    pub fn name(&self) -> &'static str {
        match self {
            GroupingMode::None => "none",
            GroupingMode::File => "file",
            GroupingMode::Package => "package",
        }
    }
}

impl fmt::Display for GroupingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GroupingMode {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" | "off" | "false" => Ok(GroupingMode::None),
            "file" | "true" => Ok(GroupingMode::File),
            "package" => Ok(GroupingMode::Package),
            other => Err(SchedulerError::invalid(format!(
                "unknown task grouping '{other}' (expected file or package)"
            ))),
        }
    }
}
