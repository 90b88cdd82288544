//! Work manifests for the command-line runner
//!
//! A manifest lists already-enumerated items, each with a shell command:
//!
//! ```toml
//! [[items]]
//! id = "tests/test_db.py::test_create"
//! command = "pytest tests/test_db.py::test_create"
//!
//! [[items]]
//! id = "tests/test_db.py::test_update"
//! group = "db"
//! command = "pytest tests/test_db.py::test_update"
//! ```
//!
//! JSON with the same shape is accepted for `.json` files.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::process::Command;

use crate::models::{Verdict, WorkItem};

#[derive(Debug, Clone, Deserialize)]
pub struct ManifestItem {
    pub id: String,
    #[serde(default)]
    pub group: Option<String>,
    pub command: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub items: Vec<ManifestItem>,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest {}", path.display()))?;

        let manifest: Manifest = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content)
                .with_context(|| format!("Invalid JSON manifest {}", path.display()))?,
            _ => toml::from_str(&content)
                .with_context(|| format!("Invalid TOML manifest {}", path.display()))?,
        };

        manifest.validate()?;
        tracing::debug!("Loaded {} items from {}", manifest.items.len(), path.display());
        Ok(manifest)
    }

    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for item in &self.items {
            if item.id.trim().is_empty() {
                bail!("Manifest item with empty id");
            }
            if !seen.insert(item.id.as_str()) {
                bail!("Duplicate manifest item id: {}", item.id);
            }
            if item.command.trim().is_empty() {
                bail!("Manifest item '{}' has no command", item.id);
            }
        }
        Ok(())
    }

    pub fn work_items(&self) -> Vec<WorkItem> {
        self.items
            .iter()
            .map(|item| WorkItem {
                id: item.id.clone(),
                group_key: item.group.clone(),
            })
            .collect()
    }

    /// Runner executing each item's shell command
    pub fn shell_runner(&self) -> ShellRunner {
        ShellRunner {
            commands: self
                .items
                .iter()
                .map(|item| (item.id.clone(), item.command.clone()))
                .collect(),
        }
    }
}

/// Runs an item's command through the platform shell
///
/// Exit status 0 passes, any other status fails; a command that cannot be
/// started is an execution error.
#[derive(Debug, Clone)]
pub struct ShellRunner {
    commands: HashMap<String, String>,
}

impl ShellRunner {
    pub fn run(&self, item: &WorkItem) -> Result<Verdict> {
        let command = self
            .commands
            .get(&item.id)
            .with_context(|| format!("No command registered for item '{}'", item.id))?;

        let output = shell_command(command)
            .output()
            .with_context(|| format!("Failed to start command for '{}'", item.id))?;

        if output.status.success() {
            return Ok(Verdict::Passed);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let last_line = stderr.lines().rev().find(|l| !l.trim().is_empty());
        let detail = match last_line {
            Some(line) => format!("{} - {}", output.status, line.trim()),
            None => output.status.to_string(),
        };
        Ok(Verdict::Failed(detail))
    }
}

fn shell_command(command: &str) -> Command {
    if cfg!(windows) {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C").arg(command);
        cmd
    } else {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command);
        cmd
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_manifest(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_toml_manifest() {
        let file = write_manifest(
            ".toml",
            r#"
[[items]]
id = "a"
command = "true"

[[items]]
id = "b"
group = "g"
command = "false"
"#,
        );
        let manifest = Manifest::load(file.path()).unwrap();
        let items = manifest.work_items();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].group_key(), Some("g"));
    }

    #[test]
    fn test_load_json_manifest() {
        let file = write_manifest(".json", r#"{"items": [{"id": "a", "command": "true"}]}"#);
        assert_eq!(Manifest::load(file.path()).unwrap().items.len(), 1);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let file = write_manifest(
            ".toml",
            "[[items]]\nid = \"a\"\ncommand = \"true\"\n[[items]]\nid = \"a\"\ncommand = \"true\"\n",
        );
        let err = Manifest::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("Duplicate"));
    }

    #[cfg(unix)]
    #[test]
    fn test_shell_runner_verdicts() {
        let manifest = Manifest {
            items: vec![
                ManifestItem {
                    id: "ok".to_string(),
                    group: None,
                    command: "exit 0".to_string(),
                },
                ManifestItem {
                    id: "bad".to_string(),
                    group: None,
                    command: "echo broken >&2; exit 3".to_string(),
                },
            ],
        };
        let runner = manifest.shell_runner();
        assert_eq!(runner.run(&WorkItem::new("ok")).unwrap(), Verdict::Passed);
        match runner.run(&WorkItem::new("bad")).unwrap() {
            Verdict::Failed(detail) => assert!(detail.contains("broken")),
            Verdict::Passed => panic!("expected failure"),
        }
        assert!(runner.run(&WorkItem::new("unknown")).is_err());
    }
}
