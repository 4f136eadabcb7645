//! Operation catalog: the ordered menu of actions the dashboard offers.
//!
//! The catalog is plain data. Each privileged entry is an
//! [`OperationDescriptor`] naming a program and a fixed argument vector; the
//! dashboard never interprets the shell text inside it.

use serde::{Deserialize, Serialize};

/// An external process that has not been started yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationDescriptor {
    /// Display name, also used in status lines
    pub title: String,
    /// Executable path or name resolved through PATH
    pub program: String,
    /// Fixed argument vector
    #[serde(default)]
    pub args: Vec<String>,
    /// Whether the credential check must pass before the process starts
    #[serde(default = "default_requires_auth")]
    pub requires_auth: bool,
}

fn default_requires_auth() -> bool {
    true
}

impl OperationDescriptor {
    /// Create a descriptor for `program` with the given arguments.
    pub fn new(
        title: impl Into<String>,
        program: impl Into<String>,
        args: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            title: title.into(),
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            requires_auth: true,
        }
    }

    /// Create a descriptor that runs `script` through `sh -c`.
    pub fn shell(title: impl Into<String>, script: impl Into<String>) -> Self {
        Self::new(title, "sh", ["-c".to_string(), script.into()])
    }

    /// Mark whether this operation is gated by the credential check.
    pub fn with_auth(mut self, requires_auth: bool) -> Self {
        self.requires_auth = requires_auth;
        self
    }

    /// The command line as it would be typed, for logging.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// What selecting a menu entry does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuAction {
    /// Run an external operation
    Run(OperationDescriptor),
    /// Report where the application log is written
    ShowLogs,
    /// Quit the dashboard
    Exit,
}

/// One line of the menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub title: String,
    pub action: MenuAction,
}

impl CatalogEntry {
    fn run(descriptor: OperationDescriptor) -> Self {
        Self {
            title: descriptor.title.clone(),
            action: MenuAction::Run(descriptor),
        }
    }
}

/// Ordered, read-only list of menu entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    /// The built-in menu.
    pub fn builtin() -> Self {
        Self::with_operations(default_operations())
    }

    /// Build a menu from `operations` followed by the fixed `View Logs` and
    /// `Exit` entries.
    pub fn with_operations(operations: Vec<OperationDescriptor>) -> Self {
        let mut entries: Vec<CatalogEntry> = operations.into_iter().map(CatalogEntry::run).collect();
        entries.push(CatalogEntry {
            title: "View Logs".into(),
            action: MenuAction::ShowLogs,
        });
        entries.push(CatalogEntry {
            title: "Exit".into(),
            action: MenuAction::Exit,
        });
        Self { entries }
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&CatalogEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find an entry by its menu title.
    pub fn find(&self, title: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.title == title)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Operations offered when the configuration does not list its own.
pub fn default_operations() -> Vec<OperationDescriptor> {
    vec![
        OperationDescriptor::shell(
            "System Cleanup",
            "sudo apt-get autoremove -y && sudo apt-get clean",
        ),
        OperationDescriptor::shell("System Updates", "sudo apt-get update"),
        OperationDescriptor::shell(
            "Maintenance",
            "sudo journalctl --vacuum-size=100M --vacuum-time=2weeks",
        ),
        OperationDescriptor::shell(
            "Dev Caches",
            "docker system prune -f; npm cache clean --force",
        )
        .with_auth(false),
    ]
}
