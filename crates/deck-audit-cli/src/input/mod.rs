pub mod file;
pub mod stdin;

use deck_audit_core::calculator::SourceRecord;
use deck_audit_core::classifier::DisplayedGrid;
use deck_audit_core::orchestrator::{GridProvider, SourceProvider};
use deck_audit_core::AuditResult;

/// Source records on disk, read when the audit asks for them.
pub struct SourceFile {
    path: String,
}

impl SourceFile {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
        }
    }
}

impl SourceProvider for SourceFile {
    fn load_records(self) -> AuditResult<Vec<SourceRecord>> {
        tracing::debug!(path = %self.path, "loading source records");
        file::read_records(&self.path)
    }
}

/// Where the extracted grid comes from.
pub enum GridInput {
    File(String),
    Stdin,
}

impl GridInput {
    /// "-" selects stdin.
    pub fn from_arg(arg: &str) -> Self {
        if arg == "-" {
            GridInput::Stdin
        } else {
            GridInput::File(arg.to_string())
        }
    }
}

impl GridProvider for GridInput {
    fn load_grid(self) -> AuditResult<DisplayedGrid> {
        match self {
            GridInput::File(path) => {
                tracing::debug!(%path, "loading deck grid");
                file::read_grid(&path)
            }
            GridInput::Stdin => stdin::read_stdin(),
        }
    }
}
