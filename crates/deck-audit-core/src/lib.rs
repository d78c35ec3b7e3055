pub mod calculator;
pub mod classifier;
pub mod comparator;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod parser;
pub mod report;
pub mod tolerance;
pub mod types;

pub use error::AuditError;
pub use types::*;

pub use calculator::{compute, compute_with_metadata, ExpectedValues, SourceRecord};
pub use classifier::{classify, DisplayedGrid, DisplayedTable, GridCell};
pub use comparator::{compare, Outcome};
pub use config::AuditConfig;
pub use orchestrator::{audit, Auditor, CollectingSink, ReportSink, RunState, TracingSink};
pub use parser::{parse_display, DisplayValue};
pub use report::{Severity, ValidationReport, Verdict};
pub use tolerance::TolerancePolicy;

/// Standard result type for all deck-audit computations
pub type AuditResult<T> = Result<T, AuditError>;
