// crates/issue-monitor-sources/src/registry.rs
// ============================================================================
// Module: Source Registry
// Description: Construction of built-in source adapters from definitions.
// Purpose: Turn declarative source definitions into ready adapters.
// Dependencies: issue-monitor-core, serde, thiserror
// ============================================================================

//! ## Overview
//! A [`SourceDefinition`] names one built-in adapter kind and its settings.
//! [`build_source`] validates the definition and returns the adapter behind
//! the core [`SourceAdapter`] interface so the run coordinator can schedule
//! it without knowing the concrete type.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use issue_monitor_core::SourceAdapter;
use issue_monitor_core::SourceId;
use serde::Deserialize;
use thiserror::Error;

use crate::FileSource;
use crate::FileSourceConfig;
use crate::GithubIssuesSource;
use crate::GithubSourceConfig;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while constructing a source adapter.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum SourceSetupError {
    /// Source definition failed validation.
    #[error("invalid source definition: {0}")]
    Invalid(String),
    /// Transport client could not be created.
    #[error("source client error: {0}")]
    Client(String),
}

// ============================================================================
// SECTION: Definitions
// ============================================================================

/// Declarative definition of a built-in source adapter.
///
/// Serialized with an inline `type` tag (`github` or `file`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceDefinition {
    /// GitHub repository issues.
    Github(GithubSourceConfig),
    /// Local JSON candidate file.
    File(FileSourceConfig),
}

impl SourceDefinition {
    /// Returns the adapter kind label.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Github(_) => "github",
            Self::File(_) => "file",
        }
    }
}

// ============================================================================
// SECTION: Construction
// ============================================================================

/// Builds the adapter described by `definition` for source `id`.
///
/// # Errors
///
/// Returns [`SourceSetupError`] when the definition is invalid or its
/// transport cannot be initialized.
pub fn build_source(
    id: SourceId,
    definition: SourceDefinition,
) -> Result<Arc<dyn SourceAdapter>, SourceSetupError> {
    if id.as_str().trim().is_empty() {
        return Err(SourceSetupError::Invalid("source id must be non-empty".to_string()));
    }
    match definition {
        SourceDefinition::Github(config) => Ok(Arc::new(GithubIssuesSource::new(id, config)?)),
        SourceDefinition::File(config) => {
            if config.path.as_os_str().is_empty() {
                return Err(SourceSetupError::Invalid("file source path is empty".to_string()));
            }
            Ok(Arc::new(FileSource::new(id, config)))
        }
    }
}
