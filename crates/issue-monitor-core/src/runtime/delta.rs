// crates/issue-monitor-core/src/runtime/delta.rs
// ============================================================================
// Module: Issue Monitor Delta Engine
// Description: Classifies a candidate batch into new and known identifiers.
// Purpose: Compute the genuinely new subset of a fetch in a stable order.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! The delta engine is read-only with respect to the identifier store. It
//! rejects candidates that claim a different source or carry a reference
//! the discovery log cannot hold, collapses duplicate identifiers, sorts by
//! `(observed_at, external_id)`, and partitions the result into new and
//! known identifiers. New issues are stamped with the run's discovery date,
//! never with `observed_at`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use crate::core::CandidateIssue;
use crate::core::DiscoveredIssue;
use crate::core::DiscoveryDate;
use crate::core::IssueIdentifier;
use crate::core::SourceId;
use crate::interfaces::IdentifierStore;
use crate::interfaces::SourceWarning;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Classification of one source's candidate batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delta {
    /// New issues in commit order.
    pub new: Vec<DiscoveredIssue>,
    /// Identifiers already present in the store, in sorted order.
    pub known: Vec<IssueIdentifier>,
    /// Candidates rejected during classification.
    pub rejected: Vec<SourceWarning>,
}

// ============================================================================
// SECTION: Delta Engine
// ============================================================================

/// Read-only delta computation over an identifier store.
pub struct DeltaEngine<'a, S: ?Sized> {
    /// Store consulted for membership.
    store: &'a S,
}

impl<'a, S> DeltaEngine<'a, S>
where
    S: IdentifierStore + ?Sized,
{
    /// Creates a delta engine reading from `store`.
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self {
            store,
        }
    }

    /// Classifies `candidates` fetched from `source`.
    ///
    /// # Invariants
    /// - `new` is sorted by `observed_at`, then `external_id`.
    /// - Each identifier appears at most once across `new` and `known`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when a membership lookup fails.
    pub fn compute(
        &self,
        source: &SourceId,
        candidates: Vec<CandidateIssue>,
        discovery_date: DiscoveryDate,
    ) -> Result<Delta, StoreError> {
        let mut delta = Delta::default();
        let mut accepted = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let external_id = Some(candidate.external_id.to_string());
            if candidate.source != *source {
                let detail = format!(
                    "candidate claims source {} but was fetched from {source}",
                    candidate.source
                );
                delta.rejected.push(SourceWarning::malformed(external_id, detail));
            } else if !candidate.reference.is_loggable() {
                let detail =
                    format!("candidate reference cannot be logged: '{}'", candidate.reference);
                delta.rejected.push(SourceWarning::malformed(external_id, detail));
            } else {
                accepted.push(candidate);
            }
        }
        accepted.sort_by(|a, b| {
            a.observed_at.cmp(&b.observed_at).then_with(|| a.external_id.cmp(&b.external_id))
        });

        let mut visited = BTreeSet::new();
        for candidate in accepted {
            let identifier = candidate.identifier();
            if !visited.insert(identifier.clone()) {
                continue;
            }
            if self.store.contains(&identifier)? {
                delta.known.push(identifier);
            } else {
                delta.new.push(DiscoveredIssue::from_candidate(candidate, discovery_date));
            }
        }
        Ok(delta)
    }
}
