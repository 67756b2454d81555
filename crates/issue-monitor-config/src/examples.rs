// crates/issue-monitor-config/src/examples.rs
// ============================================================================
// Module: Config Examples
// Description: Canonical example configuration payload.
// Purpose: Deterministic starting point for operators and tooling.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Canonical example for issue monitor configuration. The output is static
//! and must always load and validate.

/// Returns a canonical example `issue-monitor.toml` configuration.
#[must_use]
pub fn config_toml_example() -> String {
    String::from(
        r#"[store]
path = "state/issue-monitor.db"
journal_mode = "wal"
sync_mode = "full"
busy_timeout_ms = 5000

[log]
path = "discoveries.md"
title = "Upstream discoveries"

[run]
concurrency = 4
fetch_timeout_ms = 30000
utc_offset_minutes = 0

[audit]
sink = "file"
path = "state/audit.jsonl"

[[sources]]
id = "rust-lang-rust"
type = "github"
owner = "rust-lang"
repo = "rust"
state = "open"
labels = ["I-unsound"]
max_candidates = 50
# token_env = "GITHUB_TOKEN"

[[sources]]
id = "tokio"
type = "github"
owner = "tokio-rs"
repo = "tokio"
every_n_runs = 4

[[sources]]
id = "advisories"
type = "file"
path = "feeds/advisories.json"
max_candidates = 100
"#,
    )
}
