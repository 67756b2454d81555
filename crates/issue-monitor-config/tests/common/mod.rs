// crates/issue-monitor-config/tests/common/mod.rs
// =============================================================================
// Module: Config Test Helpers
// Description: Shared helpers for config validation tests.
// Purpose: Reduce duplication across integration tests for issue-monitor-config.
// =============================================================================

#![allow(
    dead_code,
    clippy::panic,
    reason = "Test helpers are selectively used across suites and may panic."
)]

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use issue_monitor_config::IssueMonitorConfig;

/// Parses a TOML string into an `IssueMonitorConfig` for tests.
pub fn config_from_toml(toml_str: &str) -> Result<IssueMonitorConfig, toml::de::Error> {
    toml::from_str(toml_str)
}

/// Returns a minimal config with all defaults applied.
pub fn minimal_config() -> Result<IssueMonitorConfig, toml::de::Error> {
    config_from_toml("")
}

/// Returns a config holding one GitHub source with the given extra lines.
pub fn github_source_config(extra: &str) -> Result<IssueMonitorConfig, toml::de::Error> {
    config_from_toml(&format!(
        "[[sources]]\nid = \"widgets\"\ntype = \"github\"\nowner = \"octo\"\n\
         repo = \"widgets\"\n{extra}\n"
    ))
}

/// Writes `contents` to `name` inside `dir` and returns the path.
pub fn write_config(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap_or_else(|err| panic!("write config: {err}"));
    path
}
