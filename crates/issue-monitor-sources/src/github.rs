// crates/issue-monitor-sources/src/github.rs
// ============================================================================
// Module: GitHub Issues Source
// Description: Source adapter for the GitHub REST issues listing.
// Purpose: Fetch recent issues of one repository with strict limits.
// Dependencies: issue-monitor-core, reqwest, serde, serde_json
// ============================================================================

//! ## Overview
//! The GitHub source issues one bounded GET against
//! `/repos/{owner}/{repo}/issues` and turns each returned issue into a
//! [`CandidateIssue`]. Pull requests, which the endpoint also lists, are
//! skipped silently. Entries missing a number, title, or link become
//! per-candidate warnings. Redirects are never followed and bodies beyond
//! `max_response_bytes` fail closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::io::Read;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use issue_monitor_core::CandidateIssue;
use issue_monitor_core::ExternalId;
use issue_monitor_core::FetchBatch;
use issue_monitor_core::IssueReference;
use issue_monitor_core::SourceAdapter;
use issue_monitor_core::SourceError;
use issue_monitor_core::SourceId;
use issue_monitor_core::SourceWarning;
use issue_monitor_core::Timestamp;
use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::blocking::Response;
use reqwest::header::ACCEPT;
use reqwest::redirect::Policy;
use serde::Deserialize;
use serde_json::Value;

use crate::registry::SourceSetupError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Public GitHub REST API base URL.
pub const GITHUB_API_BASE: &str = "https://api.github.com";
/// Media type requested from the REST API.
const GITHUB_MEDIA_TYPE: &str = "application/vnd.github+json";
/// REST API version header name.
const API_VERSION_HEADER: &str = "X-GitHub-Api-Version";
/// REST API version pinned for response shape stability.
const API_VERSION: &str = "2022-11-28";
/// Largest page size the listing endpoint accepts.
const MAX_PER_PAGE: u32 = 100;
/// Default request timeout in milliseconds.
const DEFAULT_TIMEOUT_MS: u64 = 10_000;
/// Default response size limit in bytes.
const DEFAULT_MAX_RESPONSE_BYTES: usize = 4 * 1024 * 1024;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Issue state filter for the listing request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueState {
    /// Only open issues.
    #[default]
    Open,
    /// Only closed issues.
    Closed,
    /// Open and closed issues.
    All,
}

impl IssueState {
    /// Returns the query parameter value for this state.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::All => "all",
        }
    }
}

/// Configuration for the GitHub issues source.
///
/// # Invariants
/// - `owner` and `repo` are single path segments.
/// - `allow_http = false` blocks cleartext `http://` API bases.
/// - `max_response_bytes` is a hard upper bound on the response body.
/// - `token_env` names an environment variable; the token itself is never
///   stored in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GithubSourceConfig {
    /// Repository owner (user or organization).
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// Issue state filter.
    #[serde(default)]
    pub state: IssueState,
    /// Labels every returned issue must carry.
    #[serde(default)]
    pub labels: Vec<String>,
    /// REST API base URL.
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Environment variable holding a bearer token.
    #[serde(default)]
    pub token_env: Option<String>,
    /// Allow cleartext HTTP API bases.
    #[serde(default)]
    pub allow_http: bool,
    /// Request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Maximum response size allowed, in bytes.
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,
    /// Page size requested from the API, clamped to `1 ..= 100`.
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    /// User agent string for outbound requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl GithubSourceConfig {
    /// Creates a configuration for `owner/repo` with default limits.
    #[must_use]
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            state: IssueState::default(),
            labels: Vec::new(),
            api_base: default_api_base(),
            token_env: None,
            allow_http: false,
            timeout_ms: default_timeout_ms(),
            max_response_bytes: default_max_response_bytes(),
            per_page: default_per_page(),
            user_agent: default_user_agent(),
        }
    }

    /// Returns the `owner/repo` slug used in issue references.
    #[must_use]
    pub fn repository(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

/// Default API base for serde.
fn default_api_base() -> String {
    GITHUB_API_BASE.to_string()
}

/// Default timeout for serde.
const fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

/// Default response limit for serde.
const fn default_max_response_bytes() -> usize {
    DEFAULT_MAX_RESPONSE_BYTES
}

/// Default page size for serde.
const fn default_per_page() -> u32 {
    MAX_PER_PAGE
}

/// Default user agent for serde.
fn default_user_agent() -> String {
    format!("issue-monitor/{}", env!("CARGO_PKG_VERSION"))
}

// ============================================================================
// SECTION: Source Implementation
// ============================================================================

/// Source adapter for one GitHub repository.
///
/// # Invariants
/// - The request URL is validated once at construction.
/// - Redirects are not followed.
/// - Responses exceeding configured limits fail closed.
pub struct GithubIssuesSource {
    /// Source identifier this adapter serves.
    id: SourceId,
    /// Source configuration, including limits.
    config: GithubSourceConfig,
    /// Fully built listing URL.
    url: Url,
    /// Bearer token for authenticated requests.
    token: Option<String>,
    /// HTTP client used for outbound requests.
    client: Client,
}

impl GithubIssuesSource {
    /// Creates a GitHub source, reading the token from `token_env` when set.
    ///
    /// # Errors
    ///
    /// Returns [`SourceSetupError`] when the configuration is invalid, the
    /// token variable is unset, or the HTTP client cannot be created.
    pub fn new(id: SourceId, config: GithubSourceConfig) -> Result<Self, SourceSetupError> {
        let token = match &config.token_env {
            Some(name) => {
                let value = env::var(name).map_err(|_| {
                    SourceSetupError::Invalid(format!("token variable {name} is not set"))
                })?;
                let value = value.trim().to_string();
                if value.is_empty() {
                    let message = format!("token variable {name} is empty");
                    return Err(SourceSetupError::Invalid(message));
                }
                Some(value)
            }
            None => None,
        };
        Self::with_token(id, config, token)
    }

    /// Creates a GitHub source with an explicit bearer token.
    ///
    /// # Errors
    ///
    /// Returns [`SourceSetupError`] when the configuration is invalid or the
    /// HTTP client cannot be created.
    pub fn with_token(
        id: SourceId,
        config: GithubSourceConfig,
        token: Option<String>,
    ) -> Result<Self, SourceSetupError> {
        let url = build_listing_url(&config)?;
        let client = build_http_client(&config)?;
        Ok(Self {
            id,
            config,
            url,
            token,
            client,
        })
    }

    /// Returns the listing URL requested on every fetch.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }
}

impl SourceAdapter for GithubIssuesSource {
    fn source_id(&self) -> &SourceId {
        &self.id
    }

    fn fetch(&self) -> Result<FetchBatch, SourceError> {
        let mut request = self
            .client
            .get(self.url.clone())
            .header(ACCEPT, GITHUB_MEDIA_TYPE)
            .header(API_VERSION_HEADER, API_VERSION);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let mut response = request
            .send()
            .map_err(|err| SourceError::Unavailable(format!("github request failed: {err}")))?;
        if response.url() != &self.url {
            return Err(SourceError::Unavailable("redirects are not allowed".to_string()));
        }
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Unavailable(format!(
                "github returned http status {}",
                status.as_u16()
            )));
        }
        let fetched_at = unix_millis();
        let body = read_response_limited(&mut response, self.config.max_response_bytes)?;
        parse_issue_page(&self.id, &self.config.repository(), &body, fetched_at)
    }
}

// ============================================================================
// SECTION: Response Parsing
// ============================================================================

/// Issue fields read from one listing entry.
#[derive(Debug, Deserialize)]
struct GithubIssue {
    /// Repository-scoped issue number.
    number: Option<u64>,
    /// Issue title.
    title: Option<String>,
    /// Browser link to the issue.
    html_url: Option<String>,
    /// Present only when the entry is a pull request.
    pull_request: Option<Value>,
}

/// Parses one listing page into a candidate batch.
///
/// Entries keep response order. Each candidate is observed at
/// `fetched_at_ms` plus its position so the batch stays strictly ordered.
///
/// # Errors
///
/// Returns [`SourceError::Unavailable`] when the body is not a JSON array.
pub fn parse_issue_page(
    source: &SourceId,
    repository: &str,
    body: &[u8],
    fetched_at_ms: i64,
) -> Result<FetchBatch, SourceError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|err| SourceError::Unavailable(format!("github response is not json: {err}")))?;
    let Value::Array(items) = value else {
        return Err(SourceError::Unavailable("github response is not an issue list".to_string()));
    };
    let mut batch = FetchBatch::default();
    for (position, item) in items.into_iter().enumerate() {
        let issue: GithubIssue = match serde_json::from_value(item) {
            Ok(issue) => issue,
            Err(err) => {
                batch.warnings.push(SourceWarning::malformed(
                    None,
                    format!("entry {position} has unexpected shape: {err}"),
                ));
                continue;
            }
        };
        if issue.pull_request.is_some() {
            continue;
        }
        let Some(number) = issue.number else {
            batch.warnings.push(SourceWarning::malformed(
                None,
                format!("entry {position} has no issue number"),
            ));
            continue;
        };
        let (Some(title), Some(url)) = (issue.title, issue.html_url) else {
            batch.warnings.push(SourceWarning::malformed(
                Some(number.to_string()),
                "issue is missing its title or link",
            ));
            continue;
        };
        let offset = i64::try_from(position).unwrap_or(i64::MAX);
        batch.candidates.push(CandidateIssue {
            source: source.clone(),
            external_id: ExternalId::from(number),
            reference: IssueReference::new(format!("{repository}#{number}")),
            title,
            url,
            observed_at: Timestamp::UnixMillis(fetched_at_ms.saturating_add(offset)),
        });
    }
    Ok(batch)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds and validates the listing URL.
fn build_listing_url(config: &GithubSourceConfig) -> Result<Url, SourceSetupError> {
    for (name, segment) in [("owner", &config.owner), ("repo", &config.repo)] {
        if segment.trim().is_empty() || segment.contains('/') {
            return Err(SourceSetupError::Invalid(format!(
                "github {name} must be a single non-empty path segment"
            )));
        }
    }
    let mut url = Url::parse(&config.api_base)
        .map_err(|err| SourceSetupError::Invalid(format!("invalid github api base: {err}")))?;
    validate_url(&url, config)?;
    url.path_segments_mut()
        .map_err(|()| SourceSetupError::Invalid("github api base cannot be a base".to_string()))?
        .pop_if_empty()
        .extend(["repos", config.owner.as_str(), config.repo.as_str(), "issues"]);
    url.set_query(None);
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("state", config.state.as_str());
        query.append_pair("sort", "created");
        query.append_pair("direction", "desc");
        query.append_pair("per_page", &config.per_page.clamp(1, MAX_PER_PAGE).to_string());
        if !config.labels.is_empty() {
            query.append_pair("labels", &config.labels.join(","));
        }
    }
    Ok(url)
}

/// Validates scheme and credential policy for the API base.
fn validate_url(url: &Url, config: &GithubSourceConfig) -> Result<(), SourceSetupError> {
    match url.scheme() {
        "https" => {}
        "http" if config.allow_http => {}
        _ => return Err(SourceSetupError::Invalid("unsupported url scheme".to_string())),
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err(SourceSetupError::Invalid("url credentials are not allowed".to_string()));
    }
    if url.host_str().is_none() {
        return Err(SourceSetupError::Invalid("url host required".to_string()));
    }
    Ok(())
}

/// Builds the HTTP client with redirects disabled.
fn build_http_client(config: &GithubSourceConfig) -> Result<Client, SourceSetupError> {
    Client::builder()
        .timeout(Duration::from_millis(config.timeout_ms))
        .user_agent(config.user_agent.clone())
        .redirect(Policy::none())
        .build()
        .map_err(|err| SourceSetupError::Client(format!("http client build failed: {err}")))
}

/// Reads a response body while enforcing the size limit.
fn read_response_limited(
    response: &mut Response,
    max_bytes: usize,
) -> Result<Vec<u8>, SourceError> {
    let expected_len = response.content_length();
    let max_bytes_u64 = u64::try_from(max_bytes)
        .map_err(|_| SourceError::Unavailable("response size limit exceeds u64".to_string()))?;
    if let Some(expected) = expected_len
        && expected > max_bytes_u64
    {
        return Err(SourceError::Unavailable("github response exceeds size limit".to_string()));
    }
    let mut buf = Vec::new();
    let limit = max_bytes_u64.saturating_add(1);
    let mut handle = response.take(limit);
    handle
        .read_to_end(&mut buf)
        .map_err(|_| SourceError::Unavailable("failed to read github response".to_string()))?;
    if buf.len() > max_bytes {
        return Err(SourceError::Unavailable("github response exceeds size limit".to_string()));
    }
    if let Some(expected) = expected_len {
        let expected = usize::try_from(expected)
            .map_err(|_| SourceError::Unavailable("invalid response length".to_string()))?;
        if buf.len() < expected {
            return Err(SourceError::Unavailable("github response truncated".to_string()));
        }
    }
    Ok(buf)
}

/// Returns the current wall-clock time in unix milliseconds.
fn unix_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
}
