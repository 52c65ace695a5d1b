use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Largest accepted `refresh-margin-secs` (one day)
pub const MAX_REFRESH_MARGIN_SECS: u64 = 86_400;

/// Main configuration structure for Sitemap-Indexer
///
/// Built once from the TOML file and passed by reference into the engine.
/// Nothing in the crate reads run parameters from global state.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub run: RunConfig,
    #[serde(default)]
    pub submission: SubmissionConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// What to submit and how much of it
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    /// Sitemap (or sitemap index) to read URLs from
    #[serde(rename = "sitemap-url")]
    pub sitemap_url: String,

    /// Whether URLs are registered or removed
    #[serde(default)]
    pub operation: Operation,

    /// Maximum number of non-skipped submissions in one run
    #[serde(rename = "daily-limit", default = "default_daily_limit")]
    pub daily_limit: u32,

    /// Number of leading sitemap URLs to ignore
    #[serde(rename = "start-offset", default)]
    pub start_offset: usize,
}

/// Remote operation requested for every URL of the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Notify the index that the URL was added or updated
    #[default]
    Register,
    /// Notify the index that the URL was removed
    Delete,
}

impl Operation {
    /// Wire name of the notification type
    pub fn notification_type(&self) -> &'static str {
        match self {
            Self::Register => "URL_UPDATED",
            Self::Delete => "URL_DELETED",
        }
    }

    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Register => "register",
            Self::Delete => "delete",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "register" => Some(Self::Register),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Register => write!(f, "index registration"),
            Self::Delete => write!(f, "index deletion"),
        }
    }
}

/// Remote submission behaviour: endpoint, pacing and retry schedule
#[derive(Debug, Clone, Deserialize)]
pub struct SubmissionConfig {
    /// Indexing API publish endpoint
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Total attempts per URL, including the first one
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Wait before the second attempt (milliseconds)
    #[serde(rename = "initial-backoff-ms", default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Growth factor applied to the wait after every failed attempt
    #[serde(rename = "backoff-multiplier", default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Upper bound for a single backoff wait (milliseconds)
    #[serde(rename = "max-backoff-ms", default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Minimum time between two remote submissions (milliseconds)
    #[serde(rename = "pacing-interval-ms", default = "default_pacing_interval_ms")]
    pub pacing_interval_ms: u64,

    /// Timeout applied to every HTTP request (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl SubmissionConfig {
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    pub fn pacing_interval(&self) -> Duration {
        Duration::from_millis(self.pacing_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            max_backoff_ms: default_max_backoff_ms(),
            pacing_interval_ms: default_pacing_interval_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Delegated-access credential configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Installed-application client secret JSON downloaded from the provider
    #[serde(rename = "client-secret-path")]
    pub client_secret_path: PathBuf,

    /// Where the cached credential record lives
    #[serde(rename = "credential-path", default = "default_credential_path")]
    pub credential_path: PathBuf,

    /// Scopes requested during consent
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,

    /// Local ports tried, in order, for the consent callback listener
    #[serde(rename = "candidate-ports", default = "default_candidate_ports")]
    pub candidate_ports: Vec<u16>,

    /// How long to wait for the browser callback (seconds)
    #[serde(rename = "consent-timeout-secs", default = "default_consent_timeout_secs")]
    pub consent_timeout_secs: u64,

    /// Credentials expiring within this window are refreshed first (seconds)
    #[serde(rename = "refresh-margin-secs", default = "default_refresh_margin_secs")]
    pub refresh_margin_secs: u64,

    /// Overrides the authorization URI from the client secret file
    #[serde(rename = "auth-uri", default)]
    pub auth_uri: Option<String>,

    /// Overrides the token URI from the client secret file
    #[serde(rename = "token-uri", default)]
    pub token_uri: Option<String>,
}

impl AuthConfig {
    pub fn consent_timeout(&self) -> Duration {
        Duration::from_secs(self.consent_timeout_secs)
    }

    /// Margin before expiry at which a cached credential is refreshed
    ///
    /// Saturates at [`MAX_REFRESH_MARGIN_SECS`]; validation rejects anything larger.
    pub fn refresh_margin(&self) -> chrono::Duration {
        let secs = self.refresh_margin_secs.min(MAX_REFRESH_MARGIN_SECS) as i64;
        chrono::Duration::try_seconds(secs).unwrap_or(chrono::Duration::zero())
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite ledger database
    #[serde(rename = "ledger-path", default = "default_ledger_path")]
    pub ledger_path: PathBuf,

    /// Path to the append-only run log
    #[serde(rename = "log-path", default = "default_log_path")]
    pub log_path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            ledger_path: default_ledger_path(),
            log_path: default_log_path(),
        }
    }
}

fn default_daily_limit() -> u32 {
    200
}

fn default_endpoint() -> String {
    "https://indexing.googleapis.com/v3/urlNotifications:publish".to_string()
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    1000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_max_backoff_ms() -> u64 {
    60_000
}

fn default_pacing_interval_ms() -> u64 {
    1000
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_credential_path() -> PathBuf {
    PathBuf::from("auto_token.json")
}

fn default_scopes() -> Vec<String> {
    vec!["https://www.googleapis.com/auth/indexing".to_string()]
}

fn default_candidate_ports() -> Vec<u16> {
    vec![3000, 8080, 8081, 8082]
}

fn default_consent_timeout_secs() -> u64 {
    300
}

fn default_refresh_margin_secs() -> u64 {
    300
}

fn default_ledger_path() -> PathBuf {
    PathBuf::from("indexing.db")
}

fn default_log_path() -> PathBuf {
    PathBuf::from("indexing.log")
}
