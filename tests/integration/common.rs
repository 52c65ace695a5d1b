//! Shared fixtures for the integration tests

use serde_json::{json, Value};
use sitemap_indexer::auth::{
    AuthFlow, ConsentPrompt, Credential, CredentialStore, FileCredentialStore,
};
use sitemap_indexer::config::Config;
use sitemap_indexer::engine::{HttpIndexClient, SubmissionEngine};
use sitemap_indexer::http::build_http_client;
use sitemap_indexer::sitemap::SitemapLoader;
use sitemap_indexer::state::ResumeLedger;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const SCOPE: &str = "https://www.googleapis.com/auth/indexing";

/// A temp directory for state files plus one mock server for every remote
pub struct TestEnv {
    pub dir: TempDir,
    pub server: MockServer,
}

impl TestEnv {
    pub async fn start() -> Self {
        let env = Self {
            dir: tempfile::tempdir().unwrap(),
            server: MockServer::start().await,
        };
        env.write_client_secret();
        env
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Site URL with the given path, as listed in the sitemap
    pub fn site_url(&self, page: &str) -> String {
        format!("https://example.com/{}", page)
    }

    pub fn config(&self, daily_limit: u32, start_offset: usize) -> Config {
        self.config_with_ports(daily_limit, start_offset, &[0])
    }

    pub fn config_with_ports(&self, daily_limit: u32, start_offset: usize, ports: &[u16]) -> Config {
        let ports: Vec<String> = ports.iter().map(u16::to_string).collect();
        let toml = format!(
            r#"
[run]
sitemap-url = "{server}/sitemap.xml"
daily-limit = {daily_limit}
start-offset = {start_offset}

[submission]
endpoint = "{server}/publish"
max-retries = 3
initial-backoff-ms = 10
backoff-multiplier = 2.0
max-backoff-ms = 100
pacing-interval-ms = 1
request-timeout-secs = 5

[auth]
client-secret-path = "{secret}"
credential-path = "{credential}"
candidate-ports = [{ports}]
consent-timeout-secs = 1
refresh-margin-secs = 300

[output]
ledger-path = "{ledger}"
log-path = "{log}"
"#,
            server = self.server.uri(),
            daily_limit = daily_limit,
            start_offset = start_offset,
            secret = self.path("client_secret.json").display(),
            credential = self.path("token.json").display(),
            ports = ports.join(", "),
            ledger = self.path("indexing.db").display(),
            log = self.path("indexing.log").display(),
        );
        let config: Config = toml::from_str(&toml).unwrap();
        sitemap_indexer::config::validate(&config).unwrap();
        config
    }

    fn write_client_secret(&self) {
        let secret = json!({
            "installed": {
                "client_id": "test-client",
                "client_secret": "test-secret",
                "auth_uri": "https://accounts.example.com/o/oauth2/auth",
                "token_uri": format!("{}/token", self.server.uri()),
            }
        });
        std::fs::write(self.path("client_secret.json"), secret.to_string()).unwrap();
    }

    pub fn credential_store(&self) -> FileCredentialStore {
        FileCredentialStore::new(self.path("token.json"), vec![SCOPE.to_string()])
    }

    /// Caches a credential that expires `expires_in` from now
    pub fn seed_credential(&self, access_token: &str, expires_in: chrono::Duration) {
        let credential = Credential {
            access_token: access_token.to_string(),
            refresh_token: Some("refresh-1".to_string()),
            expires_at: chrono::Utc::now() + expires_in,
            scopes: [SCOPE.to_string()].into_iter().collect(),
        };
        self.credential_store().save(&credential).unwrap();
    }

    pub fn ledger(&self, config: &Config) -> ResumeLedger {
        ResumeLedger::open(&config.output.ledger_path, config.run.operation).unwrap()
    }

    /// Serves a `<urlset>` listing `pages` at `/sitemap.xml`
    pub async fn mount_sitemap(&self, pages: &[&str]) -> Vec<String> {
        let urls: Vec<String> = pages.iter().map(|p| self.site_url(p)).collect();
        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(urlset(&urls)))
            .mount(&self.server)
            .await;
        urls
    }

    /// Accepts every publish call
    pub async fn mount_publish_ok(&self) {
        Mock::given(method("POST"))
            .and(path("/publish"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "urlNotificationMetadata": {
                    "latestUpdate": {
                        "type": "URL_UPDATED",
                        "notifyTime": "2024-05-01T10:00:00Z"
                    }
                }
            })))
            .mount(&self.server)
            .await;
    }

    /// URLs of every publish call the server received, in order
    pub async fn published(&self) -> Vec<String> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|request| request.url.path() == "/publish")
            .filter_map(|request| {
                let body: Value = serde_json::from_slice(&request.body).ok()?;
                body.get("url")?.as_str().map(str::to_string)
            })
            .collect()
    }

    pub async fn publish_count(&self, url: &str) -> usize {
        self.published().await.iter().filter(|u| *u == url).count()
    }

    /// An engine wired like the binary's, against the mock server
    pub fn engine(&self, config: &Config) -> SubmissionEngine {
        let client = build_http_client(config.submission.request_timeout()).unwrap();
        let auth = AuthFlow::new(&config.auth, client).unwrap();
        self.engine_with(config, auth)
    }

    pub fn engine_with(&self, config: &Config, auth: AuthFlow) -> SubmissionEngine {
        let client = build_http_client(config.submission.request_timeout()).unwrap();
        SubmissionEngine::new(
            SitemapLoader::new(client.clone()),
            Box::new(auth),
            Box::new(HttpIndexClient::new(client, &config.submission.endpoint)),
            self.ledger(config),
            &config.submission,
        )
    }
}

pub fn urlset(urls: &[String]) -> String {
    let entries: String = urls
        .iter()
        .map(|u| format!("  <url><loc>{}</loc></url>\n", u))
        .collect();
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n{}</urlset>",
        entries
    )
}

/// How the simulated operator answers the consent screen
#[derive(Debug, Clone)]
pub enum Reply {
    Approve(&'static str),
    Deny(&'static str),
    Ignore,
}

/// Consent prompt that plays the browser: it follows the redirect itself
#[derive(Clone)]
pub struct ScriptedPrompt {
    reply: Reply,
    presented: Arc<Mutex<Vec<Url>>>,
}

impl ScriptedPrompt {
    pub fn new(reply: Reply) -> Self {
        Self {
            reply,
            presented: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn presented(&self) -> Vec<Url> {
        self.presented.lock().unwrap().clone()
    }

    /// Port of the redirect URI from the last presented authorization URL
    pub fn callback_port(&self) -> Option<u16> {
        let url = self.presented().pop()?;
        let params: HashMap<String, String> = url.query_pairs().into_owned().collect();
        Url::parse(params.get("redirect_uri")?).ok()?.port()
    }
}

impl ConsentPrompt for ScriptedPrompt {
    fn present(&self, url: &Url) {
        self.presented.lock().unwrap().push(url.clone());

        let params: HashMap<String, String> = url.query_pairs().into_owned().collect();
        let state = params["state"].clone();
        let port = Url::parse(&params["redirect_uri"]).unwrap().port().unwrap();

        let query = match &self.reply {
            Reply::Approve(code) => format!("code={}&state={}", code, state),
            Reply::Deny(error) => format!("error={}&state={}", error, state),
            Reply::Ignore => return,
        };
        let target = format!("http://127.0.0.1:{}/?{}", port, query);
        tokio::spawn(async move {
            let _ = reqwest::get(target).await;
        });
    }
}
