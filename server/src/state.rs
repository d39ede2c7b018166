use std::sync::Arc;
use std::time::Duration;

use color_eyre::eyre::{eyre, WrapErr};

use crate::oauth::{OAuth2User, Scope, DEFAULT_SCOPES};
use crate::twitter::TwitterClient;

pub const DEFAULT_CALLBACK_URL: &str = "http://127.0.0.1:3000/callback";
pub const DEFAULT_PORT: u16 = 3000;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// The app credentials registered with Twitter
#[derive(Clone, Debug)]
pub struct TwitterOAuthConfig {
    pub client_id: String,
    /// Only confidential clients have a secret
    pub client_secret: Option<String>,
    /// Redirect URI registered for this app
    pub callback: String,
    pub scopes: Vec<Scope>,
}

impl TwitterOAuthConfig {
    /// Scopes as sent on the authorize URL, space separated
    pub fn scope_string(&self) -> String {
        self.scopes
            .iter()
            .map(Scope::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Remote endpoints, overridable so tests can point at a fixture server
#[derive(Clone, Debug)]
pub struct TwitterEndpoints {
    pub authorize_url: String,
    pub token_url: String,
    pub revoke_url: String,
    /// Base URL for the v2 REST API
    pub api_url: String,
}

impl Default for TwitterEndpoints {
    fn default() -> Self {
        Self {
            authorize_url: "https://twitter.com/i/oauth2/authorize".to_string(),
            token_url: "https://api.twitter.com/2/oauth2/token".to_string(),
            revoke_url: "https://api.twitter.com/2/oauth2/revoke".to_string(),
            api_url: "https://api.twitter.com".to_string(),
        }
    }
}

impl TwitterEndpoints {
    /// Every endpoint served from one base URL, the way the fixture server lays them out
    pub fn with_base_url(base: &str) -> Self {
        let base = base.trim_end_matches('/');

        Self {
            authorize_url: format!("{base}/i/oauth2/authorize"),
            token_url: format!("{base}/2/oauth2/token"),
            revoke_url: format!("{base}/2/oauth2/revoke"),
            api_url: base.to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub oauth: TwitterOAuthConfig,
    pub endpoints: TwitterEndpoints,
    pub port: u16,
    /// Timeout applied to every outbound request
    pub http_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> color_eyre::Result<Self> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> color_eyre::Result<Self> {
        let client_id = var("CLIENT_ID").ok_or_else(|| eyre!("CLIENT_ID must be set"))?;
        let client_secret = var("CLIENT_SECRET").filter(|s| !s.is_empty());

        let defaults = TwitterEndpoints::default();
        let endpoints = TwitterEndpoints {
            authorize_url: var("TWITTER_AUTHORIZE_URL").unwrap_or(defaults.authorize_url),
            token_url: var("TWITTER_TOKEN_URL").unwrap_or(defaults.token_url),
            revoke_url: var("TWITTER_REVOKE_URL").unwrap_or(defaults.revoke_url),
            api_url: var("TWITTER_API_URL").unwrap_or(defaults.api_url),
        };

        let port = match var("PORT") {
            Some(port) => port.parse().wrap_err("PORT must be a valid port number")?,
            None => DEFAULT_PORT,
        };

        let http_timeout = match var("HTTP_TIMEOUT_SECS") {
            Some(secs) => secs
                .parse()
                .wrap_err("HTTP_TIMEOUT_SECS must be a whole number of seconds")?,
            None => DEFAULT_HTTP_TIMEOUT_SECS,
        };

        Ok(Self {
            oauth: TwitterOAuthConfig {
                client_id,
                client_secret,
                callback: var("CALLBACK_URL").unwrap_or_else(|| DEFAULT_CALLBACK_URL.to_string()),
                scopes: DEFAULT_SCOPES.to_vec(),
            },
            endpoints,
            port,
            http_timeout: Duration::from_secs(http_timeout),
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub oauth: Arc<OAuth2User>,
    pub twitter: TwitterClient,
}

impl AppState {
    pub fn new(config: AppConfig) -> color_eyre::Result<Self> {
        let http = reqwest::ClientBuilder::new()
            .timeout(config.http_timeout)
            .use_rustls_tls()
            .build()
            .wrap_err("Failed to build HTTP client")?;

        let api_url = config.endpoints.api_url.clone();
        let oauth = Arc::new(OAuth2User::new(config.oauth, config.endpoints, http.clone()));
        let twitter = TwitterClient::new(http, api_url, oauth.clone());

        Ok(Self { oauth, twitter })
    }
}
