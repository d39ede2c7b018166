use reqwest::{header::ACCEPT, RequestBuilder, Response, StatusCode, Url};
use tracing::{info, warn};

use crate::oauth::session::{PendingAuthorization, SessionStatus, SessionStore};
use crate::oauth::token::{OAuthTokenSet, TokenResponse};
use crate::oauth::utils::{random_token, PkceChallenge, CODE_CHALLENGE_METHOD};
use crate::state::{TwitterEndpoints, TwitterOAuthConfig};

#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    #[error("State isn't matching")]
    StateMismatch,
    #[error("no access token available, log in first")]
    NotAuthenticated,
    #[error("invalid {endpoint} URL: {message}")]
    InvalidUrl {
        endpoint: &'static str,
        message: String,
    },
    #[error("{endpoint} request failed: {source}")]
    Request {
        endpoint: &'static str,
        source: reqwest::Error,
    },
    #[error("{endpoint} endpoint responded with {status}: {body}")]
    Status {
        endpoint: &'static str,
        status: StatusCode,
        body: String,
    },
}

/// The OAuth2 client for the single user of this process
///
/// Holds the app credentials and the session store; all token writes go
/// through here.
#[derive(Debug)]
pub struct OAuth2User {
    config: TwitterOAuthConfig,
    endpoints: TwitterEndpoints,
    http: reqwest::Client,
    sessions: SessionStore,
}

impl OAuth2User {
    pub fn new(
        config: TwitterOAuthConfig,
        endpoints: TwitterEndpoints,
        http: reqwest::Client,
    ) -> Self {
        Self {
            config,
            endpoints,
            http,
            sessions: SessionStore::new(),
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub async fn status(&self) -> SessionStatus {
        self.sessions.status().await
    }

    /// Build the authorize URL for a new login attempt
    ///
    /// A fresh state value and PKCE verifier are generated and remembered until
    /// the matching callback arrives.
    #[tracing::instrument(skip(self))]
    pub async fn generate_auth_url(&self) -> Result<Url, OAuthError> {
        let state = random_token(32);
        let pkce = PkceChallenge::generate();
        let scope = self.config.scope_string();

        let url = Url::parse_with_params(
            &self.endpoints.authorize_url,
            &[
                ("response_type", "code"),
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.callback.as_str()),
                ("state", state.as_str()),
                ("code_challenge", pkce.challenge.as_str()),
                ("code_challenge_method", CODE_CHALLENGE_METHOD),
                ("scope", scope.as_str()),
            ],
        )
        .map_err(|e| OAuthError::InvalidUrl {
            endpoint: "authorize",
            message: e.to_string(),
        })?;

        self.sessions
            .insert_pending(state, PendingAuthorization::new(pkce.verifier))
            .await;

        Ok(url)
    }

    /// Exchange an authorization code for an access token
    ///
    /// The pending authorization for `state` is consumed before anything is
    /// sent; an unknown state never reaches the token endpoint.
    #[tracing::instrument(skip_all)]
    pub async fn request_access_token(&self, code: &str, state: &str) -> Result<(), OAuthError> {
        let Some(pending) = self.sessions.take_pending(state).await else {
            warn!("Callback state does not match any pending login");
            return Err(OAuthError::StateMismatch);
        };

        let response = self
            .token_request(&[
                ("code", code),
                ("grant_type", "authorization_code"),
                ("code_verifier", pending.code_verifier.as_str()),
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.callback.as_str()),
            ])
            .await?;

        self.sessions
            .set_token(OAuthTokenSet::from_token_response(response))
            .await;
        info!("Access token stored");

        Ok(())
    }

    /// Drop the pending authorization for `state` after the user denied access
    pub async fn cancel_authorization(&self, state: &str) -> Result<(), OAuthError> {
        match self.sessions.take_pending(state).await {
            Some(_) => Ok(()),
            None => Err(OAuthError::StateMismatch),
        }
    }

    /// Get a usable access token, refreshing it first when it has expired
    pub async fn access_token(&self) -> Result<String, OAuthError> {
        let mut slot = self.sessions.token_slot().await;
        let token = slot.as_ref().ok_or(OAuthError::NotAuthenticated)?;

        if !token.is_expired() {
            return Ok(token.access_token.clone());
        }

        let Some(refresh_token) = token.refresh_token.clone() else {
            warn!("Access token expired and no refresh token is held");
            *slot = None;
            return Err(OAuthError::NotAuthenticated);
        };

        info!("Access token expired, refreshing");
        let refreshed = self
            .token_request(&[
                ("refresh_token", refresh_token.as_str()),
                ("grant_type", "refresh_token"),
                ("client_id", self.config.client_id.as_str()),
            ])
            .await;

        let response = match refreshed {
            Ok(response) => response,
            Err(OAuthError::Status { status, .. }) if status.is_client_error() => {
                warn!(%status, "Refresh token rejected, dropping the session");
                *slot = None;
                return Err(OAuthError::NotAuthenticated);
            }
            Err(err) => return Err(err),
        };

        let refreshed = OAuthTokenSet::from_token_response(response).inherit_refresh_token(token);
        let access_token = refreshed.access_token.clone();
        *slot = Some(refreshed);

        Ok(access_token)
    }

    /// Revoke the current access token and forget it
    #[tracing::instrument(skip(self))]
    pub async fn revoke_access_token(&self) -> Result<serde_json::Value, OAuthError> {
        let mut slot = self.sessions.token_slot().await;
        let token = slot.as_ref().ok_or(OAuthError::NotAuthenticated)?;

        let form = [
            ("token_type_hint", "access_token"),
            ("token", token.access_token.as_str()),
            ("client_id", self.config.client_id.as_str()),
        ];
        let response = self
            .client_post(&self.endpoints.revoke_url)
            .form(&form)
            .send()
            .await
            .map_err(|source| OAuthError::Request {
                endpoint: "revoke",
                source,
            })?;
        let body = error_for_status("revoke", response)
            .await?
            .json::<serde_json::Value>()
            .await
            .map_err(|source| OAuthError::Request {
                endpoint: "revoke",
                source,
            })?;

        *slot = None;
        info!("Access token revoked");

        Ok(body)
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenResponse, OAuthError> {
        let response = self
            .client_post(&self.endpoints.token_url)
            .form(form)
            .send()
            .await
            .map_err(|source| OAuthError::Request {
                endpoint: "token",
                source,
            })?;

        error_for_status("token", response)
            .await?
            .json::<TokenResponse>()
            .await
            .map_err(|source| OAuthError::Request {
                endpoint: "token",
                source,
            })
    }

    /// POST to an authorization server endpoint, with basic auth for confidential clients
    fn client_post(&self, url: &str) -> RequestBuilder {
        let request = self.http.post(url).header(ACCEPT, "application/json");

        match &self.config.client_secret {
            Some(secret) => request.basic_auth(&self.config.client_id, Some(secret)),
            None => request,
        }
    }
}

async fn error_for_status(endpoint: &'static str, response: Response) -> Result<Response, OAuthError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to read error response".to_string());
    tracing::error!(endpoint, %status, %body, "Authorization server request failed");

    Err(OAuthError::Status {
        endpoint,
        status,
        body,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::oauth::session::MAX_PENDING_AUTHORIZATIONS;
    use crate::oauth::DEFAULT_SCOPES;

    fn client() -> OAuth2User {
        OAuth2User::new(
            TwitterOAuthConfig {
                client_id: "client-id".to_string(),
                client_secret: None,
                callback: "http://127.0.0.1:3000/callback".to_string(),
                scopes: DEFAULT_SCOPES.to_vec(),
            },
            TwitterEndpoints::default(),
            reqwest::Client::new(),
        )
    }

    #[tokio::test]
    async fn test_auth_url_carries_state_and_s256_challenge() {
        let client = client();
        let url = client.generate_auth_url().await.unwrap();
        let query: HashMap<String, String> = url.query_pairs().into_owned().collect();

        assert_eq!(url.host_str(), Some("twitter.com"));
        assert_eq!(url.path(), "/i/oauth2/authorize");
        assert_eq!(query["response_type"], "code");
        assert_eq!(query["client_id"], "client-id");
        assert_eq!(query["redirect_uri"], "http://127.0.0.1:3000/callback");
        assert_eq!(query["code_challenge_method"], "s256");
        assert!(!query["code_challenge"].is_empty());
        assert!(query["scope"].contains("offline.access"));
        assert!(query["scope"].starts_with("tweet.read users.read"));
        assert!(!query["state"].is_empty());
        assert_eq!(client.status().await, SessionStatus::AwaitingCallback);
    }

    #[tokio::test]
    async fn test_each_login_gets_a_fresh_state() {
        let client = client();
        let first = client.generate_auth_url().await.unwrap();
        let second = client.generate_auth_url().await.unwrap();

        let state = |url: &Url| {
            url.query_pairs()
                .find(|(k, _)| k == "state")
                .map(|(_, v)| v.into_owned())
        };

        assert_ne!(state(&first), state(&second));
        assert_eq!(client.sessions().pending_count().await, 2);
    }

    #[tokio::test]
    async fn test_repeated_logins_keep_a_bounded_number_pending() {
        let client = client();

        for _ in 0..MAX_PENDING_AUTHORIZATIONS * 3 {
            client.generate_auth_url().await.unwrap();
        }

        assert_eq!(
            client.sessions().pending_count().await,
            MAX_PENDING_AUTHORIZATIONS
        );
    }

    #[tokio::test]
    async fn test_unknown_state_fails_without_a_token_request() {
        let client = client();
        client.generate_auth_url().await.unwrap();

        let err = client
            .request_access_token("abc", "wrong")
            .await
            .unwrap_err();

        assert!(matches!(err, OAuthError::StateMismatch));
        assert_eq!(client.sessions().pending_count().await, 1);
    }

    #[tokio::test]
    async fn test_revoke_without_token_is_not_authenticated() {
        let client = client();

        let err = client.revoke_access_token().await.unwrap_err();

        assert!(matches!(err, OAuthError::NotAuthenticated));
    }

    #[tokio::test]
    async fn test_expired_token_without_refresh_token_is_dropped() {
        let client = client();
        client
            .sessions()
            .set_token(OAuthTokenSet::from_token_response(TokenResponse {
                access_token: "stale".to_string(),
                token_type: "bearer".to_string(),
                expires_in: Some(0),
                refresh_token: None,
                scope: None,
            }))
            .await;

        let err = client.access_token().await.unwrap_err();

        assert!(matches!(err, OAuthError::NotAuthenticated));
        assert_eq!(client.status().await, SessionStatus::Unauthenticated);
    }
}
