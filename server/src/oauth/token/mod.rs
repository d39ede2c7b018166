use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Token endpoint response body
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    /// Lifetime of the access token in seconds
    pub expires_in: Option<i64>,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
}

/// Represents a complete set of OAuth tokens with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthTokenSet {
    /// The access token for API requests
    pub access_token: String,
    /// The token type (usually "bearer")
    pub token_type: String,
    /// When the access token expires, if the server told us
    pub expires_at: Option<DateTime<Utc>>,
    /// Refresh token for obtaining a new access token
    pub refresh_token: Option<String>,
    /// The scopes granted to this token
    pub scope: Option<String>,
}

impl OAuthTokenSet {
    /// Create a new OAuthTokenSet from a TokenResponse
    pub fn from_token_response(response: TokenResponse) -> Self {
        Self::from_token_response_at(response, Utc::now())
    }

    fn from_token_response_at(response: TokenResponse, now: DateTime<Utc>) -> Self {
        Self {
            access_token: response.access_token,
            token_type: response.token_type,
            expires_at: response.expires_in.map(|secs| now + Duration::seconds(secs)),
            refresh_token: response.refresh_token,
            scope: response.scope,
        }
    }

    /// Check if the access token is expired
    ///
    /// Tokens are considered expired 30 seconds early to account for clock skew
    /// and network latency.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at < now + Duration::seconds(30),
            None => false,
        }
    }

    /// Keep the previous refresh token when a refresh response omits one
    pub fn inherit_refresh_token(mut self, previous: &OAuthTokenSet) -> Self {
        if self.refresh_token.is_none() {
            self.refresh_token = previous.refresh_token.clone();
        }
        self
    }
}
