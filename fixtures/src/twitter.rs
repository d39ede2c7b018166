//! Fake Twitter authorization server and v2 API
//!
//! The authorize endpoint approves every request straight away and redirects
//! back with a code, so a whole login can be driven without a browser.

use axum::{
    extract::{Form, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64ct::{Base64UrlUnpadded, Encoding};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

/// Lifetime reported for issued access tokens, in seconds
pub const ACCESS_TOKEN_TTL: i64 = 7200;

#[derive(Debug, Clone)]
struct Grant {
    client_id: String,
    redirect_uri: String,
    code_challenge: String,
}

#[derive(Debug, Default)]
struct Ledger {
    grants: HashMap<String, Grant>,
    access_tokens: HashSet<String>,
    refresh_tokens: HashSet<String>,
    next_id: u64,
    token_requests: usize,
    revocations: usize,
}

impl Ledger {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

// Server state to hold seeded data and everything issued so far
#[derive(Clone)]
pub struct TwitterFixture {
    users: Arc<Vec<Value>>,
    tweets: Arc<HashMap<String, Vec<Value>>>,
    me: Option<String>,
    access_token_ttl: i64,
    ledger: Arc<Mutex<Ledger>>,
}

impl Default for TwitterFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl TwitterFixture {
    /// Seeded with `alice` (id 123, the logged in user) and `bob` (id 456)
    pub fn new() -> Self {
        let users = vec![
            json!({
                "id": "123",
                "name": "Alice",
                "username": "alice",
                "verified": false,
                "public_metrics": {
                    "followers_count": 42,
                    "following_count": 7,
                    "tweet_count": 4,
                    "listed_count": 0
                },
                "entities": {
                    "description": { "hashtags": [{ "start": 0, "end": 5, "tag": "rust" }] }
                }
            }),
            json!({
                "id": "456",
                "name": "Bob",
                "username": "bob",
                "verified": true,
                "public_metrics": {
                    "followers_count": 1000,
                    "following_count": 10,
                    "tweet_count": 1,
                    "listed_count": 3
                }
            }),
        ];

        let alice_tweets = vec![
            tweet("1004", "123", "quoting bob", Some(("quoted", "2002"))),
            tweet("1003", "123", "RT @bob: shipping day", Some(("retweeted", "2002"))),
            tweet("1002", "123", "@bob agreed", Some(("replied_to", "2001"))),
            tweet("1001", "123", "hello world", None),
        ];
        let bob_tweets = vec![tweet("2002", "456", "shipping day", None)];

        Self {
            users: Arc::new(users),
            tweets: Arc::new(HashMap::from([
                ("123".to_string(), alice_tweets),
                ("456".to_string(), bob_tweets),
            ])),
            me: Some("123".to_string()),
            access_token_ttl: ACCESS_TOKEN_TTL,
            ledger: Arc::new(Mutex::new(Ledger::default())),
        }
    }

    /// `/2/users/me` answers without a user
    pub fn without_me(mut self) -> Self {
        self.me = None;
        self
    }

    /// Issue access tokens with this lifetime instead of the default
    pub fn with_access_token_ttl(mut self, seconds: i64) -> Self {
        self.access_token_ttl = seconds;
        self
    }

    /// How many times the token endpoint has been called
    pub fn token_requests(&self) -> usize {
        self.ledger().token_requests
    }

    /// How many tokens have been revoked
    pub fn revocations(&self) -> usize {
        self.ledger().revocations
    }

    /// Invalidate every refresh token issued so far
    pub fn revoke_refresh_tokens(&self) {
        self.ledger().refresh_tokens.clear();
    }

    pub fn router(self) -> Router {
        Router::new()
            // Authorization server
            .route("/i/oauth2/authorize", get(authorize))
            .route("/2/oauth2/token", post(token))
            .route("/2/oauth2/revoke", post(revoke))
            // v2 API
            .route("/2/users/me", get(users_me))
            .route("/2/users/by/username/:username", get(user_by_username))
            .route("/2/users/:id/tweets", get(user_tweets))
            .with_state(self)
    }

    fn ledger(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn user(&self, predicate: impl Fn(&Value) -> bool) -> Option<Value> {
        self.users.iter().find(|user| predicate(user)).cloned()
    }

    fn check_bearer(&self, headers: &HeaderMap) -> Result<(), Response> {
        let token = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "));

        match token {
            Some(token) if self.ledger().access_tokens.contains(token) => Ok(()),
            _ => Err((
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "title": "Unauthorized",
                    "type": "about:blank",
                    "status": 401,
                    "detail": "Unauthorized"
                })),
            )
                .into_response()),
        }
    }

    fn issue_tokens(&self, scope: &str) -> Value {
        let mut ledger = self.ledger();
        let id = ledger.next_id();
        let access_token = format!("fixture-access-{id}");
        let refresh_token = format!("fixture-refresh-{id}");
        ledger.access_tokens.insert(access_token.clone());
        ledger.refresh_tokens.insert(refresh_token.clone());

        json!({
            "token_type": "bearer",
            "expires_in": self.access_token_ttl,
            "access_token": access_token,
            "scope": scope,
            "refresh_token": refresh_token
        })
    }
}

fn tweet(id: &str, author_id: &str, text: &str, reference: Option<(&str, &str)>) -> Value {
    let mut tweet = json!({
        "id": id,
        "text": text,
        "author_id": author_id,
        "lang": "en",
        "edit_history_tweet_ids": [id],
        "public_metrics": {
            "retweet_count": 1,
            "reply_count": 0,
            "like_count": 3,
            "quote_count": 0
        }
    });

    if let Some((kind, referenced_id)) = reference {
        tweet["referenced_tweets"] = json!([{ "type": kind, "id": referenced_id }]);
    }

    tweet
}

fn oauth_error(error: &str, description: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": error, "error_description": description })),
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
struct AuthorizeParams {
    response_type: String,
    client_id: String,
    redirect_uri: String,
    state: String,
    code_challenge: String,
    code_challenge_method: String,
    #[allow(dead_code)]
    scope: String,
}

#[derive(Serialize)]
struct CallbackQuery<'a> {
    state: &'a str,
    code: &'a str,
}

async fn authorize(
    State(fixture): State<TwitterFixture>,
    Query(params): Query<AuthorizeParams>,
) -> Response {
    if params.response_type != "code" {
        return oauth_error("unsupported_response_type", "response_type must be code");
    }
    if !params.code_challenge_method.eq_ignore_ascii_case("s256") {
        return oauth_error("invalid_request", "only s256 code challenges are accepted");
    }

    let code = {
        let mut ledger = fixture.ledger();
        let code = format!("fixture-code-{}", ledger.next_id());
        ledger.grants.insert(
            code.clone(),
            Grant {
                client_id: params.client_id,
                redirect_uri: params.redirect_uri.clone(),
                code_challenge: params.code_challenge,
            },
        );
        code
    };

    let query = match serde_urlencoded::to_string(CallbackQuery {
        state: &params.state,
        code: &code,
    }) {
        Ok(query) => query,
        Err(_) => return oauth_error("server_error", "could not encode callback"),
    };

    info!("Approving authorization, issued {}", code);
    let location = format!("{}?{}", params.redirect_uri, query);
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

async fn token(
    State(fixture): State<TwitterFixture>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    fixture.ledger().token_requests += 1;

    let field = |name: &str| form.get(name).map(String::as_str).unwrap_or_default();

    match field("grant_type") {
        "authorization_code" => {
            let Some(grant) = fixture.ledger().grants.remove(field("code")) else {
                return oauth_error("invalid_request", "Value passed for the authorization code was invalid.");
            };

            let challenge =
                Base64UrlUnpadded::encode_string(&Sha256::digest(field("code_verifier").as_bytes()));
            if challenge != grant.code_challenge {
                return oauth_error("invalid_request", "Value passed for the code verifier did not match.");
            }
            if field("redirect_uri") != grant.redirect_uri || field("client_id") != grant.client_id {
                return oauth_error("invalid_request", "Client or redirect URI did not match.");
            }

            Json(fixture.issue_tokens("tweet.read users.read offline.access")).into_response()
        }
        "refresh_token" => {
            if !fixture.ledger().refresh_tokens.remove(field("refresh_token")) {
                return oauth_error("invalid_request", "Value passed for the token was invalid.");
            }

            Json(fixture.issue_tokens("tweet.read users.read offline.access")).into_response()
        }
        _ => oauth_error("unsupported_grant_type", "grant_type is not supported"),
    }
}

async fn revoke(
    State(fixture): State<TwitterFixture>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let token = form.get("token").map(String::as_str).unwrap_or_default();

    let mut ledger = fixture.ledger();
    let revoked = ledger.access_tokens.remove(token) || ledger.refresh_tokens.remove(token);
    if revoked {
        ledger.revocations += 1;
    }

    Json(json!({ "revoked": revoked })).into_response()
}

fn not_found(value: &str, parameter: &str, detail: String) -> Value {
    json!({
        "errors": [{
            "value": value,
            "detail": detail,
            "title": "Not Found Error",
            "resource_type": "user",
            "parameter": parameter,
            "resource_id": value,
            "type": "https://api.twitter.com/2/problems/resource-not-found"
        }]
    })
}

async fn users_me(State(fixture): State<TwitterFixture>, headers: HeaderMap) -> Response {
    if let Err(response) = fixture.check_bearer(&headers) {
        return response;
    }

    let me = fixture
        .me
        .as_deref()
        .and_then(|id| fixture.user(|user| user["id"] == id));

    match me {
        Some(user) => Json(json!({ "data": user })).into_response(),
        None => Json(not_found("me", "id", "Could not find the authenticated user.".to_string()))
            .into_response(),
    }
}

async fn user_by_username(
    State(fixture): State<TwitterFixture>,
    Path(username): Path<String>,
    headers: HeaderMap,
) -> Response {
    if let Err(response) = fixture.check_bearer(&headers) {
        return response;
    }

    if !is_valid_username(&username) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "errors": [{
                    "parameters": { "username": [username] },
                    "message": format!(
                        "The `username` query parameter value [{username}] does not match ^[A-Za-z0-9_]{{1,15}}$"
                    )
                }],
                "title": "Invalid Request",
                "detail": "One or more parameters to your request was invalid.",
                "type": "https://api.twitter.com/2/problems/invalid-request"
            })),
        )
            .into_response();
    }

    let found = fixture.user(|user| {
        user["username"]
            .as_str()
            .is_some_and(|name| name.eq_ignore_ascii_case(&username))
    });

    match found {
        Some(user) => Json(json!({ "data": user })).into_response(),
        None => Json(not_found(
            &username,
            "username",
            format!("Could not find user with username: [{username}]."),
        ))
        .into_response(),
    }
}

fn is_valid_username(username: &str) -> bool {
    (1..=15).contains(&username.len())
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn list_param<'a>(params: &'a HashMap<String, String>, name: &str) -> Vec<&'a str> {
    params
        .get(name)
        .map(|value| value.split(',').filter(|item| !item.is_empty()).collect())
        .unwrap_or_default()
}

fn is_excluded(tweet: &Value, exclude: &[&str]) -> bool {
    let kinds: Vec<&str> = tweet["referenced_tweets"]
        .as_array()
        .map(|refs| refs.iter().filter_map(|r| r["type"].as_str()).collect())
        .unwrap_or_default();

    (exclude.contains(&"replies") && kinds.contains(&"replied_to"))
        || (exclude.contains(&"retweets") && kinds.contains(&"retweeted"))
}

async fn user_tweets(
    State(fixture): State<TwitterFixture>,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    if let Err(response) = fixture.check_bearer(&headers) {
        return response;
    }

    let Some(tweets) = fixture.tweets.get(&id) else {
        return Json(not_found(&id, "id", format!("Could not find user with id: [{id}].")))
            .into_response();
    };

    let exclude = list_param(&params, "exclude");
    let data: Vec<Value> = tweets
        .iter()
        .filter(|tweet| !is_excluded(tweet, &exclude))
        .cloned()
        .collect();

    let mut body = json!({
        "data": data,
        "meta": {
            "result_count": data.len(),
            "newest_id": data.first().map(|t| t["id"].clone()),
            "oldest_id": data.last().map(|t| t["id"].clone())
        }
    });

    if list_param(&params, "expansions").contains(&"author_id") {
        let authors: Vec<Value> = fixture
            .users
            .iter()
            .filter(|user| data.iter().any(|t| t["author_id"] == user["id"]))
            .cloned()
            .collect();
        body["includes"] = json!({ "users": authors });
    }

    Json(body).into_response()
}
