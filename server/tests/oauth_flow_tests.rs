use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use fixtures::{spawn_server, twitter::TwitterFixture};
use serde_json::Value;
use tokio::net::TcpListener;
use tweet_timeline::{
    oauth::DEFAULT_SCOPES,
    routes,
    server::run_server,
    state::{AppConfig, AppState, TwitterEndpoints, TwitterOAuthConfig},
};

struct TestApp {
    addr: SocketAddr,
    fixture: TwitterFixture,
    client: reqwest::Client,
}

impl TestApp {
    async fn start(fixture: TwitterFixture) -> Self {
        let twitter_addr = spawn_server(fixture.clone().router()).await.unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let state = AppState::new(AppConfig {
            oauth: TwitterOAuthConfig {
                client_id: "client-id".to_string(),
                client_secret: Some("client-secret".to_string()),
                callback: format!("http://{addr}/callback"),
                scopes: DEFAULT_SCOPES.to_vec(),
            },
            endpoints: TwitterEndpoints::with_base_url(&format!("http://{twitter_addr}")),
            port: addr.port(),
            http_timeout: Duration::from_secs(5),
        })
        .unwrap();

        tokio::spawn(run_server(listener, routes::routes(state)));

        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap();

        Self {
            addr,
            fixture,
            client,
        }
    }

    async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(format!("http://{}{}", self.addr, path))
            .send()
            .await
            .unwrap()
    }

    /// Walk `/login` through the fixture's authorize page, returning the callback URL
    async fn approved_callback_url(&self) -> String {
        let login = self.get("/login").await;
        assert_eq!(login.status(), reqwest::StatusCode::FOUND);

        let approved = self
            .client
            .get(location(&login))
            .send()
            .await
            .unwrap();
        assert_eq!(approved.status(), reqwest::StatusCode::FOUND);

        location(&approved)
    }

    async fn login(&self) -> reqwest::Response {
        let callback_url = self.approved_callback_url().await;
        self.client.get(callback_url).send().await.unwrap()
    }

    /// Start a login and return the state the app generated for it
    async fn pending_state(&self) -> String {
        let login = self.get("/login").await;
        query(&location(&login))["state"].clone()
    }
}

fn location(response: &reqwest::Response) -> String {
    response.headers()["location"].to_str().unwrap().to_string()
}

fn query(url: &str) -> HashMap<String, String> {
    let (_, query) = url.split_once('?').unwrap();
    serde_urlencoded::from_str(query).unwrap()
}

fn tweet_ids(json: &Value) -> Vec<String> {
    json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_login_redirects_to_authorize_with_pkce() {
    let app = TestApp::start(TwitterFixture::new()).await;

    let response = app.get("/login").await;

    assert_eq!(response.status(), reqwest::StatusCode::FOUND);
    let url = location(&response);
    assert!(url.contains("/i/oauth2/authorize?"));

    let params = query(&url);
    assert_eq!(params["code_challenge_method"], "s256");
    assert_eq!(params["client_id"], "client-id");
    assert_eq!(params["redirect_uri"], format!("http://{}/callback", app.addr));
    assert!(!params["code_challenge"].is_empty());
    assert!(!params["state"].is_empty());
}

#[tokio::test]
async fn test_each_login_uses_a_different_state() {
    let app = TestApp::start(TwitterFixture::new()).await;

    let first = app.pending_state().await;
    let second = app.pending_state().await;

    assert_ne!(first, second);
}

#[tokio::test]
async fn test_callback_with_wrong_state_never_exchanges_the_code() {
    let app = TestApp::start(TwitterFixture::new()).await;
    app.pending_state().await;

    let response = app.get("/callback?code=abc&state=wrong").await;

    assert_eq!(response.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.text().await.unwrap(), "State isn't matching");
    assert_eq!(app.fixture.token_requests(), 0);
}

#[tokio::test]
async fn test_callback_state_cannot_be_replayed() {
    let app = TestApp::start(TwitterFixture::new()).await;
    let callback_url = app.approved_callback_url().await;

    let first = app.client.get(&callback_url).send().await.unwrap();
    let second = app.client.get(&callback_url).send().await.unwrap();

    assert_eq!(first.status(), reqwest::StatusCode::FOUND);
    assert_eq!(second.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(app.fixture.token_requests(), 1);
}

#[tokio::test]
async fn test_full_flow_relays_own_timeline_without_replies_or_retweets() {
    let app = TestApp::start(TwitterFixture::new()).await;

    let callback = app.login().await;
    assert_eq!(callback.status(), reqwest::StatusCode::FOUND);
    assert_eq!(location(&callback), "/tweets");
    assert_eq!(app.fixture.token_requests(), 1);

    let response = app.get("/tweets").await;
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "application/json");

    let json: Value = response.json().await.unwrap();
    assert_eq!(tweet_ids(&json), vec!["1004", "1001"]);
    for tweet in json["data"].as_array().unwrap() {
        let kinds: Vec<&str> = tweet["referenced_tweets"]
            .as_array()
            .map(|refs| refs.iter().filter_map(|r| r["type"].as_str()).collect())
            .unwrap_or_default();
        assert!(!kinds.contains(&"replied_to"));
        assert!(!kinds.contains(&"retweeted"));
    }
    assert_eq!(json["includes"]["users"][0]["username"], "alice");
}

#[tokio::test]
async fn test_tweets_for_named_user() {
    let app = TestApp::start(TwitterFixture::new()).await;
    app.login().await;

    let response = app.get("/tweets?username=bob").await;

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let json: Value = response.json().await.unwrap();
    assert_eq!(tweet_ids(&json), vec!["2002"]);
}

#[tokio::test]
async fn test_unknown_username_is_404() {
    let app = TestApp::start(TwitterFixture::new()).await;
    app.login().await;

    let response = app.get("/tweets?username=nobody").await;

    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
    assert!(response.text().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_username_is_404() {
    let app = TestApp::start(TwitterFixture::new()).await;
    app.login().await;

    let response = app.get("/tweets?username=al%20ice").await;

    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_self_lookup_without_username_is_400() {
    let app = TestApp::start(TwitterFixture::new().without_me()).await;
    app.login().await;

    let response = app.get("/tweets").await;

    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_tweets_before_login_is_401() {
    let app = TestApp::start(TwitterFixture::new()).await;

    let response = app.get("/tweets").await;

    assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["error"], "not_authenticated");
}

#[tokio::test]
async fn test_failed_code_exchange_answers_502() {
    let app = TestApp::start(TwitterFixture::new()).await;
    let state = app.pending_state().await;

    let response = app
        .get(&format!("/callback?code=bogus&state={state}"))
        .await;

    assert_eq!(response.status(), reqwest::StatusCode::BAD_GATEWAY);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["error"], "remote_call_failed");
    assert_eq!(app.fixture.token_requests(), 1);
}

#[tokio::test]
async fn test_denied_authorization_is_400() {
    let app = TestApp::start(TwitterFixture::new()).await;
    let state = app.pending_state().await;

    let response = app
        .get(&format!("/callback?error=access_denied&state={state}"))
        .await;

    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["error"], "authorization_denied");
    assert_eq!(app.fixture.token_requests(), 0);
}

#[tokio::test]
async fn test_revoke_after_login() {
    let app = TestApp::start(TwitterFixture::new()).await;
    app.login().await;

    let response = app.get("/revoke").await;

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["revoked"], true);
    assert_eq!(app.fixture.revocations(), 1);

    let after = app.get("/tweets").await;
    assert_eq!(after.status(), reqwest::StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_revoke_before_login_is_401() {
    let app = TestApp::start(TwitterFixture::new()).await;

    let response = app.get("/revoke").await;

    assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);
    assert_eq!(app.fixture.revocations(), 0);
}

#[tokio::test]
async fn test_expired_token_is_refreshed() {
    let app = TestApp::start(TwitterFixture::new().with_access_token_ttl(0)).await;
    app.login().await;

    let response = app.get("/tweets").await;

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert!(app.fixture.token_requests() > 1);
}

#[tokio::test]
async fn test_rejected_refresh_logs_the_user_out() {
    let app = TestApp::start(TwitterFixture::new().with_access_token_ttl(0)).await;
    app.login().await;
    app.fixture.revoke_refresh_tokens();

    let first = app.get("/tweets").await;
    let second = app.get("/tweets").await;

    assert_eq!(first.status(), reqwest::StatusCode::UNAUTHORIZED);
    assert_eq!(second.status(), reqwest::StatusCode::UNAUTHORIZED);
    assert_eq!(app.fixture.token_requests(), 2);
}
