//! OAuth2 authorization-code flow with PKCE against the Twitter API
//! This includes PKCE generation, the in-memory session store and token handling

pub mod client;
pub mod session;
pub mod token;
pub mod utils;

pub use client::*;
pub use session::{SessionStatus, SessionStore};

use std::fmt;

/// Scopes the app can request on the authorize URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    TweetRead,
    TweetWrite,
    UsersRead,
    FollowsRead,
    FollowsWrite,
    OfflineAccess,
    LikeRead,
    LikeWrite,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::TweetRead => "tweet.read",
            Scope::TweetWrite => "tweet.write",
            Scope::UsersRead => "users.read",
            Scope::FollowsRead => "follows.read",
            Scope::FollowsWrite => "follows.write",
            Scope::OfflineAccess => "offline.access",
            Scope::LikeRead => "like.read",
            Scope::LikeWrite => "like.write",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The scopes requested by `/login`
pub const DEFAULT_SCOPES: [Scope; 8] = [
    Scope::TweetRead,
    Scope::UsersRead,
    Scope::TweetWrite,
    Scope::FollowsRead,
    Scope::FollowsWrite,
    Scope::OfflineAccess,
    Scope::LikeRead,
    Scope::LikeWrite,
];
