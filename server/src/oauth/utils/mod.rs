use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{thread_rng, RngCore};
use sha2::{Digest, Sha256};

/// Helper function to create URL-safe base64 encoding without padding
pub fn base64_url_encode(input: &[u8]) -> String {
    Base64UrlUnpadded::encode_string(input)
}

/// Generate a random URL-safe token from `len` bytes of entropy
pub fn random_token(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    thread_rng().fill_bytes(&mut bytes);
    base64_url_encode(&bytes)
}

/// The code challenge method sent on the authorize URL
pub const CODE_CHALLENGE_METHOD: &str = "s256";

/// A PKCE verifier and its S256 challenge
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    /// PKCE code verifier - the original random string
    pub verifier: String,
    /// PKCE code challenge - the hashed and encoded verifier
    pub challenge: String,
}

impl PkceChallenge {
    /// Generate a new PKCE code verifier and challenge
    pub fn generate() -> Self {
        // 64 bytes encode to 86 characters, inside the 43..=128 range
        let verifier = random_token(64);
        let challenge = s256_challenge(&verifier);

        Self {
            verifier,
            challenge,
        }
    }
}

/// Create a code challenge using the S256 method
pub fn s256_challenge(verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    base64_url_encode(&hasher.finalize())
}
