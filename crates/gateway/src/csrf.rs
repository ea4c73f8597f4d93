//! Per-session anti-forgery tokens.
//!
//! The bootstrap endpoint hands the widget a token derived from a
//! process-local random secret and the session id; every visitor POST must
//! echo it back. Tokens are stateless — rotating the process invalidates
//! them all, which matches the widget re-bootstrapping on reload.

use sha2::Digest;

#[derive(Clone)]
pub struct CsrfKeys {
    secret: [u8; 32],
}

impl CsrfKeys {
    #[must_use]
    pub fn new() -> Self {
        Self {
            secret: rand::random(),
        }
    }

    /// Token the widget must present for this session.
    #[must_use]
    pub fn token_for(&self, session_id: &str) -> String {
        let mut hasher = sha2::Sha256::new();
        hasher.update(self.secret);
        hasher.update(session_id.as_bytes());
        let digest = hasher.finalize();
        digest.iter().map(|b| format!("{b:02x}")).collect()
    }

    #[must_use]
    pub fn verify(&self, session_id: &str, token: &str) -> bool {
        // Constant-time enough for a 64-char hex compare of a hash output.
        self.token_for(session_id) == token
    }
}

impl Default for CsrfKeys {
    fn default() -> Self {
        Self::new()
    }
}
