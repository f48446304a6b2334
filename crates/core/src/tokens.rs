//! One-time tokens for magic links and password resets.
//!
//! Only the SHA-256 digest is stored; the plaintext goes into the emailed
//! link and nowhere else.

use rand::Rng;
use sha2::{Digest, Sha256};

/// Length of a generated token (alphanumeric characters).
pub const TOKEN_LENGTH: usize = 48;

/// Validity of the first-time password setup link.
pub const WELCOME_TOKEN_TTL_HOURS: i64 = 72;

/// Validity of a password reset link.
pub const PASSWORD_RESET_TOKEN_TTL_HOURS: i64 = 1;

define_text_enum! {
    /// What a token authorises. Stored in `auth_tokens.purpose`.
    TokenPurpose ("token purpose") {
        Welcome = "welcome",
        PasswordReset = "password-reset",
    }
}

impl TokenPurpose {
    pub fn ttl(self) -> chrono::Duration {
        match self {
            TokenPurpose::Welcome => chrono::Duration::hours(WELCOME_TOKEN_TTL_HOURS),
            TokenPurpose::PasswordReset => {
                chrono::Duration::hours(PASSWORD_RESET_TOKEN_TTL_HOURS)
            }
        }
    }

    /// Front-end path the emailed link points at.
    pub fn link_path(self) -> &'static str {
        match self {
            TokenPurpose::Welcome => "set-password",
            TokenPurpose::PasswordReset => "reset-password",
        }
    }
}

/// A freshly generated token.
pub struct GeneratedToken {
    /// Sent to the user, never stored.
    pub plaintext: String,
    /// SHA-256 hex digest, stored in the database.
    pub hash: String,
}

pub fn generate_token() -> GeneratedToken {
    let plaintext: String = rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect();
    let hash = hash_token(&plaintext);
    GeneratedToken { plaintext, hash }
}

/// SHA-256 hex digest of a token.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Absolute link for a token, e.g. `https://app/set-password?token=...`.
pub fn token_link(app_url: &str, purpose: TokenPurpose, token: &str) -> String {
    format!(
        "{}/{}?token={token}",
        app_url.trim_end_matches('/'),
        purpose.link_path()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_token_shape() {
        let t = generate_token();
        assert_eq!(t.plaintext.len(), TOKEN_LENGTH);
        assert!(t.plaintext.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(t.hash, hash_token(&t.plaintext));
        assert_eq!(t.hash.len(), 64);
    }

    #[test]
    fn tokens_are_unique() {
        assert_ne!(generate_token().plaintext, generate_token().plaintext);
    }

    #[test]
    fn reset_is_shorter_than_welcome() {
        assert!(TokenPurpose::PasswordReset.ttl() < TokenPurpose::Welcome.ttl());
        assert_eq!(TokenPurpose::PasswordReset.ttl(), chrono::Duration::hours(1));
    }

    #[test]
    fn links() {
        assert_eq!(
            token_link("https://clearance.example.edu/", TokenPurpose::Welcome, "abc"),
            "https://clearance.example.edu/set-password?token=abc"
        );
        assert_eq!(
            token_link("http://localhost:5173", TokenPurpose::PasswordReset, "xyz"),
            "http://localhost:5173/reset-password?token=xyz"
        );
    }
}
