//! Bearer token authentication for the management API.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::collections::HashSet;

use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

/// Authenticates API requests via Bearer tokens.
///
/// Accepted tokens are configured as HMAC-SHA256 digests keyed by
/// `signing_secret`, so the configuration never holds a usable token.
/// Digests are produced with `admin token generate`.
pub struct AuthService {
    signing_secret: String,
    accepted: HashSet<String>,
}

impl AuthService {
    /// Creates the service from the signing secret and the accepted digests.
    ///
    /// Digests are compared in lowercase hex.
    pub fn new<I, S>(signing_secret: String, digests: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            signing_secret,
            accepted: digests
                .into_iter()
                .map(|d| d.as_ref().trim().to_ascii_lowercase())
                .filter(|d| !d.is_empty())
                .collect(),
        }
    }

    /// Hashes a raw token with HMAC-SHA256 using `secret`.
    ///
    /// Returns a 64-character lowercase hex-encoded MAC.
    pub fn digest(secret: &str, token: &str) -> String {
        // HMAC accepts keys of any length, so new_from_slice cannot fail.
        let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
            Ok(mac) => mac,
            Err(_) => return String::new(),
        };
        mac.update(token.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    pub fn accepted_count(&self) -> usize {
        self.accepted.len()
    }

    /// Authenticates a raw token against the configured digests.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Unauthorized`] if the token's digest is not accepted.
    pub fn authenticate(&self, token: &str) -> Result<(), AppError> {
        let digest = Self::digest(&self.signing_secret, token);

        if digest.is_empty() || !self.accepted.contains(&digest) {
            return Err(AppError::unauthorized("Invalid or revoked token"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_secret() -> String {
        "test-signing-secret".to_string()
    }

    #[test]
    fn test_authenticate_success() {
        let digest = AuthService::digest(&test_secret(), "valid-token");
        let service = AuthService::new(test_secret(), [digest]);

        assert!(service.authenticate("valid-token").is_ok());
    }

    #[test]
    fn test_authenticate_invalid_token() {
        let digest = AuthService::digest(&test_secret(), "valid-token");
        let service = AuthService::new(test_secret(), [digest]);

        let result = service.authenticate("invalid-token");
        assert!(matches!(result.unwrap_err(), AppError::Unauthorized { .. }));
    }

    #[test]
    fn test_digests_are_case_insensitive() {
        let digest = AuthService::digest(&test_secret(), "token").to_uppercase();
        let service = AuthService::new(test_secret(), [format!(" {digest} ")]);

        assert!(service.authenticate("token").is_ok());
        assert_eq!(service.accepted_count(), 1);
    }

    #[test]
    fn test_digest_consistency() {
        let a = AuthService::digest(&test_secret(), "test-token");
        let b = AuthService::digest(&test_secret(), "test-token");

        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, AuthService::digest(&test_secret(), "other-token"));
    }

    #[test]
    fn test_secret_matters() {
        assert_ne!(
            AuthService::digest("secret-a", "token"),
            AuthService::digest("secret-b", "token")
        );
    }

    #[test]
    fn test_no_digests_rejects_everything() {
        let service = AuthService::new(test_secret(), Vec::<String>::new());
        assert!(service.authenticate("").is_err());
    }
}
