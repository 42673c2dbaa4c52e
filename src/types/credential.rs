//! Credential Types
//!
//! Access/refresh credential pair and the wire shapes of the token endpoints.

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// Access/refresh token pair used for bearer authentication.
///
/// Both halves are always present; an unauthenticated session is represented by
/// the absence of a pair, never by a pair with one side missing.
#[derive(Clone)]
pub struct CredentialPair {
    access_token: SecretString,
    refresh_token: SecretString,
    /// When the current access token was obtained.
    pub obtained_at: DateTime<Utc>,
}

impl CredentialPair {
    /// Create a new credential pair.
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: SecretString::new(access_token.into()),
            refresh_token: SecretString::new(refresh_token.into()),
            obtained_at: Utc::now(),
        }
    }

    /// Get access token value (for Authorization header).
    pub fn access_token(&self) -> &str {
        self.access_token.expose_secret()
    }

    /// Get refresh token value (for the refresh exchange).
    pub fn refresh_token(&self) -> &str {
        self.refresh_token.expose_secret()
    }

    /// Replace the access token after a refresh, rotating the refresh token
    /// only when the server issued a new one.
    pub fn refreshed(&self, access_token: String, rotated_refresh_token: Option<String>) -> Self {
        let refresh_token = match rotated_refresh_token {
            Some(token) if !token.is_empty() => SecretString::new(token),
            _ => self.refresh_token.clone(),
        };

        Self {
            access_token: SecretString::new(access_token),
            refresh_token,
            obtained_at: Utc::now(),
        }
    }

    /// Format as Authorization header value.
    pub fn authorization_header(&self) -> String {
        format!("Bearer {}", self.access_token.expose_secret())
    }
}

impl std::fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("obtained_at", &self.obtained_at)
            .finish()
    }
}

/// Body of the refresh exchange request.
#[derive(Clone, Serialize)]
pub struct RefreshRequestBody<'a> {
    pub refresh_token: &'a str,
}

/// Body of the login request.
#[derive(Clone, Serialize)]
pub struct LoginRequestBody<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Token response from the login and refresh endpoints.
///
/// Fields are optional so that a response lacking `access_token` is detected
/// as a failed exchange rather than a decode error.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
}

impl TokenResponse {
    /// Access token, if present and non-empty.
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref().filter(|t| !t.is_empty())
    }

    /// Refresh token, if present and non-empty.
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref().filter(|t| !t.is_empty())
    }
}
