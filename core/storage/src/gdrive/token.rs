//! Bearer token handling for Google Drive.
//!
//! Tokens arrive from the host already issued (for example by a browser
//! implicit-grant flow). They are stored as the JSON text of a remote's
//! `token` option and are never refreshed here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cloudferry_common::{Error, Result, SecretString};

/// Token JSON as stored in a remote's `token` option.
#[derive(Debug, Serialize, Deserialize)]
struct TokenJson {
    access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expiry: Option<DateTime<Utc>>,
}

/// OAuth2 bearer token for Drive API requests.
#[derive(Debug, Clone)]
pub struct DriveToken {
    access_token: SecretString,
    token_type: Option<String>,
    refresh_token: Option<SecretString>,
    expiry: Option<DateTime<Utc>>,
}

impl DriveToken {
    /// Token consisting only of an access token.
    pub fn from_access_token(access_token: impl Into<String>) -> Self {
        Self {
            access_token: SecretString::new(access_token),
            token_type: None,
            refresh_token: None,
            expiry: None,
        }
    }

    /// Parse the JSON text of a `token` option.
    ///
    /// # Errors
    /// - `Error::Config` when the text is not a token object
    pub fn parse(json: &str) -> Result<Self> {
        let raw: TokenJson = serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("failed to parse token: {}", e)))?;

        Ok(Self {
            access_token: SecretString::new(raw.access_token),
            token_type: raw.token_type,
            refresh_token: raw.refresh_token.map(SecretString::new),
            expiry: raw.expiry,
        })
    }

    /// Serialize to the JSON text stored in a `token` option.
    pub fn to_json(&self) -> Result<String> {
        let raw = TokenJson {
            access_token: self.access_token.expose().to_string(),
            token_type: self.token_type.clone(),
            refresh_token: self
                .refresh_token
                .as_ref()
                .map(|t| t.expose().to_string()),
            expiry: self.expiry,
        };
        Ok(serde_json::to_string(&raw)?)
    }

    /// Value of the `Authorization` header.
    pub fn authorization(&self) -> String {
        let token_type = self.token_type.as_deref().unwrap_or("Bearer");
        format!("{} {}", token_type, self.access_token.expose())
    }

    /// Check if the token carries an expiry that has passed.
    pub fn is_expired(&self) -> bool {
        self.expiry.is_some_and(|expiry| expiry <= Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_token_only() {
        let token = DriveToken::from_access_token("ya29.abc");
        assert_eq!(token.authorization(), "Bearer ya29.abc");
        assert!(!token.is_expired());
        assert_eq!(token.to_json().unwrap(), r#"{"access_token":"ya29.abc"}"#);
    }

    #[test]
    fn test_json_escaping() {
        let token = DriveToken::from_access_token(r#"a"b\c"#);
        let json = token.to_json().unwrap();
        let parsed = DriveToken::parse(&json).unwrap();
        assert_eq!(parsed.authorization(), r#"Bearer a"b\c"#);
    }

    #[test]
    fn test_parse_full_token() {
        let token = DriveToken::parse(
            r#"{"access_token":"x","token_type":"Bearer","refresh_token":"r","expiry":"2000-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert!(token.is_expired());
        assert!(token.to_json().unwrap().contains(r#""refresh_token":"r""#));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = DriveToken::parse("not json").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let token = DriveToken::from_access_token("ya29.secret");
        assert!(!format!("{:?}", token).contains("ya29"));
    }
}
