//! API token handling using the secrecy crate
//!
//! The Confluence API token is wrapped in [`SecretString`] as soon as it is
//! parsed. Its memory is zeroed on drop, `Debug` output is redacted and it
//! serializes as a placeholder, so it cannot leak through logs or a dumped
//! configuration. Code that needs the value calls `expose_secret()`.
//!
//! # Example
//!
//! ```rust
//! use confluence_export::config::secret_string;
//! use secrecy::ExposeSecret;
//!
//! let token = secret_string("atl-token".to_string());
//! assert_eq!(token.expose_secret(), "atl-token");
//! assert!(!format!("{token:?}").contains("atl-token"));
//! ```

use secrecy::{CloneableSecret, DebugSecret, Secret, SerializableSecret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroize;

const REDACTED: &str = "[REDACTED]";

/// String payload for [`Secret`]
#[derive(Clone, Debug, Zeroize)]
#[zeroize(drop)]
pub struct SecretValue(String);

impl CloneableSecret for SecretValue {}
impl DebugSecret for SecretValue {}
impl SerializableSecret for SecretValue {}

impl From<String> for SecretValue {
    fn from(s: String) -> Self {
        SecretValue(s)
    }
}

impl PartialEq<str> for SecretValue {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl AsRef<str> for SecretValue {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl SecretValue {
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl Serialize for SecretValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(REDACTED)
    }
}

impl<'de> Deserialize<'de> for SecretValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(SecretValue)
    }
}

/// Zeroizing, redacted string
pub type SecretString = Secret<SecretValue>;

/// Wraps a String in a [`SecretString`]
#[inline]
pub fn secret_string(value: String) -> SecretString {
    Secret::new(SecretValue::from(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_secret_string_creation() {
        let secret = secret_string("api-token".to_string());
        assert_eq!(secret.expose_secret(), "api-token");
        assert!(!secret.expose_secret().is_empty());
    }

    #[test]
    fn test_blank_secret_is_empty() {
        assert!(secret_string("   ".to_string()).expose_secret().is_empty());
    }

    #[test]
    fn test_secret_debug_redacted() {
        let secret = secret_string("sensitive-data".to_string());
        let debug_output = format!("{secret:?}");
        assert!(!debug_output.contains("sensitive-data"));
    }

    #[test]
    fn test_secret_serializes_redacted() {
        #[derive(Serialize, Deserialize)]
        struct Credentials {
            api_token: SecretString,
        }

        let parsed: Credentials = serde_json::from_str(r#"{"api_token":"abc123"}"#).unwrap();
        assert_eq!(parsed.api_token.expose_secret(), "abc123");

        let json = serde_json::to_string(&parsed).unwrap();
        assert!(!json.contains("abc123"));
        assert!(json.contains(REDACTED));
    }
}
