//! Secret string wrapper for the reasoning API token.

use std::fmt;

/// A wrapper for sensitive strings that redacts the value in Debug/Display output.
///
/// # Example
///
/// ```
/// use appstore_orchestrator::config::SecretString;
///
/// let secret = SecretString::new("sk-proj-123");
/// assert_eq!(format!("{:?}", secret), "<REDACTED>");
/// assert_eq!(secret.expose(), "sk-proj-123");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct SecretString(String);

impl SecretString {
    /// Creates a new `SecretString` from any string-like value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Exposes the underlying secret value.
    ///
    /// Only call this where the secret is actually sent, e.g. the
    /// `Authorization` header of a reasoning request.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Returns true if the secret is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<REDACTED>")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<REDACTED>")
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for SecretString {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_string_debug_and_display_redacted() {
        let secret = SecretString::new("sk-proj-abcdef");
        assert_eq!(format!("{secret:?}"), "<REDACTED>");
        assert_eq!(format!("{secret}"), "<REDACTED>");
    }

    #[test]
    fn test_secret_string_expose_returns_original() {
        let secret: SecretString = "sk-proj-abcdef".into();
        assert_eq!(secret.expose(), "sk-proj-abcdef");
    }

    #[test]
    fn test_secret_string_eq() {
        assert_eq!(SecretString::new("a"), SecretString::from("a".to_string()));
        assert_ne!(SecretString::new("a"), SecretString::new("b"));
    }

    #[test]
    fn test_secret_string_is_empty() {
        assert!(SecretString::new("").is_empty());
        assert!(!SecretString::new("k").is_empty());
    }
}
