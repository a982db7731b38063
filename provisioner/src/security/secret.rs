// Transient credential holder
//
// The operator's password lives in a `SecretString` from the prompt onward: it is zeroized on
// drop and never printed by `Debug`. Copies made inside the terminal library before it hands the
// value over are outside our control. `reveal()` is called only where a child-process payload is
// built.

use anyhow::Result;
use secrecy::{ExposeSecret, SecretString};

use crate::utils::validation::validate_credential;

pub struct OpaqueSecret {
    value: SecretString,
}

impl OpaqueSecret {
    /// Wrap a collected value, rejecting credentials the steps cannot carry.
    pub fn new(value: impl Into<SecretString>) -> Result<Self> {
        let value = value.into();
        validate_credential(value.expose_secret())?;
        Ok(Self { value })
    }

    /// Plaintext view; call only while building the payload that needs it.
    pub fn reveal(&self) -> &str {
        self.value.expose_secret()
    }

    /// Replace every occurrence of the secret in `text` with `***`.
    pub fn redact(&self, text: &str) -> String {
        let secret = self.reveal();
        if secret.is_empty() || !text.contains(secret) {
            return text.to_string();
        }
        text.replace(secret, "***")
    }
}

impl std::fmt::Debug for OpaqueSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("OpaqueSecret(***)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_never_shows_the_value() {
        let secret = OpaqueSecret::new("Hunter2!Hunter2".to_string()).unwrap();
        let rendered = format!("{:?}", secret);
        assert_eq!(rendered, "OpaqueSecret(***)");
        assert!(!rendered.contains("Hunter2"));
    }

    #[test]
    fn new_accepts_a_secret_string() {
        let prompted = SecretString::from("Tr1cky'Pass");
        let secret = OpaqueSecret::new(prompted).unwrap();
        assert_eq!(secret.reveal(), "Tr1cky'Pass");
        assert!(OpaqueSecret::new(SecretString::from("")).is_err());
    }

    #[test]
    fn reveal_returns_the_collected_value() {
        let secret = OpaqueSecret::new("p@ss'word".to_string()).unwrap();
        assert_eq!(secret.reveal(), "p@ss'word");
    }

    #[test]
    fn new_rejects_invalid_credentials() {
        assert!(OpaqueSecret::new(String::new()).is_err());
        assert!(OpaqueSecret::new("two\nlines".to_string()).is_err());
    }

    #[test]
    fn redact_scrubs_error_text() {
        let secret = OpaqueSecret::new("Sup3rSecret".to_string()).unwrap();
        let scrubbed = secret.redact("Login failed near 'Sup3rSecret' (Sup3rSecret)");
        assert_eq!(scrubbed, "Login failed near '***' (***)");
        assert_eq!(secret.redact("nothing to hide"), "nothing to hide");
    }
}
