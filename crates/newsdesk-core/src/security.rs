//! API keys read from the environment.

use std::env;
use std::fmt;

use crate::NewsdeskError;

/// An API key together with the variable it came from. Only [`expose`]
/// reveals the value; formatting shows the variable name.
///
/// [`expose`]: SecretValue::expose
#[derive(Clone)]
pub struct SecretValue {
    source: String,
    value: String,
}

impl SecretValue {
    pub fn expose(&self) -> &str {
        &self.value
    }

    /// Name of the environment variable holding the key.
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretValue")
            .field("source", &self.source)
            .field("value", &"<redacted>")
            .finish()
    }
}

impl fmt::Display for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}=<redacted>", self.source)
    }
}

/// Read `var`, rejecting unset or blank values. Surrounding whitespace is
/// stripped from the key.
pub fn require_env(var: &str) -> Result<SecretValue, NewsdeskError> {
    match env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(SecretValue {
            source: var.to_string(),
            value: value.trim().to_string(),
        }),
        _ => Err(NewsdeskError::MissingSecret(var.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loaded_key_never_formats_its_value() {
        unsafe {
            std::env::set_var("NEWSDESK_TEST_SECRET", "  gsk-live-123\n");
        }
        let secret = require_env("NEWSDESK_TEST_SECRET").unwrap();

        assert_eq!(secret.expose(), "gsk-live-123");
        assert_eq!(secret.source(), "NEWSDESK_TEST_SECRET");
        assert_eq!(secret.to_string(), "$NEWSDESK_TEST_SECRET=<redacted>");
        assert_eq!(
            format!("{secret:?}"),
            r#"SecretValue { source: "NEWSDESK_TEST_SECRET", value: "<redacted>" }"#
        );
        assert!(!format!("{secret} {secret:?} {secret:#?}").contains("gsk-live"));
    }

    #[test]
    fn blank_or_unset_keys_are_missing() {
        unsafe {
            std::env::remove_var("NEWSDESK_TEST_SECRET_MISSING");
            std::env::set_var("NEWSDESK_TEST_SECRET_BLANK", "   ");
        }
        for var in ["NEWSDESK_TEST_SECRET_MISSING", "NEWSDESK_TEST_SECRET_BLANK"] {
            let err = require_env(var).unwrap_err();
            assert!(matches!(err, NewsdeskError::MissingSecret(ref name) if name == var));
        }
    }
}
