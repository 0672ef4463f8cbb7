//! Credential resolution.
//!
//! Precedence: explicit option → caller-supplied environment overrides → process
//! environment. Within each source the keys are checked in a fixed order and the first
//! non-empty value wins.

use crate::error::ErrorContext;
use crate::{Error, Result};
use secrecy::SecretString;
use std::collections::HashMap;

/// Environment values supplied by the caller in place of (or on top of) the process environment.
pub type EnvOverrides = HashMap<String, String>;

/// Where one backend family looks for its credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CredentialSpec {
    /// Display name used in error messages.
    pub label: &'static str,
    /// Keys looked up in [`EnvOverrides`], in order.
    pub override_keys: &'static [&'static str],
    /// Process environment variables, in order.
    pub env_keys: &'static [&'static str],
}

pub const REPLICATE_CREDENTIALS: CredentialSpec = CredentialSpec {
    label: "Replicate",
    override_keys: &["REPLICATE_API_KEY", "REPLICATE_API_TOKEN"],
    env_keys: &["REPLICATE_API_TOKEN", "REPLICATE_API_KEY"],
};

impl CredentialSpec {
    /// Resolve without failing. `None` means no source had a non-empty value.
    pub fn resolve(&self, explicit: Option<&str>, overrides: &EnvOverrides) -> Option<SecretString> {
        explicit
            .and_then(non_empty)
            .or_else(|| {
                self.override_keys
                    .iter()
                    .find_map(|k| overrides.get(*k).and_then(|v| non_empty(v)))
            })
            .or_else(|| {
                self.env_keys
                    .iter()
                    .find_map(|k| std::env::var(k).ok().and_then(|v| non_empty(&v)))
            })
            .map(SecretString::from)
    }

    /// The error raised when a call is attempted without a credential.
    pub fn missing_error(&self) -> Error {
        let primary = self.env_keys.first().copied().unwrap_or("API_KEY");
        Error::configuration_with_context(
            format!(
                "{} API key is not set. Set the {} environment variable or add `apiKey` to the provider config.",
                self.label, primary
            ),
            ErrorContext::new()
                .with_field_path("options.api_key")
                .with_source("credential_resolver"),
        )
    }
}

fn non_empty(v: &str) -> Option<String> {
    let v = v.trim();
    (!v.is_empty()).then(|| v.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    const TEST_SPEC: CredentialSpec = CredentialSpec {
        label: "Test",
        override_keys: &["TEST_OVERRIDE_A", "TEST_OVERRIDE_B"],
        env_keys: &["AI_LIB_PROVIDERS_TEST_UNSET_KEY_A", "AI_LIB_PROVIDERS_TEST_UNSET_KEY_B"],
    };

    #[test]
    fn test_explicit_wins() {
        let mut env = EnvOverrides::new();
        env.insert("TEST_OVERRIDE_A".into(), "from-env".into());
        let key = TEST_SPEC.resolve(Some("explicit"), &env).unwrap();
        assert_eq!(key.expose_secret(), "explicit");
    }

    #[test]
    fn test_override_order_and_empty_skipped() {
        let mut env = EnvOverrides::new();
        env.insert("TEST_OVERRIDE_A".into(), "   ".into());
        env.insert("TEST_OVERRIDE_B".into(), "second".into());
        let key = TEST_SPEC.resolve(Some(""), &env).unwrap();
        assert_eq!(key.expose_secret(), "second");
    }

    #[test]
    fn test_absent_everywhere() {
        assert!(TEST_SPEC.resolve(None, &EnvOverrides::new()).is_none());
        let err = TEST_SPEC.missing_error();
        assert!(err.is_configuration());
        assert!(err
            .to_string()
            .contains("Test API key is not set. Set the AI_LIB_PROVIDERS_TEST_UNSET_KEY_A environment variable"));
    }
}
