//! Configuration from the environment.
//!
//! `main` loads a local `.env` first; credentials are only demanded by the
//! jobs that talk to the corresponding API.

use crate::core::{DEFAULT_DEMOGRAPHICS_MODEL, DEFAULT_SUMMARY_MODEL};
use crate::error::{Error, Result};
use secrecy::SecretString;

const YOUTUBE_API_KEY: &str = "YOUTUBE_API_KEY";
const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
const SUMMARY_MODEL: &str = "VIDSCRAPE_SUMMARY_MODEL";
const DEMOGRAPHICS_MODEL: &str = "VIDSCRAPE_DEMOGRAPHICS_MODEL";
const PLACEHOLDER_KEY: &str = "your_api_key_here";

#[derive(Debug)]
pub struct Config {
    youtube_api_key: Option<SecretString>,
    openai_api_key: Option<SecretString>,
    pub summary_model: String,
    pub demographics_model: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let key = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty() && v != PLACEHOLDER_KEY)
                .map(SecretString::from)
        };

        Self {
            youtube_api_key: key(YOUTUBE_API_KEY),
            openai_api_key: key(OPENAI_API_KEY),
            summary_model: lookup(SUMMARY_MODEL)
                .unwrap_or_else(|| DEFAULT_SUMMARY_MODEL.to_string()),
            demographics_model: lookup(DEMOGRAPHICS_MODEL)
                .unwrap_or_else(|| DEFAULT_DEMOGRAPHICS_MODEL.to_string()),
        }
    }

    pub fn youtube_api_key(&self) -> Result<&SecretString> {
        self.youtube_api_key.as_ref().ok_or_else(|| missing(YOUTUBE_API_KEY))
    }

    pub fn openai_api_key(&self) -> Result<&SecretString> {
        self.openai_api_key.as_ref().ok_or_else(|| missing(OPENAI_API_KEY))
    }
}

fn missing(name: &str) -> Error {
    Error::config(format!(
        "required environment variable {name} is not set (add it to your .env file)"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn missing_keys_are_config_errors() {
        let cfg = config(&[]);
        assert!(matches!(cfg.youtube_api_key(), Err(Error::Config(_))));
        assert!(matches!(cfg.openai_api_key(), Err(Error::Config(_))));
        assert_eq!(cfg.summary_model, DEFAULT_SUMMARY_MODEL);
    }

    #[test]
    fn placeholder_key_counts_as_missing() {
        let cfg = config(&[(YOUTUBE_API_KEY, "your_api_key_here"), (OPENAI_API_KEY, "sk-1")]);
        assert!(cfg.youtube_api_key().is_err());
        assert_eq!(cfg.openai_api_key().unwrap().expose_secret(), "sk-1");
    }

    #[test]
    fn model_overrides() {
        let cfg = config(&[(DEMOGRAPHICS_MODEL, "gpt-4.1")]);
        assert_eq!(cfg.demographics_model, "gpt-4.1");
    }
}
