//! Shared plumbing for the OpenAI backed services.

use crate::error::{Error, Result};
use async_openai::config::OpenAIConfig;
use async_openai::types::responses::{OutputItem, OutputMessageContent, Response};
use secrecy::{ExposeSecret, SecretString};
use std::path::Path;
use tracing::warn;

pub type OpenAIClient = async_openai::Client<OpenAIConfig>;

pub fn client(api_key: &SecretString) -> OpenAIClient {
    async_openai::Client::with_config(OpenAIConfig::new().with_api_key(api_key.expose_secret()))
}

/// Concatenate every text part of the response's message outputs.
pub fn output_text(response: Response) -> String {
    let mut content = String::new();
    for output in response.output {
        if let OutputItem::Message(out) = output {
            for c in out.content {
                match c {
                    OutputMessageContent::OutputText(text) => content.push_str(&text.text),
                    _ => {
                        warn!("Unexpected content type: {c:?}");
                        continue;
                    }
                }
            }
        }
    }
    content
}

/// Read a system prompt from disk. A missing prompt is a configuration error.
pub fn load_prompt(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(Error::config(format!(
            "prompt file '{}' not found",
            path.display()
        )));
    }
    let prompt = std::fs::read_to_string(path)?;
    if prompt.trim().is_empty() {
        return Err(Error::config(format!("prompt file '{}' is empty", path.display())));
    }
    Ok(prompt)
}
