//! Demographic inference from channel profiles.
//!
//! The model gets the channel's name, description and country as text and,
//! when the channel has one, its profile image. It must answer with a JSON
//! object matching [`response_schema`]; anything else fails the item.

use crate::core::llm::{self, OpenAIClient};
use crate::core::records::{
    AgeRange, ChannelProfile, Demographics, DemographicsRow, Gender, RaceEthnicity,
};
use crate::error::{Error, Result};
use async_openai::types::responses::CreateResponse;
use serde_json::{Value, json};

pub const DEFAULT_DEMOGRAPHICS_MODEL: &str = "gpt-4o";
const SCHEMA_NAME: &str = "user_demographics";
const NOT_AVAILABLE: &str = "Not available";

#[derive(Clone)]
pub struct DemographicsService {
    client: OpenAIClient,
    model: String,
    prompt: String,
}

impl DemographicsService {
    pub fn new(client: OpenAIClient, model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            prompt: prompt.into(),
        }
    }

    pub async fn infer(&self, profile: &ChannelProfile) -> Result<Demographics> {
        let request: CreateResponse =
            serde_json::from_value(request_body(&self.model, &self.prompt, profile))?;
        let response = self.client.responses().create(request).await?;
        parse_demographics(&llm::output_text(response))
    }

    pub async fn infer_row(&self, profile: &ChannelProfile) -> Result<DemographicsRow> {
        let demographics = self.infer(profile).await?;
        tracing::info!(
            age = %demographics.inferred_age_range,
            gender = %demographics.inferred_gender,
            race_ethnicity = %demographics.inferred_race_ethnicity,
            confidence = demographics.confidence_level,
            "Inferred demographics"
        );
        Ok(DemographicsRow::new(profile, demographics))
    }
}

fn or_not_available(value: &str) -> &str {
    if value.trim().is_empty() {
        NOT_AVAILABLE
    } else {
        value
    }
}

pub fn user_message(profile: &ChannelProfile) -> String {
    format!(
        "Username: {}\n\
         Channel Description: {}\n\
         Country: {}\n\
         Profile Image URL: {}\n\
         \n\
         Please analyze the profile image and available information to infer demographic characteristics.",
        profile.channel_title,
        or_not_available(&profile.channel_description),
        or_not_available(&profile.channel_country),
        profile.thumbnail_url,
    )
}

/// Strict JSON schema for [`Demographics`].
pub fn response_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "inferred_age_range": { "type": "string", "enum": AgeRange::VALUES },
            "inferred_gender": { "type": "string", "enum": Gender::VALUES },
            "inferred_race_ethnicity": { "type": "string", "enum": RaceEthnicity::VALUES },
            "confidence_level": { "type": "number" },
            "reasoning": { "type": "string" }
        },
        "required": [
            "inferred_age_range",
            "inferred_gender",
            "inferred_race_ethnicity",
            "confidence_level",
            "reasoning"
        ],
        "additionalProperties": false
    })
}

fn request_body(model: &str, prompt: &str, profile: &ChannelProfile) -> Value {
    let text = user_message(profile);
    let content = if profile.thumbnail_url.trim().is_empty() {
        json!(text)
    } else {
        json!([
            { "type": "input_text", "text": text },
            { "type": "input_image", "image_url": profile.thumbnail_url, "detail": "auto" }
        ])
    };

    json!({
        "model": model,
        "input": [
            { "type": "message", "role": "system", "content": prompt },
            { "type": "message", "role": "user", "content": content }
        ],
        "text": {
            "format": {
                "type": "json_schema",
                "name": SCHEMA_NAME,
                "schema": response_schema(),
                "strict": true
            }
        }
    })
}

pub fn parse_demographics(raw: &str) -> Result<Demographics> {
    let demographics: Demographics = serde_json::from_str(raw.trim())?;
    if !(0.0..=1.0).contains(&demographics.confidence_level) {
        return Err(Error::custom(format!(
            "confidence_level {} is outside [0, 1]",
            demographics.confidence_level
        )));
    }
    Ok(demographics)
}
