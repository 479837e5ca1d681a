use crate::core::llm::{self, OpenAIClient};
use crate::core::records::{SummaryRow, TranscriptRow};
use crate::error::{Error, Result};
use async_openai::types::responses::{
    CreateResponseArgs, EasyInputMessageArgs, InputItem, InputParam, Role,
};

pub const DEFAULT_SUMMARY_MODEL: &str = "gpt-4o-mini";
const MAX_OUTPUT_TOKENS: u32 = 500;
const TEMPERATURE: f32 = 0.3;

#[derive(Clone)]
pub struct SummaryService {
    client: OpenAIClient,
    model: String,
    prompt: String,
}

impl SummaryService {
    pub fn new(client: OpenAIClient, model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            prompt: prompt.into(),
        }
    }

    pub async fn summarize(&self, transcript: &str) -> Result<String> {
        let request = CreateResponseArgs::default()
            .max_output_tokens(MAX_OUTPUT_TOKENS)
            .model(self.model.as_str())
            .temperature(TEMPERATURE)
            .input(InputParam::Items(vec![
                InputItem::EasyMessage(
                    EasyInputMessageArgs::default()
                        .role(Role::System)
                        .content(self.prompt.as_str())
                        .build()?,
                ),
                InputItem::EasyMessage(
                    EasyInputMessageArgs::default()
                        .role(Role::User)
                        .content(user_content(transcript))
                        .build()?,
                ),
            ]))
            .build()?;

        let response = self.client.responses().create(request).await?;
        let summary = llm::output_text(response).trim().to_string();
        if summary.is_empty() {
            return Err(Error::custom("model returned an empty summary"));
        }
        Ok(summary)
    }

    /// Summarize one transcript row, carrying its language metadata through.
    pub async fn summarize_row(&self, row: &TranscriptRow) -> Result<SummaryRow> {
        if row.transcript.trim().is_empty() {
            return Err(Error::custom("transcript is empty"));
        }
        let summary = self.summarize(&row.transcript).await?;
        Ok(SummaryRow {
            video_id: row.video_id.clone(),
            summary,
            is_generated: row.is_generated,
            language: row.language.clone(),
            language_code: row.language_code.clone(),
        })
    }
}

fn user_content(transcript: &str) -> String {
    format!("Transcript:\n\n{transcript}")
}

#[cfg(test)]
mod tests {
    use super::user_content;

    #[test]
    fn user_content_prefixes_transcript() {
        assert_eq!(user_content("hello"), "Transcript:\n\nhello");
    }
}
