use crate::core::records::TranscriptRow;
use crate::error::{Error, Result};
use yt_transcript_rs::{FetchedTranscript, api::YouTubeTranscriptApi};

#[derive(Clone)]
pub struct TranscriptService {
    api: YouTubeTranscriptApi,
    languages: Vec<String>,
}

impl TranscriptService {
    pub fn new(languages: Vec<String>) -> Result<Self> {
        let api = YouTubeTranscriptApi::new(None, None, None)
            .map_err(|e| Error::custom(format!("Failed to create transcript client: {e}")))?;
        Ok(Self { api, languages })
    }

    pub async fn fetch_transcript(&self, video_id: &str) -> Result<FetchedTranscript> {
        let languages: Vec<&str> = self.languages.iter().map(String::as_str).collect();

        match self.api.fetch_transcript(video_id, &languages, false).await {
            Ok(transcript) => Ok(transcript),
            Err(e) => Err(Error::custom(format!("Failed to fetch transcript: {e}"))),
        }
    }

    /// Fetch and flatten a transcript into a single output row.
    pub async fn fetch_row(&self, video_id: &str) -> Result<TranscriptRow> {
        let transcript = self.fetch_transcript(video_id).await?;
        Ok(Self::to_row(video_id, &transcript))
    }

    pub fn to_row(video_id: &str, transcript: &FetchedTranscript) -> TranscriptRow {
        TranscriptRow {
            video_id: video_id.to_string(),
            is_generated: transcript.is_generated,
            language: transcript.language.clone(),
            language_code: transcript.language_code.clone(),
            transcript: join_segments(transcript.snippets.iter().map(|s| s.text.as_str())),
        }
    }
}

/// Clean each segment and join them with single spaces.
pub fn join_segments<'a>(segments: impl IntoIterator<Item = &'a str>) -> String {
    segments
        .into_iter()
        .map(clean_text)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Decode HTML entities and flatten all whitespace runs to one space.
pub fn clean_text(raw: &str) -> String {
    let decoded = html_escape::decode_html_entities(raw);
    decoded
        .replace('\u{a0}', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

const MAX_VIDEO_ID_LEN: usize = 128;

/// Ensure a video identifier is safe for downstream use (API calls, CSV keys).
/// Only ASCII alphanumeric characters plus `_` and `-` are allowed.
pub fn sanitize_video_id(raw: &str) -> Result<String> {
    let trimmed = raw.trim();

    if trimmed.is_empty() {
        return Err(Error::custom("Video ID cannot be empty"));
    }

    if trimmed.len() > MAX_VIDEO_ID_LEN {
        return Err(Error::custom("Video ID is unexpectedly long"));
    }

    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
    {
        return Err(Error::custom(
            "Video ID contains unsupported characters; expected only letters, numbers, '-' or '_'",
        ));
    }

    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::{MAX_VIDEO_ID_LEN, clean_text, join_segments, sanitize_video_id};

    #[test]
    fn allows_expected_characters() {
        let id = sanitize_video_id(" abcDEF123-_x ").expect("valid ID");
        assert_eq!(id, "abcDEF123-_x");
    }

    #[test]
    fn rejects_empty() {
        assert!(sanitize_video_id("   ").is_err());
    }

    #[test]
    fn rejects_invalid_chars() {
        assert!(sanitize_video_id("abc/../../etc").is_err());
    }

    #[test]
    fn rejects_too_long() {
        let long = "a".repeat(MAX_VIDEO_ID_LEN + 1);
        assert!(sanitize_video_id(&long).is_err());
    }

    #[test]
    fn cleans_nbsp_newlines_and_runs_of_spaces() {
        assert_eq!(
            clean_text("  so\u{a0}this is\nthe   [Music]\t part "),
            "so this is the [Music] part"
        );
    }

    #[test]
    fn decodes_entities() {
        assert_eq!(clean_text("it&#39;s &amp; more"), "it's & more");
    }

    #[test]
    fn joins_cleaned_segments_skipping_blank_ones() {
        let joined = join_segments(["hello\nthere", "   ", "general\u{a0}kenobi"]);
        assert_eq!(joined, "hello there general kenobi");
    }
}
