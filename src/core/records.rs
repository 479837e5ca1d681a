//! Row layouts for every dataset the jobs read and write.

use crate::core::checkpoint::Record;
use crate::core::processor::WorkItem;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentRow {
    pub video_id: String,
    pub video_title: String,
    pub video_channel: String,
    pub author: String,
    #[serde(default)]
    pub author_channel_id: String,
    pub comment_text: String,
    pub like_count: u64,
    pub published_at: String,
}

impl Record for CommentRow {
    const COLUMNS: &'static [&'static str] = &[
        "video_id",
        "video_title",
        "video_channel",
        "author",
        "author_channel_id",
        "comment_text",
        "like_count",
        "published_at",
    ];
    const KEY_COLUMN: &'static str = "video_id";

    fn key(&self) -> &str {
        &self.video_id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptRow {
    pub video_id: String,
    pub is_generated: bool,
    pub language: String,
    pub language_code: String,
    pub transcript: String,
}

impl Record for TranscriptRow {
    const COLUMNS: &'static [&'static str] = &[
        "video_id",
        "is_generated",
        "language",
        "language_code",
        "transcript",
    ];
    const KEY_COLUMN: &'static str = "video_id";

    fn key(&self) -> &str {
        &self.video_id
    }
}

impl WorkItem for TranscriptRow {
    fn id(&self) -> &str {
        &self.video_id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub video_id: String,
    pub summary: String,
    pub is_generated: bool,
    pub language: String,
    pub language_code: String,
}

impl Record for SummaryRow {
    const COLUMNS: &'static [&'static str] = &[
        "video_id",
        "summary",
        "is_generated",
        "language",
        "language_code",
    ];
    const KEY_COLUMN: &'static str = "video_id";

    fn key(&self) -> &str {
        &self.video_id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelProfile {
    pub channel_id: String,
    pub channel_title: String,
    pub channel_description: String,
    pub channel_country: String,
    pub channel_custom_url: String,
    pub thumbnail_url: String,
    pub subscriber_count: Option<u64>,
    pub view_count: Option<u64>,
    pub video_count: Option<u64>,
}

impl Record for ChannelProfile {
    const COLUMNS: &'static [&'static str] = &[
        "channel_id",
        "channel_title",
        "channel_description",
        "channel_country",
        "channel_custom_url",
        "thumbnail_url",
        "subscriber_count",
        "view_count",
        "video_count",
    ];
    const KEY_COLUMN: &'static str = "channel_id";

    fn key(&self) -> &str {
        &self.channel_id
    }
}

impl WorkItem for ChannelProfile {
    fn id(&self) -> &str {
        &self.channel_id
    }

    fn label(&self) -> String {
        format!("Analyzing: {}", self.channel_title)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum AgeRange {
    #[serde(rename = "under_18")]
    #[display("under_18")]
    Under18,
    #[serde(rename = "18-24")]
    #[display("18-24")]
    From18To24,
    #[serde(rename = "25-34")]
    #[display("25-34")]
    From25To34,
    #[serde(rename = "35-44")]
    #[display("35-44")]
    From35To44,
    #[serde(rename = "45-54")]
    #[display("45-54")]
    From45To54,
    #[serde(rename = "55-64")]
    #[display("55-64")]
    From55To64,
    #[serde(rename = "65_plus")]
    #[display("65_plus")]
    Over65,
    #[serde(rename = "unclear")]
    #[display("unclear")]
    Unclear,
}

impl AgeRange {
    pub const VALUES: &'static [&'static str] = &[
        "under_18", "18-24", "25-34", "35-44", "45-54", "55-64", "65_plus", "unclear",
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    #[display("male")]
    Male,
    #[display("female")]
    Female,
    #[display("non_binary")]
    NonBinary,
    #[display("unclear")]
    Unclear,
}

impl Gender {
    pub const VALUES: &'static [&'static str] = &["male", "female", "non_binary", "unclear"];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RaceEthnicity {
    #[display("white")]
    White,
    #[display("black_african_american")]
    BlackAfricanAmerican,
    #[display("hispanic_latino")]
    HispanicLatino,
    #[display("asian")]
    Asian,
    #[display("middle_eastern_north_african")]
    MiddleEasternNorthAfrican,
    #[display("native_american_indigenous")]
    NativeAmericanIndigenous,
    #[display("pacific_islander")]
    PacificIslander,
    #[display("multiracial")]
    Multiracial,
    #[display("unclear")]
    Unclear,
}

impl RaceEthnicity {
    pub const VALUES: &'static [&'static str] = &[
        "white",
        "black_african_american",
        "hispanic_latino",
        "asian",
        "middle_eastern_north_african",
        "native_american_indigenous",
        "pacific_islander",
        "multiracial",
        "unclear",
    ];
}

/// Structured answer expected back from the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Demographics {
    pub inferred_age_range: AgeRange,
    pub inferred_gender: Gender,
    pub inferred_race_ethnicity: RaceEthnicity,
    pub confidence_level: f64,
    pub reasoning: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemographicsRow {
    pub channel_id: String,
    pub channel_title: String,
    pub thumbnail_url: String,
    pub channel_description: String,
    pub channel_country: String,
    pub inferred_age_range: AgeRange,
    pub inferred_gender: Gender,
    pub inferred_race_ethnicity: RaceEthnicity,
    pub confidence_level: f64,
    pub reasoning: String,
}

impl DemographicsRow {
    pub fn new(profile: &ChannelProfile, demographics: Demographics) -> Self {
        Self {
            channel_id: profile.channel_id.clone(),
            channel_title: profile.channel_title.clone(),
            thumbnail_url: profile.thumbnail_url.clone(),
            channel_description: profile.channel_description.clone(),
            channel_country: profile.channel_country.clone(),
            inferred_age_range: demographics.inferred_age_range,
            inferred_gender: demographics.inferred_gender,
            inferred_race_ethnicity: demographics.inferred_race_ethnicity,
            confidence_level: demographics.confidence_level,
            reasoning: demographics.reasoning,
        }
    }
}

impl Record for DemographicsRow {
    const COLUMNS: &'static [&'static str] = &[
        "channel_id",
        "channel_title",
        "thumbnail_url",
        "channel_description",
        "channel_country",
        "inferred_age_range",
        "inferred_gender",
        "inferred_race_ethnicity",
        "confidence_level",
        "reasoning",
    ];
    const KEY_COLUMN: &'static str = "channel_id";

    fn key(&self) -> &str {
        &self.channel_id
    }
}

/// The `video_id` column of a comments dataset.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VideoRef {
    pub video_id: String,
}

/// The author columns of a comments dataset.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CommentAuthor {
    pub author: String,
    #[serde(default)]
    pub author_channel_id: String,
}

impl WorkItem for CommentAuthor {
    fn id(&self) -> &str {
        &self.author_channel_id
    }

    fn label(&self) -> String {
        self.author.clone()
    }
}

/// Distinct video ids in first-seen order.
pub fn unique_video_ids(rows: impl IntoIterator<Item = VideoRef>) -> Vec<String> {
    let mut seen = HashSet::new();
    rows.into_iter()
        .map(|r| r.video_id)
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

/// Distinct authors with a channel id, in first-seen order.
pub fn unique_authors(rows: impl IntoIterator<Item = CommentAuthor>) -> Vec<CommentAuthor> {
    let mut seen = HashSet::new();
    rows.into_iter()
        .map(|mut r| {
            r.author_channel_id = r.author_channel_id.trim().to_string();
            r
        })
        .filter(|r| !r.author_channel_id.is_empty())
        .filter(|r| seen.insert(r.author_channel_id.clone()))
        .collect()
}
