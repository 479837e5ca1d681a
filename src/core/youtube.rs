//! Thin client for the YouTube Data API v3 endpoints the jobs need.

use crate::core::processor::WorkItem;
use crate::core::records::{ChannelProfile, CommentRow};
use crate::error::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

const API_BASE: &str = "https://www.googleapis.com/youtube/v3";
const SEARCH_PAGE_MAX: u32 = 50;
const COMMENTS_PAGE_MAX: u32 = 100;

/// Channels endpoint accepts at most this many ids per request.
pub const CHANNELS_PER_REQUEST: usize = 50;

/// A video returned by search.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoHit {
    pub video_id: String,
    pub title: String,
    pub channel: String,
    pub published_at: String,
}

impl WorkItem for VideoHit {
    fn id(&self) -> &str {
        &self.video_id
    }

    fn label(&self) -> String {
        format!("Processing: {}", self.title)
    }
}

pub struct YouTubeService {
    http: reqwest::Client,
    api_key: SecretString,
    base_url: String,
}

impl YouTubeService {
    pub fn new(api_key: &SecretString) -> Self {
        Self::with_base_url(api_key, API_BASE)
    }

    pub fn with_base_url(api_key: &SecretString, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: SecretString::from(api_key.expose_secret().to_owned()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Search videos by relevance, following pages until `max_results`.
    pub async fn search(&self, query: &str, max_results: u32) -> Result<Vec<VideoHit>> {
        let mut videos = Vec::new();
        let mut page_token: Option<String> = None;

        while (videos.len() as u32) < max_results {
            let page_size = (max_results - videos.len() as u32).min(SEARCH_PAGE_MAX);
            let mut params = vec![
                ("part", "snippet".to_string()),
                ("q", query.to_string()),
                ("type", "video".to_string()),
                ("order", "relevance".to_string()),
                ("maxResults", page_size.to_string()),
            ];
            if let Some(token) = &page_token {
                params.push(("pageToken", token.clone()));
            }

            let page: SearchResponse = self.get("search", &params).await?;
            videos.extend(page.items.into_iter().filter_map(|item| {
                Some(VideoHit {
                    video_id: item.id.video_id?,
                    title: item.snippet.title,
                    channel: item.snippet.channel_title,
                    published_at: item.snippet.published_at,
                })
            }));

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        videos.truncate(max_results as usize);
        for video in &videos {
            debug!(video_id = %video.video_id, published_at = %video.published_at, "Found video");
        }
        Ok(videos)
    }

    /// All top-level comments of a video, across every page.
    pub async fn list_comments(&self, video: &VideoHit) -> Result<Vec<CommentRow>> {
        let mut comments = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut params = vec![
                ("part", "snippet".to_string()),
                ("videoId", video.video_id.clone()),
                ("maxResults", COMMENTS_PAGE_MAX.to_string()),
                ("textFormat", "plainText".to_string()),
            ];
            if let Some(token) = &page_token {
                params.push(("pageToken", token.clone()));
            }

            let page: CommentThreadsResponse =
                match self.get("commentThreads", &params).await {
                    Err(Error::YouTubeApi { reason, .. }) if reason == "commentsDisabled" => {
                        return Err(Error::CommentsDisabled(video.video_id.clone()));
                    }
                    other => other?,
                };

            debug!(video_id = %video.video_id, count = page.items.len(), "Fetched comment page");
            comments.extend(page.items.into_iter().map(|item| {
                let c = item.snippet.top_level_comment.snippet;
                CommentRow {
                    video_id: video.video_id.clone(),
                    video_title: video.title.clone(),
                    video_channel: video.channel.clone(),
                    author: c.author_display_name,
                    author_channel_id: c.author_channel_id.map(|a| a.value).unwrap_or_default(),
                    comment_text: c.text_display,
                    like_count: c.like_count,
                    published_at: c.published_at,
                }
            }));

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(comments)
    }

    /// Channel details for up to [`CHANNELS_PER_REQUEST`] ids.
    pub async fn get_channels(&self, channel_ids: &[String]) -> Result<Vec<ChannelProfile>> {
        if channel_ids.len() > CHANNELS_PER_REQUEST {
            return Err(Error::custom(format!(
                "at most {CHANNELS_PER_REQUEST} channel ids per request, got {}",
                channel_ids.len()
            )));
        }

        let params = vec![
            ("part", "snippet,statistics".to_string()),
            ("id", channel_ids.join(",")),
            ("maxResults", CHANNELS_PER_REQUEST.to_string()),
        ];
        let page: ChannelsResponse = self.get("channels", &params).await?;
        Ok(page.items.into_iter().map(ChannelItem::into_profile).collect())
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &str, params: &[(&str, String)]) -> Result<T> {
        let response = self
            .http
            .get(format!("{}/{endpoint}", self.base_url))
            .query(params)
            .query(&[("key", self.api_key.expose_secret())])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(api_error(status.as_u16(), &body));
        }
        Ok(serde_json::from_str(&body)?)
    }
}

fn api_error(status: u16, body: &str) -> Error {
    let parsed = serde_json::from_str::<ErrorResponse>(body).ok();
    let (reason, message) = match parsed {
        Some(resp) => (
            resp.error
                .errors
                .into_iter()
                .next()
                .map(|e| e.reason)
                .unwrap_or_default(),
            resp.error.message,
        ),
        None => (String::new(), body.chars().take(200).collect()),
    };
    Error::YouTubeApi {
        status,
        reason,
        message,
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchItemId,
    snippet: SearchSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItemId {
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchSnippet {
    title: String,
    channel_title: String,
    published_at: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentThreadsResponse {
    #[serde(default)]
    items: Vec<CommentThread>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommentThread {
    snippet: CommentThreadSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentThreadSnippet {
    top_level_comment: TopLevelComment,
}

#[derive(Debug, Deserialize)]
struct TopLevelComment {
    snippet: CommentSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentSnippet {
    author_display_name: String,
    author_channel_id: Option<AuthorChannelId>,
    text_display: String,
    #[serde(default)]
    like_count: u64,
    published_at: String,
}

#[derive(Debug, Deserialize)]
struct AuthorChannelId {
    value: String,
}

#[derive(Debug, Deserialize)]
struct ChannelsResponse {
    #[serde(default)]
    items: Vec<ChannelItem>,
}

#[derive(Debug, Deserialize)]
struct ChannelItem {
    id: String,
    snippet: ChannelSnippet,
    #[serde(default)]
    statistics: ChannelStatistics,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelSnippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    country: String,
    #[serde(default)]
    custom_url: String,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
    default: Option<Thumbnail>,
    medium: Option<Thumbnail>,
    high: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

// counts arrive as decimal strings
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelStatistics {
    subscriber_count: Option<String>,
    view_count: Option<String>,
    video_count: Option<String>,
}

impl ChannelItem {
    fn into_profile(self) -> ChannelProfile {
        let thumbnails = self.snippet.thumbnails;
        let thumbnail_url = thumbnails
            .high
            .or(thumbnails.medium)
            .or(thumbnails.default)
            .map(|t| t.url)
            .unwrap_or_default();
        let count = |v: Option<String>| v.and_then(|s| s.parse::<u64>().ok());

        ChannelProfile {
            channel_id: self.id,
            channel_title: self.snippet.title,
            channel_description: self.snippet.description,
            channel_country: self.snippet.country,
            channel_custom_url: self.snippet.custom_url,
            thumbnail_url,
            subscriber_count: count(self.statistics.subscriber_count),
            view_count: count(self.statistics.view_count),
            video_count: count(self.statistics.video_count),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn transport_errors_do_not_expose_the_api_key() {
        let key = SecretString::from("AIza-not-for-logs".to_string());
        // nothing listens on port 1
        let youtube = YouTubeService::with_base_url(&key, "http://127.0.0.1:1/youtube/v3");

        let err = youtube.search("anything", 5).await.unwrap_err();
        assert!(matches!(err, Error::Http(_)));
        let text = err.to_string();
        assert!(!text.contains("AIza-not-for-logs"), "{text}");
        assert!(!format!("{err:?}").contains("AIza-not-for-logs"));
    }

    #[test]
    fn channel_prefers_high_thumbnail_and_parses_counts() {
        let json = r#"{
            "items": [{
                "id": "UCabc",
                "snippet": {
                    "title": "Alice",
                    "description": "hi",
                    "customUrl": "@alice",
                    "thumbnails": {
                        "default": {"url": "d"},
                        "medium": {"url": "m"},
                        "high": {"url": "h"}
                    }
                },
                "statistics": {"subscriberCount": "12", "viewCount": "340", "hiddenSubscriberCount": false}
            }, {
                "id": "UCdef",
                "snippet": {"title": "Bob", "thumbnails": {"default": {"url": "d"}}}
            }]
        }"#;
        let resp: ChannelsResponse = serde_json::from_str(json).unwrap();
        let profiles: Vec<ChannelProfile> =
            resp.items.into_iter().map(ChannelItem::into_profile).collect();

        assert_eq!(profiles[0].thumbnail_url, "h");
        assert_eq!(profiles[0].subscriber_count, Some(12));
        assert_eq!(profiles[0].video_count, None);
        assert_eq!(profiles[0].channel_country, "");
        assert_eq!(profiles[1].thumbnail_url, "d");
        assert_eq!(profiles[1].view_count, None);
    }

    #[test]
    fn comments_disabled_reason_is_extracted() {
        let body = r#"{"error": {"code": 403, "message": "The video has disabled comments.",
            "errors": [{"reason": "commentsDisabled", "domain": "youtube.commentThread"}]}}"#;
        match api_error(403, body) {
            Error::YouTubeApi {
                status, reason, ..
            } => {
                assert_eq!(status, 403);
                assert_eq!(reason, "commentsDisabled");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn non_json_error_body_is_kept_as_message() {
        match api_error(502, "Bad Gateway") {
            Error::YouTubeApi { reason, message, .. } => {
                assert!(reason.is_empty());
                assert_eq!(message, "Bad Gateway");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn search_items_without_video_id_are_ignored() {
        let json = r#"{"items": [
            {"id": {"kind": "youtube#channel", "channelId": "UC1"},
             "snippet": {"title": "c", "channelTitle": "c", "publishedAt": "x"}},
            {"id": {"kind": "youtube#video", "videoId": "v1"},
             "snippet": {"title": "t", "channelTitle": "ch", "publishedAt": "2024"}}
        ]}"#;
        let resp: SearchResponse = serde_json::from_str(json).unwrap();
        let ids: Vec<Option<String>> = resp.items.into_iter().map(|i| i.id.video_id).collect();
        assert_eq!(ids, vec![None, Some("v1".to_string())]);
        assert!(resp.next_page_token.is_none());
    }
}
