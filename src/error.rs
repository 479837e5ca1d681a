use derive_more::{Display, From};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, From)]
pub enum Error {
    #[display("{_0}")]
    #[from]
    Custom(String),

    #[display("configuration error: {_0}")]
    Config(String),

    #[display("YouTube API error (status {status}, reason {reason}): {message}")]
    YouTubeApi {
        status: u16,
        reason: String,
        message: String,
    },

    #[display("comments are disabled for video {_0}")]
    CommentsDisabled(String),

    #[display("io error: {_0}")]
    #[from]
    Io(std::io::Error),

    #[display("csv error: {_0}")]
    #[from]
    Csv(csv::Error),

    #[display("json error: {_0}")]
    #[from]
    Json(serde_json::Error),

    #[display("http error: {_0}")]
    Http(reqwest::Error),

    #[display("openai error: {_0}")]
    #[from]
    OpenAI(async_openai::error::OpenAIError),
}

impl Error {
    pub fn custom(val: impl std::fmt::Display) -> Self {
        Self::Custom(val.to_string())
    }

    pub fn config(val: impl std::fmt::Display) -> Self {
        Self::Config(val.to_string())
    }
}

impl std::error::Error for Error {}

// request urls carry the API key as a query parameter
impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e.without_url())
    }
}
