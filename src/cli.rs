use crate::core::DEFAULT_DATA_DIR;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "vidscrape")]
#[command(about = "Resumable YouTube comment, transcript and profile collection")]
#[command(version = "0.1.0")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory for default inputs and outputs
    #[arg(long, global = true, default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,

    /// Save the output file after this many successful items
    #[arg(long, global = true)]
    pub flush_every: Option<usize>,

    /// Request budget; sets a fixed pause between items (0 disables it)
    #[arg(long, global = true)]
    pub requests_per_minute: Option<u32>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search videos and scrape their comments
    Comments {
        /// Search query
        #[arg(short, long, default_value = "NYC congestion pricing")]
        query: String,

        /// Maximum number of videos to process
        #[arg(short = 'n', long, default_value_t = 10)]
        max_videos: u32,

        /// Output CSV (default: data/youtube_comments_YYYYMMDD_HHMM.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Fetch transcripts for every video in a comments CSV
    Transcripts {
        #[command(flatten)]
        io: JobArgs,

        /// Preferred transcript languages (comma-separated)
        #[arg(short, long, default_value = "en")]
        languages: String,
    },

    /// Summarize transcripts with an LLM
    Summarize {
        #[command(flatten)]
        io: JobArgs,

        /// System prompt file
        #[arg(long, default_value = "prompts/summarize_video.md")]
        prompt: PathBuf,
    },

    /// Collect commenter channel profiles, or analyze them with --analyze
    Profiles {
        #[command(flatten)]
        io: JobArgs,

        /// Run the demographic analysis phase instead of profile collection
        #[arg(short, long)]
        analyze: bool,

        /// Profiles CSV for the analysis phase (default: latest in data/)
        #[arg(short, long)]
        profiles: Option<PathBuf>,

        /// System prompt file for the analysis phase
        #[arg(long, default_value = "prompts/infer_demographics.md")]
        prompt: PathBuf,
    },

    /// Infer commenter demographics from a profiles CSV
    Demographics {
        #[command(flatten)]
        io: JobArgs,

        /// System prompt file
        #[arg(long, default_value = "prompts/infer_demographics.md")]
        prompt: PathBuf,
    },

    /// List datasets in the data directory
    List,
}

#[derive(Args)]
pub struct JobArgs {
    /// Input CSV (default: latest matching file in data/)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Output CSV (default: timestamped file in data/); reuse it to resume
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Maximum number of items to process (0 for no limit)
    #[arg(short = 'n', long)]
    pub max_items: Option<usize>,
}
