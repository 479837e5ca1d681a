mod cli;
mod config;
mod core;
mod error;

use crate::cli::{Cli, Commands, JobArgs};
use crate::config::Config;
use crate::core::{
    BatchProcessor, BatchReport, BatchSettings, CHANNELS_PER_REQUEST, ChannelProfile, Checkpoint,
    CommentAuthor, CommentRow, Dataset, DemographicsRow, DemographicsService, Record,
    StorageService, SummaryRow, SummaryService, TranscriptRow, TranscriptService, VideoRef,
    YouTubeService, llm, read_csv, require_columns, sanitize_video_id, unique_authors,
    unique_video_ids,
};
use crate::error::{Error, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// LLM and channel lookups share the same per-minute budget.
const API_REQUESTS_PER_MINUTE: u32 = 50;
const DEMOGRAPHICS_CHECKPOINT_INTERVAL: usize = 50;
const ROW_CHECKPOINT_INTERVAL: usize = 10;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();
}

/// CLI overrides on top of a job's own defaults.
struct Overrides {
    flush_every: Option<usize>,
    requests_per_minute: Option<u32>,
}

impl Overrides {
    fn settings(&self, flush_every: usize, requests_per_minute: u32) -> BatchSettings {
        BatchSettings::with_requests_per_minute(
            self.flush_every.unwrap_or(flush_every),
            self.requests_per_minute.unwrap_or(requests_per_minute),
        )
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::from_env();
    let storage = StorageService::new(cli.data_dir);
    let overrides = Overrides {
        flush_every: cli.flush_every,
        requests_per_minute: cli.requests_per_minute,
    };

    match cli.command {
        Commands::Comments {
            query,
            max_videos,
            output,
        } => {
            let settings = overrides.settings(1, 0);
            run_comments(&config, &storage, settings, &query, max_videos, output).await
        }
        Commands::Transcripts { io, languages } => {
            let settings = overrides.settings(ROW_CHECKPOINT_INTERVAL, 0);
            let languages = languages
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            run_transcripts(&storage, settings, io, languages).await
        }
        Commands::Summarize { io, prompt } => {
            let settings = overrides.settings(ROW_CHECKPOINT_INTERVAL, API_REQUESTS_PER_MINUTE);
            run_summarize(&config, &storage, settings, io, &prompt).await
        }
        Commands::Profiles {
            io,
            analyze,
            profiles,
            prompt,
        } => {
            if analyze {
                let settings = overrides
                    .settings(DEMOGRAPHICS_CHECKPOINT_INTERVAL, API_REQUESTS_PER_MINUTE);
                let io = analysis_args(io, profiles);
                run_demographics(&config, &storage, settings, io, &prompt).await
            } else {
                let settings = overrides.settings(1, API_REQUESTS_PER_MINUTE);
                run_profiles(&config, &storage, settings, io).await
            }
        }
        Commands::Demographics { io, prompt } => {
            let settings =
                overrides.settings(DEMOGRAPHICS_CHECKPOINT_INTERVAL, API_REQUESTS_PER_MINUTE);
            run_demographics(&config, &storage, settings, io, &prompt).await
        }
        Commands::List => run_list(&storage),
    }
}

async fn run_comments(
    config: &Config,
    storage: &StorageService,
    settings: BatchSettings,
    query: &str,
    max_videos: u32,
    output: Option<PathBuf>,
) -> Result<()> {
    let youtube = YouTubeService::new(config.youtube_api_key()?);

    info!(query, "Searching for videos");
    let videos = youtube.search(query, max_videos).await?;
    if videos.is_empty() {
        println!("No videos found.");
        return Ok(());
    }
    info!(count = videos.len(), "Found videos, fetching comments");

    let output = storage.output_path(output, Dataset::Comments)?;
    let mut checkpoint = Checkpoint::<CommentRow>::open(&output);
    let youtube = &youtube;

    let report = BatchProcessor::new(settings)
        .run_chunked(videos, 1, &mut checkpoint, |chunk| async move {
            let mut rows = Vec::new();
            for video in &chunk {
                let comments = youtube.list_comments(video).await?;
                info!(count = comments.len(), "Collected comments");
                rows.extend(comments);
            }
            Ok(rows)
        })
        .await?;

    print_summary("comments", &report, &checkpoint);
    Ok(())
}

async fn run_transcripts(
    storage: &StorageService,
    settings: BatchSettings,
    io: JobArgs,
    languages: Vec<String>,
) -> Result<()> {
    let input = storage.input_path(io.input, Dataset::Comments)?;
    require_columns(&input, &["video_id"])?;

    let video_ids = unique_video_ids(read_csv::<VideoRef>(&input)?);
    let unique = video_ids.len();
    let video_ids = capped(video_ids, io.max_items);
    info!(selected = video_ids.len(), unique, "Loaded video ids");

    let video_ids: Vec<String> = video_ids
        .into_iter()
        .filter_map(|raw| match sanitize_video_id(&raw) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(video_id = %raw, error = %e, "Skipping invalid video id");
                None
            }
        })
        .collect();

    let service = TranscriptService::new(languages)?;
    let output = storage.output_path(io.output, Dataset::Transcripts)?;
    let mut checkpoint = Checkpoint::<TranscriptRow>::open(&output);
    let service = &service;

    let report = BatchProcessor::new(settings)
        .run(video_ids, &mut checkpoint, |video_id| async move {
            let row = service.fetch_row(&video_id).await?;
            info!(
                language = %row.language_code,
                chars = row.transcript.len(),
                "Collected transcript"
            );
            Ok(row)
        })
        .await?;

    print_summary("transcripts", &report, &checkpoint);
    Ok(())
}

async fn run_summarize(
    config: &Config,
    storage: &StorageService,
    settings: BatchSettings,
    io: JobArgs,
    prompt: &Path,
) -> Result<()> {
    let api_key = config.openai_api_key()?;
    let prompt = llm::load_prompt(prompt)?;

    let input = storage.input_path(io.input, Dataset::Transcripts)?;
    let rows = capped(read_csv::<TranscriptRow>(&input)?, io.max_items);

    let service = SummaryService::new(llm::client(api_key), &config.summary_model, prompt);
    let output = storage.output_path(io.output, Dataset::Summaries)?;
    let mut checkpoint = Checkpoint::<SummaryRow>::open(&output);
    let service = &service;

    let report = BatchProcessor::new(settings)
        .run(rows, &mut checkpoint, |row| async move {
            let summary = service.summarize_row(&row).await?;
            info!(chars = summary.summary.len(), "Summary generated");
            Ok(summary)
        })
        .await?;

    print_summary("summaries", &report, &checkpoint);
    Ok(())
}

async fn run_profiles(
    config: &Config,
    storage: &StorageService,
    settings: BatchSettings,
    io: JobArgs,
) -> Result<()> {
    let input = storage.input_path(io.input, Dataset::Comments)?;
    require_columns(&input, &["author", "author_channel_id"]).map_err(|e| {
        Error::config(format!(
            "{e}; re-run `vidscrape comments` to collect a comments file with author channel ids"
        ))
    })?;

    let authors = unique_authors(read_csv::<CommentAuthor>(&input)?);
    if authors.is_empty() {
        return Err(Error::config(format!(
            "no commenters with channel ids found in '{}'",
            input.display()
        )));
    }
    info!(count = authors.len(), "Found unique commenters with channel ids");
    let authors = capped(authors, io.max_items);

    let youtube = YouTubeService::new(config.youtube_api_key()?);
    let output = storage.output_path(io.output, Dataset::Profiles)?;
    let mut checkpoint = Checkpoint::<ChannelProfile>::open(&output);
    let youtube = &youtube;

    let report = BatchProcessor::new(settings)
        .run_chunked(authors, CHANNELS_PER_REQUEST, &mut checkpoint, |chunk| async move {
            let ids: Vec<String> = chunk.into_iter().map(|a| a.author_channel_id).collect();
            let profiles = youtube.get_channels(&ids).await?;
            info!(requested = ids.len(), fetched = profiles.len(), "Fetched channel details");
            Ok(profiles)
        })
        .await?;

    print_summary("profiles", &report, &checkpoint);
    Ok(())
}

async fn run_demographics(
    config: &Config,
    storage: &StorageService,
    settings: BatchSettings,
    io: JobArgs,
    prompt: &Path,
) -> Result<()> {
    let api_key = config.openai_api_key()?;
    let prompt = llm::load_prompt(prompt)?;

    let input = storage.input_path(io.input, Dataset::Profiles)?;
    let profiles = capped(read_csv::<ChannelProfile>(&input)?, io.max_items);

    let service =
        DemographicsService::new(llm::client(api_key), &config.demographics_model, prompt);
    let output = storage.output_path(io.output, Dataset::Demographics)?;
    let mut checkpoint = Checkpoint::<DemographicsRow>::open(&output);
    let service = &service;

    let report = BatchProcessor::new(settings)
        .run(profiles, &mut checkpoint, |profile| async move {
            service.infer_row(&profile).await
        })
        .await?;

    print_summary("demographics", &report, &checkpoint);
    Ok(())
}

fn run_list(storage: &StorageService) -> Result<()> {
    let files = storage.list_files()?;

    if files.is_empty() {
        println!("No datasets found in {}.", storage.data_dir().display());
        return Ok(());
    }

    println!("Found {} files:", files.len());
    println!();

    for file in files {
        let size_kb = file.size / 1024;
        let size_str = if size_kb < 1024 {
            format!("{size_kb}KB")
        } else {
            format!("{:.1}MB", size_kb as f64 / 1024.0)
        };

        println!("{:<14} {:<40} {}", file.dataset.to_string(), file.name, size_str);
    }

    Ok(())
}

/// `profiles --analyze` reads only `--profiles`; `-i` names the comments CSV.
fn analysis_args(io: JobArgs, profiles: Option<PathBuf>) -> JobArgs {
    JobArgs {
        input: profiles,
        ..io
    }
}

/// Keep the first `max` items. Zero means no cap.
fn capped<T>(mut items: Vec<T>, max: Option<usize>) -> Vec<T> {
    if let Some(max) = max.filter(|&m| m > 0) {
        items.truncate(max);
    }
    items
}

fn print_summary<R: Record>(what: &str, report: &BatchReport, checkpoint: &Checkpoint<R>) {
    println!();
    if report.total > 0 && report.attempted == 0 {
        println!("All {} items already processed!", report.total);
    } else {
        println!(
            "Finished {what}: {} succeeded, {} failed, {} already done",
            report.succeeded, report.failed, report.already_done
        );
    }
    if checkpoint.is_empty() || !checkpoint.path().exists() {
        println!("Nothing saved.");
    } else {
        println!(
            "{} rows saved to: {}",
            checkpoint.len(),
            checkpoint.path().display()
        );
    }
}
