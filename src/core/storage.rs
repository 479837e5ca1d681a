use crate::error::{Error, Result};
use chrono::Local;
use derive_more::Display;
use serde::de::DeserializeOwned;
use std::fs as std_fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const DEFAULT_DATA_DIR: &str = "data";
const DATASET_SUFFIX: &str = ".csv";

/// The datasets the jobs produce, each with its own file name prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Dataset {
    #[display("Comments")]
    Comments,
    #[display("Transcripts")]
    Transcripts,
    #[display("Summaries")]
    Summaries,
    #[display("Profiles")]
    Profiles,
    #[display("Demographics")]
    Demographics,
}

impl Dataset {
    pub const ALL: [Dataset; 5] = [
        Dataset::Comments,
        Dataset::Transcripts,
        Dataset::Summaries,
        Dataset::Profiles,
        Dataset::Demographics,
    ];

    pub fn prefix(self) -> &'static str {
        match self {
            Dataset::Comments => "youtube_comments_",
            Dataset::Transcripts => "transcripts_",
            Dataset::Summaries => "video_summaries_",
            Dataset::Profiles => "user_profiles_",
            Dataset::Demographics => "user_demographics_",
        }
    }

    pub fn from_file_name(name: &str) -> Option<Self> {
        if !name.ends_with(DATASET_SUFFIX) {
            return None;
        }
        Self::ALL.into_iter().find(|d| name.starts_with(d.prefix()))
    }
}

#[derive(Debug, Clone)]
pub struct FileEntry {
    pub path: PathBuf,
    pub name: String,
    pub dataset: Dataset,
    pub size: u64,
    pub modified: std::time::SystemTime,
}

pub struct StorageService {
    data_dir: PathBuf,
}

impl StorageService {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// `<data_dir>/<prefix>YYYYMMDD_HHMM.csv`, creating the directory.
    pub fn default_output_path(&self, dataset: Dataset) -> Result<PathBuf> {
        ensure_directory(&self.data_dir)?;
        let timestamp = Local::now().format("%Y%m%d_%H%M");
        Ok(self
            .data_dir
            .join(format!("{}{timestamp}{DATASET_SUFFIX}", dataset.prefix())))
    }

    /// Resolve an output path, falling back to a fresh timestamped name.
    pub fn output_path(&self, explicit: Option<PathBuf>, dataset: Dataset) -> Result<PathBuf> {
        match explicit {
            Some(path) => Ok(path),
            None => {
                let path = self.default_output_path(dataset)?;
                info!(
                    path = %path.display(),
                    "No output given; pass it with -o on the next run to resume"
                );
                Ok(path)
            }
        }
    }

    /// Resolve an input path, falling back to the newest file of `dataset`.
    pub fn input_path(&self, explicit: Option<PathBuf>, dataset: Dataset) -> Result<PathBuf> {
        match explicit {
            Some(path) if path.exists() => Ok(path),
            Some(path) => Err(Error::config(format!(
                "input file '{}' not found",
                path.display()
            ))),
            None => {
                let path = self.latest_dataset(dataset)?;
                info!(path = %path.display(), "Using latest {dataset} file");
                Ok(path)
            }
        }
    }

    /// Newest file of `dataset` in the data directory, by modification time.
    pub fn latest_dataset(&self, dataset: Dataset) -> Result<PathBuf> {
        self.list_files()?
            .into_iter()
            .find(|f| f.dataset == dataset)
            .map(|f| f.path)
            .ok_or_else(|| {
                Error::config(format!(
                    "no {dataset} files ({}*{DATASET_SUFFIX}) found in '{}'",
                    dataset.prefix(),
                    self.data_dir.display()
                ))
            })
    }

    /// Every recognised dataset in the data directory, newest first.
    pub fn list_files(&self) -> Result<Vec<FileEntry>> {
        let mut files = Vec::new();

        if let Ok(entries) = std_fs::read_dir(&self.data_dir) {
            for entry in entries {
                let entry = entry?;
                let path = entry.path();

                if let Some(name) = path.file_name().and_then(|n| n.to_str())
                    && let Some(dataset) = Dataset::from_file_name(name)
                {
                    let metadata = entry.metadata()?;
                    files.push(FileEntry {
                        path: path.clone(),
                        name: name.to_string(),
                        dataset,
                        size: metadata.len(),
                        modified: metadata.modified()?,
                    });
                }
            }
        }

        files.sort_by(|a, b| b.modified.cmp(&a.modified));

        Ok(files)
    }
}

/// Read every row of an input CSV. Any malformed row is an error.
pub fn read_csv<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

/// Fail with a configuration error if `path` lacks any of `columns`.
pub fn require_columns(path: &Path, columns: &[&str]) -> Result<()> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?;
    let missing: Vec<&str> = columns
        .iter()
        .copied()
        .filter(|c| !headers.iter().any(|h| h == *c))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::config(format!(
            "'{}' is missing required column(s): {}",
            path.display(),
            missing.join(", ")
        )))
    }
}

fn ensure_directory(path: &Path) -> Result<()> {
    std_fs::create_dir_all(path)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let metadata = std_fs::metadata(path)?;
        let mut permissions = metadata.permissions();
        if permissions.mode() & 0o777 != 0o700 {
            permissions.set_mode(0o700);
            std_fs::set_permissions(path, permissions)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};

    fn touch(path: &Path, age: Duration) {
        std_fs::write(path, "video_id\n").unwrap();
        let file = std_fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() - age).unwrap();
    }

    #[test]
    fn classifies_dataset_names() {
        assert_eq!(
            Dataset::from_file_name("user_profiles_20240101_1200.csv"),
            Some(Dataset::Profiles)
        );
        assert_eq!(
            Dataset::from_file_name("video_summaries_x.csv"),
            Some(Dataset::Summaries)
        );
        assert_eq!(Dataset::from_file_name("transcripts_x.txt"), None);
        assert_eq!(Dataset::from_file_name("notes.csv"), None);
    }

    #[test]
    fn latest_dataset_picks_newest_of_its_kind() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageService::new(dir.path());
        touch(&dir.path().join("transcripts_old.csv"), Duration::from_secs(600));
        touch(&dir.path().join("transcripts_new.csv"), Duration::from_secs(60));
        touch(&dir.path().join("user_profiles_newest.csv"), Duration::ZERO);

        let latest = storage.latest_dataset(Dataset::Transcripts).unwrap();
        assert_eq!(latest.file_name().unwrap(), "transcripts_new.csv");
        assert!(matches!(
            storage.latest_dataset(Dataset::Comments),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn explicit_missing_input_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageService::new(dir.path());
        let err = storage
            .input_path(Some(dir.path().join("absent.csv")), Dataset::Comments)
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn default_output_uses_prefix_and_creates_dir() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageService::new(dir.path().join("data"));
        let path = storage.default_output_path(Dataset::Demographics).unwrap();
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("user_demographics_"));
        assert!(name.ends_with(".csv"));
        assert!(dir.path().join("data").is_dir());
    }

    #[test]
    fn reports_missing_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.csv");
        std_fs::write(&path, "video_id,author\nv,a\n").unwrap();

        assert!(require_columns(&path, &["video_id"]).is_ok());
        let err = require_columns(&path, &["author", "author_channel_id"]).unwrap_err();
        assert!(err.to_string().contains("author_channel_id"));
    }
}
