//! Sequential, resumable batch loop.

use crate::core::checkpoint::{Checkpoint, Record};
use crate::error::Result;
use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

/// Something the processor can run a handler over.
pub trait WorkItem {
    /// Stable identifier matched against the checkpoint's key column.
    fn id(&self) -> &str;

    /// Human readable name for progress lines.
    fn label(&self) -> String {
        self.id().to_string()
    }
}

impl WorkItem for String {
    fn id(&self) -> &str {
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchSettings {
    /// Successful units between checkpoint flushes.
    pub flush_every: usize,
    /// Pause between units.
    pub delay: Duration,
}

impl BatchSettings {
    pub fn new(flush_every: usize, delay: Duration) -> Self {
        Self {
            flush_every: flush_every.max(1),
            delay,
        }
    }

    /// Turn a requests-per-minute budget into a fixed per-unit delay.
    pub fn with_requests_per_minute(flush_every: usize, rpm: u32) -> Self {
        let delay = if rpm == 0 {
            Duration::ZERO
        } else {
            Duration::from_micros(60_000_000 / u64::from(rpm))
        };
        Self::new(flush_every, delay)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Items handed to the processor, after de-duplication.
    pub total: usize,
    /// Items skipped because the checkpoint already had them.
    pub already_done: usize,
    /// Units the handler was called for.
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Rows appended during this run.
    pub rows: usize,
    pub flushes: usize,
}

pub struct BatchProcessor {
    settings: BatchSettings,
}

impl BatchProcessor {
    pub fn new(settings: BatchSettings) -> Self {
        Self { settings }
    }

    /// Run `handler` once per item not yet in `checkpoint`, one row per item.
    pub async fn run<W, R, F, Fut>(
        &self,
        items: Vec<W>,
        checkpoint: &mut Checkpoint<R>,
        mut handler: F,
    ) -> Result<BatchReport>
    where
        W: WorkItem,
        R: Record,
        F: FnMut(W) -> Fut,
        Fut: Future<Output = Result<R>>,
    {
        self.run_chunked(items, 1, checkpoint, |mut chunk: Vec<W>| {
            let call = chunk.pop().map(&mut handler);
            async move {
                match call {
                    Some(call) => call.await.map(|row| vec![row]),
                    None => Ok(Vec::new()),
                }
            }
        })
        .await
    }

    /// Run `handler` over chunks of up to `chunk_size` pending items.
    ///
    /// The handler may return any number of rows for a chunk. Progress,
    /// flushing and rate limiting all count chunks, not items.
    pub async fn run_chunked<W, R, F, Fut>(
        &self,
        items: Vec<W>,
        chunk_size: usize,
        checkpoint: &mut Checkpoint<R>,
        mut handler: F,
    ) -> Result<BatchReport>
    where
        W: WorkItem,
        R: Record,
        F: FnMut(Vec<W>) -> Fut,
        Fut: Future<Output = Result<Vec<R>>>,
    {
        let mut report = BatchReport::default();
        let mut seen = HashSet::new();
        let mut pending = Vec::new();

        for item in items {
            if !seen.insert(item.id().to_string()) {
                continue;
            }
            report.total += 1;
            if checkpoint.contains(item.id()) {
                report.already_done += 1;
            } else {
                pending.push(item);
            }
        }

        info!(
            pending = pending.len(),
            total = report.total,
            already_done = report.already_done,
            "Starting batch"
        );

        let chunks = into_chunks(pending, chunk_size.max(1));
        let unit_count = chunks.len();
        let mut unflushed = 0usize;

        for (idx, chunk) in chunks.into_iter().enumerate() {
            let position = idx + 1;
            let label = match chunk.as_slice() {
                [single] => single.label(),
                many => format!("{} items", many.len()),
            };
            let ids: Vec<String> = chunk.iter().map(|w| w.id().to_string()).collect();

            info!("[{position}/{unit_count}] {label}");
            report.attempted += 1;

            match handler(chunk).await {
                Ok(rows) => {
                    report.succeeded += 1;
                    report.rows += rows.len();
                    for row in rows {
                        checkpoint.push(row);
                    }
                    unflushed += 1;
                }
                Err(e) => {
                    report.failed += 1;
                    warn!(items = ?ids, error = %e, "Skipping after failure");
                }
            }

            let is_last = position == unit_count;
            if unflushed > 0 && (unflushed >= self.settings.flush_every || is_last) {
                checkpoint.flush()?;
                report.flushes += 1;
                unflushed = 0;
                info!(
                    rows = checkpoint.len(),
                    path = %checkpoint.path().display(),
                    "Checkpoint saved"
                );
            }

            if !is_last && !self.settings.delay.is_zero() {
                tokio::time::sleep(self.settings.delay).await;
            }
        }

        Ok(report)
    }
}

fn into_chunks<W>(items: Vec<W>, size: usize) -> Vec<Vec<W>> {
    let mut chunks = Vec::with_capacity(items.len().div_ceil(size));
    let mut current = Vec::with_capacity(size);
    for item in items {
        current.push(item);
        if current.len() == size {
            chunks.push(std::mem::replace(&mut current, Vec::with_capacity(size)));
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
