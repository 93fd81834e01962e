//! Run-level orchestration
//!
//! Resolves the input pattern, fans the files out to a fixed pool of
//! workers and collects what they report. Each worker loops: take a path
//! from the shared intake queue, load it, mark it done, publish the result.
//! The first failure published ends the run with an error once every worker
//! has stopped; files already in flight are allowed to finish.

use chrono::{DateTime, Utc};
use glob::MatchOptions;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::backend::BackendConnector;
use crate::config::LoaderConfig;
use crate::error::{LoadError, Result};
use crate::outcome::{FileOutcome, LoadVerdict};
use crate::processor::FileProcessor;
use crate::renamer;

/// What happened to one loaded file
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    /// Where the file lives now
    pub done_path: PathBuf,
    pub verdict: LoadVerdict,
    pub outcome: FileOutcome,
}

/// Result of a run in which every file was loaded and marked done
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Sorted by original path
    pub files: Vec<FileReport>,
    /// Files left untouched because the run was cancelled
    pub skipped: usize,
}

impl RunSummary {
    pub fn processed(&self) -> u64 {
        self.files.iter().map(|f| f.outcome.processed()).sum()
    }

    pub fn errors(&self) -> u64 {
        self.files.iter().map(|f| f.outcome.errors()).sum()
    }

    /// Files whose error rate was over the threshold
    pub fn high_error_rate_files(&self) -> usize {
        self.files
            .iter()
            .filter(|f| !f.verdict.is_acceptable())
            .count()
    }
}

type Intake = Arc<Mutex<mpsc::Receiver<PathBuf>>>;
type Results = mpsc::UnboundedSender<Result<FileReport>>;

pub struct PipelineDriver {
    config: LoaderConfig,
    processor: Arc<FileProcessor>,
    cancel: CancellationToken,
}

impl PipelineDriver {
    /// Validates `config`; nothing is started until [`PipelineDriver::run`]
    pub fn new(config: LoaderConfig, connector: Arc<dyn BackendConnector>) -> Result<Self> {
        config.validate()?;
        let processor = Arc::new(FileProcessor::new(&config, connector));

        Ok(Self {
            config,
            processor,
            cancel: CancellationToken::new(),
        })
    }

    /// Token that stops workers from taking further files
    ///
    /// Cancelled by the driver itself on the first failure when `fail_fast`
    /// is set; callers may also cancel it, e.g. on Ctrl-C.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub async fn run(&self) -> Result<RunSummary> {
        let started_at = Utc::now();

        let paths = resolve_pattern(&self.config.pattern)?;
        if paths.is_empty() {
            return Err(LoadError::NoFilesFound(self.config.pattern.clone()));
        }

        info!(
            files = paths.len(),
            workers = self.config.workers,
            dry_run = self.config.dry_run,
            "Starting workers"
        );

        // Every path fits, so filling the queue never waits on a worker
        let (intake_tx, intake_rx) = mpsc::channel(paths.len());
        for path in paths {
            intake_tx
                .send(path)
                .await
                .map_err(|e| LoadError::Worker(format!("intake queue closed: {e}")))?;
        }
        drop(intake_tx);

        let intake: Intake = Arc::new(Mutex::new(intake_rx));
        let (results_tx, mut results_rx) = mpsc::unbounded_channel();

        let handles: Vec<JoinHandle<()>> = (0..self.config.workers)
            .map(|worker_id| {
                tokio::spawn(worker_loop(
                    worker_id,
                    intake.clone(),
                    self.processor.clone(),
                    results_tx.clone(),
                    self.cancel.clone(),
                    self.config.fail_fast,
                ))
            })
            .collect();
        drop(results_tx);

        let joined = futures::future::join_all(handles).await;

        let mut skipped = 0;
        if self.cancel.is_cancelled() {
            let mut queue = intake.lock().await;
            while queue.try_recv().is_ok() {
                skipped += 1;
            }
            warn!(skipped, "Run cancelled, remaining files left for the next run");
        }

        let mut first_error = None;
        let mut files = Vec::new();
        while let Some(result) = results_rx.recv().await {
            match result {
                Ok(report) => files.push(report),
                Err(e) if first_error.is_none() => first_error = Some(e),
                Err(e) => warn!(error = %e, "Additional file failure"),
            }
        }

        for (worker_id, result) in joined.into_iter().enumerate() {
            if let Err(e) = result {
                error!(worker = worker_id, error = %e, "Worker task panicked");
                first_error.get_or_insert(LoadError::Worker(e.to_string()));
            }
        }

        if let Some(e) = first_error {
            return Err(e);
        }

        files.sort_by(|a, b| a.path.cmp(&b.path));
        let summary = RunSummary {
            started_at,
            finished_at: Utc::now(),
            files,
            skipped,
        };

        info!(
            files = summary.files.len(),
            processed = summary.processed(),
            errors = summary.errors(),
            high_error_rate_files = summary.high_error_rate_files(),
            "All files processed"
        );

        Ok(summary)
    }
}

async fn worker_loop(
    worker_id: usize,
    intake: Intake,
    processor: Arc<FileProcessor>,
    results: Results,
    cancel: CancellationToken,
    fail_fast: bool,
) {
    loop {
        let next = {
            let mut queue = intake.lock().await;
            tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                path = queue.recv() => path,
            }
        };
        let Some(path) = next else {
            break;
        };

        let result = load_file(&processor, &path).await;
        if let Err(e) = &result {
            error!(worker = worker_id, file = %path.display(), error = %e, "File failed");
            if fail_fast {
                cancel.cancel();
            }
        }

        if results.send(result).is_err() {
            break;
        }
    }

    debug!(worker = worker_id, "Worker finished");
}

/// Load one file and, if that completes, mark it done
async fn load_file(processor: &FileProcessor, path: &Path) -> Result<FileReport> {
    let outcome = processor.process(path).await?;
    let verdict = outcome.verdict(processor.error_threshold());
    let done_path = renamer::mark_done(path).await?;

    Ok(FileReport {
        path: path.to_path_buf(),
        done_path,
        verdict,
        outcome,
    })
}

/// Expand `pattern` to the regular files it matches, sorted
///
/// Files whose name starts with `.` have already been marked done and are
/// skipped, unless the last component of the pattern itself starts with `.`.
pub fn resolve_pattern(pattern: &str) -> Result<Vec<PathBuf>> {
    let options = MatchOptions {
        case_sensitive: true,
        require_literal_separator: false,
        require_literal_leading_dot: false,
    };
    let wants_dotfiles = Path::new(pattern)
        .file_name()
        .is_some_and(|name| name.to_string_lossy().starts_with('.'));

    let entries = glob::glob_with(pattern, options).map_err(|source| LoadError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) if !wants_dotfiles && is_done(&path) => {
                debug!(path = %path.display(), "Skipping file already marked done")
            },
            Ok(path) if path.is_file() => paths.push(path),
            Ok(path) => debug!(path = %path.display(), "Skipping non-file match"),
            Err(e) => warn!(error = %e, "Cannot read glob match"),
        }
    }

    paths.sort();
    Ok(paths)
}

fn is_done(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|name| name.to_string_lossy().starts_with(renamer::DONE_MARKER))
}
