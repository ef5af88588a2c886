//! Progress notifications.
//!
//! Reporters are purely observational: the pipeline produces the same output
//! with or without one attached. Events may arrive from whichever task
//! finished a unit of work, so reporters must be `Send + Sync` and should not
//! assume any particular thread.

use indicatif::{ProgressBar, ProgressStyle};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Pipeline stage an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    ReadingFile,
    ParsingSubtitles,
    ContentAnalysis,
    TranslationStart,
    GroupStart,
    GroupDone,
    GroupError,
    GroupRetry,
    Rebuilding,
    Completed,
    Error,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::ReadingFile => "reading_file",
            Stage::ParsingSubtitles => "parsing_subtitles",
            Stage::ContentAnalysis => "content_analysis",
            Stage::TranslationStart => "translation_start",
            Stage::GroupStart => "group_start",
            Stage::GroupDone => "group_done",
            Stage::GroupError => "group_error",
            Stage::GroupRetry => "group_retry",
            Stage::Rebuilding => "rebuilding",
            Stage::Completed => "completed",
            Stage::Error => "error",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single progress notification. Group numbers are 1-based.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    ReadingFile {
        path: PathBuf,
    },
    ParsingSubtitles,
    ContentAnalysis,
    TranslationStart {
        subtitles: usize,
        groups: usize,
    },
    GroupStart {
        group: usize,
        total: usize,
        attempt: u32,
        max_attempts: u32,
    },
    GroupDone {
        group: usize,
        total: usize,
        degraded: bool,
    },
    GroupError {
        group: usize,
        total: usize,
        attempt: u32,
        error: String,
        timed_out: bool,
    },
    GroupRetry {
        group: usize,
        total: usize,
        next_attempt: u32,
        delay: Duration,
    },
    Rebuilding,
    Completed {
        subtitles: usize,
        output: PathBuf,
    },
    Error {
        message: String,
    },
}

impl ProgressEvent {
    pub fn stage(&self) -> Stage {
        match self {
            ProgressEvent::ReadingFile { .. } => Stage::ReadingFile,
            ProgressEvent::ParsingSubtitles => Stage::ParsingSubtitles,
            ProgressEvent::ContentAnalysis => Stage::ContentAnalysis,
            ProgressEvent::TranslationStart { .. } => Stage::TranslationStart,
            ProgressEvent::GroupStart { .. } => Stage::GroupStart,
            ProgressEvent::GroupDone { .. } => Stage::GroupDone,
            ProgressEvent::GroupError { .. } => Stage::GroupError,
            ProgressEvent::GroupRetry { .. } => Stage::GroupRetry,
            ProgressEvent::Rebuilding => Stage::Rebuilding,
            ProgressEvent::Completed { .. } => Stage::Completed,
            ProgressEvent::Error { .. } => Stage::Error,
        }
    }

    pub fn current(&self) -> usize {
        match self {
            ProgressEvent::GroupStart { group, .. }
            | ProgressEvent::GroupDone { group, .. }
            | ProgressEvent::GroupError { group, .. }
            | ProgressEvent::GroupRetry { group, .. } => *group,
            ProgressEvent::Completed { subtitles, .. } => *subtitles,
            _ => 0,
        }
    }

    pub fn total(&self) -> usize {
        match self {
            ProgressEvent::GroupStart { total, .. }
            | ProgressEvent::GroupDone { total, .. }
            | ProgressEvent::GroupError { total, .. }
            | ProgressEvent::GroupRetry { total, .. } => *total,
            ProgressEvent::TranslationStart { subtitles, .. }
            | ProgressEvent::Completed { subtitles, .. } => *subtitles,
            _ => 0,
        }
    }
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressEvent::ReadingFile { path } => {
                let name = path.file_name().unwrap_or(path.as_os_str());
                write!(f, "Reading {}", name.to_string_lossy())
            }
            ProgressEvent::ParsingSubtitles => write!(f, "Parsing subtitles"),
            ProgressEvent::ContentAnalysis => write!(f, "Analysing content"),
            ProgressEvent::TranslationStart { subtitles, groups } => write!(
                f,
                "Translating {} subtitles in {} speaker groups",
                subtitles, groups
            ),
            ProgressEvent::GroupStart {
                group,
                attempt,
                max_attempts,
                ..
            } => write!(
                f,
                "Translating group {} (attempt {}/{})",
                group, attempt, max_attempts
            ),
            ProgressEvent::GroupDone {
                group, degraded, ..
            } => {
                if *degraded {
                    write!(f, "Group {} kept original text", group)
                } else {
                    write!(f, "Group {} translated", group)
                }
            }
            ProgressEvent::GroupError {
                group,
                attempt,
                error,
                ..
            } => write!(f, "Group {} failed (attempt {}): {}", group, attempt, error),
            ProgressEvent::GroupRetry {
                group,
                next_attempt,
                delay,
                ..
            } => write!(
                f,
                "Retrying group {} in {}s (attempt {})",
                group,
                delay.as_secs(),
                next_attempt
            ),
            ProgressEvent::Rebuilding => write!(f, "Rebuilding SRT file"),
            ProgressEvent::Completed { output, .. } => {
                let name = output.file_name().unwrap_or(output.as_os_str());
                write!(f, "Translation complete: {}", name.to_string_lossy())
            }
            ProgressEvent::Error { message } => write!(f, "Processing failed: {}", message),
        }
    }
}

/// Receiver of progress events.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: &ProgressEvent);
}

impl<F> ProgressReporter for F
where
    F: Fn(&ProgressEvent) + Send + Sync,
{
    fn report(&self, event: &ProgressEvent) {
        self(event)
    }
}

/// Writes every event to the tracing log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl ProgressReporter for LogReporter {
    fn report(&self, event: &ProgressEvent) {
        match event.stage() {
            Stage::GroupError | Stage::Error => warn!("{}", event),
            Stage::GroupStart | Stage::GroupRetry => debug!("{}", event),
            _ => info!("{}", event),
        }
    }
}

/// Terminal progress bar counting finished groups.
pub struct BarReporter {
    bar: ProgressBar,
}

impl BarReporter {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} groups {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Self { bar }
    }
}

impl Default for BarReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for BarReporter {
    fn report(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::ReadingFile { .. } => {
                self.bar.reset();
                self.bar.set_length(0);
                self.bar.set_message(event.to_string());
            }
            ProgressEvent::TranslationStart { groups, .. } => {
                self.bar.set_length(*groups as u64);
                self.bar.set_position(0);
                self.bar.enable_steady_tick(Duration::from_millis(100));
                self.bar.set_message(event.to_string());
            }
            ProgressEvent::GroupDone { .. } => {
                self.bar.inc(1);
            }
            ProgressEvent::GroupError { .. } | ProgressEvent::GroupRetry { .. } => {
                self.bar.println(event.to_string());
            }
            ProgressEvent::Completed { .. } => {
                self.bar.finish_with_message(event.to_string());
            }
            ProgressEvent::Error { .. } => {
                self.bar.abandon_with_message(event.to_string());
            }
            _ => self.bar.set_message(event.to_string()),
        }
    }
}
