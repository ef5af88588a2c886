use super::prompt::GroupPrompt;
use super::Translator;
use crate::error::{Result, SubtransError};
use crate::progress::{ProgressEvent, ProgressReporter};
use crate::subtitle::{proportional_split, target_lengths, SpeakerGroup, SplitPunctuation, Subtitle};
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Number of neighbouring groups on each side supplied as context.
pub const DEFAULT_CONTEXT_WINDOW: usize = 5;

/// Sampling temperature for group translation.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Granularity at which retry sleeps check for cancellation.
const CANCEL_POLL: Duration = Duration::from_millis(250);

/// Attempts, per-call timeout and flat retry delays for one group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub timeout: Duration,
    /// Delay after an attempt that timed out.
    pub timeout_delay: Duration,
    /// Delay after any other failed attempt.
    pub error_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            timeout: Duration::from_secs(60),
            timeout_delay: Duration::from_secs(10),
            error_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    pub fn delay_after(&self, error: &SubtransError) -> Duration {
        match error {
            SubtransError::Timeout(_) => self.timeout_delay,
            _ => self.error_delay,
        }
    }
}

/// Why a group fell back to its original text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Degradation {
    EmptyResult,
    Timeout,
    Error(String),
}

impl Degradation {
    pub fn from_error(error: &SubtransError) -> Self {
        match error {
            SubtransError::EmptyTranslation => Degradation::EmptyResult,
            SubtransError::Timeout(_) => Degradation::Timeout,
            other => Degradation::Error(other.to_string()),
        }
    }

    /// Tag written in front of the original text.
    pub fn marker(&self) -> String {
        match self {
            Degradation::EmptyResult => "[translation failed]".to_string(),
            Degradation::Timeout => "[translation timed out]".to_string(),
            // keep the marker on one line so the SRT block stays intact
            Degradation::Error(detail) => format!(
                "[translation error: {}]",
                detail.split_whitespace().collect::<Vec<_>>().join(" ")
            ),
        }
    }

    pub fn passthrough(&self, original: &str) -> String {
        format!("{} {}", self.marker(), original)
    }
}

/// How a group's lines were produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitStatus {
    /// The response had exactly one line per subtitle.
    Translated,
    /// The response was cut back into lines proportionally.
    Resplit,
    /// The line count had to be forced to match the group.
    Repaired { expected: usize, produced: usize },
    Degraded(Degradation),
}

impl UnitStatus {
    pub fn is_degraded(&self) -> bool {
        matches!(self, UnitStatus::Degraded(_))
    }
}

/// Result of translating one speaker group.
#[derive(Debug, Clone)]
pub struct TranslationUnit {
    /// Group position, 0-based.
    pub group: usize,
    /// Position of the group's first subtitle in the file.
    pub offset: usize,
    /// Trimmed response for the whole group, absent when degraded.
    pub block: Option<String>,
    /// One entry per subtitle of the group.
    pub lines: Vec<String>,
    pub status: UnitStatus,
}

impl TranslationUnit {
    fn degraded(index: usize, group: &SpeakerGroup<'_>, reason: Degradation) -> Self {
        let lines = group
            .subtitles
            .iter()
            .map(|s| reason.passthrough(&s.text))
            .collect();
        Self {
            group: index,
            offset: group.offset,
            block: None,
            lines,
            status: UnitStatus::Degraded(reason),
        }
    }

    /// Force exactly `expected` lines: pad with empty lines or fold the surplus
    /// into the last line.
    pub fn repair(&mut self, expected: usize, joiner: &str) {
        let produced = self.lines.len();
        if produced == expected {
            return;
        }

        warn!(
            "Group {} produced {} lines for {} subtitles, repairing",
            self.group + 1,
            produced,
            expected
        );

        if produced < expected {
            self.lines.resize(expected, String::new());
        } else {
            let keep = expected.max(1);
            let surplus: Vec<String> = self.lines.drain(keep..).collect();
            if let Some(last) = self.lines.last_mut() {
                for piece in surplus.iter().filter(|p| !p.is_empty()) {
                    if !last.is_empty() {
                        last.push_str(joiner);
                    }
                    last.push_str(piece);
                }
            }
            self.lines.truncate(expected);
        }

        if !self.status.is_degraded() {
            self.status = UnitStatus::Repaired { expected, produced };
        }
    }
}

/// Flatten units (in group order) into one line per subtitle.
pub fn lines_in_order(units: Vec<TranslationUnit>) -> Vec<String> {
    units.into_iter().flat_map(|u| u.lines).collect()
}

/// Completed group translations, one write-once slot per group.
///
/// Reads of a group that has not finished yet return `None` immediately.
#[derive(Debug)]
pub struct ContextLog {
    slots: Vec<OnceLock<String>>,
}

impl ContextLog {
    pub fn new(len: usize) -> Self {
        Self {
            slots: (0..len).map(|_| OnceLock::new()).collect(),
        }
    }

    /// Store the translation of `index`. Returns false if the slot was
    /// already filled or does not exist.
    pub fn record(&self, index: usize, text: String) -> bool {
        self.slots
            .get(index)
            .map(|slot| slot.set(text).is_ok())
            .unwrap_or(false)
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.slots.get(index)?.get().map(String::as_str)
    }

    /// Number of groups with a recorded translation.
    pub fn completed(&self) -> usize {
        self.slots.iter().filter(|s| s.get().is_some()).count()
    }
}

struct Attempt {
    block: String,
    lines: Vec<String>,
    status: UnitStatus,
}

/// Translates speaker groups with surrounding context.
///
/// With more than one worker, groups run concurrently behind a semaphore and
/// each group sees whichever earlier groups have already finished; otherwise
/// groups run one after another in order. Output order never depends on the
/// mode.
pub struct GroupTranslator {
    translator: Arc<dyn Translator>,
    max_workers: usize,
    window: usize,
    temperature: f32,
    target_language: String,
    vocabulary: Vec<String>,
    retry: RetryPolicy,
    punctuation: SplitPunctuation,
    reporter: Option<Arc<dyn ProgressReporter>>,
    cancelled: Arc<AtomicBool>,
}

impl GroupTranslator {
    pub fn new(translator: Arc<dyn Translator>, max_workers: usize) -> Self {
        Self {
            translator,
            max_workers,
            window: DEFAULT_CONTEXT_WINDOW,
            temperature: DEFAULT_TEMPERATURE,
            target_language: "zh".to_string(),
            vocabulary: Vec::new(),
            retry: RetryPolicy::default(),
            punctuation: SplitPunctuation::default(),
            reporter: None,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the target language; also selects the matching punctuation preset.
    pub fn with_target_language(mut self, language: impl Into<String>) -> Self {
        self.target_language = language.into();
        self.punctuation = SplitPunctuation::for_language(&self.target_language);
        self
    }

    pub fn with_vocabulary(mut self, vocabulary: Vec<String>) -> Self {
        self.vocabulary = vocabulary;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_punctuation(mut self, punctuation: SplitPunctuation) -> Self {
        self.punctuation = punctuation;
        self
    }

    pub fn with_reporter(mut self, reporter: Option<Arc<dyn ProgressReporter>>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_cancel_flag(mut self, cancelled: Arc<AtomicBool>) -> Self {
        self.cancelled = cancelled;
        self
    }

    /// Translate all groups and return one unit per group, in group order.
    ///
    /// Individual group failures degrade to marked passthrough text; the only
    /// error returned is [`SubtransError::Cancelled`].
    pub async fn translate_groups(
        &self,
        groups: &[SpeakerGroup<'_>],
        summary: &str,
    ) -> Result<Vec<TranslationUnit>> {
        if groups.is_empty() {
            return Ok(Vec::new());
        }

        let log = ContextLog::new(groups.len());

        let mut units = if self.max_workers > 1 {
            info!(
                "Translating {} groups with {} concurrent requests using {}",
                groups.len(),
                self.max_workers,
                self.translator.name()
            );

            let semaphore = Semaphore::new(self.max_workers);
            let mut pending = FuturesUnordered::new();

            for index in 0..groups.len() {
                let semaphore = &semaphore;
                let log = &log;
                pending.push(async move {
                    let _permit = semaphore
                        .acquire()
                        .await
                        .map_err(|_| SubtransError::Cancelled)?;
                    self.translate_group(index, groups, summary, log).await
                });
            }

            let mut units = Vec::with_capacity(groups.len());
            while let Some(result) = pending.next().await {
                units.push(result?);
            }

            // completion order is arbitrary
            units.sort_by_key(|u| u.group);
            units
        } else {
            info!(
                "Translating {} groups sequentially using {}",
                groups.len(),
                self.translator.name()
            );

            let mut units = Vec::with_capacity(groups.len());
            for index in 0..groups.len() {
                units.push(self.translate_group(index, groups, summary, &log).await?);
            }
            units
        };

        for (unit, group) in units.iter_mut().zip(groups) {
            unit.repair(group.len(), self.punctuation.joiner());
        }

        let translated = log.completed();
        if translated < groups.len() {
            warn!(
                "{} of {} groups kept their original text",
                groups.len() - translated,
                groups.len()
            );
        }

        Ok(units)
    }

    async fn translate_group(
        &self,
        index: usize,
        groups: &[SpeakerGroup<'_>],
        summary: &str,
        log: &ContextLog,
    ) -> Result<TranslationUnit> {
        let group = &groups[index];
        let total = groups.len();
        let number = index + 1;
        let max_attempts = self.retry.max_attempts.max(1);

        let block = group.flattened();
        let following = self.following_context(index, groups);
        let mut attempt = 0;

        loop {
            attempt += 1;
            self.ensure_not_cancelled()?;
            self.report(ProgressEvent::GroupStart {
                group: number,
                total,
                attempt,
                max_attempts,
            });

            // rebuilt every attempt so retries see groups that finished meanwhile
            let previous = self.previous_context(index, groups, log);
            let prompt = GroupPrompt {
                summary,
                vocabulary: &self.vocabulary,
                target_language: &self.target_language,
                previous: &previous,
                block: &block,
                following: &following,
                window: self.window,
            }
            .render();

            match self.attempt(&block, &prompt, group).await {
                Ok(done) => {
                    debug!(
                        "Group {} translated ({:?}, {} lines)",
                        number,
                        done.status,
                        done.lines.len()
                    );
                    log.record(index, done.block.clone());
                    self.report(ProgressEvent::GroupDone {
                        group: number,
                        total,
                        degraded: false,
                    });
                    return Ok(TranslationUnit {
                        group: index,
                        offset: group.offset,
                        block: Some(done.block),
                        lines: done.lines,
                        status: done.status,
                    });
                }
                Err(error) => {
                    warn!(
                        "Group {} failed (attempt {}/{}): {}",
                        number, attempt, max_attempts, error
                    );
                    self.report(ProgressEvent::GroupError {
                        group: number,
                        total,
                        attempt,
                        error: error.to_string(),
                        timed_out: matches!(error, SubtransError::Timeout(_)),
                    });

                    if attempt >= max_attempts {
                        let reason = Degradation::from_error(&error);
                        warn!("Group {} falls back to original text: {}", number, reason.marker());
                        self.report(ProgressEvent::GroupDone {
                            group: number,
                            total,
                            degraded: true,
                        });
                        return Ok(TranslationUnit::degraded(index, group, reason));
                    }

                    let delay = self.retry.delay_after(&error);
                    self.report(ProgressEvent::GroupRetry {
                        group: number,
                        total,
                        next_attempt: attempt + 1,
                        delay,
                    });
                    self.pause(delay).await?;
                }
            }
        }
    }

    async fn attempt(&self, block: &str, prompt: &str, group: &SpeakerGroup<'_>) -> Result<Attempt> {
        let call = self.translator.translate(block, prompt, self.temperature);
        let response = match tokio::time::timeout(self.retry.timeout, call).await {
            Ok(result) => result?,
            Err(_) => return Err(SubtransError::Timeout(self.retry.timeout)),
        };

        let translated = response.trim();
        if translated.is_empty() {
            return Err(SubtransError::EmptyTranslation);
        }

        let lines: Vec<String> = translated
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();

        if lines.len() == group.len() {
            return Ok(Attempt {
                block: translated.to_string(),
                lines,
                status: UnitStatus::Translated,
            });
        }

        let joined = lines.join(self.punctuation.joiner());
        let source_lengths: Vec<usize> = group.subtitles.iter().map(Subtitle::char_len).collect();
        let targets = target_lengths(&source_lengths, joined.chars().count());
        let pieces: Vec<String> = proportional_split(&joined, &targets, &self.punctuation)
            .into_iter()
            .map(|p| p.trim().to_string())
            .collect();

        debug!(
            "Resplit {} response lines into {} subtitles",
            lines.len(),
            pieces.len()
        );

        Ok(Attempt {
            block: translated.to_string(),
            lines: pieces,
            status: UnitStatus::Resplit,
        })
    }

    /// Translated text of up to `window` preceding groups, falling back to the
    /// original text of any group that has not finished.
    fn previous_context(&self, index: usize, groups: &[SpeakerGroup<'_>], log: &ContextLog) -> String {
        let start = index.saturating_sub(self.window);
        (start..index)
            .map(|j| log.get(j).map(str::to_string).unwrap_or_else(|| groups[j].text()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Original text of up to `window` following groups.
    fn following_context(&self, index: usize, groups: &[SpeakerGroup<'_>]) -> String {
        groups
            .iter()
            .skip(index + 1)
            .take(self.window)
            .map(|g| g.text())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn ensure_not_cancelled(&self) -> Result<()> {
        if self.cancelled.load(Ordering::Relaxed) {
            Err(SubtransError::Cancelled)
        } else {
            Ok(())
        }
    }

    async fn pause(&self, delay: Duration) -> Result<()> {
        let deadline = Instant::now() + delay;
        loop {
            self.ensure_not_cancelled()?;
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            tokio::time::sleep((deadline - now).min(CANCEL_POLL)).await;
        }
    }

    fn report(&self, event: ProgressEvent) {
        if let Some(reporter) = &self.reporter {
            reporter.report(&event);
        }
    }
}
