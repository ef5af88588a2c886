use crate::config::Config;
use crate::error::{Result, SubtransError};
use crate::progress::{ProgressEvent, ProgressReporter};
use crate::subtitle::{group_by_speaker, parse_srt, serialize_srt};
use crate::translate::orchestrator::lines_in_order;
use crate::translate::{
    analyze_content, GroupTranslator, RetryPolicy, Translator, UnitStatus, DEFAULT_SUMMARY,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const CANCEL_POLL: Duration = Duration::from_millis(250);

/// Settings for translating one file.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Target language code, also used in the output file name.
    pub target_language: String,
    /// Concurrent group requests.
    pub concurrency: usize,
    pub temperature: f32,
    pub context_window: usize,
    /// Fixed renderings handed to every prompt.
    pub vocabulary: Vec<String>,
    pub retry: RetryPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for PipelineConfig {
    fn from(config: &Config) -> Self {
        Self {
            target_language: config.target_language.clone(),
            concurrency: config.concurrency,
            temperature: config.temperature,
            context_window: config.context_window,
            vocabulary: Vec::new(),
            retry: config.retry_policy(),
        }
    }
}

/// Statistics from translating one file.
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    pub subtitles: usize,
    pub groups: usize,
    /// Lines written as marked passthrough.
    pub degraded_lines: usize,
    /// Groups whose response was re-split proportionally.
    pub resplit_groups: usize,
    /// Groups whose line count had to be forced.
    pub repaired_groups: usize,
    /// Whether content analysis produced a summary.
    pub analysis_available: bool,
    pub total_time: Duration,
}

#[derive(Debug)]
pub struct PipelineResult {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub analysis_path: PathBuf,
    pub stats: PipelineStats,
}

/// `<base>_translated_<lang><ext>` next to the input.
pub fn output_path(input: &Path, target_language: &str) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    let name = match input.extension() {
        Some(ext) => format!("{}_translated_{}.{}", stem, target_language, ext.to_string_lossy()),
        None => format!("{}_translated_{}", stem, target_language),
    };
    input.with_file_name(name)
}

/// `<base>_analysis.txt` next to the input.
pub fn analysis_path(input: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    input.with_file_name(format!("{}_analysis.txt", stem))
}

fn ensure_not_cancelled(cancelled: &AtomicBool) -> Result<()> {
    if cancelled.load(Ordering::Relaxed) {
        Err(SubtransError::Cancelled)
    } else {
        Ok(())
    }
}

/// Resolves once the cancel flag is set.
async fn cancellation(cancelled: &AtomicBool) {
    while !cancelled.load(Ordering::Relaxed) {
        tokio::time::sleep(CANCEL_POLL).await;
    }
}

fn report(reporter: &Option<Arc<dyn ProgressReporter>>, event: ProgressEvent) {
    if let Some(reporter) = reporter {
        reporter.report(&event);
    }
}

/// Translate a single SRT file.
///
/// Stages:
/// 1. Read and parse the input
/// 2. Analyse the content (falls back to a generic summary)
/// 3. Group by speaker and translate the groups
/// 4. Rebuild the SRT and write it together with the analysis report
///
/// Both outputs are overwritten if they exist. A failure is reported as a
/// [`ProgressEvent::Error`] before it is returned.
pub async fn translate_file(
    input: &Path,
    translator: Arc<dyn Translator>,
    config: &PipelineConfig,
    reporter: Option<Arc<dyn ProgressReporter>>,
    cancelled: Arc<AtomicBool>,
) -> Result<PipelineResult> {
    let result = run_file(input, translator, config, reporter.clone(), cancelled).await;

    if let Err(e) = &result {
        warn!("Failed to translate {}: {}", input.display(), e);
        report(
            &reporter,
            ProgressEvent::Error {
                message: format!("{}: {}", input.display(), e),
            },
        );
    }

    result
}

async fn run_file(
    input: &Path,
    translator: Arc<dyn Translator>,
    config: &PipelineConfig,
    reporter: Option<Arc<dyn ProgressReporter>>,
    cancelled: Arc<AtomicBool>,
) -> Result<PipelineResult> {
    let start_time = Instant::now();

    if !input.exists() {
        return Err(SubtransError::FileNotFound(input.display().to_string()));
    }

    info!("Reading {}", input.display());
    report(
        &reporter,
        ProgressEvent::ReadingFile {
            path: input.to_path_buf(),
        },
    );
    let raw = tokio::fs::read_to_string(input).await?;

    report(&reporter, ProgressEvent::ParsingSubtitles);
    let subtitles = parse_srt(&raw);
    if subtitles.is_empty() {
        return Err(SubtransError::NoSubtitles(input.display().to_string()));
    }
    debug!("Parsed {} subtitles", subtitles.len());

    ensure_not_cancelled(&cancelled)?;

    report(&reporter, ProgressEvent::ContentAnalysis);
    let full_text = subtitles
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    let analysis = tokio::select! {
        analysis = analyze_content(
            translator.as_ref(),
            &full_text,
            &config.vocabulary,
            &config.target_language,
            config.retry.timeout,
        ) => analysis,
        _ = cancellation(&cancelled) => return Err(SubtransError::Cancelled),
    };
    let analysis_available = analysis.is_some();
    let summary = analysis.unwrap_or_else(|| {
        info!("No content analysis available, using generic guidance");
        DEFAULT_SUMMARY.to_string()
    });

    ensure_not_cancelled(&cancelled)?;

    let groups = group_by_speaker(&subtitles);
    info!(
        "Translating {} subtitles in {} speaker groups to {}",
        subtitles.len(),
        groups.len(),
        config.target_language
    );
    report(
        &reporter,
        ProgressEvent::TranslationStart {
            subtitles: subtitles.len(),
            groups: groups.len(),
        },
    );

    let group_translator = GroupTranslator::new(translator, config.concurrency)
        .with_window(config.context_window)
        .with_temperature(config.temperature)
        .with_target_language(config.target_language.clone())
        .with_vocabulary(config.vocabulary.clone())
        .with_retry(config.retry.clone())
        .with_reporter(reporter.clone())
        .with_cancel_flag(cancelled.clone());

    let units = group_translator.translate_groups(&groups, &summary).await?;

    let mut stats = PipelineStats {
        subtitles: subtitles.len(),
        groups: groups.len(),
        analysis_available,
        ..PipelineStats::default()
    };
    for unit in &units {
        match unit.status {
            UnitStatus::Degraded(_) => stats.degraded_lines += unit.lines.len(),
            UnitStatus::Resplit => stats.resplit_groups += 1,
            UnitStatus::Repaired { .. } => stats.repaired_groups += 1,
            UnitStatus::Translated => {}
        }
    }

    report(&reporter, ProgressEvent::Rebuilding);
    let lines = lines_in_order(units);
    if lines.len() != subtitles.len() {
        // repair guarantees equal counts; reaching this is a bug
        return Err(SubtransError::Translation(format!(
            "Rebuilt {} lines for {} subtitles",
            lines.len(),
            subtitles.len()
        )));
    }
    let content = serialize_srt(subtitles.iter().zip(lines.iter().map(String::as_str)));

    let output = output_path(input, &config.target_language);
    tokio::fs::write(&output, content).await?;
    info!("Wrote {} subtitles to {}", subtitles.len(), output.display());

    let analysis_output = analysis_path(input);
    tokio::fs::write(
        &analysis_output,
        format!("Content analysis report:\n{}", summary),
    )
    .await?;
    debug!("Wrote analysis report to {}", analysis_output.display());

    if stats.degraded_lines > 0 {
        warn!(
            "{} lines kept their original text; search the output for \"[translation\"",
            stats.degraded_lines
        );
    }

    stats.total_time = start_time.elapsed();

    report(
        &reporter,
        ProgressEvent::Completed {
            subtitles: subtitles.len(),
            output: output.clone(),
        },
    );

    Ok(PipelineResult {
        input_path: input.to_path_buf(),
        output_path: output,
        analysis_path: analysis_output,
        stats,
    })
}

/// Translate several files one after another.
///
/// A failure in one file is reported and returned in its slot without
/// affecting the others. Once cancelled, the remaining files are skipped.
pub async fn translate_files(
    inputs: &[PathBuf],
    translator: Arc<dyn Translator>,
    config: &PipelineConfig,
    reporter: Option<Arc<dyn ProgressReporter>>,
    cancelled: Arc<AtomicBool>,
) -> Vec<(PathBuf, Result<PipelineResult>)> {
    let mut results = Vec::with_capacity(inputs.len());

    for (i, input) in inputs.iter().enumerate() {
        if cancelled.load(Ordering::Relaxed) {
            results.push((input.clone(), Err(SubtransError::Cancelled)));
            continue;
        }

        info!("File {}/{}: {}", i + 1, inputs.len(), input.display());
        let result = translate_file(
            input,
            translator.clone(),
            config,
            reporter.clone(),
            cancelled.clone(),
        )
        .await;

        results.push((input.clone(), result));
    }

    results
}

/// Print a summary of one translated file.
pub fn print_summary(result: &PipelineResult) {
    let stats = &result.stats;
    println!();
    println!("═══════════════════════════════════════════════════════════════");
    println!("                    Subtitle Translation Complete              ");
    println!("═══════════════════════════════════════════════════════════════");
    println!();
    println!("  Input:      {}", result.input_path.display());
    println!("  Output:     {}", result.output_path.display());
    println!("  Analysis:   {}", result.analysis_path.display());
    println!("  Subtitles:  {}", stats.subtitles);
    println!("  Groups:     {}", stats.groups);
    if !stats.analysis_available {
        println!("  Note:       content analysis unavailable, generic guidance used");
    }
    if stats.resplit_groups > 0 || stats.repaired_groups > 0 {
        println!(
            "  Re-split:   {} groups ({} repaired)",
            stats.resplit_groups + stats.repaired_groups,
            stats.repaired_groups
        );
    }
    if stats.degraded_lines > 0 {
        println!("  Untranslated lines: {}", stats.degraded_lines);
    }
    println!();
    println!("  Total:      {:.2}s", stats.total_time.as_secs_f64());
    println!();
    println!("═══════════════════════════════════════════════════════════════");
}
