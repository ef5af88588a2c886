//! One-shot content analysis used as translation guidance.

use super::prompt::{analysis_prompt, char_prefix, ANALYSIS_SAMPLE_CHARS};
use super::Translator;
use std::time::Duration;
use tracing::{debug, warn};

/// Texts shorter than this (after trimming) are not worth analysing.
pub const MIN_ANALYSIS_CHARS: usize = 50;

/// Sampling temperature for the analysis call.
pub const ANALYSIS_TEMPERATURE: f32 = 0.3;

/// Guidance used when no analysis is available.
pub const DEFAULT_SUMMARY: &str =
    "This is a subtitle file that needs translating. Keep the tone and style of the original.";

/// Summarise the content of a subtitle file.
///
/// Returns `None` for degenerate input, an empty response, a failed call or
/// one that takes longer than `timeout`. Callers fall back to
/// [`DEFAULT_SUMMARY`].
pub async fn analyze_content(
    translator: &dyn Translator,
    full_text: &str,
    vocabulary: &[String],
    target_language: &str,
    timeout: Duration,
) -> Option<String> {
    if full_text.trim().chars().count() < MIN_ANALYSIS_CHARS {
        debug!("Text too short for content analysis");
        return None;
    }

    let sample = char_prefix(full_text, ANALYSIS_SAMPLE_CHARS);
    let prompt = analysis_prompt(sample, vocabulary, target_language);

    let call = translator.translate(sample, &prompt, ANALYSIS_TEMPERATURE);
    let Ok(result) = tokio::time::timeout(timeout, call).await else {
        warn!("Content analysis timed out after {}s", timeout.as_secs());
        return None;
    };

    match result {
        Ok(summary) if !summary.trim().is_empty() => Some(summary.trim().to_string()),
        Ok(_) => {
            warn!("Content analysis returned an empty response");
            None
        }
        Err(e) => {
            warn!("Content analysis failed: {}", e);
            None
        }
    }
}
