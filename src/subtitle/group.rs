//! Speaker-based grouping of consecutive subtitles.

use super::Subtitle;
use regex::Regex;
use std::sync::OnceLock;

fn speaker_marker() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| Regex::new(r"^(.+?)[:：]").expect("Invalid regex"))
}

/// A contiguous run of subtitles attributed to one speaker.
///
/// `speaker` is `None` only for a leading run that appears before any
/// speaker marker has been seen.
#[derive(Debug, Clone, Copy)]
pub struct SpeakerGroup<'a> {
    pub speaker: Option<&'a str>,
    /// Position of the first subtitle of this group in the full sequence.
    pub offset: usize,
    pub subtitles: &'a [Subtitle],
}

impl<'a> SpeakerGroup<'a> {
    pub fn len(&self) -> usize {
        self.subtitles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subtitles.is_empty()
    }

    /// Original lines joined with newlines.
    pub fn text(&self) -> String {
        self.subtitles
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// All lines flattened into a single block, one space between lines.
    pub fn flattened(&self) -> String {
        self.text().replace(&['\n', '\r'][..], " ")
    }
}

/// Extract the leading `name:` (or `name：`) marker from a subtitle line.
pub fn speaker_of(text: &str) -> Option<&str> {
    speaker_marker()
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
}

/// Partition subtitles into speaker groups in a single pass.
///
/// Every line with a speaker marker opens a new group; unmarked lines join the
/// group that is currently open. The groups cover the input exactly, in order.
pub fn group_by_speaker(subtitles: &[Subtitle]) -> Vec<SpeakerGroup<'_>> {
    let mut groups = Vec::new();
    let mut start = 0;
    let mut speaker: Option<&str> = None;

    for (i, subtitle) in subtitles.iter().enumerate() {
        if let Some(name) = speaker_of(&subtitle.text) {
            if i > start {
                groups.push(SpeakerGroup {
                    speaker,
                    offset: start,
                    subtitles: &subtitles[start..i],
                });
            }
            start = i;
            speaker = Some(name);
        }
    }

    if start < subtitles.len() {
        groups.push(SpeakerGroup {
            speaker,
            offset: start,
            subtitles: &subtitles[start..],
        });
    }

    groups
}
