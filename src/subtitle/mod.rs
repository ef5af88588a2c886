pub mod group;
pub mod split;
pub mod srt;

pub use group::{group_by_speaker, speaker_of, SpeakerGroup};
pub use split::{proportional_split, target_lengths, SplitPunctuation};
pub use srt::{parse_srt, serialize_srt};

/// A single parsed SRT entry.
///
/// `index`, `start` and `end` are kept exactly as they appeared in the input
/// and are written back verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subtitle {
    pub index: String,
    pub start: String,
    pub end: String,
    pub text: String,
}

impl Subtitle {
    pub fn new(
        index: impl Into<String>,
        start: impl Into<String>,
        end: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            index: index.into(),
            start: start.into(),
            end: end.into(),
            text: text.into(),
        }
    }

    /// Length of the text in characters.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}
