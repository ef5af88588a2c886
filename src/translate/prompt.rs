//! Prompt templates for content analysis and group translation.

use super::language_code_to_name;

/// Maximum number of characters of the subtitle text sent for analysis.
pub const ANALYSIS_SAMPLE_CHARS: usize = 2500;

/// First `max_chars` characters of `text`.
pub fn char_prefix(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte, _)) => &text[..byte],
        None => text,
    }
}

fn vocabulary_block(vocabulary: &[String], empty: &str) -> String {
    if vocabulary.is_empty() {
        empty.to_string()
    } else {
        vocabulary.join("\n")
    }
}

/// Instruction for the one-shot content analysis call.
pub fn analysis_prompt(sample: &str, vocabulary: &[String], target_language: &str) -> String {
    let lang_name = language_code_to_name(target_language);
    let vocab_section = if vocabulary.is_empty() {
        String::new()
    } else {
        format!(
            "\nCustom vocabulary (already fixed, do not repeat):\n{}\n",
            vocabulary.join("\n")
        )
    };

    format!(
        r#"Analyse the overall content of the following subtitle text and write a precise report that will guide a translation into {lang_name}:

1. Content type (drama, documentary, interview, tabletop game session, tutorial, ...)
2. Main topics and core plot
3. Key people or characters, their traits, and a fixed {lang_name} rendering of each name (original and translation)
4. Specific places or settings with fixed translations (original and translation)
5. Names, places and proper nouns not covered by the custom vocabulary below; list each as "<translation> <original>" on its own line and say which glossary category it belongs to
6. Language style and tone
7. Likely target audience
{vocab_section}
Summarise concisely and professionally.

Subtitle text (first {ANALYSIS_SAMPLE_CHARS} characters):
{sample}"#
    )
}

/// Everything the translation prompt for one group needs.
#[derive(Debug, Clone, Copy)]
pub struct GroupPrompt<'a> {
    pub summary: &'a str,
    pub vocabulary: &'a [String],
    pub target_language: &'a str,
    pub previous: &'a str,
    pub block: &'a str,
    pub following: &'a str,
    pub window: usize,
}

impl GroupPrompt<'_> {
    pub fn render(&self) -> String {
        let lang_name = language_code_to_name(self.target_language);
        let vocabulary = vocabulary_block(self.vocabulary, "(none)");
        let GroupPrompt {
            summary,
            previous,
            block,
            following,
            window,
            ..
        } = *self;

        format!(
            r#"You are a professional subtitle translator working on dialogue attributed to named speakers. Background on this content:
{summary}

Custom vocabulary (use these renderings exactly):
{vocabulary}

Requirements:
1. Translate only the "Group to translate" section into {lang_name}.
2. Keep the tone and style of the original while reading naturally in {lang_name}.
3. Return only the translation, with nothing added.
4. The surrounding context is for reference only; do not translate it.
5. Connect smoothly with the previous text and leave room for what follows.
6. Keep similar-looking names distinct and always translate names.

Previously translated text (up to {window} groups):
{previous}

Group to translate:
{block}

Upcoming untranslated text (up to {window} groups):
{following}

Return only the translation of the group to translate."#
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_prefix_respects_boundaries() {
        assert_eq!(char_prefix("奥利安说话", 3), "奥利安");
        assert_eq!(char_prefix("short", 100), "short");
        assert_eq!(char_prefix("", 5), "");
    }

    #[test]
    fn test_analysis_prompt_contents() {
        let vocab = vec!["灰颅堡 Grayskull Keep".to_string()];
        let prompt = analysis_prompt("MATT: Welcome back.", &vocab, "zh");
        assert!(prompt.contains("Simplified Chinese"));
        assert!(prompt.contains("灰颅堡 Grayskull Keep"));
        assert!(prompt.contains("MATT: Welcome back."));
    }

    #[test]
    fn test_analysis_prompt_without_vocabulary() {
        let prompt = analysis_prompt("text", &[], "fr");
        assert!(!prompt.contains("Custom vocabulary"));
        assert!(prompt.contains("French"));
    }

    #[test]
    fn test_group_prompt_render() {
        let prompt = GroupPrompt {
            summary: "A tabletop game session.",
            vocabulary: &[],
            target_language: "ja",
            previous: "前の文",
            block: "ORION: Can we use the word liaison?",
            following: "MATT: Sure.",
            window: 5,
        }
        .render();

        assert!(prompt.contains("A tabletop game session."));
        assert!(prompt.contains("(none)"));
        assert!(prompt.contains("Japanese"));
        assert!(prompt.contains("Group to translate:\nORION: Can we use the word liaison?"));
        assert!(prompt.contains("前の文"));
        assert!(prompt.contains("MATT: Sure."));
        assert!(prompt.contains("up to 5 groups"));
    }
}
