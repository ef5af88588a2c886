// SRT subtitle codec
use super::Subtitle;
use regex::Regex;
use std::sync::OnceLock;

fn block_header() -> &'static Regex {
    static HEADER: OnceLock<Regex> = OnceLock::new();
    HEADER.get_or_init(|| {
        Regex::new(r"(\d+)\n(\d{2}:\d{2}:\d{2},\d{3}) --> (\d{2}:\d{2}:\d{2},\d{3})\n")
            .expect("Invalid regex")
    })
}

/// Parse raw SRT content into subtitles, in file order.
///
/// Line endings are normalised first. Each block is an index line, a
/// `start --> end` line and text running up to the next blank line or the end
/// of input. Anything that does not match that shape is skipped, so malformed
/// input yields fewer (possibly zero) subtitles rather than an error.
pub fn parse_srt(content: &str) -> Vec<Subtitle> {
    let content = content
        .trim_start_matches('\u{feff}')
        .replace("\r\n", "\n")
        .replace('\r', "\n");
    let header = block_header();

    let mut subtitles = Vec::new();
    let mut pos = 0;

    while let Some(caps) = header.captures_at(&content, pos) {
        let Some(whole) = caps.get(0) else { break };
        let text_start = whole.end();
        let rest = &content[text_start..];

        let text_end = if rest.starts_with('\n') {
            text_start
        } else {
            rest.find("\n\n")
                .map(|p| text_start + p)
                .unwrap_or(content.len())
        };

        subtitles.push(Subtitle {
            index: caps[1].to_string(),
            start: caps[2].to_string(),
            end: caps[3].to_string(),
            text: content[text_start..text_end].trim().to_string(),
        });

        pos = text_end.max(text_start);
    }

    subtitles
}

/// Serialize subtitles paired with their replacement text.
///
/// Index and timestamps come from the subtitle untouched; only the text is
/// swapped. The output is standard SRT and parses back with [`parse_srt`].
pub fn serialize_srt<'a, I>(pairs: I) -> String
where
    I: IntoIterator<Item = (&'a Subtitle, &'a str)>,
{
    pairs
        .into_iter()
        .map(|(subtitle, text)| {
            format!(
                "{}\n{} --> {}\n{}\n\n",
                subtitle.index, subtitle.start, subtitle.end, text
            )
        })
        .collect()
}
