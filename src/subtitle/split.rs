//! Length-proportional re-splitting of a translated block.
//!
//! A speaker group is translated as one block, so the result has to be cut
//! back into as many pieces as the group had lines. Cut points follow the
//! relative lengths of the source lines and are nudged so that a piece never
//! ends just before closing punctuation and never starts with a separator.
//! All lengths are counted in characters.

/// Punctuation classes used to adjust cut points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitPunctuation {
    /// Characters that stay attached to the end of a piece.
    trailing: Vec<char>,
    /// Characters that must not start a piece.
    leading: Vec<char>,
    /// Separator used when several translated lines are re-joined into one block.
    joiner: String,
}

impl SplitPunctuation {
    pub fn new(trailing: &str, leading: &str, joiner: &str) -> Self {
        Self {
            trailing: trailing.chars().collect(),
            leading: leading.chars().collect(),
            joiner: joiner.to_string(),
        }
    }

    /// Chinese/Japanese sentence tails, including common final particles.
    pub fn cjk() -> Self {
        Self::new("。，.！？的们么了地些；”」』…", "，、 \t\n", "")
    }

    /// Space-separated scripts.
    pub fn latin() -> Self {
        Self::new(".,!?;:…\"')]", " \t\n,;", " ")
    }

    pub fn joiner(&self) -> &str {
        &self.joiner
    }

    /// Pick a preset for a target language code such as `zh`, `zh-TW` or `fr`.
    pub fn for_language(code: &str) -> Self {
        let primary = code
            .split(|c: char| c == '-' || c == '_')
            .next()
            .unwrap_or_default()
            .to_lowercase();
        match primary.as_str() {
            "zh" | "ja" | "chinese" | "japanese" => Self::cjk(),
            _ => Self::latin(),
        }
    }

    fn is_trailing(&self, c: char) -> bool {
        self.trailing.contains(&c)
    }

    fn is_leading(&self, c: char) -> bool {
        self.leading.contains(&c)
    }
}

impl Default for SplitPunctuation {
    fn default() -> Self {
        Self::cjk()
    }
}

/// Target piece lengths for a translated block of `translated_len` characters,
/// proportional to the source line lengths. Every target is at least 1.
pub fn target_lengths(source_lengths: &[usize], translated_len: usize) -> Vec<usize> {
    let total: usize = source_lengths.iter().sum();
    if total == 0 {
        let even = translated_len / source_lengths.len().max(1);
        return vec![even.max(1); source_lengths.len()];
    }

    source_lengths
        .iter()
        .map(|&len| (translated_len * len / total).max(1))
        .collect()
}

/// Cut `text` into `targets.len()` pieces whose lengths approximate `targets`.
///
/// Concatenating the pieces always reproduces `text`. When the text runs out
/// before the last target, the remaining pieces are empty strings.
pub fn proportional_split(
    text: &str,
    targets: &[usize],
    punctuation: &SplitPunctuation,
) -> Vec<String> {
    if targets.len() <= 1 {
        return vec![text.to_string()];
    }

    let chars: Vec<char> = text.chars().collect();
    let n = chars.len();
    let mut pieces = Vec::with_capacity(targets.len());
    let mut start = 0;

    for &len in &targets[..targets.len() - 1] {
        if start >= n {
            pieces.push(String::new());
            continue;
        }

        let mut cut = (start + len).min(n);
        if cut + 1 < n {
            while cut < n && punctuation.is_trailing(chars[cut]) {
                cut += 1;
            }
        }
        // separators go to the end of this piece rather than the start of the next
        while cut < n && punctuation.is_leading(chars[cut]) {
            cut += 1;
        }

        pieces.push(chars[start..cut].iter().collect());
        start = cut;
    }

    pieces.push(chars[start.min(n)..].iter().collect());
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(text: &str, targets: &[usize]) -> Vec<String> {
        proportional_split(text, targets, &SplitPunctuation::cjk())
    }

    #[test]
    fn test_equal_sentences_cut_after_full_stop() {
        let text = "这是第一句话。这是第二句话。这是第三句话。";
        let pieces = split(text, &[6, 6, 6]);
        assert_eq!(pieces, vec!["这是第一句话。", "这是第二句话。", "这是第三句话。"]);
    }

    #[test]
    fn test_uneven_targets_keep_content() {
        let text = "短句。这是一个比较长的句子内容。长句结束。";
        let pieces = split(text, &[3, 12, 4]);
        assert_eq!(pieces.len(), 3);
        assert_eq!(pieces.concat(), text);
        assert_eq!(pieces[0], "短句。");
    }

    #[test]
    fn test_single_target_returns_whole_text() {
        let text = "奥利安：我们能用联络人这个词吗？";
        assert_eq!(split(text, &[15]), vec![text.to_string()]);
        assert_eq!(split(text, &[]), vec![text.to_string()]);
    }

    #[test]
    fn test_exhausted_text_yields_empty_tail() {
        let pieces = split("abc", &[5, 5, 5]);
        assert_eq!(pieces, vec!["abc", "", ""]);
    }

    #[test]
    fn test_separator_not_at_piece_start() {
        let text = "我们走吧，现在就走";
        let pieces = split(text, &[4, 4]);
        assert_eq!(pieces[0], "我们走吧，");
        assert_eq!(pieces[1], "现在就走");
    }

    #[test]
    fn test_completeness_across_targets() {
        let texts = [
            "",
            "a",
            "奥利安：我们能用「联络人」这个词吗？我认为这很合适。你们觉得呢？",
            "Hello there, how are you doing today? Fine, thanks.",
            "，，，、、、",
        ];
        let target_sets: [&[usize]; 5] = [&[1, 1], &[3, 1, 7], &[10, 10, 10, 10], &[1; 8], &[50, 1]];

        for text in texts {
            for targets in target_sets {
                let pieces = split(text, targets);
                assert_eq!(pieces.len(), targets.len(), "{text:?} {targets:?}");
                assert_eq!(pieces.concat(), text, "{text:?} {targets:?}");

                let latin = proportional_split(text, targets, &SplitPunctuation::latin());
                assert_eq!(latin.concat(), text);
                assert_eq!(latin.len(), targets.len());
            }
        }
    }

    #[test]
    fn test_latin_preset_moves_space() {
        let pieces = proportional_split("Hello there friend", &[5, 5], &SplitPunctuation::latin());
        assert_eq!(pieces, vec!["Hello ", "there friend"]);
    }

    #[test]
    fn test_for_language() {
        assert_eq!(SplitPunctuation::for_language("zh"), SplitPunctuation::cjk());
        assert_eq!(SplitPunctuation::for_language("zh-TW"), SplitPunctuation::cjk());
        assert_eq!(SplitPunctuation::for_language("ja"), SplitPunctuation::cjk());
        assert_eq!(SplitPunctuation::for_language("fr"), SplitPunctuation::latin());
        assert_eq!(SplitPunctuation::default(), SplitPunctuation::cjk());
    }

    #[test]
    fn test_target_lengths_proportional() {
        assert_eq!(target_lengths(&[10, 30], 20), vec![5, 15]);
        assert_eq!(target_lengths(&[1, 100], 10), vec![1, 9]);
    }

    #[test]
    fn test_target_lengths_zero_source() {
        assert_eq!(target_lengths(&[0, 0], 10), vec![5, 5]);
        assert_eq!(target_lengths(&[0, 0], 0), vec![1, 1]);
    }
}
