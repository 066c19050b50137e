// Text Processing Service
// Pure text operations: fragment refinement, token windows, rule-based splitting

use regex::Regex;
use std::sync::OnceLock;
use tracing::warn;

/// Normalize a raw note before segmentation: smart quotes become ASCII,
/// non-breaking and ideographic spaces become regular spaces, and line endings
/// become `\n`. Runs of spaces are left untouched — the double-space split in
/// [`refine_fragments`] depends on them.
pub fn normalize_note(text: &str) -> String {
    static SPACE_RE: OnceLock<Regex> = OnceLock::new();
    let space_re = SPACE_RE.get_or_init(|| Regex::new(r"[\u{00A0}\u{3000}]").unwrap());

    let s = text
        .replace('\u{201c}', "\"")
        .replace('\u{201d}', "\"")
        .replace('\u{2018}', "'")
        .replace('\u{2019}', "'")
        .replace("\r\n", "\n")
        .replace('\r', "\n");

    space_re.replace_all(&s, " ").trim().to_string()
}

/// Split a fragment into whitespace-delimited word tokens.
pub fn word_tokens(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}

/// Re-express a long token sequence as fixed-size windows, re-joined with
/// single spaces. Produces `ceil(len / token_length)` chunks in order; every
/// chunk holds at most `token_length` tokens and only the last may be shorter.
///
/// A structurally impossible request (zero-width window) is logged and yields
/// an empty vec — callers treat that as "no chunks produced", not as an error.
pub fn divide_tokens(tokens: &[&str], token_length: usize) -> Vec<String> {
    if token_length == 0 {
        warn!(
            tokens = tokens.len(),
            "divide_tokens called with zero window size, dropping fragment"
        );
        return vec![];
    }

    let total = tokens.len();
    let mut chunks = Vec::with_capacity(total.div_ceil(token_length));

    let mut i = 0;
    while i < total {
        if i + token_length < total {
            chunks.push(tokens[i..i + token_length].join(" "));
        } else {
            // Tail window, possibly shorter; always the last chunk emitted.
            chunks.push(tokens[i..].join(" "));
        }
        i += token_length;
    }

    chunks
}

/// Refine segmenter output into cleaned sentence fragments: each sentence is
/// additionally split on a literal double space, trimmed, and empties are
/// dropped. Relative (sentence, sub-fragment) order is preserved.
///
/// The extra double-space split exists because dictated clinical text often
/// separates clauses with runs of whitespace instead of punctuation, which the
/// upstream segmenter does not treat as a boundary.
pub fn refine_fragments<I, S>(sentences: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut fragments = Vec::new();
    for sentence in sentences {
        for piece in sentence.as_ref().split("  ") {
            let piece = piece.trim();
            if piece.is_empty() {
                continue;
            }
            fragments.push(piece.to_string());
        }
    }
    fragments
}

/// Local rule-based sentence splitting, used when the segmenter service is
/// unreachable. Splits on terminal punctuation, keeping decimal numbers and
/// quoted spans intact.
pub fn split_sentences(text: &str) -> Vec<String> {
    if text.is_empty() {
        return vec![];
    }

    let chars: Vec<char> = text.chars().collect();
    let mut sentences = Vec::new();
    let mut buffer = String::new();
    let mut in_quote = false;
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        buffer.push(ch);

        if ch == '"' {
            in_quote = !in_quote;
        }

        if ['.', '!', '?'].contains(&ch) && !in_quote {
            // A dot between digits is a decimal, not a boundary.
            let is_decimal = ch == '.'
                && i > 0
                && i + 1 < chars.len()
                && chars[i - 1].is_ascii_digit()
                && chars[i + 1].is_ascii_digit();

            if !is_decimal {
                let sentence = buffer.trim().to_string();
                if !sentence.is_empty() {
                    sentences.push(sentence);
                }
                buffer.clear();
            }
        }

        i += 1;
    }

    let remaining = buffer.trim().to_string();
    if !remaining.is_empty() {
        sentences.push(remaining);
    }

    sentences
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_divide_exact_multiple() {
        let tokens: Vec<String> = (0..700).map(|i| format!("w{}", i)).collect();
        let refs: Vec<&str> = tokens.iter().map(|s| s.as_str()).collect();

        let chunks = divide_tokens(&refs, 350);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].split_whitespace().count(), 350);
        assert_eq!(chunks[1].split_whitespace().count(), 350);
    }

    #[test]
    fn test_divide_with_remainder() {
        let tokens: Vec<String> = (0..751).map(|i| format!("w{}", i)).collect();
        let refs: Vec<&str> = tokens.iter().map(|s| s.as_str()).collect();

        let chunks = divide_tokens(&refs, 350);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].split_whitespace().count(), 51);
    }

    #[test]
    fn test_divide_chunk_count_is_ceil() {
        for (len, window, expected) in [(1usize, 4usize, 1usize), (4, 4, 1), (5, 4, 2), (12, 5, 3)] {
            let tokens: Vec<String> = (0..len).map(|i| i.to_string()).collect();
            let refs: Vec<&str> = tokens.iter().map(|s| s.as_str()).collect();
            assert_eq!(divide_tokens(&refs, window).len(), expected);
        }
    }

    #[test]
    fn test_divide_preserves_token_order() {
        let tokens: Vec<String> = (0..23).map(|i| i.to_string()).collect();
        let refs: Vec<&str> = tokens.iter().map(|s| s.as_str()).collect();

        let chunks = divide_tokens(&refs, 5);
        let rejoined: Vec<String> = chunks
            .iter()
            .flat_map(|c| c.split_whitespace().map(|t| t.to_string()))
            .collect();
        assert_eq!(rejoined, tokens);
    }

    #[test]
    fn test_divide_zero_window_is_empty() {
        assert!(divide_tokens(&["a", "b"], 0).is_empty());
    }

    #[test]
    fn test_refine_splits_on_double_space() {
        let fragments = refine_fragments(["Patient smokes daily.  Patient denies alcohol use."]);
        assert_eq!(
            fragments,
            vec!["Patient smokes daily.", "Patient denies alcohol use."]
        );
    }

    #[test]
    fn test_refine_drops_empty_fragments() {
        let fragments = refine_fragments(["   ", "", "  \t "]);
        assert!(fragments.is_empty());
    }

    #[test]
    fn test_refine_trims_and_keeps_order() {
        let fragments = refine_fragments(["  first.  second. ", "third."]);
        assert_eq!(fragments, vec!["first.", "second.", "third."]);
    }

    #[test]
    fn test_split_sentences_basic() {
        let sentences = split_sentences("Patient reports pain. Denies fever! Any cough?");
        assert_eq!(
            sentences,
            vec!["Patient reports pain.", "Denies fever!", "Any cough?"]
        );
    }

    #[test]
    fn test_split_sentences_keeps_decimals() {
        let sentences = split_sentences("Temperature was 37.5 today. Stable overnight.");
        assert_eq!(sentences.len(), 2);
        assert!(sentences[0].contains("37.5"));
    }

    #[test]
    fn test_split_sentences_respects_quotes() {
        let sentences = split_sentences("She said \"no pain today.\" and left. Next visit soon.");
        assert_eq!(sentences.len(), 2);
    }

    #[test]
    fn test_split_sentences_empty() {
        assert!(split_sentences("").is_empty());
    }

    #[test]
    fn test_normalize_note_replaces_special_spaces() {
        let input = "Patient\u{00A0}stable.\r\nNo\u{201c}issues\u{201d} noted.";
        let output = normalize_note(input);
        assert_eq!(output, "Patient stable.\nNo\"issues\" noted.");
    }

    #[test]
    fn test_normalize_note_keeps_double_spaces() {
        let output = normalize_note("smokes daily.  denies alcohol.");
        assert!(output.contains("  "));
    }
}
