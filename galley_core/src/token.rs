//! Splits text into the units the diff engine aligns.
//!
//! Plain text is segmented on Unicode word or sentence boundaries, with
//! trailing whitespace folded into the preceding unit so that concatenating
//! all token texts reproduces the input byte for byte. Protected spans are
//! emitted as single tokens holding exactly the span text.

use unicode_segmentation::UnicodeSegmentation;

use galley_api::SpanKind;

use crate::span;

/// One diff unit: a plain chunk or a protected span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Exact text of the unit, including any trailing whitespace for
    /// plain chunks.
    pub text: String,
    /// Set when the unit is a protected span.
    pub protected: Option<SpanKind>,
}

impl Token {
    /// A plain text unit.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            protected: None,
        }
    }

    /// Whether this unit is a protected span.
    pub const fn is_protected(&self) -> bool {
        self.protected.is_some()
    }
}

/// Segmentation level for plain text between protected spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Granularity {
    /// Word-level units; the usual choice for prose.
    #[default]
    Word,
    /// Sentence-level units; coarser and much faster on large documents.
    Sentence,
}

/// Tokenize `text`, keeping every protected span atomic.
pub fn tokenize(text: &str, granularity: Granularity) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut cursor = 0;
    for span in span::tag(text) {
        if span.start > cursor {
            push_plain(&text[cursor..span.start], granularity, &mut tokens);
        }
        cursor = span.end;
        tokens.push(Token {
            text: span.text,
            protected: Some(span.kind),
        });
    }
    if cursor < text.len() {
        push_plain(&text[cursor..], granularity, &mut tokens);
    }
    tokens
}

/// Tokenize a plain segment. Whitespace never begins a unit except at the
/// start of a segment, so `" a  b "` becomes `[" ", "a  ", "b "]`.
fn push_plain(segment: &str, granularity: Granularity, out: &mut Vec<Token>) {
    match granularity {
        Granularity::Word => {
            let mut segment_tokens = 0usize;
            for piece in segment.split_word_bounds() {
                let is_whitespace = piece.chars().all(char::is_whitespace);
                match out.last_mut() {
                    Some(last) if is_whitespace && segment_tokens > 0 => {
                        last.text.push_str(piece);
                    }
                    _ => {
                        out.push(Token::plain(piece));
                        segment_tokens += 1;
                    }
                }
            }
        }
        Granularity::Sentence => {
            for piece in segment.split_sentence_bounds() {
                out.push(Token::plain(piece));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().map(|token| token.text.as_str()).collect()
    }

    fn joined(tokens: &[Token]) -> String {
        tokens.iter().map(|token| token.text.as_str()).collect()
    }

    #[test]
    fn whitespace_attaches_to_the_preceding_word() {
        let tokens = tokenize("The quick  fox", Granularity::Word);
        assert_eq!(texts(&tokens), vec!["The ", "quick  ", "fox"]);
    }

    #[test]
    fn protected_spans_are_single_tokens() {
        let tokens = tokenize("see [@doe2021] now", Granularity::Word);
        assert_eq!(texts(&tokens), vec!["see ", "[@doe2021]", " ", "now"]);
        assert_eq!(tokens[1].protected, Some(SpanKind::Citation));
        assert!(!tokens[0].is_protected());
    }

    #[test]
    fn concatenation_reproduces_the_input() {
        let samples = [
            "",
            "plain words only",
            "  leading and trailing  ",
            "math $a+b$ inside [@cite] text {#fig:x} and @fig:x.\n\nNew paragraph.",
            "unicode: naïve café — résumé",
            "windows\r\nline endings\r\n",
        ];
        for sample in samples {
            for granularity in [Granularity::Word, Granularity::Sentence] {
                let tokens = tokenize(sample, granularity);
                assert_eq!(joined(&tokens), sample);
            }
        }
    }

    #[test]
    fn sentence_granularity_splits_on_sentence_bounds() {
        let tokens = tokenize("One done. Two done. Three.", Granularity::Sentence);
        assert_eq!(texts(&tokens), vec!["One done. ", "Two done. ", "Three."]);
    }

    #[test]
    fn whitespace_after_a_protected_span_starts_a_new_token() {
        let tokens = tokenize("$x$ follows", Granularity::Word);
        assert_eq!(texts(&tokens), vec!["$x$", " ", "follows"]);
        assert!(tokens[0].is_protected());
        assert!(!tokens[1].is_protected());
    }

    #[test]
    fn empty_input_yields_no_tokens() {
        assert!(tokenize("", Granularity::Word).is_empty());
    }
}
