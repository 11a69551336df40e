//! Sentence segmentation used by the risk scorer.
//!
//! Boundaries follow Unicode Standard Annex #29 (sentence boundaries) as
//! implemented by `unicode-segmentation`. Each segment is trimmed of
//! surrounding whitespace and whitespace-only segments are dropped. The
//! segmentation is part of the scoring contract: changing it changes scores.

use unicode_segmentation::UnicodeSegmentation;

use super::Span;

/// A sentence borrowed from the source text together with its byte span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sentence<'a> {
    pub text: &'a str,
    pub span: Span,
}

/// Split `text` into trimmed, non-empty sentences in document order.
pub fn split_sentences(text: &str) -> Vec<Sentence<'_>> {
    text.split_sentence_bound_indices()
        .filter_map(|(offset, segment)| {
            let trimmed_start = segment.trim_start();
            let leading = segment.len() - trimmed_start.len();
            let trimmed = trimmed_start.trim_end();
            if trimmed.is_empty() {
                return None;
            }
            let start = offset + leading;
            Some(Sentence {
                text: trimmed,
                span: (start, start + trimmed.len()),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(input: &str) -> Vec<&str> {
        split_sentences(input).into_iter().map(|s| s.text).collect()
    }

    #[test]
    fn empty_and_blank_input_have_no_sentences() {
        assert!(split_sentences("").is_empty());
        assert!(split_sentences("   \n\t  ").is_empty());
    }

    #[test]
    fn splits_on_terminal_punctuation() {
        assert_eq!(
            texts("The term is one year. Either party may renew! Is notice required?"),
            vec![
                "The term is one year.",
                "Either party may renew!",
                "Is notice required?"
            ]
        );
    }

    #[test]
    fn line_breaks_end_sentences() {
        assert_eq!(
            texts("Section 1 Definitions\nSection 2 Payment terms"),
            vec!["Section 1 Definitions", "Section 2 Payment terms"]
        );
    }

    #[test]
    fn lowercase_continuation_does_not_split() {
        assert_eq!(
            texts("Fees apply, e.g. late fees. Nothing else."),
            vec!["Fees apply, e.g. late fees.", "Nothing else."]
        );
    }

    #[test]
    fn spans_point_back_into_source() {
        let input = "  First clause.   Second clause.  ";
        for sentence in split_sentences(input) {
            assert_eq!(&input[sentence.span.0..sentence.span.1], sentence.text);
        }
    }
}
