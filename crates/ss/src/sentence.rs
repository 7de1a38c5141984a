//! Sentence/word parsing and canonical serialization, per spec.md §4.6.
//!
//! A file's content is modeled as an ordered list of sentences, each an
//! ordered list of words plus an optional trailing delimiter. [`parse`] and
//! [`rebuild`] are inverses up to whitespace canonicalization: re-parsing a
//! rebuilt string always yields the same sentence structure, but a rebuilt
//! string may differ byte-for-byte from whatever was first written (single
//! spaces replace whatever whitespace run separated two words).

/// Sentence-ending punctuation recognized by [`parse`].
const DELIMITERS: [char; 3] = ['.', '!', '?'];

fn is_delimiter(ch: char) -> bool {
    DELIMITERS.contains(&ch)
}

/// One sentence: an ordered word list and the punctuation that ended it, if
/// any (the last sentence in a file need not have one).
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Sentence {
    /// Words in this sentence, in order.
    pub words: Vec<String>,
    /// The delimiter this sentence ended with, if present.
    pub delimiter: Option<char>,
}

/// Derived, recomputable statistics about a parsed document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Stats {
    /// Canonical byte size of [`rebuild`]'s output.
    pub size: u64,
    /// Total word count across every sentence.
    pub word_count: u64,
    /// Character count; always equal to `size`.
    pub char_count: u64,
}

/// Recomputes [`Stats`] for a sentence list, as `stats_refresh` does after
/// every commit.
#[must_use]
pub fn compute_stats(sentences: &[Sentence]) -> Stats {
    let size = rebuild(sentences).len() as u64;
    let word_count = sentences.iter().map(|s| s.words.len() as u64).sum();
    Stats {
        size,
        word_count,
        char_count: size,
    }
}

/// Parses raw file content into sentences.
///
/// Inter-sentence whitespace (the run right after a delimiter) is skipped;
/// a trailing empty sentence is appended if the content ends on a
/// delimiter; empty content yields one empty sentence rather than zero.
#[must_use]
pub fn parse(content: &str) -> Vec<Sentence> {
    let mut sentences = Vec::new();
    let mut current = String::new();

    for ch in content.chars() {
        if ch.is_whitespace() && current.is_empty() {
            continue;
        }
        if is_delimiter(ch) {
            sentences.push(sentence_from(&current, Some(ch)));
            current.clear();
        } else {
            current.push(ch);
        }
    }

    let last_had_delimiter = sentences.last().is_some_and(|s| s.delimiter.is_some());
    if !current.trim().is_empty() {
        sentences.push(sentence_from(&current, None));
    } else if last_had_delimiter {
        sentences.push(Sentence::default());
    }

    if sentences.is_empty() {
        sentences.push(Sentence::default());
    }
    sentences
}

/// Whether `text` contains any sentence-ending punctuation, as recognized
/// by [`parse`]. Used by a draft to decide whether inserted content can
/// change its sentence count.
#[must_use]
pub fn contains_delimiter(text: &str) -> bool {
    text.chars().any(is_delimiter)
}

fn sentence_from(raw: &str, delimiter: Option<char>) -> Sentence {
    Sentence {
        words: raw.split_whitespace().map(str::to_string).collect(),
        delimiter,
    }
}

/// Rebuilds canonical text from sentences: words joined by single spaces,
/// sentences joined by a single space, each sentence's delimiter appended.
///
/// A sentence with no words and no delimiter contributes nothing, including
/// no separating space — this is what keeps the trailing empty sentence
/// [`parse`] appends after a final delimiter invisible on round-trip.
#[must_use]
pub fn rebuild(sentences: &[Sentence]) -> String {
    let mut out = String::new();
    for sentence in sentences {
        if sentence.words.is_empty() && sentence.delimiter.is_none() {
            continue;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(&sentence.words.join(" "));
        if let Some(delim) = sentence.delimiter {
            out.push(delim);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_two_sentences() {
        let sentences = parse("Hello world. Goodbye now!");
        assert_eq!(
            sentences,
            vec![
                Sentence {
                    words: vec!["Hello".into(), "world".into()],
                    delimiter: Some('.'),
                },
                Sentence {
                    words: vec!["Goodbye".into(), "now".into()],
                    delimiter: Some('!'),
                },
            ]
        );
    }

    #[test]
    fn trailing_delimiter_appends_empty_sentence() {
        let sentences = parse("Done.");
        assert_eq!(sentences.len(), 2);
        assert!(sentences[1].words.is_empty());
        assert_eq!(sentences[1].delimiter, None);
    }

    #[test]
    fn empty_content_yields_one_empty_sentence() {
        assert_eq!(parse(""), vec![Sentence::default()]);
    }

    #[test]
    fn sentence_with_no_terminal_delimiter() {
        let sentences = parse("just words here");
        assert_eq!(sentences.len(), 1);
        assert_eq!(sentences[0].delimiter, None);
        assert_eq!(sentences[0].words.len(), 3);
    }

    #[test]
    fn rebuild_then_reparse_is_stable() {
        let original = parse("One. Two two! Three");
        let text = rebuild(&original);
        let reparsed = parse(&text);
        assert_eq!(original, reparsed);
    }

    #[test]
    fn compute_stats_matches_size_and_chars() {
        let sentences = parse("A b c.");
        let stats = compute_stats(&sentences);
        assert_eq!(stats.size, stats.char_count);
        assert_eq!(stats.word_count, 3);
    }
}
