//! The staged-edit buffer a `WRITE_LOCK` session edits before `ETIRW`
//! commits it, per spec.md §4.7.

use common::DocError;

use crate::sentence::{self, Sentence};

/// A draft is a flat, word-index-addressable token list cloned from the
/// live sentence at lock time, plus that sentence's own trailing delimiter
/// held separately. Ordinary inserts (no punctuation in the inserted
/// content) only ever touch the word list, so the draft stays one sentence
/// ending on its original delimiter; an insert whose content itself carries
/// sentence punctuation (`"end."`) re-derives the split on commit by
/// re-parsing the joined tokens, naturally producing more than one sentence.
/// `delim_marker` tracks where the original delimiter sits relative to the
/// tokens inserted since: it is the token index the delimiter immediately
/// precedes, so it only shifts when tokens are spliced in strictly before it.
#[derive(Clone, Debug)]
pub struct Draft {
    tokens: Vec<String>,
    delimiter: Option<char>,
    delim_marker: usize,
    needs_resplit: bool,
}

impl Draft {
    /// Clones the live sentence's words and delimiter into a fresh draft.
    #[must_use]
    pub fn from_sentence(sentence: &Sentence) -> Self {
        Self {
            tokens: sentence.words.clone(),
            delimiter: sentence.delimiter,
            delim_marker: sentence.words.len(),
            needs_resplit: false,
        }
    }

    /// Number of tokens currently in the draft; the valid range for an
    /// insertion's `word_index` is `0..=len()`.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether the draft currently holds no tokens.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Tokenizes `content` on whitespace and splices it into the draft at
    /// `word_index`.
    ///
    /// # Errors
    ///
    /// Returns [`common::ErrorCode::InvalidSentence`] if `word_index` is
    /// past the end of the draft.
    pub fn insert(&mut self, word_index: usize, content: &str) -> Result<(), DocError> {
        if word_index > self.tokens.len() {
            return Err(DocError::new(
                common::ErrorCode::InvalidSentence,
                format!("word index {word_index} out of range"),
            ));
        }
        if sentence::contains_delimiter(content) {
            self.needs_resplit = true;
        }
        let new_tokens: Vec<String> = content.split_whitespace().map(str::to_string).collect();
        if word_index < self.delim_marker {
            self.delim_marker += new_tokens.len();
        }
        self.tokens.splice(word_index..word_index, new_tokens);
        Ok(())
    }

    /// Produces the draft's sentence(s), ready for `ETIRW` to splice into
    /// the document. So long as every insert stayed delimiter-free, the
    /// draft is still exactly the one sentence it started as — its word
    /// list plus its original delimiter. Only once an insert has introduced
    /// punctuation of its own does this re-split: the original delimiter is
    /// placed back at `delim_marker`, right before whatever was inserted at
    /// or after it, and the whole text is re-parsed per spec.md §4.6's rules.
    #[must_use]
    pub fn to_sentences(&self) -> Vec<Sentence> {
        if !self.needs_resplit {
            return vec![Sentence {
                words: self.tokens.clone(),
                delimiter: self.delimiter,
            }];
        }
        let marker = self.delim_marker.min(self.tokens.len());
        let mut text = self.tokens[..marker].join(" ");
        if let Some(delim) = self.delimiter {
            text.push(delim);
        }
        if marker < self.tokens.len() {
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(&self.tokens[marker..].join(" "));
        }
        sentence::parse(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sentence(text: &str) -> Sentence {
        sentence::parse(text).remove(0)
    }

    #[test]
    fn from_sentence_keeps_delimiter_separate_from_tokens() {
        let draft = Draft::from_sentence(&sentence("Hello world."));
        assert_eq!(draft.len(), 2);
        assert_eq!(draft.delimiter, Some('.'));
    }

    #[test]
    fn appending_delimiter_free_word_keeps_single_sentence() {
        let mut draft = Draft::from_sentence(&sentence("Hello world."));
        draft.insert(2, "there").unwrap();
        let sentences = draft.to_sentences();
        assert_eq!(sentences.len(), 1);
        assert_eq!(sentences[0].words, vec!["Hello", "world", "there"]);
        assert_eq!(sentences[0].delimiter, Some('.'));
    }

    #[test]
    fn insert_splices_tokens_at_index() {
        let mut draft = Draft::from_sentence(&sentence("Hello world."));
        draft.insert(1, "brave new").unwrap();
        assert_eq!(draft.to_sentences()[0].words, vec!["Hello", "brave", "new", "world"]);
    }

    #[test]
    fn insert_out_of_range_is_invalid_sentence() {
        let mut draft = Draft::from_sentence(&sentence("Hi."));
        let err = draft.insert(10, "oops").unwrap_err();
        assert_eq!(err.code(), common::ErrorCode::InvalidSentence);
    }

    #[test]
    fn inserting_delimiter_bearing_token_resplits_into_sentences() {
        let mut draft = Draft::from_sentence(&sentence("Hello world."));
        draft.insert(2, "Next.").unwrap();
        let sentences = draft.to_sentences();
        // "Next." ends on a delimiter, so the canonical parse appends an
        // empty trailing sentence per spec.md §4.6 rule 4.
        assert_eq!(sentences.len(), 3);
        assert_eq!(sentences[0].words, vec!["Hello", "world"]);
        assert_eq!(sentences[1].words, vec!["Next"]);
        assert!(sentences[2].words.is_empty());
    }
}
