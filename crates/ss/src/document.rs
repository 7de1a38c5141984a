//! A document: the arena of sentences plus the order they currently appear
//! in. Order is free to change on every commit; [`crate::arena::SentenceId`]
//! never does, which is what lets a lock held on one sentence survive a
//! splice elsewhere in the file.

use crate::arena::{SentenceArena, SentenceId};
use crate::sentence::{self, Sentence, Stats};

/// The live structure of one file: content plus derived stats, guarded
/// together as the storage server's `SLOCK`.
pub struct Document {
    arena: SentenceArena,
    order: Vec<SentenceId>,
    stats: Stats,
}

impl Document {
    /// Parses `content` into a fresh document.
    #[must_use]
    pub fn from_content(content: &str) -> Self {
        Self::from_sentences(sentence::parse(content))
    }

    /// Builds a document directly from already-parsed sentences.
    #[must_use]
    pub fn from_sentences(sentences: Vec<Sentence>) -> Self {
        let mut arena = SentenceArena::default();
        let order: Vec<SentenceId> = sentences.into_iter().map(|s| arena.alloc(s)).collect();
        let stats = sentence::compute_stats(&Self::materialize(&arena, &order));
        Self { arena, order, stats }
    }

    fn materialize(arena: &SentenceArena, order: &[SentenceId]) -> Vec<Sentence> {
        order
            .iter()
            .map(|id| arena.get(*id).cloned().unwrap_or_default())
            .collect()
    }

    /// Number of sentences currently in the document.
    #[must_use]
    pub fn sentence_count(&self) -> usize {
        self.order.len()
    }

    /// The stable id of the sentence at position `index`, if in range.
    #[must_use]
    pub fn sentence_id_at(&self, index: usize) -> Option<SentenceId> {
        self.order.get(index).copied()
    }

    /// Borrows the sentence at position `index`.
    #[must_use]
    pub fn sentence_at(&self, index: usize) -> Option<&Sentence> {
        self.sentence_id_at(index).and_then(|id| self.arena.get(id))
    }

    /// Borrows a sentence by its stable id directly.
    #[must_use]
    pub fn sentence_by_id(&self, id: SentenceId) -> Option<&Sentence> {
        self.arena.get(id)
    }

    /// Finds the current position of `id` in the order, if it is still
    /// part of the document. A lock holder must re-resolve position this
    /// way at commit time rather than trusting the position it observed at
    /// `WRITE_LOCK` time, since an unrelated commit earlier in the document
    /// may have spliced in new sentences since then.
    #[must_use]
    pub fn position_of(&self, id: SentenceId) -> Option<usize> {
        self.order.iter().position(|&candidate| candidate == id)
    }

    /// Renders the document's canonical text as it would read after
    /// splicing `first`/`rest` in at `position`, without mutating the
    /// document. Used by a commit to size-check a candidate edit before
    /// applying it.
    #[must_use]
    pub fn preview_splice(&self, position: usize, first: &Sentence, rest: &[Sentence]) -> Option<String> {
        if position >= self.order.len() {
            return None;
        }
        let mut sentences = self.materialized();
        sentences[position] = first.clone();
        for (offset, sentence) in rest.iter().cloned().enumerate() {
            sentences.insert(position + 1 + offset, sentence);
        }
        Some(sentence::rebuild(&sentences))
    }

    /// Replaces the sentence at `position` with `first`, then splices `rest`
    /// in as brand-new sentences immediately after it. This is the one
    /// structural mutation `ETIRW` performs: `first` keeps the position's
    /// stable id (so another session already holding its lock still
    /// addresses the same sentence), while `rest` gets freshly allocated
    /// ids.
    ///
    /// Returns `false` if `position` is out of range.
    pub fn splice(&mut self, position: usize, first: Sentence, rest: Vec<Sentence>) -> bool {
        let Some(id) = self.sentence_id_at(position) else {
            return false;
        };
        if let Some(slot) = self.arena.get_mut(id) {
            *slot = first;
        }
        let new_ids: Vec<SentenceId> = rest.into_iter().map(|s| self.arena.alloc(s)).collect();
        for (offset, new_id) in new_ids.into_iter().enumerate() {
            self.order.insert(position + 1 + offset, new_id);
        }
        self.refresh_stats();
        true
    }

    /// Recomputes [`Stats`] from the current sentence order.
    pub fn refresh_stats(&mut self) {
        self.stats = sentence::compute_stats(&self.materialized());
    }

    /// Current derived statistics.
    #[must_use]
    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// Renders the document's canonical text form.
    #[must_use]
    pub fn render(&self) -> String {
        sentence::rebuild(&self.materialized())
    }

    fn materialized(&self) -> Vec<Sentence> {
        Self::materialize(&self.arena, &self.order)
    }

    /// Replaces the entire document with freshly parsed `content`, as
    /// `UNDO`/`REVERT` do. Every previous [`SentenceId`] is invalidated;
    /// callers must have already released any lock held against this
    /// document before calling this.
    pub fn replace_all(&mut self, content: &str) {
        *self = Self::from_content(content);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splice_keeps_first_sentence_id_stable() {
        let mut doc = Document::from_content("One. Two.");
        let id_before = doc.sentence_id_at(0).unwrap();
        let rest = vec![sentence::parse("New part.").remove(0)];
        doc.splice(0, sentence::parse("Edited.").remove(0), rest);
        assert_eq!(doc.sentence_id_at(0), Some(id_before));
        assert_eq!(doc.sentence_count(), 3);
    }

    #[test]
    fn preview_splice_does_not_mutate_the_document() {
        let doc = Document::from_content("One. Two.");
        let rest = vec![sentence::parse("New part.").remove(0)];
        let preview = doc
            .preview_splice(0, &sentence::parse("Edited.").remove(0), &rest)
            .unwrap();
        assert_eq!(preview, "Edited. New part. Two.");
        assert_eq!(doc.render(), "One. Two.");
    }

    #[test]
    fn render_round_trips_through_parse() {
        let doc = Document::from_content("Alpha beta. Gamma!");
        assert_eq!(doc.render(), "Alpha beta. Gamma!");
    }

    #[test]
    fn stats_refresh_after_splice() {
        let mut doc = Document::from_content("One.");
        doc.splice(0, sentence::parse("One two three.").remove(0), vec![]);
        assert_eq!(doc.stats().word_count, 3);
    }

    #[test]
    fn replace_all_resets_content_and_ids() {
        let mut doc = Document::from_content("Old.");
        doc.replace_all("Brand new text.");
        assert_eq!(doc.render(), "Brand new text.");
        assert_eq!(doc.sentence_count(), 1);
    }
}
