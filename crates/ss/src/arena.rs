//! A stable-index arena of [`Sentence`]s, per spec.md §9's redesign flag:
//! sentences live at a fixed [`SentenceId`] for as long as they exist, so a
//! splice that reorders the document never invalidates another session's
//! lock on an unrelated sentence.

use std::collections::HashMap;

use crate::sentence::Sentence;

/// A stable handle to one arena slot. Never reused for a different
/// sentence while any session still references it; freed slots are only
/// reclaimed for brand new sentences.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SentenceId(usize);

/// The arena: a growable slot vector plus a freelist of vacated slots.
#[derive(Default)]
pub struct SentenceArena {
    slots: Vec<Option<Sentence>>,
    freelist: Vec<usize>,
}

impl SentenceArena {
    /// Allocates a new slot for `sentence`, reusing a freed slot if one is
    /// available.
    pub fn alloc(&mut self, sentence: Sentence) -> SentenceId {
        if let Some(index) = self.freelist.pop() {
            self.slots[index] = Some(sentence);
            SentenceId(index)
        } else {
            self.slots.push(Some(sentence));
            SentenceId(self.slots.len() - 1)
        }
    }

    /// Borrows the sentence at `id`, if it still holds one.
    #[must_use]
    pub fn get(&self, id: SentenceId) -> Option<&Sentence> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    /// Mutably borrows the sentence at `id`.
    pub fn get_mut(&mut self, id: SentenceId) -> Option<&mut Sentence> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Frees the slot at `id`, making it eligible for reuse by a future
    /// [`Self::alloc`].
    pub fn free(&mut self, id: SentenceId) {
        if id.0 < self.slots.len() {
            self.slots[id.0] = None;
            self.freelist.push(id.0);
        }
    }
}

/// A map keyed by [`SentenceId`], used for the per-sentence lock table.
pub type SentenceMap<V> = HashMap<SentenceId, V>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sentence::Sentence;

    fn s(word: &str) -> Sentence {
        Sentence {
            words: vec![word.to_string()],
            delimiter: None,
        }
    }

    #[test]
    fn alloc_returns_distinct_ids() {
        let mut arena = SentenceArena::default();
        let a = arena.alloc(s("a"));
        let b = arena.alloc(s("b"));
        assert_ne!(a, b);
        assert_eq!(arena.get(a).unwrap().words[0], "a");
        assert_eq!(arena.get(b).unwrap().words[0], "b");
    }

    #[test]
    fn free_then_alloc_reuses_slot_without_aliasing_old_id() {
        let mut arena = SentenceArena::default();
        let a = arena.alloc(s("a"));
        arena.free(a);
        let b = arena.alloc(s("b"));
        assert_eq!(arena.get(a), None);
        assert_eq!(arena.get(b).unwrap().words[0], "b");
    }
}
