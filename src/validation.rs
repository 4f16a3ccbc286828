//! Partial assignments and the checks that decide whether one is still a legal (part of a) fill.

use crate::grid_config::{Choice, GridConfig};
use crate::types::{SlotId, WordId};

/// A mapping from each slot to its chosen word, or `None` if the slot hasn't been decided yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    words: Vec<Option<WordId>>,
}

impl Assignment {
    /// An assignment with every slot unassigned.
    #[must_use]
    pub fn new(slot_count: usize) -> Assignment {
        Assignment {
            words: vec![None; slot_count],
        }
    }

    #[must_use]
    pub fn from_words(words: Vec<Option<WordId>>) -> Assignment {
        Assignment { words }
    }

    #[must_use]
    pub fn get(&self, slot_id: SlotId) -> Option<WordId> {
        self.words[slot_id]
    }

    pub fn bind(&mut self, slot_id: SlotId, word_id: WordId) {
        self.words[slot_id] = Some(word_id);
    }

    pub fn unbind(&mut self, slot_id: SlotId) {
        self.words[slot_id] = None;
    }

    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.words.len()
    }

    /// Iterate over the slots that have a word, as `(slot_id, word_id)` pairs.
    pub fn assigned(&self) -> impl Iterator<Item = (SlotId, WordId)> + '_ {
        self.words
            .iter()
            .enumerate()
            .filter_map(|(slot_id, word_id)| word_id.map(|word_id| (slot_id, word_id)))
    }

    /// Iterate over the ids of slots that don't have a word yet.
    pub fn unassigned(&self) -> impl Iterator<Item = SlotId> + '_ {
        self.words
            .iter()
            .enumerate()
            .filter(|(_, word_id)| word_id.is_none())
            .map(|(slot_id, _)| slot_id)
    }

    /// True iff every slot has a word.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.words.iter().all(Option::is_some)
    }

    /// The assigned slots as `Choice`s, in slot order.
    #[must_use]
    pub fn choices(&self) -> Vec<Choice> {
        self.assigned()
            .map(|(slot_id, word_id)| Choice { slot_id, word_id })
            .collect()
    }
}

/// Check whether two assigned slots can coexist: they must hold different words, and if they
/// cross, the words must agree in the shared cell.
#[must_use]
pub fn is_compatible(
    config: &GridConfig,
    (x, x_word): (SlotId, WordId),
    (y, y_word): (SlotId, WordId),
) -> bool {
    if x_word == y_word {
        return false;
    }

    match config.overlap(x, y) {
        Some((x_cell, y_cell)) => {
            let x_glyph = config.word_list.get_word(x_word).glyphs.get(x_cell);
            let y_glyph = config.word_list.get_word(y_word).glyphs.get(y_cell);
            x_glyph.is_some() && x_glyph == y_glyph
        }
        None => true,
    }
}

/// Check every pair of distinct assigned slots for duplicate words and crossing conflicts.
/// Unassigned slots impose no constraint.
#[must_use]
pub fn is_consistent(config: &GridConfig, assignment: &Assignment) -> bool {
    let assigned: Vec<(SlotId, WordId)> = assignment.assigned().collect();

    assigned.iter().enumerate().all(|(idx, &x)| {
        assigned[idx + 1..]
            .iter()
            .all(|&y| is_compatible(config, x, y))
    })
}

/// Check only the pairs involving `slot_id`. If the assignment was consistent before `slot_id`
/// was bound, this gives the same answer as `is_consistent`.
#[must_use]
pub fn is_consistent_binding(
    config: &GridConfig,
    assignment: &Assignment,
    slot_id: SlotId,
) -> bool {
    let Some(word_id) = assignment.get(slot_id) else {
        return true;
    };

    assignment
        .assigned()
        .filter(|&(other_slot_id, _)| other_slot_id != slot_id)
        .all(|other| is_compatible(config, (slot_id, word_id), other))
}
