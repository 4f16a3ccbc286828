//! Per-slot candidate lists, plus the unary (length) filter applied to them before propagation.

use log::debug;
use std::ops::Index;

use crate::grid_config::GridConfig;
use crate::types::{SlotId, WordId};

/// The words still considered possible for each slot. Each domain keeps the word list's order and
/// only ever shrinks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainStore {
    domains: Vec<Vec<WordId>>,
}

impl DomainStore {
    /// Give every slot the full vocabulary.
    #[must_use]
    pub fn initialize(config: &GridConfig) -> DomainStore {
        let all_words: Vec<WordId> = (0..config.word_list.len()).collect();

        DomainStore {
            domains: vec![all_words; config.slot_count()],
        }
    }

    /// Build a store from explicit per-slot option lists.
    #[must_use]
    pub fn from_options(domains: Vec<Vec<WordId>>) -> DomainStore {
        DomainStore { domains }
    }

    #[must_use]
    pub fn get(&self, slot_id: SlotId) -> &[WordId] {
        &self.domains[slot_id]
    }

    #[must_use]
    pub fn len(&self, slot_id: SlotId) -> usize {
        self.domains[slot_id].len()
    }

    #[must_use]
    pub fn contains(&self, slot_id: SlotId, word_id: WordId) -> bool {
        self.domains[slot_id].contains(&word_id)
    }

    /// The only remaining word for a slot, if it's down to exactly one.
    #[must_use]
    pub fn single_option(&self, slot_id: SlotId) -> Option<WordId> {
        match self.domains[slot_id].as_slice() {
            &[word_id] => Some(word_id),
            _ => None,
        }
    }

    /// The first slot whose domain has been wiped out, if any.
    #[must_use]
    pub fn first_empty(&self) -> Option<SlotId> {
        self.domains.iter().position(Vec::is_empty)
    }

    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.domains.len()
    }

    /// Remove every word from a slot's domain that doesn't satisfy `keep`, preserving the order of
    /// the rest. Returns the number of words removed.
    pub fn retain<F>(&mut self, slot_id: SlotId, keep: F) -> usize
    where
        F: FnMut(&WordId) -> bool,
    {
        let domain = &mut self.domains[slot_id];
        let before = domain.len();
        domain.retain(keep);
        before - domain.len()
    }

    /// Remove words whose length doesn't match their slot's length. Returns the total number of
    /// words removed across all slots. A slot left with no options isn't reported here; that shows
    /// up during propagation or search.
    pub fn enforce_node_consistency(&mut self, config: &GridConfig) -> usize {
        let mut removed = 0;

        for slot_config in &config.slot_configs {
            removed += self.retain(slot_config.id, |&word_id| {
                config.word_list.get_word(word_id).len() == slot_config.length
            });
        }

        debug!(
            "node consistency removed {removed} options across {} slots",
            config.slot_count()
        );

        removed
    }
}

impl Index<SlotId> for DomainStore {
    type Output = [WordId];

    fn index(&self, slot_id: SlotId) -> &Self::Output {
        &self.domains[slot_id]
    }
}
