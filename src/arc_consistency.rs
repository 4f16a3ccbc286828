//! This module contains a crossword-specific implementation of arc consistency. For our purposes,
//! a pair of slots `(x, y)` is arc-consistent when:
//!
//! - Every option for `x` has at least one option in `y` with the same letter in their shared
//!   cell (only relevant if `x` and `y` cross). For example, if 1D doesn't have any options
//!   starting with the letter A, we remove any options for 1A that start with the letter A.
//!
//! - If `y` has been reduced to one option, that word is no longer available to `x`, since the
//!   same word can't appear twice in the grid.
//!
//! Two propagation strategies are available (see `PropagationMode`): a full AC-3 worklist that
//! keeps revising until nothing changes, and a single linear pass over the arc list.

use log::debug;
use std::collections::{HashSet, VecDeque};

#[cfg(feature = "serde")]
use serde_derive::{Deserialize, Serialize};

use crate::domains::DomainStore;
use crate::grid_config::GridConfig;
use crate::types::{GlyphId, SlotId};

/// How `establish_arc_consistency` works through its arcs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PropagationMode {
    /// Textbook AC-3: whenever a slot loses options, every arc pointing at it is queued again, so
    /// the result is a fixed point.
    #[default]
    Worklist,

    /// Revise each arc exactly once, in order, without re-queueing. Cheaper but may leave
    /// unsupported options behind.
    SinglePass,
}

/// Result from a successful call to `establish_arc_consistency`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArcConsistencySuccess {
    /// How many times `revise` was called.
    pub revisions: usize,

    /// How many options were removed in total.
    pub eliminations: usize,
}

/// Result from a failed call to `establish_arc_consistency`, identifying the slot whose domain was
/// wiped out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArcConsistencyFailure {
    pub slot_id: SlotId,
}

/// Result from a call to `establish_arc_consistency`.
pub type ArcConsistencyResult = Result<ArcConsistencySuccess, ArcConsistencyFailure>;

/// Every ordered pair of distinct slots, in slot order. This includes pairs that don't cross,
/// since the duplicate-word rule applies to them too.
#[must_use]
pub fn all_arcs(config: &GridConfig) -> Vec<(SlotId, SlotId)> {
    let slot_count = config.slot_count();
    (0..slot_count)
        .flat_map(|x| (0..slot_count).filter(move |&y| y != x).map(move |y| (x, y)))
        .collect()
}

/// Make `x` arc-consistent with `y` by removing options from `x`'s domain that have no compatible
/// option in `y`'s domain, or that duplicate `y`'s only remaining option. Returns whether anything
/// was removed.
pub fn revise(config: &GridConfig, domains: &mut DomainStore, x: SlotId, y: SlotId) -> bool {
    if x == y {
        return false;
    }

    let word_list = &config.word_list;
    let y_single_option = domains.single_option(y);
    let overlap = config.overlap(x, y);

    if y_single_option.is_none() && overlap.is_none() {
        return false;
    }

    // The glyphs `y`'s options can place in the shared cell.
    let supported_glyphs: Option<(usize, HashSet<GlyphId>)> = overlap.map(|(x_cell, y_cell)| {
        (
            x_cell,
            domains
                .get(y)
                .iter()
                .filter_map(|&word_id| word_list.get_word(word_id).glyphs.get(y_cell).copied())
                .collect(),
        )
    });

    let removed = domains.retain(x, |&word_id| {
        if y_single_option == Some(word_id) {
            return false;
        }

        match &supported_glyphs {
            Some((x_cell, glyphs)) => word_list
                .get_word(word_id)
                .glyphs
                .get(*x_cell)
                .map_or(false, |glyph| glyphs.contains(glyph)),
            None => true,
        }
    });

    removed > 0
}

/// Remove options from `domains` until the given arcs (or every ordered pair of slots, if `arcs`
/// is `None`) are consistent. Fails if any slot ends up with no options.
pub fn establish_arc_consistency(
    config: &GridConfig,
    domains: &mut DomainStore,
    arcs: Option<&[(SlotId, SlotId)]>,
    mode: PropagationMode,
) -> ArcConsistencyResult {
    let default_arcs;
    let arcs: &[(SlotId, SlotId)] = match arcs {
        Some(arcs) => arcs,
        None => {
            default_arcs = all_arcs(config);
            &default_arcs
        }
    };

    let result = match mode {
        PropagationMode::SinglePass => single_pass(config, domains, arcs),
        PropagationMode::Worklist => worklist(config, domains, arcs),
    }?;

    // Slots that no arc touched can still have been emptied beforehand (e.g., by node
    // consistency).
    if let Some(slot_id) = domains.first_empty() {
        debug!("slot {slot_id} has no options after arc consistency");
        return Err(ArcConsistencyFailure { slot_id });
    }

    debug!(
        "arc consistency ({mode:?}) made {} revisions and {} eliminations",
        result.revisions, result.eliminations
    );

    Ok(result)
}

fn single_pass(
    config: &GridConfig,
    domains: &mut DomainStore,
    arcs: &[(SlotId, SlotId)],
) -> ArcConsistencyResult {
    let mut result = ArcConsistencySuccess::default();

    for &(x, y) in arcs {
        let before = domains.len(x);
        result.revisions += 1;
        if revise(config, domains, x, y) {
            result.eliminations += before - domains.len(x);
        }
    }

    Ok(result)
}

fn worklist(
    config: &GridConfig,
    domains: &mut DomainStore,
    arcs: &[(SlotId, SlotId)],
) -> ArcConsistencyResult {
    let mut result = ArcConsistencySuccess::default();
    let mut queue: VecDeque<(SlotId, SlotId)> = arcs.iter().copied().collect();
    let mut queued: HashSet<(SlotId, SlotId)> = arcs.iter().copied().collect();

    while let Some((x, y)) = queue.pop_front() {
        queued.remove(&(x, y));

        let before = domains.len(x);
        result.revisions += 1;
        if !revise(config, domains, x, y) {
            continue;
        }

        let after = domains.len(x);
        result.eliminations += before - after;

        if after == 0 {
            debug!("domain wipeout for slot {x} while revising against slot {y}");
            return Err(ArcConsistencyFailure { slot_id: x });
        }

        // Arcs pointing at `x` may have lost support. Crossing slots depend on its letters; once
        // it's down to a single word, every other slot depends on it through the duplicate rule.
        let dependents: Vec<SlotId> = if after == 1 {
            (0..config.slot_count()).filter(|&z| z != x).collect()
        } else {
            config.neighbors(x)
        };

        for z in dependents {
            if queued.insert((z, x)) {
                queue.push_back((z, x));
            }
        }
    }

    Ok(result)
}
