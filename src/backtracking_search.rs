//! This module implements grid-filling using a depth-first backtracking search over partial
//! assignments. Slots are chosen with the minimum-remaining-values heuristic (ties broken by
//! degree, then by slot order) and words are tried in least-constraining-value order. Domains are
//! filtered once up front (node consistency, then arc consistency) and are read-only during the
//! search itself.

use log::{debug, info, trace};
use std::cmp::Reverse;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::arc_consistency::{
    establish_arc_consistency, ArcConsistencyFailure, ArcConsistencySuccess, PropagationMode,
};
use crate::domains::DomainStore;
use crate::grid_config::{Choice, GridConfig};
use crate::types::{SlotId, WordId};
use crate::validation::{is_consistent, is_consistent_binding, Assignment};
use crate::CHECK_INVARIANTS;

/// How many states should we visit between checks of the deadline and abort flag?
pub const INTERRUPT_FREQUENCY: usize = 10;

/// A struct tracking stats about the filling process.
#[derive(Debug, Clone, Default)]
pub struct Statistics {
    pub states: usize,
    pub backtracks: usize,
    pub node_consistency_eliminations: usize,
    pub arc_consistency_revisions: usize,
    pub arc_consistency_eliminations: usize,
    pub total_time: Duration,
    pub arc_consistency_time: Duration,
    pub search_time: Duration,
}

/// Knobs for a fill operation. The default runs full AC-3 and searches without any limit.
#[derive(Debug, Clone, Default)]
pub struct FillOptions {
    pub propagation_mode: PropagationMode,

    /// Give up once this much time has passed since the start of the fill.
    pub timeout: Option<Duration>,

    /// Give up after visiting this many search states.
    pub max_states: Option<usize>,

    /// A flag that another thread can set to cancel the fill.
    pub abort: Option<Arc<AtomicBool>>,
}

/// A struct representing the results of a fill operation.
#[derive(Debug)]
pub struct FillSuccess {
    pub statistics: Statistics,

    /// One choice per slot, in slot order.
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FillFailure {
    /// There's no fill for this grid and word list.
    HardFailure,
    Timeout,
    Abort,
    ExceededStateLimit(usize),
}

/// Choose the next slot to fill: fewest remaining options first, then the slot with the most
/// crossings, then the lowest slot id. Returns `None` if every slot is assigned.
#[must_use]
pub fn select_unassigned_slot(
    config: &GridConfig,
    domains: &DomainStore,
    assignment: &Assignment,
) -> Option<SlotId> {
    assignment.unassigned().min_by_key(|&slot_id| {
        (
            domains.len(slot_id),
            Reverse(config.slot_configs[slot_id].degree()),
            slot_id,
        )
    })
}

/// Count how many options `word_id` would rule out for the slots crossing `slot_id`. An assigned
/// neighbor only counts if its domain is down to this exact word and it holds it; an unassigned
/// neighbor counts each of its options that disagrees in the shared cell, plus one if its only
/// option is this word.
fn count_ruled_out_options(
    config: &GridConfig,
    domains: &DomainStore,
    assignment: &Assignment,
    slot_id: SlotId,
    word_id: WordId,
) -> usize {
    let word = config.word_list.get_word(word_id);

    config.slot_configs[slot_id]
        .crossing_cells()
        .map(|(cell_idx, crossing)| {
            let neighbor = crossing.other_slot_id;
            let dupe = usize::from(domains.single_option(neighbor) == Some(word_id));

            if let Some(neighbor_word_id) = assignment.get(neighbor) {
                return if neighbor_word_id == word_id { dupe } else { 0 };
            }

            let glyph = word.glyphs.get(cell_idx);
            let conflicts = domains
                .get(neighbor)
                .iter()
                .filter(|&&other_word_id| {
                    config
                        .word_list
                        .get_word(other_word_id)
                        .glyphs
                        .get(crossing.other_slot_cell)
                        != glyph
                })
                .count();

            dupe + conflicts
        })
        .sum()
}

/// Return the options for `slot_id` sorted so that the one ruling out the fewest options among
/// its neighbors comes first. Ties keep domain order.
#[must_use]
pub fn order_domain_values(
    config: &GridConfig,
    domains: &DomainStore,
    assignment: &Assignment,
    slot_id: SlotId,
) -> Vec<WordId> {
    let mut options = domains.get(slot_id).to_vec();
    options.sort_by_cached_key(|&word_id| {
        count_ruled_out_options(config, domains, assignment, slot_id, word_id)
    });
    options
}

/// State shared by every frame of a single search.
struct Search<'a> {
    config: &'a GridConfig,
    domains: &'a DomainStore,
    deadline: Option<Instant>,
    max_states: Option<usize>,
    abort: Option<&'a AtomicBool>,
    statistics: Statistics,
}

impl<'a> Search<'a> {
    fn check_interrupts(&self) -> Result<(), FillFailure> {
        let states = self.statistics.states;

        if let Some(max_states) = self.max_states {
            if states > max_states {
                return Err(FillFailure::ExceededStateLimit(states));
            }
        }

        if (states - 1) % INTERRUPT_FREQUENCY == 0 {
            if let Some(deadline) = self.deadline {
                if Instant::now() >= deadline {
                    return Err(FillFailure::Timeout);
                }
            }
            if let Some(abort) = self.abort {
                if abort.load(Ordering::Relaxed) {
                    return Err(FillFailure::Abort);
                }
            }
        }

        Ok(())
    }

    /// Try to extend `assignment` to a complete fill. On success the assignment is left complete
    /// and `Ok(true)` is returned; on `Ok(false)` it's back in the state it was passed in.
    fn backtrack(&mut self, assignment: &mut Assignment) -> Result<bool, FillFailure> {
        self.statistics.states += 1;
        self.check_interrupts()?;

        let Some(slot_id) = select_unassigned_slot(self.config, self.domains, assignment) else {
            return Ok(is_consistent(self.config, assignment));
        };

        for word_id in order_domain_values(self.config, self.domains, assignment, slot_id) {
            assignment.bind(slot_id, word_id);
            trace!(
                "trying {} in slot {}",
                self.config.word_list.get_word(word_id).normalized_string,
                self.config.slot_configs[slot_id].slot_key()
            );

            if is_consistent_binding(self.config, assignment, slot_id)
                && self.backtrack(assignment)?
            {
                return Ok(true);
            }

            assignment.unbind(slot_id);
        }

        self.statistics.backtracks += 1;
        Ok(false)
    }
}

/// Search for a complete fill using already-filtered domains. Slots that are down to a single
/// option start out bound to it.
pub fn find_fill_for_domains(
    config: &GridConfig,
    domains: &DomainStore,
    options: &FillOptions,
) -> Result<FillSuccess, FillFailure> {
    let deadline = options.timeout.map(|timeout| Instant::now() + timeout);
    search_domains(config, domains, options, deadline)
}

/// Like `find_fill_for_domains`, but with the deadline already fixed by the caller, so
/// `options.timeout` is ignored.
fn search_domains(
    config: &GridConfig,
    domains: &DomainStore,
    options: &FillOptions,
    deadline: Option<Instant>,
) -> Result<FillSuccess, FillFailure> {
    let start = Instant::now();

    if let Some(slot_id) = domains.first_empty() {
        debug!("slot {slot_id} has no options; skipping search");
        return Err(FillFailure::HardFailure);
    }

    let mut assignment = Assignment::new(config.slot_count());
    for slot_id in 0..config.slot_count() {
        if let Some(word_id) = domains.single_option(slot_id) {
            assignment.bind(slot_id, word_id);
        }
    }

    if !is_consistent(config, &assignment) {
        debug!("slots with a single option conflict with each other");
        return Err(FillFailure::HardFailure);
    }

    let mut search = Search {
        config,
        domains,
        deadline,
        max_states: options.max_states,
        abort: options.abort.as_deref(),
        statistics: Statistics::default(),
    };

    let found = search.backtrack(&mut assignment)?;
    let mut statistics = search.statistics;
    statistics.search_time = start.elapsed();

    debug!(
        "search visited {} states with {} backtracks",
        statistics.states, statistics.backtracks
    );

    if !found {
        return Err(FillFailure::HardFailure);
    }

    if CHECK_INVARIANTS && !(assignment.is_complete() && is_consistent(config, &assignment)) {
        panic!("Search returned an invalid fill?");
    }

    Ok(FillSuccess {
        statistics,
        choices: assignment.choices(),
    })
}

/// Search for a valid fill for the given grid: build domains from the word list, enforce node and
/// arc consistency, and then run the backtracking search.
pub fn find_fill(config: &GridConfig, options: &FillOptions) -> Result<FillSuccess, FillFailure> {
    let start = Instant::now();
    let deadline = options.timeout.map(|timeout| start + timeout);

    let mut domains = DomainStore::initialize(config);
    let node_consistency_eliminations = domains.enforce_node_consistency(config);

    let arc_consistency_start = Instant::now();
    let arc_consistency =
        establish_arc_consistency(config, &mut domains, None, options.propagation_mode);
    let arc_consistency_time = arc_consistency_start.elapsed();

    let ArcConsistencySuccess {
        revisions,
        eliminations,
    } = match arc_consistency {
        Ok(success) => success,
        Err(ArcConsistencyFailure { slot_id }) => {
            info!(
                "no fill: slot {} has no remaining options",
                config.slot_configs[slot_id].slot_key()
            );
            return Err(FillFailure::HardFailure);
        }
    };

    let result = search_domains(config, &domains, options, deadline);

    match result {
        Ok(mut success) => {
            let statistics = &mut success.statistics;
            statistics.node_consistency_eliminations = node_consistency_eliminations;
            statistics.arc_consistency_revisions = revisions;
            statistics.arc_consistency_eliminations = eliminations;
            statistics.arc_consistency_time = arc_consistency_time;
            statistics.total_time = start.elapsed();

            info!(
                "filled {} slots in {:?} ({} states)",
                config.slot_count(),
                statistics.total_time,
                statistics.states
            );
            Ok(success)
        }
        Err(failure) => {
            info!("no fill: {failure:?}");
            Err(failure)
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::arc_consistency::{establish_arc_consistency, PropagationMode};
    use crate::backtracking_search::{
        find_fill, find_fill_for_domains, order_domain_values, search_domains,
        select_unassigned_slot, FillFailure, FillOptions,
    };
    use crate::domains::DomainStore;
    use crate::grid_config::{render_grid, Choice, GridConfig};
    use crate::validation::{is_consistent, Assignment};
    use crate::word_list::tests::dictionary_path;
    use crate::word_list::{WordList, WordListSource};
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    /// One across slot (0) and one down slot (1) sharing their first cell.
    const CORNER: &str = "
        ___
        _##
        _##
    ";

    /// Four slots around a blocked center: top (0), bottom (1), left (2), right (3).
    const RING: &str = "
        ___
        _#_
        ___
    ";

    fn generate_config(words: &[&str], template: &str) -> GridConfig {
        GridConfig::from_template_string(WordList::from_words(words).unwrap(), template).unwrap()
    }

    fn fill_strings(config: &GridConfig, choices: &[Choice]) -> Vec<String> {
        choices
            .iter()
            .map(|choice| {
                config
                    .word_list
                    .get_word(choice.word_id)
                    .normalized_string
                    .clone()
            })
            .collect()
    }

    #[test]
    fn test_find_fill_for_corner() {
        let config = generate_config(&["cat", "cow", "dog"], CORNER);

        let result = find_fill(&config, &FillOptions::default()).expect("Failed to find a fill");

        println!("{:?}", result.statistics);
        println!("{}", render_grid(&config, &result.choices));

        assert_eq!(fill_strings(&config, &result.choices), vec!["CAT", "COW"]);
        assert_eq!(render_grid(&config, &result.choices), "CAT\nO██\nW██");
    }

    #[test]
    fn test_find_fill_for_corner_with_single_pass() {
        let config = generate_config(&["cat", "cow", "dog"], CORNER);
        let options = FillOptions {
            propagation_mode: PropagationMode::SinglePass,
            ..FillOptions::default()
        };

        let result = find_fill(&config, &options).expect("Failed to find a fill");

        assert_eq!(fill_strings(&config, &result.choices), vec!["CAT", "COW"]);
    }

    #[test]
    fn test_find_fill_breaks_ties_by_word_list_order() {
        let config = generate_config(&["dog", "cow", "cat"], CORNER);

        let result = find_fill(&config, &FillOptions::default()).expect("Failed to find a fill");

        // Both "cow" and "cat" rule out one option for the down slot, so the earlier one wins.
        assert_eq!(fill_strings(&config, &result.choices), vec!["COW", "CAT"]);
    }

    #[test]
    fn test_fill_fails_gracefully() {
        let config = generate_config(&["cat", "dog"], CORNER);

        for propagation_mode in [PropagationMode::Worklist, PropagationMode::SinglePass] {
            let options = FillOptions {
                propagation_mode,
                ..FillOptions::default()
            };
            assert_eq!(
                find_fill(&config, &options).expect_err("Found an impossible fill??"),
                FillFailure::HardFailure
            );
        }
    }

    #[test]
    fn test_fill_fails_when_lengths_dont_fit() {
        let config = generate_config(&["cat", "cow", "dog"], "____");

        assert_eq!(
            find_fill(&config, &FillOptions::default()).unwrap_err(),
            FillFailure::HardFailure
        );
    }

    #[test]
    fn test_find_fill_for_ring() {
        let config = generate_config(&["dog", "ace", "era", "cat", "cob", "bet", "tot"], RING);

        let result = find_fill(&config, &FillOptions::default()).expect("Failed to find a fill");

        println!("{:?}", result.statistics);
        println!("{}", render_grid(&config, &result.choices));

        assert_eq!(result.choices.len(), 4);
        let assignment = Assignment::from_words(
            result
                .choices
                .iter()
                .map(|choice| Some(choice.word_id))
                .collect(),
        );
        assert!(assignment.is_complete());
        assert!(is_consistent(&config, &assignment));
    }

    #[test]
    fn test_find_fill_recovers_from_dead_end() {
        // Slot 0 is the top row, slots 1 and 2 are the outer columns.
        let config = generate_config(&["tab", "pat", "bat", "tot"], "___\n_#_\n_#_");

        // After propagation slot 2 has the fewest options, and its least constraining word
        // ("tab") leaves the other two slots without a fill.
        let mut domains = DomainStore::initialize(&config);
        establish_arc_consistency(&config, &mut domains, None, PropagationMode::Worklist).unwrap();
        assert_eq!(domains.get(2), &[0, 2, 3]);
        assert_eq!(
            order_domain_values(&config, &domains, &Assignment::new(3), 2)[0],
            0
        );

        for propagation_mode in [PropagationMode::Worklist, PropagationMode::SinglePass] {
            let options = FillOptions {
                propagation_mode,
                ..FillOptions::default()
            };
            let result = find_fill(&config, &options).expect("Failed to find a fill");

            println!("{:?}", result.statistics);

            assert_eq!(
                fill_strings(&config, &result.choices),
                vec!["TAB", "TOT", "BAT"]
            );
            assert_eq!(render_grid(&config, &result.choices), "TAB\nO█A\nT█T");
            assert!(result.statistics.backtracks > 0);
        }
    }

    #[test]
    fn test_fill_fails_after_exhausting_search() {
        // Three separate rows but only two words: nothing to prune until the third slot.
        let config = generate_config(&["cat", "dog"], "___\n###\n___\n###\n___");

        let mut domains = DomainStore::initialize(&config);
        establish_arc_consistency(&config, &mut domains, None, PropagationMode::Worklist)
            .expect("Arc consistency shouldn't rule anything out");
        assert_eq!(domains, DomainStore::initialize(&config));

        assert_eq!(
            find_fill(&config, &FillOptions::default()).unwrap_err(),
            FillFailure::HardFailure
        );

        // The search visits five states before giving up.
        let options = FillOptions {
            max_states: Some(4),
            ..FillOptions::default()
        };
        assert_eq!(
            find_fill(&config, &options).unwrap_err(),
            FillFailure::ExceededStateLimit(5)
        );

        let options = FillOptions {
            max_states: Some(5),
            ..FillOptions::default()
        };
        assert_eq!(
            find_fill(&config, &options).unwrap_err(),
            FillFailure::HardFailure
        );
    }

    #[test]
    fn test_fill_from_resources() {
        let word_list = WordList::from_source(&WordListSource::File {
            path: dictionary_path().into(),
        })
        .unwrap();
        let config = GridConfig::from_template_string(
            word_list,
            include_str!("../resources/structure.txt"),
        )
        .unwrap();

        let result = find_fill(&config, &FillOptions::default()).expect("Failed to find a fill");

        println!("{:?}", result.statistics);

        assert_eq!(
            fill_strings(&config, &result.choices),
            vec!["CAT", "EARS", "CRATE", "OATS"]
        );
        assert_eq!(
            render_grid(&config, &result.choices),
            "█CAT█\n█R██O\n█A██A\n█T██T\n█EARS"
        );
    }

    #[test]
    fn test_empty_word_list() {
        let config = generate_config(&[], CORNER);
        assert_eq!(
            find_fill(&config, &FillOptions::default()).unwrap_err(),
            FillFailure::HardFailure
        );

        let config = generate_config(&[], "_#\n#_");
        let result = find_fill(&config, &FillOptions::default()).expect("Failed to find a fill");
        assert!(result.choices.is_empty());
    }

    #[test]
    fn test_find_fill_without_slots() {
        let config = generate_config(&["cat"], "_#\n#_");

        let result = find_fill(&config, &FillOptions::default()).expect("Failed to find a fill");

        assert!(result.choices.is_empty());
        assert_eq!(render_grid(&config, &result.choices), " █\n█ ");
    }

    #[test]
    fn test_select_unassigned_slot() {
        // Slot degrees for this structure are 1, 2, 2, 1.
        let config = generate_config(&[], include_str!("../resources/structure.txt"));
        let mut assignment = Assignment::new(4);

        let domains = DomainStore::from_options(vec![vec![0, 1], vec![0, 1], vec![0, 1], vec![0]]);
        assert_eq!(select_unassigned_slot(&config, &domains, &assignment), Some(3));

        let domains =
            DomainStore::from_options(vec![vec![0, 1], vec![0, 1], vec![0, 1], vec![0, 1, 2]]);
        assert_eq!(select_unassigned_slot(&config, &domains, &assignment), Some(1));

        assignment.bind(1, 0);
        assert_eq!(select_unassigned_slot(&config, &domains, &assignment), Some(2));

        for slot_id in [0, 2, 3] {
            assignment.bind(slot_id, 1);
        }
        assert_eq!(select_unassigned_slot(&config, &domains, &assignment), None);
    }

    #[test]
    fn test_order_domain_values() {
        let config = generate_config(&["dog", "cat", "cow"], CORNER);
        let domains = DomainStore::initialize(&config);
        let mut assignment = Assignment::new(2);

        assert_eq!(
            order_domain_values(&config, &domains, &assignment, 0),
            vec![1, 2, 0]
        );

        // An assigned neighbor with other options left doesn't count against any candidate.
        assignment.bind(0, 1);
        assert_eq!(
            order_domain_values(&config, &domains, &assignment, 1),
            vec![0, 1, 2]
        );

        // Once its domain is down to the word it holds, that word counts against the candidate.
        let domains = DomainStore::from_options(vec![vec![1], vec![0, 1, 2]]);
        assert_eq!(
            order_domain_values(&config, &domains, &assignment, 1),
            vec![0, 2, 1]
        );
    }

    #[test]
    fn test_conflicting_single_options() {
        let config = generate_config(&["cat", "cow"], CORNER);
        let domains = DomainStore::from_options(vec![vec![0], vec![0]]);

        assert_eq!(
            find_fill_for_domains(&config, &domains, &FillOptions::default()).unwrap_err(),
            FillFailure::HardFailure
        );
    }

    #[test]
    fn test_empty_domain_skips_search() {
        let config = generate_config(&["cat", "cow"], CORNER);
        let domains = DomainStore::from_options(vec![vec![0, 1], vec![]]);

        assert_eq!(
            find_fill_for_domains(&config, &domains, &FillOptions::default()).unwrap_err(),
            FillFailure::HardFailure
        );
    }

    #[test]
    fn test_state_limit() {
        let config = generate_config(&["cat", "cow", "dog"], CORNER);
        let options = FillOptions {
            max_states: Some(1),
            ..FillOptions::default()
        };

        assert_eq!(
            find_fill(&config, &options).unwrap_err(),
            FillFailure::ExceededStateLimit(2)
        );
    }

    #[test]
    fn test_abort() {
        let config = generate_config(&["cat", "cow", "dog"], CORNER);
        let options = FillOptions {
            abort: Some(Arc::new(AtomicBool::new(true))),
            ..FillOptions::default()
        };

        assert_eq!(find_fill(&config, &options).unwrap_err(), FillFailure::Abort);
    }

    #[test]
    fn test_timeout() {
        let config = generate_config(&["cat", "cow", "dog"], CORNER);
        let options = FillOptions {
            timeout: Some(Duration::ZERO),
            ..FillOptions::default()
        };

        assert_eq!(find_fill(&config, &options).unwrap_err(), FillFailure::Timeout);
    }

    #[test]
    fn test_deadline_set_before_search() {
        let config = generate_config(&["cat", "cow", "dog"], CORNER);
        let domains = DomainStore::initialize(&config);
        let options = FillOptions {
            timeout: Some(Duration::from_secs(60)),
            ..FillOptions::default()
        };

        // A deadline that passed before the search started wins over `options.timeout`.
        let deadline = Instant::now();
        assert_eq!(
            search_domains(&config, &domains, &options, Some(deadline)).unwrap_err(),
            FillFailure::Timeout
        );

        let deadline = Instant::now() + Duration::from_secs(60);
        assert!(search_domains(&config, &domains, &options, Some(deadline)).is_ok());
    }
}
