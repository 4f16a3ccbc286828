pub mod arc_consistency;
pub mod backtracking_search;
pub mod domains;
pub mod grid_config;
pub mod types;
pub mod validation;
pub mod word_list;

pub const CHECK_INVARIANTS: bool = cfg!(feature = "check_invariants");

/// The expected maximum number of distinct characters appearing in a word list.
pub const MAX_GLYPH_COUNT: usize = 64;

/// The expected maximum length for a single slot.
pub const MAX_SLOT_LENGTH: usize = 21;
