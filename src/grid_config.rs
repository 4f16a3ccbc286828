//! This module implements the static description of a puzzle: the grid geometry, the slots (word
//! runs) derived from it, and the crossings between them. Nothing in here changes once a fill
//! operation starts.

use smallvec::SmallVec;
use std::collections::HashMap;
use thiserror::Error;

#[cfg(feature = "serde")]
use serde_derive::{Deserialize, Serialize};

use crate::types::{CrossingId, GridCoord, SlotId, WordId};
use crate::word_list::WordList;
use crate::MAX_SLOT_LENGTH;

/// The glyph used for blocked cells when rendering a grid.
pub const BLOCK_GLYPH: char = '█';

/// The direction that a slot is facing.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Direction {
    Across,
    Down,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GridError {
    #[error("Grid must have at least one row")]
    Empty,

    #[error("Rows in grid must all be the same length")]
    RaggedRows,

    #[error("Invalid character {0:?} at row {1}, column {2}")]
    InvalidCell(char, usize, usize),

    #[error("Grid must have at least one open cell")]
    NoOpenCells,

    #[error("Slots {0} and {1} overlap in more than one cell")]
    OverlappingSlots(SlotId, SlotId),
}

/// A struct representing a crossing between one slot and another, referencing the other slot's id
/// and the location of the intersection within the other slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Crossing {
    pub other_slot_id: SlotId,
    pub other_slot_cell: usize,
    pub crossing_id: CrossingId,
}

/// A struct representing the aspects of a slot in the grid that are static during filling.
#[derive(Debug, Clone)]
pub struct SlotConfig {
    pub id: SlotId,
    pub start_cell: GridCoord,
    pub direction: Direction,
    pub length: usize,

    /// For each cell of the slot, the crossing slot sharing it, if any.
    pub crossings: SmallVec<[Option<Crossing>; MAX_SLOT_LENGTH]>,
}

impl SlotConfig {
    /// Generate the coords for each cell of this slot.
    #[must_use]
    pub fn cell_coords(&self) -> Vec<GridCoord> {
        self.slot_spec().cell_coords()
    }

    /// Generate a `SlotSpec` identifying this slot.
    #[must_use]
    pub fn slot_spec(&self) -> SlotSpec {
        SlotSpec {
            start_cell: self.start_cell,
            direction: self.direction,
            length: self.length,
        }
    }

    /// Generate a string key identifying this slot.
    #[must_use]
    pub fn slot_key(&self) -> String {
        self.slot_spec().to_key()
    }

    /// The number of slots crossing this one.
    #[must_use]
    pub fn degree(&self) -> usize {
        self.crossings.iter().flatten().count()
    }

    /// Iterate over this slot's crossings as `(cell_idx, crossing)` pairs.
    pub fn crossing_cells(&self) -> impl Iterator<Item = (usize, &Crossing)> + '_ {
        self.crossings
            .iter()
            .enumerate()
            .filter_map(|(cell_idx, crossing)| crossing.as_ref().map(|c| (cell_idx, c)))
    }
}

/// A struct identifying a specific slot in the grid.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SlotSpec {
    pub start_cell: GridCoord,
    pub direction: Direction,
    pub length: usize,
}

impl SlotSpec {
    /// Represent this slot as a string like "1,2,down,5".
    #[must_use]
    pub fn to_key(&self) -> String {
        let direction = match self.direction {
            Direction::Across => "across",
            Direction::Down => "down",
        };
        format!(
            "{},{},{},{}",
            self.start_cell.0, self.start_cell.1, direction, self.length,
        )
    }

    /// Generate the coords for each cell of this entry.
    #[must_use]
    pub fn cell_coords(&self) -> Vec<GridCoord> {
        let (row, col) = self.start_cell;
        (0..self.length)
            .map(|cell_idx| match self.direction {
                Direction::Across => (row, col + cell_idx),
                Direction::Down => (row + cell_idx, col),
            })
            .collect()
    }
}

/// The open/blocked layout of a rectangular grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridStructure {
    pub width: usize,
    pub height: usize,

    /// A flat array of cells, in order of row and then column; `true` means the cell is open.
    pub open: Vec<bool>,
}

impl GridStructure {
    /// Build a structure from rows of open/blocked flags.
    pub fn from_rows(rows: Vec<Vec<bool>>) -> Result<GridStructure, GridError> {
        let height = rows.len();
        if height == 0 {
            return Err(GridError::Empty);
        }

        let width = rows[0].len();
        if rows.iter().any(|row| row.len() != width) {
            return Err(GridError::RaggedRows);
        }

        let open: Vec<bool> = rows.into_iter().flatten().collect();
        if !open.iter().any(|&cell| cell) {
            return Err(GridError::NoOpenCells);
        }

        Ok(GridStructure {
            width,
            height,
            open,
        })
    }

    /// Parse a template string with `#` representing blocks and `_` or `.` representing open cells.
    /// Surrounding whitespace on each line and blank lines are ignored.
    pub fn from_template_string(template: &str) -> Result<GridStructure, GridError> {
        let rows = template
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .enumerate()
            .map(|(row, line)| {
                line.chars()
                    .enumerate()
                    .map(|(col, cell)| match cell {
                        '#' => Ok(false),
                        '_' | '.' => Ok(true),
                        other => Err(GridError::InvalidCell(other, row, col)),
                    })
                    .collect::<Result<Vec<bool>, GridError>>()
            })
            .collect::<Result<Vec<_>, _>>()?;

        GridStructure::from_rows(rows)
    }

    #[must_use]
    pub fn is_open(&self, (row, col): GridCoord) -> bool {
        row < self.height && col < self.width && self.open[row * self.width + col]
    }

    #[must_use]
    pub fn open_cell_count(&self) -> usize {
        self.open.iter().filter(|&&cell| cell).count()
    }
}

/// Generate a list of `SlotSpec`s for every run of two or more open cells, first across (row by
/// row) and then down (column by column).
#[must_use]
pub fn generate_slots(structure: &GridStructure) -> Vec<SlotSpec> {
    // Collect runs of open cells along each line, where `cell_at(line, pos)` maps back to grid
    // coords.
    fn build_words(
        structure: &GridStructure,
        line_count: usize,
        line_length: usize,
        cell_at: impl Fn(usize, usize) -> GridCoord,
    ) -> Vec<Vec<GridCoord>> {
        let mut result: Vec<Vec<GridCoord>> = vec![];

        for line in 0..line_count {
            let mut current_word_coords: Vec<GridCoord> = vec![];

            for pos in 0..line_length {
                let coord = cell_at(line, pos);
                if structure.is_open(coord) {
                    current_word_coords.push(coord);
                } else {
                    if current_word_coords.len() > 1 {
                        result.push(current_word_coords);
                    }
                    current_word_coords = vec![];
                }
            }

            if current_word_coords.len() > 1 {
                result.push(current_word_coords);
            }
        }

        result
    }

    let across = build_words(structure, structure.height, structure.width, |row, col| {
        (row, col)
    })
    .into_iter()
    .map(|coords| SlotSpec {
        start_cell: coords[0],
        length: coords.len(),
        direction: Direction::Across,
    });

    let down = build_words(structure, structure.width, structure.height, |col, row| {
        (row, col)
    })
    .into_iter()
    .map(|coords| SlotSpec {
        start_cell: coords[0],
        length: coords.len(),
        direction: Direction::Down,
    });

    across.chain(down).collect()
}

/// Given `SlotSpec`s specifying the positions of the slots in a grid, generate `SlotConfig`s
/// containing derived information about crossings. Also returns the number of distinct crossings.
pub fn generate_slot_configs(entries: &[SlotSpec]) -> Result<(Vec<SlotConfig>, usize), GridError> {
    // Build a map from cell location to entries involved, which we can then use to calculate
    // crossings.
    let mut entries_by_loc: HashMap<GridCoord, Vec<(SlotId, usize)>> = HashMap::new();

    for (entry_idx, entry) in entries.iter().enumerate() {
        for (cell_idx, loc) in entry.cell_coords().into_iter().enumerate() {
            entries_by_loc
                .entry(loc)
                .or_default()
                .push((entry_idx, cell_idx));
        }
    }

    // When we're generating a Crossing, if `(current_slot_id, crossing_slot_id)` is in this list,
    // use its index; if not, use `crossing_id_cache.len()` as the id and push
    // `(crossing_slot_id, current_id)` into the list so we can reuse it when we see the crossing
    // from the other side.
    let mut crossing_id_cache: Vec<(SlotId, SlotId)> = vec![];
    let mut slot_configs: Vec<SlotConfig> = Vec::with_capacity(entries.len());

    for (entry_idx, entry) in entries.iter().enumerate() {
        let mut crossings: SmallVec<[Option<Crossing>; MAX_SLOT_LENGTH]> =
            SmallVec::with_capacity(entry.length);

        for loc in entry.cell_coords() {
            let others: Vec<(SlotId, usize)> = entries_by_loc[&loc]
                .iter()
                .copied()
                .filter(|&(e, _)| e != entry_idx)
                .collect();

            let crossing = match others.as_slice() {
                [] => None,
                &[(other_slot_id, other_slot_cell)] => {
                    if entries[other_slot_id].direction == entry.direction {
                        return Err(GridError::OverlappingSlots(entry_idx, other_slot_id));
                    }

                    let crossing_id = if let Some(found_id) = crossing_id_cache
                        .iter()
                        .position(|&id_pair| id_pair == (entry_idx, other_slot_id))
                    {
                        found_id
                    } else {
                        crossing_id_cache.push((other_slot_id, entry_idx));
                        crossing_id_cache.len() - 1
                    };

                    Some(Crossing {
                        other_slot_id,
                        other_slot_cell,
                        crossing_id,
                    })
                }
                &[(other_slot_id, _), ..] => {
                    return Err(GridError::OverlappingSlots(entry_idx, other_slot_id));
                }
            };

            crossings.push(crossing);
        }

        slot_configs.push(SlotConfig {
            id: entry_idx,
            start_cell: entry.start_cell,
            direction: entry.direction,
            length: entry.length,
            crossings,
        });
    }

    Ok((slot_configs, crossing_id_cache.len()))
}

/// A struct owning all of the static information needed as input to a fill operation: the
/// vocabulary, the grid geometry, and the slot/crossing graph derived from it.
#[derive(Debug, Clone)]
pub struct GridConfig {
    /// The word list used to fill the grid; see `word_list.rs`.
    pub word_list: WordList,

    /// The open/blocked layout of the grid.
    pub structure: GridStructure,

    /// Config representing all of the slots in the grid and their crossings.
    pub slot_configs: Vec<SlotConfig>,

    /// The number of distinct crossings represented in all of the `slot_configs`.
    pub crossing_count: usize,
}

impl GridConfig {
    /// Build the slot/crossing graph for the given structure.
    pub fn new(word_list: WordList, structure: GridStructure) -> Result<GridConfig, GridError> {
        if structure.open_cell_count() == 0 {
            return Err(GridError::NoOpenCells);
        }

        let slot_specs = generate_slots(&structure);
        let (slot_configs, crossing_count) = generate_slot_configs(&slot_specs)?;

        Ok(GridConfig {
            word_list,
            structure,
            slot_configs,
            crossing_count,
        })
    }

    /// Build a config from a template string; see `GridStructure::from_template_string`.
    pub fn from_template_string(
        word_list: WordList,
        template: &str,
    ) -> Result<GridConfig, GridError> {
        GridConfig::new(word_list, GridStructure::from_template_string(template)?)
    }

    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slot_configs.len()
    }

    /// If `x` and `y` cross, return the index of the shared cell within each of them.
    #[must_use]
    pub fn overlap(&self, x: SlotId, y: SlotId) -> Option<(usize, usize)> {
        self.slot_configs[x]
            .crossing_cells()
            .find(|(_, crossing)| crossing.other_slot_id == y)
            .map(|(cell_idx, crossing)| (cell_idx, crossing.other_slot_cell))
    }

    /// The ids of all slots crossing `slot_id`, in cell order.
    #[must_use]
    pub fn neighbors(&self, slot_id: SlotId) -> Vec<SlotId> {
        self.slot_configs[slot_id]
            .crossing_cells()
            .map(|(_, crossing)| crossing.other_slot_id)
            .collect()
    }

}

/// A struct recording a slot assignment made during a fill process.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Choice {
    pub slot_id: SlotId,
    pub word_id: WordId,
}

/// Turn the given grid config and fill choices into a rendered string. Blocked cells are shown as
/// `BLOCK_GLYPH` and open cells that no choice covers as a space.
#[must_use]
pub fn render_grid(config: &GridConfig, choices: &[Choice]) -> String {
    let width = config.structure.width;
    let mut grid: Vec<Option<char>> = config
        .structure
        .open
        .iter()
        .map(|&open| if open { Some(' ') } else { None })
        .collect();

    for &Choice { slot_id, word_id } in choices {
        let slot_config = &config.slot_configs[slot_id];
        let word = config.word_list.get_word(word_id);

        for ((row, col), &glyph) in slot_config.cell_coords().into_iter().zip(&word.glyphs) {
            grid[row * width + col] = Some(config.word_list.glyphs[glyph]);
        }
    }

    grid.chunks(width)
        .map(|line| {
            line.iter()
                .map(|cell| cell.unwrap_or(BLOCK_GLYPH))
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("\n")
}
