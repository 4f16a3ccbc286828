/// An identifier for a given letter or symbol, based on its index in the `WordList`'s `glyphs`
/// field.
pub type GlyphId = usize;

/// An identifier for a given word, based on its index in the `WordList`'s `words` field.
pub type WordId = usize;

/// An identifier for a given slot, based on its index in the `GridConfig`'s `slot_configs` field.
pub type SlotId = usize;

/// An identifier for the intersection between two slots, shared by both directions of the crossing.
pub type CrossingId = usize;

/// Zero-indexed row and column of a cell in the grid, where row 0 is the top row.
pub type GridCoord = (usize, usize);
