use smallvec::SmallVec;
use std::collections::HashMap;
use std::ffi::OsString;
use std::fmt;
use std::fs;
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;

use crate::types::{GlyphId, WordId};
use crate::{MAX_GLYPH_COUNT, MAX_SLOT_LENGTH};

/// A struct representing a word in the word list.
#[derive(Debug, Clone)]
pub struct Word {
    /// The word as it would appear in a grid: trimmed, NFC-normalized and uppercased.
    pub normalized_string: String,

    /// The glyph ids making up `normalized_string`.
    pub glyphs: SmallVec<[GlyphId; MAX_SLOT_LENGTH]>,
}

impl Word {
    /// The number of cells this word occupies in a grid.
    #[must_use]
    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }
}

/// Given a canonical word string from a word list file, turn it into the normalized form we'll
/// use in the actual fill engine.
#[must_use]
pub fn normalize_word(canonical: &str) -> String {
    canonical
        .trim()
        .nfc() // Normalize Unicode combining forms
        .flat_map(char::to_uppercase)
        .collect()
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WordListError {
    #[error("Can’t read file: “{0}”")]
    InvalidPath(String),

    #[error("Word list contains invalid word on line {line}: “{word}”")]
    InvalidWord { line: usize, word: String },
}

/// Configuration describing a source of word list entries.
pub enum WordListSource {
    Memory { words: Vec<String> },
    File { path: OsString },
    FileContents { contents: &'static str },
}

/// A vocabulary of distinct normalized words, kept in the order they were first seen so that
/// everything derived from it (domains, tie-breaks) is reproducible.
#[derive(Clone, Default)]
pub struct WordList {
    /// A list of all characters that occur in any (normalized) word. `GlyphId`s used everywhere
    /// else are indices into this list.
    pub glyphs: SmallVec<[char; MAX_GLYPH_COUNT]>,

    /// The inverse of `glyphs`: a map from a character to the `GlyphId` representing it.
    pub glyph_id_by_char: HashMap<char, GlyphId>,

    /// All loaded words in first-seen order. `WordId`s are indices into this list.
    pub words: Vec<Word>,

    /// A map from a normalized string to the id of the Word representing it.
    pub word_id_by_string: HashMap<String, WordId>,
}

impl WordList {
    /// Load a word list from the given source, one word per line.
    pub fn from_source(source: &WordListSource) -> Result<WordList, WordListError> {
        let mut instance = WordList::default();

        match source {
            WordListSource::Memory { words } => {
                for (line_idx, word) in words.iter().enumerate() {
                    instance.add_word(word, line_idx + 1)?;
                }
            }
            WordListSource::File { path } => {
                let contents = fs::read_to_string(path).map_err(|_| {
                    WordListError::InvalidPath(path.to_string_lossy().into_owned())
                })?;
                instance.add_file_contents(&contents)?;
            }
            WordListSource::FileContents { contents } => {
                instance.add_file_contents(contents)?;
            }
        }

        Ok(instance)
    }

    /// Build a word list directly from a sequence of strings.
    pub fn from_words<I, S>(words: I) -> Result<WordList, WordListError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut instance = WordList::default();
        for (line_idx, word) in words.into_iter().enumerate() {
            instance.add_word(word.as_ref(), line_idx + 1)?;
        }
        Ok(instance)
    }

    fn add_file_contents(&mut self, contents: &str) -> Result<(), WordListError> {
        for (line_idx, line) in contents.lines().enumerate() {
            self.add_word(line, line_idx + 1)?;
        }
        Ok(())
    }

    /// Add a single word, returning its id. Blank input is skipped and returns `None`; a word
    /// that's already present returns the existing id without changing its position.
    pub fn add_word(
        &mut self,
        canonical: &str,
        line: usize,
    ) -> Result<Option<WordId>, WordListError> {
        let normalized = normalize_word(canonical);
        if normalized.is_empty() {
            return Ok(None);
        }
        if normalized.chars().any(char::is_whitespace) {
            return Err(WordListError::InvalidWord {
                line,
                word: canonical.trim().to_string(),
            });
        }

        if let Some(&word_id) = self.word_id_by_string.get(&normalized) {
            return Ok(Some(word_id));
        }

        let glyphs = normalized
            .chars()
            .map(|ch| self.glyph_id_for_char(ch))
            .collect();

        let word_id = self.words.len();
        self.words.push(Word {
            normalized_string: normalized.clone(),
            glyphs,
        });
        self.word_id_by_string.insert(normalized, word_id);

        Ok(Some(word_id))
    }

    /// Get the glyph id for the given char, adding it to the table if needed.
    pub fn glyph_id_for_char(&mut self, ch: char) -> GlyphId {
        if let Some(&glyph_id) = self.glyph_id_by_char.get(&ch) {
            return glyph_id;
        }
        self.glyphs.push(ch);
        let glyph_id = self.glyphs.len() - 1;
        self.glyph_id_by_char.insert(ch, glyph_id);
        glyph_id
    }

    #[must_use]
    pub fn get_word(&self, word_id: WordId) -> &Word {
        &self.words[word_id]
    }

    /// Look up a word by its (not necessarily normalized) string.
    #[must_use]
    pub fn word_id(&self, word: &str) -> Option<WordId> {
        self.word_id_by_string.get(&normalize_word(word)).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl fmt::Debug for WordList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WordList")
            .field("glyphs", &self.glyphs.len())
            .field("words", &self.words.len())
            .finish()
    }
}
