//! Replays recorded insertions onto the original text.
//!
//! The tree renderer and this replay compute the edited file independently;
//! the orchestrator requires them to agree.
//!
//! # Usage
//!
//! ```
//! use docsmith::edit::{Splice, SpliceReplay};
//!
//! let mut replay = SpliceReplay::new("def f():\n    pass\n");
//! replay.add(Splice::new(9, "    \"\"\"Doc.\"\"\"\n"));
//! let edited = replay.apply().expect("should apply");
//! assert_eq!(edited, "def f():\n    \"\"\"Doc.\"\"\"\n    pass\n");
//! ```

/// Text inserted at a byte offset of the original source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Splice {
    /// Byte offset in the original text (insert before this byte)
    pub offset: usize,
    /// Inserted content
    pub text: String,
}

impl Splice {
    /// Create a new splice
    #[must_use]
    pub fn new(offset: usize, text: impl Into<String>) -> Self {
        Self {
            offset,
            text: text.into(),
        }
    }
}

/// Error during replay
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReplayError {
    /// Splice offset is past the end of the source
    #[error("splice {index} out of bounds: offset {offset} > source length {source_len}")]
    OutOfBounds {
        /// Index of the bad splice
        index: usize,
        /// Offending offset
        offset: usize,
        /// Length of the source
        source_len: usize,
    },
    /// Splice offset falls inside a multi-byte character
    #[error("splice {index} at offset {offset} is not on a character boundary")]
    NotCharBoundary {
        /// Index of the bad splice
        index: usize,
        /// Offending offset
        offset: usize,
    },
    /// Two splices target the same offset, so their order is ambiguous
    #[error("splices {first} and {second} share an offset")]
    DuplicateOffset {
        /// Index of the first splice
        first: usize,
        /// Index of the second splice
        second: usize,
    },
}

/// Applies insert-only splices to a source string.
#[derive(Debug, Clone)]
pub struct SpliceReplay {
    source: String,
    splices: Vec<Splice>,
}

impl SpliceReplay {
    /// Create a replay over `source`
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            splices: Vec::new(),
        }
    }

    /// Record a splice
    pub fn add(&mut self, splice: Splice) {
        self.splices.push(splice);
    }

    /// Record several splices
    pub fn add_all(&mut self, splices: impl IntoIterator<Item = Splice>) {
        self.splices.extend(splices);
    }

    /// Number of recorded splices
    #[must_use]
    pub fn len(&self) -> usize {
        self.splices.len()
    }

    /// Whether nothing was recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.splices.is_empty()
    }

    /// Check splices without applying them
    ///
    /// # Errors
    /// Returns error if a splice is out of bounds, splits a character, or
    /// shares its offset with another splice
    pub fn validate(&self) -> Result<(), ReplayError> {
        for (index, splice) in self.splices.iter().enumerate() {
            if splice.offset > self.source.len() {
                return Err(ReplayError::OutOfBounds {
                    index,
                    offset: splice.offset,
                    source_len: self.source.len(),
                });
            }
            if !self.source.is_char_boundary(splice.offset) {
                return Err(ReplayError::NotCharBoundary {
                    index,
                    offset: splice.offset,
                });
            }
        }

        for first in 0..self.splices.len() {
            for second in (first + 1)..self.splices.len() {
                if self.splices[first].offset == self.splices[second].offset {
                    return Err(ReplayError::DuplicateOffset { first, second });
                }
            }
        }
        Ok(())
    }

    /// Apply all splices and return the edited source
    ///
    /// Splices are applied from the end of the text backwards so earlier
    /// offsets stay valid.
    ///
    /// # Errors
    /// See [`SpliceReplay::validate`]
    pub fn apply(self) -> Result<String, ReplayError> {
        self.validate()?;

        let extra: usize = self.splices.iter().map(|s| s.text.len()).sum();
        let mut result = String::with_capacity(self.source.len() + extra);
        result.push_str(&self.source);

        let mut sorted = self.splices;
        sorted.sort_by(|a, b| b.offset.cmp(&a.offset));
        for splice in sorted {
            result.insert_str(splice.offset, &splice.text);
        }
        Ok(result)
    }
}
