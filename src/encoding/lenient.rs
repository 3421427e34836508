//! Partial-success parsing
//!
//! Some inputs (fee quote lists, unspent sets from indexers) are decoded
//! item by item where a bad item should not sink the whole batch. Rather
//! than silently dropping failures, callers get both halves back.

use crate::error::EngineError;

/// Result of parsing a batch where individual items may fail
#[derive(Debug)]
pub struct LenientParse<T> {
    pub parsed: Vec<T>,
    /// Index of each skipped item with the reason it failed
    pub skipped: Vec<(usize, EngineError)>,
}

impl<T> LenientParse<T> {
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }

    /// Promote the first skipped item to an error
    pub fn into_strict(self) -> Result<Vec<T>, EngineError> {
        match self.skipped.into_iter().next() {
            Some((_, err)) => Err(err),
            None => Ok(self.parsed),
        }
    }
}

/// Apply `parser` to every item, keeping successes and recording failures
pub fn parse_lenient<I, T, F>(items: I, mut parser: F) -> LenientParse<T>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Result<T, EngineError>,
{
    let mut parsed = Vec::new();
    let mut skipped = Vec::new();
    for (index, item) in items.into_iter().enumerate() {
        match parser(item) {
            Ok(value) => parsed.push(value),
            Err(err) => skipped.push((index, err)),
        }
    }
    LenientParse { parsed, skipped }
}
