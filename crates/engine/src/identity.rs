//! Entity identity for rows and columns.
//!
//! Row ids and column ids live in independent namespaces. Generated ids come
//! from an `IdSequence` shared by a grid family, so a nested grid built from its
//! parent's options never hands out an id its parent already issued.

use std::borrow::Borrow;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Stable identifier of a row or column.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for EntityId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for EntityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&String> for EntityId {
    fn from(s: &String) -> Self {
        Self(s.clone())
    }
}

impl From<&EntityId> for EntityId {
    fn from(id: &EntityId) -> Self {
        id.clone()
    }
}

impl PartialEq<str> for EntityId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for EntityId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Which axis an entity belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisKind {
    Row,
    Column,
}

impl fmt::Display for AxisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AxisKind::Row => f.write_str("row"),
            AxisKind::Column => f.write_str("column"),
        }
    }
}

/// Section a row lives in. Sections are contiguous and always ordered
/// title, body, footer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowKind {
    Title,
    #[default]
    Body,
    Footer,
}

impl RowKind {
    pub const ALL: [RowKind; 3] = [RowKind::Title, RowKind::Body, RowKind::Footer];
}

impl fmt::Display for RowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowKind::Title => f.write_str("title"),
            RowKind::Body => f.write_str("body"),
            RowKind::Footer => f.write_str("footer"),
        }
    }
}

/// Monotonic id counters, one per axis kind.
///
/// Cloning shares the counters; use `IdSequence::new` for an independent family.
#[derive(Clone, Debug)]
pub struct IdSequence {
    rows: Arc<AtomicU64>,
    columns: Arc<AtomicU64>,
}

impl Default for IdSequence {
    fn default() -> Self {
        Self::new()
    }
}

impl IdSequence {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Counters that start at `start` (deterministic ids for tests and fixtures).
    pub fn starting_at(start: u64) -> Self {
        Self {
            rows: Arc::new(AtomicU64::new(start)),
            columns: Arc::new(AtomicU64::new(start)),
        }
    }

    /// Advance the counter for `kind` and return the value it held.
    pub fn next(&self, kind: AxisKind) -> u64 {
        let counter = match kind {
            AxisKind::Row => &self.rows,
            AxisKind::Column => &self.columns,
        };
        counter.fetch_add(1, Ordering::Relaxed)
    }

    /// Value the next call to `next(kind)` will return.
    pub fn peek(&self, kind: AxisKind) -> u64 {
        match kind {
            AxisKind::Row => self.rows.load(Ordering::Relaxed),
            AxisKind::Column => self.columns.load(Ordering::Relaxed),
        }
    }
}

/// Generate a fresh id for `kind`, skipping candidates for which `taken` is true.
///
/// The counter advances once per candidate, so a skipped value is never offered again.
pub fn generate_id(
    sequence: &IdSequence,
    kind: AxisKind,
    prefix: &str,
    taken: impl Fn(&str) -> bool,
) -> EntityId {
    loop {
        let candidate = format!("{}{}", prefix, sequence.next(kind));
        if !taken(&candidate) {
            return EntityId(candidate);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequences_are_independent_per_kind() {
        let seq = IdSequence::starting_at(10);
        assert_eq!(seq.next(AxisKind::Row), 10);
        assert_eq!(seq.next(AxisKind::Row), 11);
        assert_eq!(seq.next(AxisKind::Column), 10);
        assert_eq!(seq.peek(AxisKind::Row), 12);
    }

    #[test]
    fn test_cloned_sequence_shares_counters() {
        let a = IdSequence::new();
        let b = a.clone();
        a.next(AxisKind::Column);
        assert_eq!(b.next(AxisKind::Column), 2);
    }

    #[test]
    fn test_generate_id_skips_taken() {
        let seq = IdSequence::starting_at(1);
        let id = generate_id(&seq, AxisKind::Row, "_r", |c| c == "_r1" || c == "_r2");
        assert_eq!(id.as_str(), "_r3");
        // Skipped values are burned
        let id = generate_id(&seq, AxisKind::Row, "_r", |_| false);
        assert_eq!(id.as_str(), "_r4");
    }

    #[test]
    fn test_entity_id_comparisons() {
        let id = EntityId::from("r1");
        assert_eq!(id, "r1");
        assert_eq!(format!("{}", id), "r1");
        let borrowed: &str = id.borrow();
        assert_eq!(borrowed, "r1");
    }
}
