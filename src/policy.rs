//! Reconstruction policies
//!
//! An MD tag may contain bytes that start none of the recognized tokens, e.g. stray
//! punctuation or a `^` with no deleted bases after it. An encoding may also describe
//! more query bases than the read carries, e.g. a record whose sequence is `*`. This
//! module defines how each of these is handled.

/// Policy for handling unrecognized bytes while tokenizing an MD tag
///
/// The default policy is `Strict`, which rejects the tag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MdPolicy {
    /// Fail with an error on the first unrecognized byte (default policy)
    #[default]
    Strict,

    /// Skip unrecognized bytes and keep tokenizing, logging one warning per tag
    Lenient,
}
impl MdPolicy {
    #[must_use]
    pub fn is_strict(self) -> bool {
        matches!(self, Self::Strict)
    }
}

/// Policy for single-encoding reconstruction when the query is shorter than the encoding
///
/// The default policy is `Truncate`. Combined CIGAR and MD reconstruction always fails
/// on a short query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QueryPolicy {
    /// Copy whatever query bases remain; substitutions and deletions are still emitted
    /// (default policy)
    #[default]
    Truncate,

    /// Fail with [`ReconstructError::QueryExhausted`](crate::ReconstructError::QueryExhausted)
    Strict,
}
impl QueryPolicy {
    #[must_use]
    pub fn is_strict(self) -> bool {
        matches!(self, Self::Strict)
    }
}
