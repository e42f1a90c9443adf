//! Reference sequence reconstruction
//!
//! An aligned read carries two compact descriptions of the reference it was aligned
//! against. The CIGAR knows where bases were inserted, clipped or deleted but not which
//! reference bases were involved; the MD tag knows the literal reference bases at
//! mismatches and deletions but is blind to insertions and clips.
//!
//! [`Reconstructor`] offers three paths:
//!
//! * [`Reconstructor::from_cigar`] rebuilds what the CIGAR alone can represent; deleted
//!   and skipped reference bases become placeholders.
//! * [`Reconstructor::from_md`] rebuilds what the MD tag alone can represent, assuming
//!   the query has no insertions or clips.
//! * [`Reconstructor::reconstruct`] walks both in lock-step and yields the full
//!   reference span covered by the alignment.

use crate::cigar::{CigarOp, CigarOpKind};
use crate::error::{ReconstructError, Result};
use crate::md::{tokenize_md, MdToken};
use crate::policy::{MdPolicy, QueryPolicy};
use crate::DEFAULT_PLACEHOLDER;

/// Configuration for rebuilding reference sequences
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconstructor {
    /// Base emitted for reference positions whose content is unknown
    placeholder: u8,

    /// How unrecognized bytes in MD tags are handled
    md_policy: MdPolicy,

    /// How single-encoding paths handle a query shorter than the encoding
    query_policy: QueryPolicy,
}
impl Default for Reconstructor {
    fn default() -> Self {
        Self {
            placeholder: DEFAULT_PLACEHOLDER,
            md_policy: MdPolicy::default(),
            query_policy: QueryPolicy::default(),
        }
    }
}
impl Reconstructor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_placeholder(mut self, placeholder: u8) -> Self {
        self.placeholder = placeholder;
        self
    }

    #[must_use]
    pub fn with_md_policy(mut self, md_policy: MdPolicy) -> Self {
        self.md_policy = md_policy;
        self
    }

    #[must_use]
    pub fn with_query_policy(mut self, query_policy: QueryPolicy) -> Self {
        self.query_policy = query_policy;
        self
    }

    #[must_use]
    pub fn placeholder(&self) -> u8 {
        self.placeholder
    }

    #[must_use]
    pub fn md_policy(&self) -> MdPolicy {
        self.md_policy
    }

    #[must_use]
    pub fn query_policy(&self) -> QueryPolicy {
        self.query_policy
    }

    /// Query bases in `cursor..cursor + len`, clipped to the query unless the query
    /// policy is strict
    fn take<'q>(&self, query: &'q [u8], cursor: usize, len: usize) -> Result<&'q [u8]> {
        if self.query_policy.is_strict() {
            return query_slice(query, cursor, len);
        }
        let start = cursor.min(query.len());
        let end = cursor.saturating_add(len).min(query.len());
        Ok(&query[start..end])
    }

    /// Rebuilds the reference to the extent the CIGAR can represent it
    ///
    /// Inserted and soft-clipped query bases are dropped, deleted and skipped reference
    /// bases are filled with the placeholder. Hard clips, pads and `B` operations have
    /// no effect. A query shorter than the CIGAR is handled by the [`QueryPolicy`].
    pub fn from_cigar(&self, query: &[u8], cigar: &[CigarOp]) -> Result<Vec<u8>> {
        let mut reference = Vec::with_capacity(query.len());
        let mut cursor = 0;
        for op in cigar {
            let len = op.len as usize;
            match op.kind {
                CigarOpKind::Match | CigarOpKind::Equal | CigarOpKind::Diff => {
                    reference.extend_from_slice(self.take(query, cursor, len)?);
                    cursor += len;
                }
                CigarOpKind::Insertion | CigarOpKind::SoftClip => {
                    self.take(query, cursor, len)?;
                    cursor += len;
                }
                CigarOpKind::Deletion | CigarOpKind::Skip => {
                    reference.resize(reference.len() + len, self.placeholder);
                }
                CigarOpKind::HardClip | CigarOpKind::Pad | CigarOpKind::Back => {}
            }
        }
        Ok(reference)
    }

    /// Rebuilds the reference to the extent the MD tag can represent it
    ///
    /// Match runs copy query bases, deletions insert their literal bases and
    /// substitutions replace one query base with the recorded reference base. A query
    /// shorter than the tag is handled by the [`QueryPolicy`].
    pub fn from_md(&self, query: &[u8], md: &[u8]) -> Result<Vec<u8>> {
        let mut reference = Vec::with_capacity(query.len());
        let mut cursor = 0;
        for token in tokenize_md(md, self.md_policy)? {
            match token {
                MdToken::MatchRun(n) => {
                    reference.extend_from_slice(self.take(query, cursor, n)?);
                    cursor += n;
                }
                MdToken::Deletion(bases) => reference.extend_from_slice(bases),
                MdToken::Substitution(base) => {
                    self.take(query, cursor, 1)?;
                    reference.push(base);
                    cursor += 1;
                }
            }
        }
        Ok(reference)
    }

    /// Rebuilds the full reference span of an alignment from its CIGAR and MD tag
    ///
    /// The CIGAR decides which query bases take part in the alignment and where the
    /// reference has extra bases; the MD tag supplies the literal reference bases:
    ///
    /// * `M`, `=`, `X`: each aligned position is the query base inside an MD match run,
    ///   or the MD base at a substitution
    /// * `D`: the next MD token must be a deletion of the same length; its bases are
    ///   emitted
    /// * `N`: placeholders, since the MD tag does not describe skipped regions
    /// * `I`, `S`: query bases are skipped
    /// * `H`, `P`: no effect
    /// * `B`: rejected with [`ReconstructError::InvalidCigarOperation`]
    ///
    /// Any disagreement between the two encodings fails with
    /// [`ReconstructError::MdCigarMismatch`]. A query shorter than the CIGAR fails with
    /// [`ReconstructError::QueryExhausted`] regardless of the [`QueryPolicy`].
    pub fn reconstruct(&self, query: &[u8], cigar: &[CigarOp], md: &[u8]) -> Result<Vec<u8>> {
        let tokens = tokenize_md(md, self.md_policy)?;
        let num_tokens = tokens.len();
        let mut md_cursor = MdCursor::new(tokens);

        let mut reference = Vec::with_capacity(query.len());
        let mut cursor = 0;
        for op in cigar {
            let len = op.len as usize;
            match op.kind {
                CigarOpKind::Match | CigarOpKind::Equal | CigarOpKind::Diff => {
                    let aligned = query_slice(query, cursor, len)?;
                    md_cursor.aligned(aligned, &mut reference)?;
                    cursor += len;
                }
                CigarOpKind::Insertion | CigarOpKind::SoftClip => {
                    query_slice(query, cursor, len)?;
                    cursor += len;
                }
                CigarOpKind::Deletion => {
                    reference.extend_from_slice(md_cursor.deletion(len)?);
                }
                CigarOpKind::Skip => {
                    reference.resize(reference.len() + len, self.placeholder);
                }
                CigarOpKind::HardClip | CigarOpKind::Pad => {}
                CigarOpKind::Back => {
                    return Err(ReconstructError::InvalidCigarOperation(op.kind.as_char()).into());
                }
            }
        }
        md_cursor.finish()?;

        log::debug!(
            "Reconstructed {} reference bases from {} CIGAR operations and {num_tokens} MD tokens",
            reference.len(),
            cigar.len(),
        );
        Ok(reference)
    }
}

/// Rebuilds the reference from a CIGAR with the default configuration
pub fn reconstruct_from_cigar(query: &[u8], cigar: &[CigarOp]) -> Result<Vec<u8>> {
    Reconstructor::default().from_cigar(query, cigar)
}

/// Rebuilds the reference from an MD tag with the default configuration
pub fn reconstruct_from_md(query: &[u8], md: &[u8]) -> Result<Vec<u8>> {
    Reconstructor::default().from_md(query, md)
}

/// Rebuilds the full reference span from a CIGAR and an MD tag with the default
/// configuration
pub fn reconstruct_reference(query: &[u8], cigar: &[CigarOp], md: &[u8]) -> Result<Vec<u8>> {
    Reconstructor::default().reconstruct(query, cigar, md)
}

/// Returns `query[cursor..cursor + len]` or fails if the query is too short
fn query_slice(query: &[u8], cursor: usize, len: usize) -> Result<&[u8]> {
    let end = cursor.saturating_add(len);
    query.get(cursor..end).ok_or_else(|| {
        ReconstructError::QueryExhausted {
            needed: end,
            available: query.len(),
        }
        .into()
    })
}

fn mismatch(reason: String) -> crate::Error {
    ReconstructError::MdCigarMismatch(reason).into()
}

/// Position within a tokenized MD tag, tracking partial consumption of match runs
struct MdCursor<'a> {
    tokens: Vec<MdToken<'a>>,
    idx: usize,

    /// Bases left in the current match run
    remaining: usize,
}
impl<'a> MdCursor<'a> {
    fn new(tokens: Vec<MdToken<'a>>) -> Self {
        let remaining = match tokens.first() {
            Some(MdToken::MatchRun(n)) => *n,
            _ => 0,
        };
        Self {
            tokens,
            idx: 0,
            remaining,
        }
    }

    fn current(&self) -> Option<MdToken<'a>> {
        self.tokens.get(self.idx).copied()
    }

    fn advance(&mut self) {
        self.idx += 1;
        self.remaining = match self.current() {
            Some(MdToken::MatchRun(n)) => n,
            _ => 0,
        };
    }

    fn skip_exhausted_runs(&mut self) {
        while matches!(self.current(), Some(MdToken::MatchRun(_))) && self.remaining == 0 {
            self.advance();
        }
    }

    /// Emits the reference bases for a run of aligned query bases
    fn aligned(&mut self, query: &[u8], reference: &mut Vec<u8>) -> Result<()> {
        let mut offset = 0;
        while offset < query.len() {
            self.skip_exhausted_runs();
            match self.current() {
                Some(MdToken::MatchRun(_)) => {
                    let take = self.remaining.min(query.len() - offset);
                    reference.extend_from_slice(&query[offset..offset + take]);
                    self.remaining -= take;
                    offset += take;
                }
                Some(MdToken::Substitution(base)) => {
                    reference.push(base);
                    offset += 1;
                    self.advance();
                }
                Some(MdToken::Deletion(bases)) => {
                    return Err(mismatch(format!(
                        "MD deletion of {} bases falls inside aligned CIGAR bases",
                        bases.len()
                    )));
                }
                None => {
                    return Err(mismatch(format!(
                        "MD tag ends with {} aligned CIGAR bases left",
                        query.len() - offset
                    )));
                }
            }
        }
        Ok(())
    }

    /// Consumes the deletion token matching a CIGAR deletion of `len` bases
    fn deletion(&mut self, len: usize) -> Result<&'a [u8]> {
        self.skip_exhausted_runs();
        match self.current() {
            Some(MdToken::Deletion(bases)) if bases.len() == len => {
                self.advance();
                Ok(bases)
            }
            Some(MdToken::Deletion(bases)) => Err(mismatch(format!(
                "CIGAR deletion of {len} bases but MD deletion of {} bases",
                bases.len()
            ))),
            _ => Err(mismatch(format!(
                "CIGAR deletion of {len} bases has no MD deletion"
            ))),
        }
    }

    /// Ensures the MD tag describes nothing beyond the CIGAR
    fn finish(&mut self) -> Result<()> {
        self.skip_exhausted_runs();
        let extra = match self.current() {
            None => return Ok(()),
            Some(MdToken::MatchRun(_)) => self.remaining,
            Some(token) => token.reference_len(),
        };
        Err(mismatch(format!(
            "MD tag describes at least {extra} reference bases beyond the CIGAR"
        )))
    }
}
