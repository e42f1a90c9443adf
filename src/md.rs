//! MD tag tokenization
//!
//! The MD tag records the reference bases at aligned positions where a read differs
//! from the reference. It interleaves three kinds of tokens:
//!
//! * a decimal run length of matching bases, e.g. `12`
//! * a `^` followed by the reference bases deleted from the read, e.g. `^AC`
//! * a single reference base where the read has a substitution, e.g. `T`
//!
//! `0` is a valid run length and separates adjacent substitutions (`1C0G1`).

use crate::error::{MdError, Result};
use crate::policy::MdPolicy;

/// A single token of an MD tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MdToken<'a> {
    /// Number of bases matching the reference
    MatchRun(usize),

    /// Reference bases absent from the read
    Deletion(&'a [u8]),

    /// Reference base where the read carries a different base
    Substitution(u8),
}
impl MdToken<'_> {
    /// Number of read bases this token covers
    #[must_use]
    pub fn query_len(&self) -> usize {
        match self {
            Self::MatchRun(n) => *n,
            Self::Deletion(_) => 0,
            Self::Substitution(_) => 1,
        }
    }

    /// Number of reference bases this token covers
    #[must_use]
    pub fn reference_len(&self) -> usize {
        match self {
            Self::MatchRun(n) => *n,
            Self::Deletion(bases) => bases.len(),
            Self::Substitution(_) => 1,
        }
    }
}

/// Splits an MD tag into its ordered tokens
///
/// Bytes that start no token are rejected under [`MdPolicy::Strict`] and skipped under
/// [`MdPolicy::Lenient`]. A run length that overflows is rejected under both policies.
///
/// # Examples
///
/// ```
/// # use bamnav::{tokenize_md, MdPolicy, MdToken};
/// let tokens = tokenize_md(b"2^NN1T", MdPolicy::Strict).unwrap();
/// assert_eq!(
///     tokens,
///     vec![
///         MdToken::MatchRun(2),
///         MdToken::Deletion(b"NN"),
///         MdToken::MatchRun(1),
///         MdToken::Substitution(b'T'),
///     ]
/// );
/// ```
pub fn tokenize_md(tag: &[u8], policy: MdPolicy) -> Result<Vec<MdToken<'_>>> {
    let mut tokens = Vec::new();
    let mut skipped = 0;
    let mut pos = 0;

    while pos < tag.len() {
        let byte = tag[pos];
        if byte.is_ascii_digit() {
            let start = pos;
            let mut run: usize = 0;
            while pos < tag.len() && tag[pos].is_ascii_digit() {
                run = run
                    .checked_mul(10)
                    .and_then(|run| run.checked_add(usize::from(tag[pos] - b'0')))
                    .ok_or(MdError::RunLengthOverflow { pos: start })?;
                pos += 1;
            }
            tokens.push(MdToken::MatchRun(run));
        } else if byte == b'^' {
            let end = tag[pos + 1..]
                .iter()
                .position(|b| !b.is_ascii_alphabetic())
                .map_or(tag.len(), |len| pos + 1 + len);
            if end == pos + 1 {
                if policy.is_strict() {
                    return Err(MdError::EmptyDeletion { pos }.into());
                }
                skipped += 1;
                pos += 1;
                continue;
            }
            tokens.push(MdToken::Deletion(&tag[pos + 1..end]));
            pos = end;
        } else if byte.is_ascii_alphabetic() {
            tokens.push(MdToken::Substitution(byte));
            pos += 1;
        } else {
            if policy.is_strict() {
                return Err(MdError::UnexpectedByte {
                    byte: char::from(byte),
                    pos,
                }
                .into());
            }
            skipped += 1;
            pos += 1;
        }
    }

    if skipped > 0 {
        log::warn!(
            "Skipped {skipped} unrecognized byte(s) in MD tag {:?}",
            String::from_utf8_lossy(tag)
        );
    }
    Ok(tokens)
}
