//! CIGAR (Compact Idiosyncratic Gapped Alignment Report) parsing
//!
//! A CIGAR describes how the bases of an aligned read relate to the reference as a
//! run-length encoded list of operations, e.g. `10M5I3D`.
//!
//! | Op  | Code | Kind        | Consumes query | Consumes reference |
//! |-----|------|-------------|----------------|--------------------|
//! | `M` | 0    | `Match`     | yes            | yes                |
//! | `I` | 1    | `Insertion` | yes            | no                 |
//! | `D` | 2    | `Deletion`  | no             | yes                |
//! | `N` | 3    | `Skip`      | no             | yes                |
//! | `S` | 4    | `SoftClip`  | yes            | no                 |
//! | `H` | 5    | `HardClip`  | no             | no                 |
//! | `P` | 6    | `Pad`       | no             | no                 |
//! | `=` | 7    | `Equal`     | yes            | yes                |
//! | `X` | 8    | `Diff`      | yes            | yes                |
//! | `B` | 9    | `Back`      | no             | no                 |
//!
//! `B` is recognized by the parser but carries no consumption semantics here.

use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

use crate::error::{CigarError, Error, Result};

/// The kind of a single CIGAR operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CigarOpKind {
    /// Alignment match, may be a sequence match or mismatch (`M`)
    Match,
    /// Insertion to the reference (`I`)
    Insertion,
    /// Deletion from the reference (`D`)
    Deletion,
    /// Skipped region from the reference, e.g. an intron (`N`)
    Skip,
    /// Soft clipping, bases present in the query (`S`)
    SoftClip,
    /// Hard clipping, bases absent from the query (`H`)
    HardClip,
    /// Silent deletion from the padded reference (`P`)
    Pad,
    /// Sequence match (`=`)
    Equal,
    /// Sequence mismatch (`X`)
    Diff,
    /// Back (`B`)
    Back,
}
impl CigarOpKind {
    const ALL: [Self; 10] = [
        Self::Match,
        Self::Insertion,
        Self::Deletion,
        Self::Skip,
        Self::SoftClip,
        Self::HardClip,
        Self::Pad,
        Self::Equal,
        Self::Diff,
        Self::Back,
    ];

    /// Maps a SAM operation character to its kind
    #[must_use]
    pub fn from_char(c: char) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_char() == c)
    }

    /// Maps a BAM numeric operation code to its kind
    #[must_use]
    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    #[must_use]
    pub fn as_char(self) -> char {
        match self {
            Self::Match => 'M',
            Self::Insertion => 'I',
            Self::Deletion => 'D',
            Self::Skip => 'N',
            Self::SoftClip => 'S',
            Self::HardClip => 'H',
            Self::Pad => 'P',
            Self::Equal => '=',
            Self::Diff => 'X',
            Self::Back => 'B',
        }
    }

    /// BAM numeric operation code
    #[must_use]
    pub fn code(self) -> u32 {
        self as u32
    }

    #[must_use]
    pub fn consumes_query(self) -> bool {
        matches!(
            self,
            Self::Match | Self::Insertion | Self::SoftClip | Self::Equal | Self::Diff
        )
    }

    #[must_use]
    pub fn consumes_reference(self) -> bool {
        matches!(
            self,
            Self::Match | Self::Deletion | Self::Skip | Self::Equal | Self::Diff
        )
    }
}

impl fmt::Display for CigarOpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// A single CIGAR operation: a kind and a run length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CigarOp {
    pub kind: CigarOpKind,
    pub len: u32,
}
impl CigarOp {
    #[must_use]
    pub fn new(kind: CigarOpKind, len: u32) -> Self {
        Self { kind, len }
    }

    /// Decodes the BAM binary representation (`len << 4 | code`)
    pub fn from_packed(packed: u32) -> Result<Self> {
        let code = packed & 0x0F;
        let kind = CigarOpKind::from_code(code).ok_or(CigarError::UnknownOpCode(code))?;
        Ok(Self::new(kind, packed >> 4))
    }

    /// Encodes into the BAM binary representation (`len << 4 | code`)
    #[must_use]
    pub fn packed(self) -> u32 {
        (self.len << 4) | self.kind.code()
    }
}

impl fmt::Display for CigarOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.len, self.kind)
    }
}

/// Parses a CIGAR string into its ordered operations
///
/// The text must be a sequence of `<digits><op>` tokens. An empty string yields no
/// operations.
///
/// # Examples
///
/// ```
/// # use bamnav::{parse_cigar, CigarOp, CigarOpKind};
/// let ops = parse_cigar("10M5I3D").unwrap();
/// assert_eq!(
///     ops,
///     vec![
///         CigarOp::new(CigarOpKind::Match, 10),
///         CigarOp::new(CigarOpKind::Insertion, 5),
///         CigarOp::new(CigarOpKind::Deletion, 3),
///     ]
/// );
/// assert!(parse_cigar("10Q").is_err());
/// ```
pub fn parse_cigar(text: &str) -> Result<Vec<CigarOp>> {
    let mut ops = Vec::new();

    // pending length and the position its digits started at
    let mut pending: Option<(u32, usize)> = None;

    for (pos, c) in text.char_indices() {
        if let Some(digit) = c.to_digit(10) {
            let (len, start) = pending.unwrap_or((0, pos));
            let len = len
                .checked_mul(10)
                .and_then(|len| len.checked_add(digit))
                .ok_or(CigarError::LengthOverflow { pos: start })?;
            pending = Some((len, start));
        } else if let Some(kind) = CigarOpKind::from_char(c) {
            let Some((len, _)) = pending.take() else {
                return Err(CigarError::MissingLength { op: c, pos }.into());
            };
            ops.push(CigarOp::new(kind, len));
        } else {
            return Err(CigarError::UnexpectedByte { byte: c, pos }.into());
        }
    }
    if let Some((_, start)) = pending {
        return Err(CigarError::TrailingLength { pos: start }.into());
    }
    Ok(ops)
}

/// An owned, ordered list of CIGAR operations
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Cigar(Vec<CigarOp>);
impl Cigar {
    #[must_use]
    pub fn new(ops: Vec<CigarOp>) -> Self {
        Self(ops)
    }

    /// Decodes a slice of BAM packed operations
    pub fn from_packed(packed: &[u32]) -> Result<Self> {
        packed
            .iter()
            .map(|&op| CigarOp::from_packed(op))
            .collect::<Result<Vec<_>>>()
            .map(Self)
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<CigarOp> {
        self.0
    }

    /// Number of query bases the alignment spans (including soft clips)
    #[must_use]
    pub fn query_len(&self) -> u64 {
        self.0
            .iter()
            .filter(|op| op.kind.consumes_query())
            .map(|op| u64::from(op.len))
            .sum()
    }

    /// Number of reference bases the alignment spans
    #[must_use]
    pub fn reference_len(&self) -> u64 {
        self.0
            .iter()
            .filter(|op| op.kind.consumes_reference())
            .map(|op| u64::from(op.len))
            .sum()
    }
}

impl Deref for Cigar {
    type Target = [CigarOp];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<CigarOp>> for Cigar {
    fn from(ops: Vec<CigarOp>) -> Self {
        Self(ops)
    }
}

impl FromStr for Cigar {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_cigar(s).map(Self)
    }
}

impl fmt::Display for Cigar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.iter().try_for_each(|op| write!(f, "{op}"))
    }
}

impl<'a> IntoIterator for &'a Cigar {
    type Item = &'a CigarOp;
    type IntoIter = std::slice::Iter<'a, CigarOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::CigarOpKind::{
        Back, Deletion, Diff, Equal, HardClip, Insertion, Match, Pad, Skip, SoftClip,
    };
    use super::*;

    // ==================== Parsing Tests ====================

    #[test]
    fn test_parse_simple() {
        let ops = parse_cigar("10M5I3D").unwrap();
        assert_eq!(
            ops,
            vec![
                CigarOp::new(Match, 10),
                CigarOp::new(Insertion, 5),
                CigarOp::new(Deletion, 3)
            ]
        );
    }

    #[test]
    fn test_parse_all_kinds() {
        let ops = parse_cigar("1M2I3D4N5S6H7P8=9X10B").unwrap();
        let kinds: Vec<_> = ops.iter().map(|op| op.kind).collect();
        assert_eq!(
            kinds,
            vec![Match, Insertion, Deletion, Skip, SoftClip, HardClip, Pad, Equal, Diff, Back]
        );
        let lens: Vec<_> = ops.iter().map(|op| op.len).collect();
        assert_eq!(lens, (1..=10).collect::<Vec<u32>>());
    }

    #[test]
    fn test_parse_empty() {
        assert!(parse_cigar("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_zero_length() {
        assert_eq!(parse_cigar("0M").unwrap(), vec![CigarOp::new(Match, 0)]);
    }

    #[test]
    fn test_parse_max_length() {
        let ops = parse_cigar("4294967295M").unwrap();
        assert_eq!(ops[0].len, u32::MAX);
    }

    // ==================== Malformed Input Tests ====================

    #[test]
    fn test_parse_unknown_op() {
        let err = parse_cigar("10Q").unwrap_err();
        assert!(err.is_malformed_cigar());
        assert!(matches!(
            err,
            Error::CigarError(CigarError::UnexpectedByte { byte: 'Q', pos: 2 })
        ));
    }

    #[test]
    fn test_parse_lowercase_rejected() {
        assert!(parse_cigar("10m").unwrap_err().is_malformed_cigar());
    }

    #[test]
    fn test_parse_missing_length() {
        let err = parse_cigar("5MI").unwrap_err();
        assert!(matches!(
            err,
            Error::CigarError(CigarError::MissingLength { op: 'I', pos: 2 })
        ));
    }

    #[test]
    fn test_parse_trailing_digits() {
        let err = parse_cigar("5M12").unwrap_err();
        assert!(matches!(
            err,
            Error::CigarError(CigarError::TrailingLength { pos: 2 })
        ));
    }

    #[test]
    fn test_parse_overflow() {
        let err = parse_cigar("4294967296M").unwrap_err();
        assert!(matches!(
            err,
            Error::CigarError(CigarError::LengthOverflow { pos: 0 })
        ));
    }

    #[test]
    fn test_parse_rejects_whitespace_and_star() {
        assert!(parse_cigar("5M 3I").is_err());
        assert!(parse_cigar("*").is_err());
    }

    // ==================== Packed Representation Tests ====================

    #[test]
    fn test_from_packed() {
        // 100M = 100 << 4 | 0
        assert_eq!(CigarOp::from_packed(1600).unwrap(), CigarOp::new(Match, 100));
        assert_eq!(CigarOp::from_packed((7 << 4) | 9).unwrap(), CigarOp::new(Back, 7));
    }

    #[test]
    fn test_from_packed_invalid_code() {
        let err = CigarOp::from_packed((3 << 4) | 12).unwrap_err();
        assert!(matches!(
            err,
            Error::CigarError(CigarError::UnknownOpCode(12))
        ));
    }

    #[test]
    fn test_packed_matches_codes() {
        for (code, kind) in CigarOpKind::ALL.into_iter().enumerate() {
            let op = CigarOp::new(kind, 42);
            assert_eq!(op.packed(), (42 << 4) | code as u32);
            assert_eq!(CigarOpKind::from_code(code as u32), Some(kind));
        }
        assert_eq!(CigarOpKind::from_code(10), None);
    }

    // ==================== Cigar Tests ====================

    #[test]
    fn test_cigar_display_round_trip() {
        let text = "3S10M2I1D4N5=1X2H";
        let cigar: Cigar = text.parse().unwrap();
        assert_eq!(cigar.to_string(), text);
        assert_eq!(cigar.len(), 8);
    }

    #[test]
    fn test_cigar_lengths() {
        let cigar: Cigar = "3S10M2I1D4N5=1X2H".parse().unwrap();
        assert_eq!(cigar.query_len(), 3 + 10 + 2 + 5 + 1);
        assert_eq!(cigar.reference_len(), 10 + 1 + 4 + 5 + 1);
    }

    #[test]
    fn test_cigar_back_consumes_nothing() {
        let cigar: Cigar = "4M2B".parse().unwrap();
        assert_eq!(cigar.query_len(), 4);
        assert_eq!(cigar.reference_len(), 4);
    }

    #[test]
    fn test_cigar_from_packed_slice() {
        let cigar = Cigar::from_packed(&[(5 << 4) | 4, 20 << 4]).unwrap();
        assert_eq!(cigar.to_string(), "5S20M");
        assert!(Cigar::from_packed(&[15]).is_err());
    }
}
