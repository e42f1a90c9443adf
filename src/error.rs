/// Custom Result type for bamnav operations, wrapping the custom [`Error`] type
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for the bamnav library, encompassing all possible error cases
/// that can occur while addressing, parsing or reconstructing alignment data.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Errors related to virtual offsets
    #[error("Error processing virtual offset: {0}")]
    OffsetError(#[from] OffsetError),

    /// Errors related to CIGAR parsing
    #[error("Error parsing CIGAR: {0}")]
    CigarError(#[from] CigarError),

    /// Errors related to MD tag parsing
    #[error("Error parsing MD tag: {0}")]
    MdError(#[from] MdError),

    /// Errors that occur while rebuilding a reference sequence
    #[error("Error reconstructing reference: {0}")]
    ReconstructError(#[from] ReconstructError),

    /// Standard I/O errors
    #[error("Error with IO: {0}")]
    IoError(#[from] std::io::Error),
}
impl Error {
    /// Checks if the error is an out-of-range virtual offset component
    #[must_use]
    pub fn is_out_of_range(&self) -> bool {
        match self {
            Self::OffsetError(err) => err.is_out_of_range(),
            _ => false,
        }
    }

    /// Checks if the error was raised while parsing a CIGAR string
    #[must_use]
    pub fn is_malformed_cigar(&self) -> bool {
        matches!(self, Self::CigarError(_))
    }

    /// Checks if the error was raised while tokenizing an MD tag
    #[must_use]
    pub fn is_malformed_md(&self) -> bool {
        matches!(self, Self::MdError(_))
    }
}

/// Errors specific to building and viewing virtual offsets
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OffsetError {
    /// The within-block offset does not fit in 16 bits
    #[error("Require 0 <= within_block_offset < 2**16, got {0}")]
    WithinBlockOutOfRange(i128),

    /// The block start offset does not fit in 48 bits
    #[error("Require 0 <= block_start_offset < 2**48, got {0}")]
    BlockStartOutOfRange(i128),

    /// A byte buffer is not a whole number of 8-byte offsets
    #[error("Byte length {0} is not a multiple of 8")]
    InvalidSliceLength(usize),

    /// A byte buffer is not aligned for a zero-copy offset view
    #[error("Unable to cast bytes to virtual offsets - likely an alignment error")]
    Misaligned,
}
impl OffsetError {
    /// Checks if this error reports a component outside its bit-width domain
    #[must_use]
    pub fn is_out_of_range(&self) -> bool {
        matches!(
            self,
            Self::WithinBlockOutOfRange(_) | Self::BlockStartOutOfRange(_)
        )
    }
}

/// Errors that can occur while parsing a CIGAR string or a packed CIGAR operation
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CigarError {
    /// A byte that is neither a digit nor an operation code
    #[error("Unexpected byte {byte:?} at position {pos}")]
    UnexpectedByte { byte: char, pos: usize },

    /// An operation code without a preceding length
    #[error("Operation {op:?} at position {pos} has no length")]
    MissingLength { op: char, pos: usize },

    /// An operation length that does not fit in 32 bits
    #[error("Operation length starting at position {pos} overflows u32")]
    LengthOverflow { pos: usize },

    /// Digits at the end of the string with no operation code
    #[error("Trailing length without operation at position {pos}")]
    TrailingLength { pos: usize },

    /// A packed operation with a code outside 0..=9
    #[error("Invalid CIGAR operation code: {0}")]
    UnknownOpCode(u32),
}

/// Errors that can occur while tokenizing an MD tag in strict mode
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MdError {
    /// A byte that starts none of the recognized tokens
    #[error("Unexpected byte {byte:?} at position {pos}")]
    UnexpectedByte { byte: char, pos: usize },

    /// A `^` with no deleted bases after it
    #[error("Deletion marker at position {pos} is not followed by any bases")]
    EmptyDeletion { pos: usize },

    /// A match run length that does not fit in a usize
    #[error("Match run starting at position {pos} overflows")]
    RunLengthOverflow { pos: usize },
}

/// Errors that can occur while rebuilding a reference sequence
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconstructError {
    /// An edit consumed more query bases than the sequence holds
    #[error("Edit requires query bases up to {needed} but the sequence has {available}")]
    QueryExhausted { needed: usize, available: usize },

    /// A CIGAR operation that the reconstruction path cannot honour
    #[error("Invalid CIGAR operation for reconstruction: {0}")]
    InvalidCigarOperation(char),

    /// The CIGAR and the MD tag describe different alignments
    #[error("CIGAR and MD tag disagree: {0}")]
    MdCigarMismatch(String),
}
