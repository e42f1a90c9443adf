//! BGZF virtual file offsets
//!
//! Indexes over block-compressed archives record read positions as a single 64-bit
//! "virtual offset" that combines two positions:
//!
//! ```text
//!  63                                  16 15              0
//! ┌──────────────────────────────────────┬─────────────────┐
//! │  block start (compressed file byte)  │  within block   │
//! └──────────────────────────────────────┴─────────────────┘
//! ```
//!
//! The block start is the file offset of the compressed block (up to 48 bits) and the
//! within-block offset is a position inside the decompressed block (16 bits).
//! Because the block start occupies the high bits, comparing two packed offsets as plain
//! unsigned integers orders them exactly as comparing `(block_start, within_block)` pairs.

use std::fmt;
use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use bytemuck::{Pod, Zeroable};

use crate::error::{OffsetError, Result};

/// Number of bits used by the within-block component
pub const WITHIN_BLOCK_BITS: u32 = 16;

/// Exclusive upper bound of the within-block component (`2^16`)
pub const MAX_WITHIN_BLOCK: u64 = 1 << WITHIN_BLOCK_BITS;

/// Exclusive upper bound of the block start component (`2^48`)
pub const MAX_BLOCK_START: u64 = 1 << (64 - WITHIN_BLOCK_BITS);

const WITHIN_BLOCK_MASK: u64 = MAX_WITHIN_BLOCK - 1;

/// Compute a virtual offset from block start and within-block offsets
///
/// Both arguments accept any integer type losslessly convertible to `i128`, so values
/// read from signed index fields are validated rather than silently reinterpreted.
///
/// # Errors
///
/// * [`OffsetError::WithinBlockOutOfRange`] unless `0 <= within_block < 2^16`
/// * [`OffsetError::BlockStartOutOfRange`] unless `0 <= block_start < 2^48`
///
/// # Examples
///
/// ```
/// # use bamnav::make_virtual_offset;
/// assert_eq!(make_virtual_offset(0u64, 0u64).unwrap(), 0);
/// assert_eq!(make_virtual_offset(0u64, 65535u64).unwrap(), 65535);
/// assert!(make_virtual_offset(0u64, 65536u64).is_err());
/// assert!(make_virtual_offset(-1i64, 0i64).is_err());
/// ```
#[allow(clippy::cast_sign_loss)]
pub fn make_virtual_offset(
    block_start: impl Into<i128>,
    within_block: impl Into<i128>,
) -> Result<u64> {
    let block_start = block_start.into();
    let within_block = within_block.into();
    if !(0..i128::from(MAX_WITHIN_BLOCK)).contains(&within_block) {
        return Err(OffsetError::WithinBlockOutOfRange(within_block).into());
    }
    if !(0..i128::from(MAX_BLOCK_START)).contains(&block_start) {
        return Err(OffsetError::BlockStartOutOfRange(block_start).into());
    }
    Ok(((block_start as u64) << WITHIN_BLOCK_BITS) | within_block as u64)
}

/// Divide a virtual offset into its block start and within-block offsets
///
/// Every 64-bit value splits into a pair; no validation is performed.
///
/// ```
/// # use bamnav::split_virtual_offset;
/// assert_eq!(split_virtual_offset(6_553_600_000), (100_000, 0));
/// assert_eq!(split_virtual_offset(6_553_600_010), (100_000, 10));
/// ```
#[must_use]
pub fn split_virtual_offset(offset: u64) -> (u64, u64) {
    (offset >> WITHIN_BLOCK_BITS, offset & WITHIN_BLOCK_MASK)
}

/// A validated, ordered virtual file offset
///
/// This is stored identically in memory and on disk (as a little-endian `u64` on
/// little-endian hosts), so index arrays can be viewed in place with
/// [`VirtualOffset::slice_from_bytes`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Zeroable, Pod)]
#[repr(transparent)]
pub struct VirtualOffset(u64);
impl VirtualOffset {
    /// Creates a virtual offset from its two components
    pub fn new(block_start: u64, within_block: u64) -> Result<Self> {
        make_virtual_offset(block_start, within_block).map(Self)
    }

    /// Wraps a raw packed value without validation
    #[must_use]
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw packed value
    #[must_use]
    pub fn as_raw(self) -> u64 {
        self.0
    }

    /// File offset of the compressed block
    #[must_use]
    pub fn block_start(self) -> u64 {
        self.0 >> WITHIN_BLOCK_BITS
    }

    /// Offset inside the decompressed block
    #[must_use]
    pub fn within_block(self) -> u16 {
        (self.0 & WITHIN_BLOCK_MASK) as u16
    }

    /// Returns `(block_start, within_block)`
    #[must_use]
    pub fn split(self) -> (u64, u64) {
        split_virtual_offset(self.0)
    }

    /// Views a byte buffer of packed offsets without copying
    ///
    /// The buffer must be a whole number of 8-byte words and aligned to 8 bytes.
    pub fn slice_from_bytes(bytes: &[u8]) -> Result<&[Self]> {
        if bytes.len() % size_of::<Self>() != 0 {
            return Err(OffsetError::InvalidSliceLength(bytes.len()).into());
        }
        bytemuck::try_cast_slice(bytes).map_err(|_| OffsetError::Misaligned.into())
    }

    /// Returns the byte representation of a slice of offsets
    #[must_use]
    pub fn slice_as_bytes(offsets: &[Self]) -> &[u8] {
        bytemuck::cast_slice(offsets)
    }
}

impl From<VirtualOffset> for u64 {
    fn from(offset: VirtualOffset) -> Self {
        offset.0
    }
}

impl From<u64> for VirtualOffset {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for VirtualOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.block_start(), self.within_block())
    }
}

/// Reads a single little-endian virtual offset
pub fn read_virtual_offset<R: Read>(reader: &mut R) -> Result<VirtualOffset> {
    Ok(VirtualOffset(reader.read_u64::<LittleEndian>()?))
}

/// Writes a single virtual offset in little-endian format
pub fn write_virtual_offset<W: Write>(writer: &mut W, offset: VirtualOffset) -> Result<()> {
    writer.write_u64::<LittleEndian>(offset.0)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    // ==================== Encoding Tests ====================

    #[test]
    fn test_make_zero() {
        assert_eq!(make_virtual_offset(0u64, 0u64).unwrap(), 0);
        assert_eq!(make_virtual_offset(0u64, 1u64).unwrap(), 1);
    }

    #[test]
    fn test_make_within_block_boundary() {
        assert_eq!(make_virtual_offset(0u64, 65535u64).unwrap(), 65535);

        let err = make_virtual_offset(0u64, 65536u64).unwrap_err();
        assert!(err.is_out_of_range());
        assert!(matches!(
            err,
            Error::OffsetError(OffsetError::WithinBlockOutOfRange(65536))
        ));
    }

    #[test]
    fn test_make_block_start_boundary() {
        let max = MAX_BLOCK_START - 1;
        assert_eq!(make_virtual_offset(max, 0u64).unwrap(), max << 16);

        let err = make_virtual_offset(MAX_BLOCK_START, 0u64).unwrap_err();
        assert!(matches!(
            err,
            Error::OffsetError(OffsetError::BlockStartOutOfRange(_))
        ));
    }

    #[test]
    fn test_make_negative_components() {
        assert!(make_virtual_offset(-1i64, 0i64).unwrap_err().is_out_of_range());
        assert!(make_virtual_offset(0i64, -1i64).unwrap_err().is_out_of_range());
        assert!(make_virtual_offset(i64::MIN, i64::MIN)
            .unwrap_err()
            .is_out_of_range());
    }

    #[test]
    fn test_within_block_checked_first() {
        let err = make_virtual_offset(-1i64, 70_000i64).unwrap_err();
        assert!(matches!(
            err,
            Error::OffsetError(OffsetError::WithinBlockOutOfRange(70_000))
        ));
    }

    // ==================== Decoding Tests ====================

    #[test]
    fn test_split_known_values() {
        assert_eq!(split_virtual_offset(6_553_600_000), (100_000, 0));
        assert_eq!(split_virtual_offset(6_553_600_010), (100_000, 10));
    }

    #[test]
    fn test_split_is_total() {
        let (block_start, within_block) = split_virtual_offset(u64::MAX);
        assert_eq!(block_start, MAX_BLOCK_START - 1);
        assert_eq!(within_block, 0xFFFF);
    }

    #[test]
    fn test_round_trip_random() {
        let mut rng = SmallRng::seed_from_u64(42);
        for _ in 0..1_000 {
            let block_start = rng.random_range(0..MAX_BLOCK_START);
            let within_block = rng.random_range(0..MAX_WITHIN_BLOCK);
            let offset = make_virtual_offset(block_start, within_block).unwrap();
            assert_eq!(split_virtual_offset(offset), (block_start, within_block));
        }
    }

    #[test]
    fn test_ordering_matches_components() {
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..1_000 {
            let a = (rng.random_range(0..1024u64), rng.random_range(0..MAX_WITHIN_BLOCK));
            let b = (rng.random_range(0..1024u64), rng.random_range(0..MAX_WITHIN_BLOCK));
            let va = VirtualOffset::new(a.0, a.1).unwrap();
            let vb = VirtualOffset::new(b.0, b.1).unwrap();
            assert_eq!(a.cmp(&b), va.cmp(&vb));
            assert_eq!(a.cmp(&b), va.as_raw().cmp(&vb.as_raw()));
        }
    }

    // ==================== VirtualOffset Tests ====================

    #[test]
    fn test_virtual_offset_accessors() {
        let offset = VirtualOffset::new(1024, 512).unwrap();
        assert_eq!(offset.block_start(), 1024);
        assert_eq!(offset.within_block(), 512);
        assert_eq!(offset.split(), (1024, 512));
        assert_eq!(u64::from(offset), (1024 << 16) | 512);
        assert_eq!(VirtualOffset::from_raw(offset.as_raw()), offset);
    }

    #[test]
    fn test_virtual_offset_display() {
        let offset = VirtualOffset::new(100_000, 10).unwrap();
        assert_eq!(offset.to_string(), "100000/10");
    }

    #[test]
    fn test_slice_from_bytes() {
        let words: Vec<u64> = vec![
            make_virtual_offset(1u64, 2u64).unwrap(),
            make_virtual_offset(3u64, 4u64).unwrap(),
        ];
        let bytes: &[u8] = bytemuck::cast_slice(&words);
        let offsets = VirtualOffset::slice_from_bytes(bytes).unwrap();
        assert_eq!(offsets.len(), 2);
        assert_eq!(offsets[0].split(), (1, 2));
        assert_eq!(offsets[1].split(), (3, 4));
        assert_eq!(VirtualOffset::slice_as_bytes(offsets), bytes);
    }

    #[test]
    fn test_slice_from_bytes_bad_length() {
        let words = [0u64; 2];
        let bytes: &[u8] = bytemuck::cast_slice(&words);
        let err = VirtualOffset::slice_from_bytes(&bytes[..12]).unwrap_err();
        assert!(matches!(
            err,
            Error::OffsetError(OffsetError::InvalidSliceLength(12))
        ));
    }

    #[test]
    fn test_slice_from_bytes_misaligned() {
        let words = [0u64; 3];
        let bytes: &[u8] = bytemuck::cast_slice(&words);
        let err = VirtualOffset::slice_from_bytes(&bytes[1..17]).unwrap_err();
        assert!(matches!(err, Error::OffsetError(OffsetError::Misaligned)));
    }

    // ==================== Wire Format Tests ====================

    #[test]
    fn test_read_write_wire_value() {
        let offset = VirtualOffset::new(100_000, 10).unwrap();
        let mut buf = Vec::new();
        write_virtual_offset(&mut buf, offset).unwrap();
        assert_eq!(buf, 6_553_600_010u64.to_le_bytes());

        let decoded = read_virtual_offset(&mut buf.as_slice()).unwrap();
        assert_eq!(decoded, offset);
    }

    #[test]
    fn test_read_truncated() {
        let buf = [0u8; 5];
        let err = read_virtual_offset(&mut buf.as_slice()).unwrap_err();
        assert!(matches!(err, Error::IoError(_)));
    }
}
