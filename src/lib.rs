//! # bamnav
//!
//! Building blocks for random-access readers of block-compressed alignment archives.
//!
//! ## Overview
//!
//! * [`voffset`]: packs a compressed block start and an offset inside the decompressed
//!   block into a single ordered 64-bit [`VirtualOffset`], the seek target stored by
//!   archive indexes.
//! * [`cache`]: a generic least-recently-used [`BoundedCache`], typically keyed by block
//!   start to memoize decompressed blocks.
//! * [`cigar`] and [`md`]: parsers for the two compact edit encodings carried by an
//!   aligned read.
//! * [`reference`]: rebuilds the reference sequence a read was aligned against from
//!   its CIGAR, its MD tag, or both.
//!
//! ## Example
//!
//! ```
//! use bamnav::{parse_cigar, reconstruct_reference, BoundedCache, VirtualOffset};
//!
//! # fn main() -> bamnav::Result<()> {
//! let offset = VirtualOffset::new(100_000, 10)?;
//! assert_eq!(offset.as_raw(), 6_553_600_010);
//!
//! let mut blocks: BoundedCache<u64, Vec<u8>> = BoundedCache::new(16);
//! let block = blocks.get_or_insert_with(offset.block_start(), || {
//!     Ok::<_, bamnav::Error>(b"decompressed block".to_vec())
//! })?;
//! assert_eq!(block[usize::from(offset.within_block())], b'e');
//!
//! let cigar = parse_cigar("2S3M2D2M1I2M")?;
//! let reference = reconstruct_reference(b"NNACAACTGT", &cigar, b"2T0^GG4")?;
//! assert_eq!(reference, b"ACTGGACGT");
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod cigar;
pub mod error;
pub mod md;
pub mod policy;
pub mod reference;
pub mod voffset;

pub use cache::BoundedCache;
pub use cigar::{parse_cigar, Cigar, CigarOp, CigarOpKind};
pub use error::{CigarError, Error, MdError, OffsetError, ReconstructError, Result};
pub use md::{tokenize_md, MdToken};
pub use policy::{MdPolicy, QueryPolicy};
pub use reference::{
    reconstruct_from_cigar, reconstruct_from_md, reconstruct_reference, Reconstructor,
};
pub use voffset::{
    make_virtual_offset, read_virtual_offset, split_virtual_offset, write_virtual_offset,
    VirtualOffset, MAX_BLOCK_START, MAX_WITHIN_BLOCK,
};

/// The default number of entries held by a [`BoundedCache`].
pub const DEFAULT_CACHE_CAPACITY: usize = 128;

/// The default base emitted for reference positions with unknown content.
pub const DEFAULT_PLACEHOLDER: u8 = b'N';
