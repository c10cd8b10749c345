//! Packed virtual file pointers.
//!
//! A pointer into a block-compressed data file packs the compressed
//! block's file address into the high 48 bits and the offset within the
//! decompressed block into the low 16 bits.

use vannot_core::{Result, VannotError};

pub const OFFSET_SHIFT: u32 = 16;
pub const OFFSET_MASK: u64 = 0xffff;
/// Largest representable compressed-block address.
pub const MAX_BLOCK_ADDRESS: u64 = (1 << 48) - 1;
/// Largest representable offset within one decompressed block.
pub const MAX_BLOCK_OFFSET: u32 = 0xffff;

/// Pack a compressed-block address and an in-block offset into one
/// 64-bit pointer.
pub fn pack(block_address: u64, block_offset: u32) -> Result<u64> {
    if block_address > MAX_BLOCK_ADDRESS {
        return Err(VannotError::CorruptData(format!(
            "block address {} exceeds 48 bits",
            block_address
        )));
    }
    if block_offset > MAX_BLOCK_OFFSET {
        return Err(VannotError::CorruptData(format!(
            "block offset {} exceeds 16 bits",
            block_offset
        )));
    }
    Ok((block_address << OFFSET_SHIFT) | block_offset as u64)
}

/// Compressed-block address half of a packed pointer.
#[inline]
pub fn block_address(vpos: u64) -> u64 {
    vpos >> OFFSET_SHIFT
}

/// In-block offset half of a packed pointer.
#[inline]
pub fn block_offset(vpos: u64) -> u32 {
    (vpos & OFFSET_MASK) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(0, 0)]
    #[case(1, 1)]
    #[case(123_456_789, 4242)]
    #[case(MAX_BLOCK_ADDRESS, MAX_BLOCK_OFFSET)]
    fn test_pack_round_trip(#[case] address: u64, #[case] offset: u32) {
        let packed = pack(address, offset).unwrap();
        assert_eq!(block_address(packed), address);
        assert_eq!(block_offset(packed), offset);
    }

    #[rstest]
    fn test_pack_rejects_out_of_range() {
        assert!(pack(MAX_BLOCK_ADDRESS + 1, 0).is_err());
        assert!(pack(0, MAX_BLOCK_OFFSET + 1).is_err());
    }
}
