//! Scratchpad memory: 64 fixed-size lines, directly addressable like DRAM,
//! plus one line (56) reserved for the management words the block cache
//! (C1) keeps for every other cached line.

use crate::config::{LINE_SIZE, TREE_HEIGHT};
use crate::error::{FirmwareError, Result};
use crate::mmio::Device;

pub const SLOT_COUNT: u64 = 64;
pub const SIZE: u64 = SLOT_COUNT * LINE_SIZE;

pub const ROOT_SLOT: u64 = 0;
pub const DATA_SLOT: u64 = 1;
pub const DATA_MAC_SLOT: u64 = 2;
/// Tree levels `0..TREE_HEIGHT` (root-closest first) occupy slots
/// `LEVEL_SLOT_BASE..LEVEL_SLOT_BASE+TREE_HEIGHT`.
pub const LEVEL_SLOT_BASE: u64 = 3;

pub const fn level_slot(level: usize) -> u64 {
    LEVEL_SLOT_BASE + level as u64
}

/// The "leaf counter block" (§3/§4.2's `CB`) and the deepest tree level's
/// node are the same 64-byte DRAM object by construction (see DESIGN.md):
/// this slot is not a separate cached copy, it's the same slot as
/// `level_slot(TREE_HEIGHT - 1)`, addressed under a name that matches the
/// role it plays for the counter updater and data-MAC driver.
pub const LEAF_COUNTER_SLOT: u64 = level_slot(TREE_HEIGHT - 1);

pub const MGMT_SLOT: u64 = 56;

/// Management-word index for a cached slot. The root slot is never DMA'd
/// and so never needs one; every other fixed-purpose slot gets one of the
/// 8 words packed into [`MGMT_SLOT`].
pub fn mgmt_index(slot: u64) -> u64 {
    debug_assert!(slot != ROOT_SLOT && slot < MGMT_SLOT);
    slot - 1
}

const VALID_BIT: u64 = 1 << 0;
const DIRTY_BIT: u64 = 1 << 1;
const TAG_MASK: u64 = !0x3f;

/// Decoded contents of one management word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotMeta {
    pub tag: u64,
    pub valid: bool,
    pub dirty: bool,
}

impl SlotMeta {
    pub fn decode(word: u64) -> Self {
        SlotMeta {
            tag: word & TAG_MASK,
            valid: word & VALID_BIT != 0,
            dirty: word & DIRTY_BIT != 0,
        }
    }

    pub fn encode(self) -> u64 {
        (self.tag & TAG_MASK)
            | if self.valid { VALID_BIT } else { 0 }
            | if self.dirty { DIRTY_BIT } else { 0 }
    }
}

pub struct Spm {
    bytes: [u8; SIZE as usize],
}

impl Spm {
    pub fn new() -> Self {
        Spm {
            bytes: [0u8; SIZE as usize],
        }
    }

    pub fn block(&self, offset: u64, len: u64) -> Result<&[u8]> {
        let end = offset
            .checked_add(len)
            .ok_or(FirmwareError::SpmOutOfBounds { offset })?;
        if end > SIZE {
            return Err(FirmwareError::SpmOutOfBounds { offset });
        }
        Ok(&self.bytes[offset as usize..end as usize])
    }

    pub fn block_mut(&mut self, offset: u64, len: u64) -> Result<&mut [u8]> {
        let end = offset
            .checked_add(len)
            .ok_or(FirmwareError::SpmOutOfBounds { offset })?;
        if end > SIZE {
            return Err(FirmwareError::SpmOutOfBounds { offset });
        }
        Ok(&mut self.bytes[offset as usize..end as usize])
    }

    pub fn slot(&self, slot: u64) -> Result<&[u8]> {
        self.block(slot * LINE_SIZE, LINE_SIZE)
    }

    pub fn slot_mut(&mut self, slot: u64) -> Result<&mut [u8]> {
        self.block_mut(slot * LINE_SIZE, LINE_SIZE)
    }

    pub fn meta(&self, slot: u64) -> Result<SlotMeta> {
        let idx = mgmt_index(slot);
        let word = self.read64(MGMT_SLOT * LINE_SIZE + idx * 8)?;
        Ok(SlotMeta::decode(word))
    }

    pub fn set_meta(&mut self, slot: u64, meta: SlotMeta) -> Result<()> {
        let idx = mgmt_index(slot);
        self.write64(MGMT_SLOT * LINE_SIZE + idx * 8, meta.encode())
    }
}

impl Device for Spm {
    fn read64(&self, offset: u64) -> Result<u64> {
        let bytes = self.block(offset, 8)?;
        Ok(u64::from_le_bytes(bytes.try_into().unwrap()))
    }

    fn write64(&mut self, offset: u64, value: u64) -> Result<()> {
        let bytes = self.block_mut(offset, 8)?;
        bytes.copy_from_slice(&value.to_le_bytes());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn management_word_roundtrip() {
        let mut spm = Spm::new();
        let meta = SlotMeta {
            tag: 0x4000,
            valid: true,
            dirty: true,
        };
        spm.set_meta(DATA_SLOT, meta).unwrap();
        assert_eq!(spm.meta(DATA_SLOT).unwrap(), meta);
    }

    #[test]
    fn slots_are_independently_addressable() {
        let mut spm = Spm::new();
        spm.slot_mut(DATA_SLOT).unwrap().copy_from_slice(&[1u8; 64]);
        spm.slot_mut(DATA_MAC_SLOT).unwrap().copy_from_slice(&[2u8; 64]);
        assert_eq!(spm.slot(DATA_SLOT).unwrap(), &[1u8; 64][..]);
        assert_eq!(spm.slot(DATA_MAC_SLOT).unwrap(), &[2u8; 64][..]);
    }
}
