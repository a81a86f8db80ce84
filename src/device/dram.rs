//! Main memory. A flat byte store addressed from 0, holding the protected
//! line region, the counter tree, and the data-MAC region side by side.
//! Out-of-bounds accesses are a programming error, not a runtime
//! possibility the firmware needs to recover from.

use alloc::vec::Vec;

use crate::error::{FirmwareError, Result};
use crate::mmio::Device;

pub struct Dram {
    bytes: Vec<u8>,
}

impl Dram {
    pub fn new(size: u64) -> Self {
        Dram {
            bytes: alloc::vec![0u8; size as usize],
        }
    }

    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Direct slice access for the SPM DMA engine, which moves 64-byte
    /// blocks rather than single words.
    pub fn block(&self, addr: u64, len: u64) -> Result<&[u8]> {
        let end = addr
            .checked_add(len)
            .ok_or(FirmwareError::DramOutOfBounds { addr })?;
        if end > self.len() {
            return Err(FirmwareError::DramOutOfBounds { addr });
        }
        Ok(&self.bytes[addr as usize..end as usize])
    }

    pub fn block_mut(&mut self, addr: u64, len: u64) -> Result<&mut [u8]> {
        let end = addr
            .checked_add(len)
            .ok_or(FirmwareError::DramOutOfBounds { addr })?;
        if end > self.len() {
            return Err(FirmwareError::DramOutOfBounds { addr });
        }
        Ok(&mut self.bytes[addr as usize..end as usize])
    }
}

impl Device for Dram {
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
    fn read_after_write() {
        let mut dram = Dram::new(256);
        dram.write64(8, 0xdead_beef_cafe_babe).unwrap();
        assert_eq!(dram.read64(8).unwrap(), 0xdead_beef_cafe_babe);
    }

    #[test]
    fn out_of_bounds_is_an_error() {
        let dram = Dram::new(16);
        assert!(dram.read64(16).is_err());
    }
}
