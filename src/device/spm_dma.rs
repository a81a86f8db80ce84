//! DMA engine moving 64-byte blocks between DRAM and the scratchpad. This
//! is the only component allowed to move bytes into or out of SPM; every
//! other accelerator operates on whatever is already resident there.

use crate::config::LINE_SIZE;
use crate::device::dram::Dram;
use crate::device::spm::Spm;
use crate::error::{FirmwareError, Result};
use crate::mmio::poll_until_clear;

pub const REG_DRAM_ADDR: u64 = 0x00;
pub const REG_LOCAL_OFF: u64 = 0x08;
pub const REG_SIZE: u64 = 0x10;
pub const REG_DIRECTION: u64 = 0x18;
pub const REG_START: u64 = 0x20;

pub const DIRECTION_DRAM_TO_SPM: u64 = 0;
pub const DIRECTION_SPM_TO_DRAM: u64 = 1;

#[derive(Default)]
pub struct SpmDma {
    dram_addr: u64,
    local_off: u64,
    size: u64,
    direction: u64,
}

impl SpmDma {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read_reg(&self, offset: u64) -> Result<u64> {
        Ok(match offset {
            REG_DRAM_ADDR => self.dram_addr,
            REG_LOCAL_OFF => self.local_off,
            REG_SIZE => self.size,
            REG_DIRECTION => self.direction,
            REG_START => 0, // the transfer always completes synchronously
            _ => return Err(FirmwareError::SpmOutOfBounds { offset }),
        })
    }

    pub fn write_reg(&mut self, offset: u64, value: u64, dram: &mut Dram, spm: &mut Spm) -> Result<()> {
        match offset {
            REG_DRAM_ADDR => self.dram_addr = value,
            REG_LOCAL_OFF => self.local_off = value,
            REG_SIZE => self.size = value,
            REG_DIRECTION => self.direction = value,
            REG_START if value != 0 => self.start(dram, spm)?,
            REG_START => {}
            _ => return Err(FirmwareError::SpmOutOfBounds { offset }),
        }
        Ok(())
    }

    fn start(&mut self, dram: &mut Dram, spm: &mut Spm) -> Result<()> {
        let size = self.size;
        match self.direction {
            DIRECTION_DRAM_TO_SPM => {
                let src = dram.block(self.dram_addr, size)?.to_vec();
                spm.block_mut(self.local_off, size)?.copy_from_slice(&src);
            }
            DIRECTION_SPM_TO_DRAM => {
                let src = spm.block(self.local_off, size)?.to_vec();
                dram.block_mut(self.dram_addr, size)?.copy_from_slice(&src);
            }
            other => return Err(FirmwareError::SpmOutOfBounds { offset: other }),
        }
        Ok(())
    }

    /// Convenience wrapper used by the cache policy and the encrypt/decrypt
    /// drivers: copy one 64-byte line in a single register sequence, ending
    /// with the `SPM.START` busy-wait every real MMIO caller must do before
    /// touching the block it just moved (§5's suspension points).
    pub fn transfer_line(&mut self, dram_addr: u64, spm_offset: u64, direction: u64, dram: &mut Dram, spm: &mut Spm) -> Result<()> {
        self.dram_addr = dram_addr;
        self.local_off = spm_offset;
        self.size = LINE_SIZE;
        self.direction = direction;
        self.start(dram, spm)?;
        poll_until_clear(1, || self.read_reg(REG_START).unwrap_or(0));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_line() {
        let mut dram = Dram::new(256);
        let mut spm = Spm::new();
        let mut dma = SpmDma::new();
        dram.block_mut(64, 64).unwrap().copy_from_slice(&[7u8; 64]);
        dma.transfer_line(64, 128, DIRECTION_DRAM_TO_SPM, &mut dram, &mut spm)
            .unwrap();
        assert_eq!(spm.block(128, 64).unwrap(), &[7u8; 64][..]);

        spm.block_mut(128, 64).unwrap().copy_from_slice(&[9u8; 64]);
        dma.transfer_line(64, 128, DIRECTION_SPM_TO_DRAM, &mut dram, &mut spm)
            .unwrap();
        assert_eq!(dram.block(64, 64).unwrap(), &[9u8; 64][..]);
    }
}
