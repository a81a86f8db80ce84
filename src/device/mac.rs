//! Keyed-MAC engine. Treated as a black box cryptographically (an FNV-1a
//! accumulator stands in for whatever primitive real silicon uses); what
//! matters here is the register protocol: load 64 bytes from SPM, feed a
//! bit range of them into a running hash, finalize into a result register.

use crate::config::LINE_SIZE;
use crate::device::spm::Spm;
use crate::error::{FirmwareError, Result};

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x100_0000_01b3;

pub const REG_SPM_ADDR: u64 = 0x00;
pub const REG_SPM_START: u64 = 0x08;
pub const REG_COMMAND: u64 = 0x10;
pub const REG_STATUS: u64 = 0x18;
pub const REG_START_BIT: u64 = 0x20;
pub const REG_END_BIT: u64 = 0x28;
pub const REG_RESULT: u64 = 0x30;

pub const COMMAND_INIT: u64 = 1;
pub const COMMAND_UPDATE: u64 = 2;
pub const COMMAND_FINALIZE: u64 = 4;

pub struct MacEngine {
    spm_addr: u64,
    start_bit: u64,
    end_bit: u64,
    buffer: [u8; LINE_SIZE as usize],
    state: u64,
    result: u64,
}

impl MacEngine {
    pub fn new() -> Self {
        MacEngine {
            spm_addr: 0,
            start_bit: 0,
            end_bit: 0,
            buffer: [0u8; LINE_SIZE as usize],
            state: FNV_OFFSET_BASIS,
            result: 0,
        }
    }

    pub fn read_reg(&self, offset: u64) -> Result<u64> {
        Ok(match offset {
            REG_SPM_ADDR => self.spm_addr,
            REG_SPM_START => 0,
            REG_STATUS => 0,
            REG_START_BIT => self.start_bit,
            REG_END_BIT => self.end_bit,
            REG_RESULT => self.result,
            _ => return Err(FirmwareError::SpmOutOfBounds { offset }),
        })
    }

    pub fn write_reg(&mut self, offset: u64, value: u64, spm: &Spm) -> Result<()> {
        match offset {
            REG_SPM_ADDR => self.spm_addr = value,
            REG_SPM_START if value != 0 => {
                self.buffer.copy_from_slice(spm.block(self.spm_addr, LINE_SIZE)?);
            }
            REG_SPM_START => {}
            REG_START_BIT => self.start_bit = value,
            REG_END_BIT => self.end_bit = value,
            REG_COMMAND => self.command(value),
            _ => return Err(FirmwareError::SpmOutOfBounds { offset }),
        }
        Ok(())
    }

    fn command(&mut self, command: u64) {
        if command & COMMAND_INIT != 0 {
            self.state = FNV_OFFSET_BASIS;
        }
        if command & COMMAND_UPDATE != 0 {
            let start = (self.start_bit / 8) as usize;
            let end = (self.end_bit / 8) as usize;
            for &byte in &self.buffer[start..end] {
                self.state ^= byte as u64;
                self.state = self.state.wrapping_mul(FNV_PRIME);
            }
        }
        if command & COMMAND_FINALIZE != 0 {
            self.result = self.state;
        }
    }

    pub fn result(&self) -> u64 {
        self.result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mac_is_deterministic_and_order_sensitive() {
        let mut spm = Spm::new();
        spm.slot_mut(crate::device::spm::DATA_SLOT)
            .unwrap()
            .copy_from_slice(&[0xAB; 64]);

        let run = |spm: &Spm| {
            let mut mac = MacEngine::new();
            mac.write_reg(REG_SPM_ADDR, crate::device::spm::DATA_SLOT * LINE_SIZE, spm)
                .unwrap();
            mac.write_reg(REG_SPM_START, 1, spm).unwrap();
            mac.write_reg(REG_START_BIT, 0, spm).unwrap();
            mac.write_reg(REG_END_BIT, 64 * 8, spm).unwrap();
            mac.write_reg(REG_COMMAND, COMMAND_INIT | COMMAND_UPDATE | COMMAND_FINALIZE, spm)
                .unwrap();
            mac.result()
        };

        assert_eq!(run(&spm), run(&spm));

        spm.slot_mut(crate::device::spm::DATA_SLOT).unwrap()[0] ^= 1;
        assert_ne!(run(&spm), run(&spm.clone_for_test()));
    }
}

#[cfg(test)]
impl crate::device::spm::Spm {
    fn clone_for_test(&self) -> Self {
        let mut s = Spm::new();
        s.block_mut(0, crate::device::spm::SIZE)
            .unwrap()
            .copy_from_slice(self.block(0, crate::device::spm::SIZE).unwrap());
        s
    }
}
