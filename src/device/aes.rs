//! AES one-time-pad generator. The round function itself is out of scope
//! (§1): what matters here is the register protocol, not cryptographic
//! fidelity. Eight 64-bit seed words go in; four 128-bit OTP blocks come
//! out the other side, pushed into the AXI manager's FIFO in production
//! order so `ENCRYPT`/`DECRYPT` consume them in the same order.

use crate::device::axim::AxiManager;
use crate::error::{FirmwareError, Result};

pub const REG_INPUT_0: u64 = 0x00;
pub const REG_START: u64 = 0x40;

const NUM_INPUTS: usize = 8;

pub struct AesEngine {
    inputs: [u64; NUM_INPUTS],
}

impl AesEngine {
    pub fn new() -> Self {
        AesEngine { inputs: [0; NUM_INPUTS] }
    }

    pub fn read_reg(&self, offset: u64) -> Result<u64> {
        if offset == REG_START {
            return Ok(0); // self-clears; this model never stays busy
        }
        input_index(offset)
            .map(|idx| self.inputs[idx])
            .ok_or(FirmwareError::SpmOutOfBounds { offset })
    }

    pub fn write_reg(&mut self, offset: u64, value: u64, axim: &mut AxiManager) -> Result<()> {
        if let Some(idx) = input_index(offset) {
            self.inputs[idx] = value;
            return Ok(());
        }
        if offset == REG_START {
            if value != 0 {
                self.start(axim);
            }
            return Ok(());
        }
        Err(FirmwareError::SpmOutOfBounds { offset })
    }

    /// Stand-in AES-CTR-like round: not cryptographically meaningful (per
    /// §1's non-goals), but deterministic, keyed by all eight seed words,
    /// and distinct per 128-bit OTP block, which is all the protocol above
    /// depends on.
    fn start(&mut self, axim: &mut AxiManager) {
        let mut otp = [0u8; 64];
        for block in 0..4usize {
            let a = self.inputs[block * 2];
            let b = self.inputs[block * 2 + 1];
            let lo = a.wrapping_mul(0x9E37_79B9_7F4A_7C15).rotate_left(block as u32 + 1) ^ b;
            let hi = b.wrapping_mul(0xC2B2_AE3D_27D4_EB4F).rotate_left(block as u32 + 7) ^ a;
            otp[block * 16..block * 16 + 8].copy_from_slice(&lo.to_le_bytes());
            otp[block * 16 + 8..block * 16 + 16].copy_from_slice(&hi.to_le_bytes());
        }
        axim.push_otp(otp);
    }
}

fn input_index(offset: u64) -> Option<usize> {
    if offset < REG_START && offset % 8 == 0 {
        let idx = (offset / 8) as usize;
        if idx < NUM_INPUTS {
            return Some(idx);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::axim::AxiManager;

    #[test]
    fn same_seeds_produce_the_same_otp() {
        let run = || {
            let mut axim = AxiManager::new();
            let mut aes = AesEngine::new();
            for i in 0..8u64 {
                aes.write_reg(i * 8, i + 1, &mut axim).unwrap();
            }
            aes.write_reg(REG_START, 1, &mut axim).unwrap();
            axim
        };
        let a = run();
        let b = run();
        assert_eq!(format!("{a:?}"), format!("{b:?}"));
    }

    #[test]
    fn different_seeds_produce_different_otp() {
        let mut axim_a = AxiManager::new();
        let mut aes_a = AesEngine::new();
        for i in 0..8u64 {
            aes_a.write_reg(i * 8, i, &mut axim_a).unwrap();
        }
        aes_a.write_reg(REG_START, 1, &mut axim_a).unwrap();

        let mut axim_b = AxiManager::new();
        let mut aes_b = AesEngine::new();
        for i in 0..8u64 {
            aes_b.write_reg(i * 8, i + 1, &mut axim_b).unwrap();
        }
        aes_b.write_reg(REG_START, 1, &mut axim_b).unwrap();

        assert_ne!(format!("{axim_a:?}"), format!("{axim_b:?}"));
    }
}
