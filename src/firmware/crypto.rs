//! Encryption/decryption driver (C5/C6): derives the per-line OTP seed from
//! its address and counter value, launches the AES engine, and drives the
//! AXI manager through the XOR step on whichever side of the pipe needs it.

use crate::bus::Bus;
use crate::config::LINE_SIZE;
use crate::device::axim::{CMD_COPY, CMD_DECRYPT, CMD_ENCRYPT, CMD_WRITE_BACK, REG_COMMAND, REG_SPM_ADDR};
use crate::device::spm::DATA_SLOT;
use crate::device::spm_dma::DIRECTION_DRAM_TO_SPM;
use crate::error::Result;
use crate::mmio::poll_until_clear;

const REG_AES_START: u64 = crate::device::aes::REG_START;

/// §4.5's fixed seed derivation: eight 64-bit words, alternating a major-
/// and minor-salted offset from the request address. Must be computed
/// identically on the encrypt and decrypt paths or the OTPs never match.
fn derive_seeds(addr: u64, major: u64, minor: u8) -> [u64; 8] {
    let mut seeds = [0u64; 8];
    for (k, seed) in seeds.iter_mut().enumerate() {
        let base = addr.wrapping_add(16 * (k as u64 / 2));
        *seed = if k % 2 == 0 {
            base.wrapping_add(major)
        } else {
            base.wrapping_add(minor as u64)
        };
    }
    seeds
}

fn launch_aes(bus: &mut Bus, addr: u64, major: u64, minor: u8) -> Result<()> {
    for (k, seed) in derive_seeds(addr, major, minor).into_iter().enumerate() {
        bus.aes.write_reg(k as u64 * 8, seed, &mut bus.axim)?;
    }
    bus.aes.write_reg(REG_AES_START, 1, &mut bus.axim)?;
    // §5: wait AES idle before anything downstream consumes the OTPs it
    // just pushed into the AXI manager's FIFO.
    poll_until_clear(1, || bus.aes.read_reg(REG_AES_START).unwrap_or(0));
    Ok(())
}

/// Write path: XORs the AXI manager's pending write buffer with a freshly
/// generated OTP and lands the ciphertext in the data slot.
pub fn encrypt(bus: &mut Bus, addr: u64, major: u64, minor: u8) -> Result<()> {
    launch_aes(bus, addr, major, minor)?;
    bus.axim.write_reg(REG_COMMAND, CMD_ENCRYPT, &mut bus.spm)?;
    poll_until_clear(1, || bus.axim.read_reg(crate::device::axim::REG_BUSY).unwrap_or(0));
    bus.axim.write_reg(REG_SPM_ADDR, DATA_SLOT * LINE_SIZE, &mut bus.spm)?;
    bus.axim.write_reg(REG_COMMAND, CMD_WRITE_BACK, &mut bus.spm)
}

/// Read path: DMAs the ciphertext line from DRAM into the data slot, loads
/// it into the AXI manager's read buffer, and XORs it back to plaintext
/// with the same OTP the write path would have used.
pub fn decrypt(bus: &mut Bus, dram_addr: u64, addr: u64, major: u64, minor: u8) -> Result<()> {
    bus.dma.transfer_line(dram_addr, DATA_SLOT * LINE_SIZE, DIRECTION_DRAM_TO_SPM, &mut bus.dram, &mut bus.spm)?;
    launch_aes(bus, addr, major, minor)?;
    bus.axim.write_reg(REG_SPM_ADDR, DATA_SLOT * LINE_SIZE, &mut bus.spm)?;
    bus.axim.write_reg(REG_COMMAND, CMD_COPY, &mut bus.spm)?;
    bus.axim.write_reg(REG_COMMAND, CMD_DECRYPT, &mut bus.spm)?;
    poll_until_clear(1, || bus.axim.read_reg(crate::device::axim::REG_BUSY).unwrap_or(0));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemoryMapConfig;
    use crate::device::axim::{LlcRequest, Response};

    #[test]
    fn encrypt_then_decrypt_recovers_plaintext() {
        let mut bus = Bus::new(MemoryMapConfig::simulator());
        let plaintext = [0x5Au8; 64];
        let addr = bus.map.protection_base;

        bus.axim.submit(LlcRequest::write(addr, 1, plaintext));
        encrypt(&mut bus, addr, 3, 9).unwrap();
        let ciphertext = bus.spm.slot(DATA_SLOT).unwrap().to_vec();
        assert_ne!(ciphertext, plaintext.to_vec());

        bus.dram.block_mut(addr, 64).unwrap().copy_from_slice(&ciphertext);
        decrypt(&mut bus, addr, addr, 3, 9).unwrap();
        bus.axim.write_reg(crate::device::axim::REG_COMMAND, crate::device::axim::CMD_READ_RETURN, &mut bus.spm).unwrap();
        assert_eq!(bus.axim.take_response(), Some(Response::ReadOk { id: 1, data: plaintext }));
    }

    #[test]
    fn different_counter_values_produce_different_ciphertext() {
        let mut bus_a = Bus::new(MemoryMapConfig::simulator());
        let mut bus_b = Bus::new(MemoryMapConfig::simulator());
        let plaintext = [0x5Au8; 64];
        let addr = bus_a.map.protection_base;

        bus_a.axim.submit(LlcRequest::write(addr, 1, plaintext));
        bus_b.axim.submit(LlcRequest::write(addr, 1, plaintext));
        encrypt(&mut bus_a, addr, 0, 1).unwrap();
        encrypt(&mut bus_b, addr, 0, 2).unwrap();

        assert_ne!(bus_a.spm.slot(DATA_SLOT).unwrap(), bus_b.spm.slot(DATA_SLOT).unwrap());
    }
}
