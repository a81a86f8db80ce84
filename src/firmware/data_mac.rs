//! Data MAC driver (C7): authenticates one line's plaintext against the
//! counter value it was encrypted under, independent of the tree chain
//! that authenticates the counter itself (§4.2, §4.6). A line can pass
//! tree verification and still fail here if its ciphertext was tampered
//! with directly, or vice versa.

use crate::bus::Bus;
use crate::config::LINE_SIZE;
use crate::device::mac::{COMMAND_FINALIZE, COMMAND_INIT, COMMAND_UPDATE, REG_COMMAND, REG_END_BIT, REG_SPM_ADDR, REG_SPM_START, REG_START_BIT, REG_STATUS};
use crate::device::spm::{DATA_MAC_SLOT, DATA_SLOT, LEAF_COUNTER_SLOT};
use crate::error::{FirmwareError, Result};
use crate::firmware::addressing::{data_mac_block_addr, leaf_minor_bit_offset};
use crate::mmio::{Device, poll_until_clear};

const LINE_BITS: u64 = LINE_SIZE * 8;

fn compute(bus: &mut Bus, line: u64) -> Result<u64> {
    bus.mac.write_reg(REG_SPM_ADDR, DATA_SLOT * LINE_SIZE, &bus.spm)?;
    bus.mac.write_reg(REG_SPM_START, 1, &bus.spm)?;
    poll_until_clear(1, || bus.mac.read_reg(REG_SPM_START).unwrap_or(0));
    bus.mac.write_reg(REG_COMMAND, COMMAND_INIT, &bus.spm)?;
    bus.mac.write_reg(REG_START_BIT, 0, &bus.spm)?;
    bus.mac.write_reg(REG_END_BIT, LINE_BITS, &bus.spm)?;
    bus.mac.write_reg(REG_COMMAND, COMMAND_UPDATE, &bus.spm)?;
    poll_until_clear(1, || bus.mac.read_reg(REG_STATUS).unwrap_or(0));

    let bit = leaf_minor_bit_offset(line) as u64;
    bus.mac
        .write_reg(REG_SPM_ADDR, LEAF_COUNTER_SLOT * LINE_SIZE, &bus.spm)?;
    bus.mac.write_reg(REG_SPM_START, 1, &bus.spm)?;
    poll_until_clear(1, || bus.mac.read_reg(REG_SPM_START).unwrap_or(0));
    bus.mac.write_reg(REG_START_BIT, bit, &bus.spm)?;
    bus.mac.write_reg(REG_END_BIT, bit + 8, &bus.spm)?;
    bus.mac.write_reg(REG_COMMAND, COMMAND_UPDATE, &bus.spm)?;
    poll_until_clear(1, || bus.mac.read_reg(REG_STATUS).unwrap_or(0));

    bus.mac.write_reg(REG_COMMAND, COMMAND_FINALIZE, &bus.spm)?;
    poll_until_clear(1, || bus.mac.read_reg(REG_STATUS).unwrap_or(0));
    Ok(bus.mac.result())
}

/// Recomputes and stores `line`'s data MAC. Called after a write has been
/// encrypted and the leaf counter bumped, so `compute` sees the post-update
/// minor counter.
pub fn store(bus: &mut Bus, line: u64) -> Result<()> {
    let dram_addr = data_mac_block_addr(&bus.map, line);
    bus.ensure(DATA_MAC_SLOT, dram_addr)?;
    let mac = compute(bus, line)?;
    let offset = DATA_MAC_SLOT * LINE_SIZE + crate::firmware::addressing::data_mac_byte_offset(line);
    bus.spm.write64(offset, mac)?;
    bus.mark_dirty(DATA_MAC_SLOT, dram_addr)
}

/// Checks `line`'s stored data MAC against a freshly computed one. Assumes
/// `DATA_SLOT` already holds this line's decrypted plaintext and
/// `LEAF_COUNTER_SLOT` already holds its counter block (the dispatcher
/// brings both in before calling this).
pub fn verify(bus: &mut Bus, line: u64) -> Result<()> {
    let dram_addr = data_mac_block_addr(&bus.map, line);
    bus.ensure(DATA_MAC_SLOT, dram_addr)?;
    let offset = DATA_MAC_SLOT * LINE_SIZE + crate::firmware::addressing::data_mac_byte_offset(line);
    let stored = bus.spm.read64(offset)?;
    let expected = compute(bus, line)?;
    if stored != expected {
        return Err(FirmwareError::DataMacMismatch);
    }
    Ok(())
}
