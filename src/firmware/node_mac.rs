//! Shared MAC protocol for one tree level's node: feed the node's own
//! 448-bit body, then the 8-bit (or, for level 0, 64-bit root) parent entry
//! that authenticates it, and finalize. Used identically by the tree
//! verifier (to check a stored MAC) and the counter updater (to recompute
//! one after mutating the node), so it lives in one place rather than
//! twice.

use crate::bus::Bus;
use crate::config::{LINE_SIZE, TREE_HEIGHT};
use crate::device::mac::{COMMAND_FINALIZE, COMMAND_INIT, COMMAND_UPDATE, REG_COMMAND, REG_END_BIT, REG_SPM_ADDR, REG_SPM_START, REG_START_BIT, REG_STATUS};
use crate::device::spm::{ROOT_SLOT, level_slot};
use crate::error::Result;
use crate::firmware::addressing::child_slot;
use crate::mmio::poll_until_clear;

const NODE_BODY_BITS: u64 = 56 * 8;

pub(crate) fn compute(bus: &mut Bus, level: usize, path: &[u64; TREE_HEIGHT]) -> Result<u64> {
    feed_slot(bus, level_slot(level), 0, NODE_BODY_BITS, true)?;

    if level == 0 {
        // Level 0's parent is the in-SPM root: feed its full 64 bits.
        feed_slot(bus, ROOT_SLOT, 0, 64, false)?;
    } else {
        let parent_slot = level_slot(level - 1);
        let bit = 64 + child_slot(path, level - 1) * 8;
        feed_slot(bus, parent_slot, bit, bit + 8, false)?;
    }

    bus.mac.write_reg(REG_COMMAND, COMMAND_FINALIZE, &bus.spm)?;
    poll_until_clear(1, || bus.mac.read_reg(REG_STATUS).unwrap_or(0));
    Ok(bus.mac.result())
}

fn feed_slot(bus: &mut Bus, slot: u64, start_bit: u64, end_bit: u64, init: bool) -> Result<()> {
    bus.mac.write_reg(REG_SPM_ADDR, slot * LINE_SIZE, &bus.spm)?;
    bus.mac.write_reg(REG_SPM_START, 1, &bus.spm)?;
    // MAC.SPM_START self-clears once the 64 B load completes (§6).
    poll_until_clear(1, || bus.mac.read_reg(REG_SPM_START).unwrap_or(0));
    if init {
        bus.mac.write_reg(REG_COMMAND, COMMAND_INIT, &bus.spm)?;
    }
    bus.mac.write_reg(REG_START_BIT, start_bit, &bus.spm)?;
    bus.mac.write_reg(REG_END_BIT, end_bit, &bus.spm)?;
    bus.mac.write_reg(REG_COMMAND, COMMAND_UPDATE, &bus.spm)?;
    poll_until_clear(1, || bus.mac.read_reg(REG_STATUS).unwrap_or(0));
    Ok(())
}
