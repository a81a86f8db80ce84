//! Counter updater (C4): on every write, walks the path root-downward,
//! incrementing each level's own minor counter (promoting to major on
//! overflow), recomputing and storing that level's MAC, and marking the
//! slot dirty. The in-SPM root is bumped once per write before the loop
//! starts, since level 0's new MAC must authenticate the *new* root value.

use crate::bus::Bus;
use crate::config::{LINE_SIZE, TREE_HEIGHT};
use crate::device::spm::level_slot;
use crate::error::Result;
use crate::firmware::addressing::{child_slot, level_addr};
use crate::firmware::node_mac;
use crate::mmio::Device;
use crate::util::bits::{extract, minor_word_index, minor_word_shift, replace};

const MAJOR_OFFSET: u64 = 0;
const STORED_MAC_OFFSET: u64 = 56;

/// §4.4's "Root update": increments the in-SPM root (slot 0). The root has
/// no DRAM backing — it is the trust anchor, never evicted, never DMA'd.
pub fn bump_root(bus: &mut Bus) -> Result<()> {
    let root = bus.spm.read64(crate::device::spm::ROOT_SLOT * LINE_SIZE + MAJOR_OFFSET)?;
    bus.spm
        .write64(crate::device::spm::ROOT_SLOT * LINE_SIZE + MAJOR_OFFSET, root.wrapping_add(1))
}

fn update_level(bus: &mut Bus, level: usize, path: &[u64; TREE_HEIGHT]) -> Result<()> {
    let dram_addr = level_addr(&bus.map, path, level);
    let slot = level_slot(level);
    bus.ensure(slot, dram_addr)?;
    let base = slot * LINE_SIZE;

    let idx = child_slot(path, level);
    let word_off = base + minor_word_index(idx) * 8;
    let shift = minor_word_shift(idx);

    let word = bus.spm.read64(word_off)?;
    let prior = extract(word, shift);
    let next = prior.wrapping_add(1);
    bus.spm.write64(word_off, replace(word, shift, next))?;

    if prior == 0xFF {
        let major = bus.spm.read64(base + MAJOR_OFFSET)?;
        bus.spm.write64(base + MAJOR_OFFSET, major.wrapping_add(1))?;
    }

    let mac = node_mac::compute(bus, level, path)?;
    bus.spm.write64(base + STORED_MAC_OFFSET, mac)?;
    bus.mark_dirty(slot, dram_addr)
}

/// Updates every tree level root-downward after a write (§4.4). Must only
/// be called after the pre-update tree has either verified successfully or
/// been judged fresh (§4.7's "Shortcut"); this function does not verify
/// anything itself, it only mutates.
pub fn update_path(bus: &mut Bus, path: &[u64; TREE_HEIGHT]) -> Result<()> {
    bump_root(bus)?;
    for level in 0..TREE_HEIGHT {
        update_level(bus, level, path)?;
    }
    Ok(())
}

/// Decoded major/minor for `level`'s node, after `ensure`ing it resident.
/// Used by the dispatcher both before any update (to decide whether the
/// line is fresh) and after `update_path` (to seed the OTP with the new
/// counter values).
pub fn read_counters(bus: &mut Bus, level: usize, path: &[u64; TREE_HEIGHT]) -> Result<(u64, u8)> {
    let dram_addr = level_addr(&bus.map, path, level);
    let slot = level_slot(level);
    bus.ensure(slot, dram_addr)?;
    let base = slot * LINE_SIZE;
    let idx = child_slot(path, level);
    let major = bus.spm.read64(base + MAJOR_OFFSET)?;
    let word = bus.spm.read64(base + minor_word_index(idx) * 8)?;
    let minor = extract(word, minor_word_shift(idx));
    Ok((major, minor))
}
