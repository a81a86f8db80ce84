//! Request-address to tree/counter/DRAM address translation (C2). Every
//! function here is pure — no device state, no side effects — so the tree
//! verifier, counter updater and data-MAC driver all share one definition
//! of where things live instead of re-deriving it.

use crate::config::{FANOUT, LINE_SIZE, MACS_PER_BLOCK, MemoryMapConfig, TREE_HEIGHT};
use crate::error::{FirmwareError, Result};
use crate::util::bits::{mac_entry_byte_offset, minor_bit_offset};

/// Which 64-byte line a request address refers to, counted from the start
/// of the protected region. Rejects addresses outside `[P, P+Pₛ)` or not
/// 64-byte aligned (`RequestOutOfRange`, per §7).
pub fn line_index(map: &MemoryMapConfig, addr: u64) -> Result<u64> {
    if addr < map.protection_base || addr >= map.protection_base + map.protection_size {
        return Err(FirmwareError::RequestOutOfRange { addr });
    }
    if (addr - map.protection_base) % LINE_SIZE != 0 {
        return Err(FirmwareError::RequestOutOfRange { addr });
    }
    Ok((addr - map.protection_base) / LINE_SIZE)
}

/// Leaf counter block DRAM address (`CB`): covers 32 lines. By construction
/// (DESIGN.md) this is the same address as `level_addr` for the deepest
/// tree level, so the two are always cached in the same SPM slot
/// (`LEAF_COUNTER_SLOT == level_slot(TREE_HEIGHT - 1)`).
pub fn counter_block_addr(map: &MemoryMapConfig, line: u64) -> u64 {
    map.counter_base + (line / FANOUT) * LINE_SIZE
}

/// Data-MAC block DRAM address (`MB`): covers 8 lines.
pub fn data_mac_block_addr(map: &MemoryMapConfig, line: u64) -> u64 {
    map.data_mac_base + (line / MACS_PER_BLOCK) * LINE_SIZE
}

/// Bit offset, within the leaf counter block, of this line's minor counter
/// (`cbo` in §4.2).
pub fn leaf_minor_bit_offset(line: u64) -> u32 {
    minor_bit_offset(line % FANOUT)
}

/// Byte offset, within the data-MAC block, of this line's MAC entry
/// (`dmo` in §4.2).
pub fn data_mac_byte_offset(line: u64) -> u64 {
    mac_entry_byte_offset(line % MACS_PER_BLOCK)
}

/// Tree path indices root-downward. `path[0]` is the level directly under
/// the root (coarsest: fewest distinct nodes); `path[TREE_HEIGHT - 1]` is
/// the deepest level and equals `line` itself (see `counter_block_addr`).
///
/// This implementation reads spec.md's parenthetical "so path[0] is the
/// deepest level" as inverted relative to its own formula (DESIGN.md
/// records the derivation); `path[TREE_HEIGHT - 1]` is what lines up with
/// `CB` and with the root-downward processing order in C3/C4.
pub fn tree_path(line: u64) -> [u64; TREE_HEIGHT] {
    let mut path = [0u64; TREE_HEIGHT];
    for (i, slot) in path.iter_mut().enumerate() {
        let exponent = (TREE_HEIGHT - 1 - i) as u32;
        *slot = line / FANOUT.pow(exponent);
    }
    path
}

/// DRAM address of tree level `level`'s node on this path.
pub fn level_addr(map: &MemoryMapConfig, path: &[u64; TREE_HEIGHT], level: usize) -> u64 {
    map.counter_base + (path[level] / FANOUT) * LINE_SIZE + map.level_base[level]
}

/// Index, within level `level`'s own 32-entry body, of the child numbered
/// `path[level] mod 32`. Used for two distinct purposes that turn out to be
/// the same number: incrementing level `level`'s own minor counter (C4),
/// and locating the parent entry that authenticates level `level + 1`
/// (C3/C4, called with `level - 1`).
pub fn child_slot(path: &[u64; TREE_HEIGHT], level: usize) -> u64 {
    path[level] % FANOUT
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemoryMapConfig;

    #[test]
    fn deepest_path_entry_is_the_line_itself() {
        let path = tree_path(5);
        assert_eq!(path[TREE_HEIGHT - 1], 5);
    }

    #[test]
    fn deepest_level_addr_matches_counter_block() {
        let map = MemoryMapConfig::simulator();
        let line = 70;
        let path = tree_path(line);
        assert_eq!(level_addr(&map, &path, TREE_HEIGHT - 1), counter_block_addr(&map, line));
    }

    #[test]
    fn path_entries_are_monotonically_coarser_towards_the_root() {
        let path = tree_path(12345);
        for i in 1..TREE_HEIGHT {
            assert!(path[i - 1] <= path[i]);
        }
    }

    #[test]
    fn rejects_addresses_outside_protection_region() {
        let map = MemoryMapConfig::simulator();
        let bad = map.protection_base + map.protection_size;
        assert!(line_index(&map, bad).is_err());
    }

    #[test]
    fn rejects_misaligned_addresses() {
        let map = MemoryMapConfig::simulator();
        assert!(line_index(&map, map.protection_base + 1).is_err());
    }

    #[test]
    fn data_mac_offsets_fill_one_block_exactly() {
        for line in 0..MACS_PER_BLOCK {
            assert_eq!(data_mac_byte_offset(line), line * 8);
        }
        assert_eq!(data_mac_byte_offset(MACS_PER_BLOCK), 0); // wraps into the next block
    }
}
