//! Request dispatcher (C8): the top-level loop. Polls the AXI manager,
//! classifies the request as a write (Authentication path) or read
//! (Verification path), and drives C2-C7 through one request's lifetime.
//! This is the one place a caught `Err` turns into "don't ack" rather than
//! propagating further (§7's propagation policy): every fallible step below
//! runs before any state mutates, so a short-circuited `?` never leaves a
//! request half-applied.

use log::{info, warn};

use crate::bus::Bus;
use crate::config::{LINE_SIZE, TREE_HEIGHT};
use crate::device::axim::{REG_STATUS, STATUS_IS_WRITE, STATUS_PENDING};
use crate::device::axim::{CMD_READ_RETURN, CMD_WRITE_RETURN, REG_COMMAND};
use crate::device::spm::{DATA_SLOT, LEAF_COUNTER_SLOT};
use crate::error::Result;
use crate::firmware::addressing::{counter_block_addr, line_index, tree_path};
use crate::firmware::counter_updater::{read_counters, update_path};
use crate::firmware::{crypto, data_mac, tree_verifier};

/// Polls once and, if a request is waiting, fully services it. Returns
/// `Ok(None)` when there was nothing to do, `Ok(Some(()))` after a request
/// was acked, and `Err` for a request that failed verification (already
/// dropped from the queue without an ack by the time this returns).
pub fn dispatch_once(bus: &mut Bus) -> Result<Option<()>> {
    let status = bus.axim.read_reg(REG_STATUS)?;
    if status & STATUS_PENDING == 0 {
        return Ok(None);
    }

    let addr = bus.axim.read_reg(crate::device::axim::REG_REQ_ADDR)?;
    let line = match line_index(&bus.map, addr) {
        Ok(line) => line,
        Err(err) => {
            warn!("{err}");
            bus.axim.drop_current();
            return Err(err);
        }
    };
    let path = tree_path(line);

    let result = if status & STATUS_IS_WRITE != 0 {
        authenticate(bus, addr, line, &path)
    } else {
        verify(bus, addr, line, &path)
    };

    match result {
        Ok(()) => Ok(Some(())),
        Err(err) => {
            warn!("request for line {line} rejected: {err}");
            bus.axim.drop_current();
            Err(err)
        }
    }
}

/// Write path (§4.7 step 2). Counter tree is only verified if the leaf
/// block has ever been touched (the zero-init shortcut); a brand new line
/// has nothing yet to authenticate.
fn authenticate(bus: &mut Bus, addr: u64, line: u64, path: &[u64; TREE_HEIGHT]) -> Result<()> {
    bus.ensure(LEAF_COUNTER_SLOT, counter_block_addr(&bus.map, line))?;
    let (major, minor) = read_counters(bus, TREE_HEIGHT - 1, path)?;
    if major != 0 || minor != 0 {
        tree_verifier::verify_path(bus, path)?;
    }

    update_path(bus, path)?;
    let (major, minor) = read_counters(bus, TREE_HEIGHT - 1, path)?;

    crypto::encrypt(bus, addr, major, minor)?;
    data_mac::store(bus, line)?;

    let dram_addr = bus.map.protection_base + line * LINE_SIZE;
    bus.dma.transfer_line(dram_addr, DATA_SLOT * LINE_SIZE, crate::device::spm_dma::DIRECTION_SPM_TO_DRAM, &mut bus.dram, &mut bus.spm)?;

    bus.axim.write_reg(REG_COMMAND, CMD_WRITE_RETURN, &mut bus.spm)?;
    info!("write committed for line {line}");
    Ok(())
}

/// Read path (§4.7 step 3). A never-written line (major and minor both
/// zero) is served directly as all-zero plaintext under the zero-init
/// policy (see DESIGN.md), bypassing AES/DMA entirely: there is no
/// ciphertext yet to decrypt.
fn verify(bus: &mut Bus, addr: u64, line: u64, path: &[u64; TREE_HEIGHT]) -> Result<()> {
    bus.ensure(LEAF_COUNTER_SLOT, counter_block_addr(&bus.map, line))?;
    let (major, minor) = read_counters(bus, TREE_HEIGHT - 1, path)?;

    if major == 0 && minor == 0 {
        bus.axim.set_read_buffer([0u8; LINE_SIZE as usize]);
    } else {
        tree_verifier::verify_path(bus, path)?;
        let dram_addr = bus.map.protection_base + line * LINE_SIZE;
        crypto::decrypt(bus, dram_addr, addr, major, minor)?;
        data_mac::verify(bus, line)?;
    }

    bus.axim.write_reg(REG_COMMAND, CMD_READ_RETURN, &mut bus.spm)?;
    info!("read served for line {line}");
    Ok(())
}

/// The firmware's main loop: one request at a time, forever (§5's
/// cooperative single-threaded scheduling model). Never returns; a request
/// that fails verification is logged and dropped, not fatal to the loop.
pub fn run_forever(bus: &mut Bus) -> ! {
    loop {
        match dispatch_once(bus) {
            Ok(_) => {}
            Err(err) => warn!("request dropped: {err}"),
        }
    }
}
