#![cfg_attr(not(test), no_std)]
#![cfg_attr(not(test), no_main)]
#![feature(naked_functions)]
#![feature(asm_const)]
#![feature(alloc_error_handler)]

#[macro_use]
extern crate alloc;
#[macro_use]
extern crate log;
#[macro_use]
extern crate static_assertions;
#[macro_use]
extern crate derive_more;

mod arch;
mod banner;
mod bus;
mod config;
mod device;
mod error;
mod firmware;
mod mm;
mod mmio;
mod panic;
mod util;

use bus::Bus;
use config::MEMORY_MAP;

/// Single-hart entry point: bring up the console logger and heap, announce
/// the build, then hand off to the protection core's dispatch loop. There
/// is exactly one hart and no MMU bring-up in this target (see
/// `arch::riscv64::start`'s boot stub), so there is no per-CPU branching
/// like a hypervisor init would have.
pub fn init() -> ! {
    util::logger::logger_init().unwrap();
    banner::init();
    mm::heap_init();

    info!("protection core online, protected region {:#x}..{:#x}", MEMORY_MAP.protection_base, MEMORY_MAP.protection_base + MEMORY_MAP.protection_size);

    let mut bus = Bus::new(MEMORY_MAP);
    firmware::run_forever(&mut bus)
}
