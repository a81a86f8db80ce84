//! The target has no OS to hand a crashed hart back to: a panic logs and
//! then parks the core forever. Only registered outside `cfg(test)` — the
//! host test binary already links `std`'s own panic runtime, and defining
//! a second `#[panic_handler]` alongside it is a duplicate-lang-item error.

#[cfg(not(test))]
use core::panic::PanicInfo;

#[cfg(not(test))]
#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    error!("{}", info);
    loop {
        core::hint::spin_loop();
    }
}
