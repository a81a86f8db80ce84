// rCore buddy system allocator
//
// Only wired up as the `#[global_allocator]` outside `cfg(test)`: under
// `cargo test` this module still builds (so the rest of the crate doesn't
// need its own cfg-gating), but std's own allocator stays in charge, since
// this heap is only ever `init`ed from the bare-metal boot path and an
// un-initialized `LockedHeap` would abort the first `Vec`/`format!` any
// test makes.
#[cfg(not(test))]
use buddy_system_allocator::LockedHeap;

const HEAP_SIZE: usize = 256 * 1024;

#[cfg(not(test))]
#[repr(align(4096))]
struct HeapRegion([u8; HEAP_SIZE]);

#[cfg(not(test))]
static HEAP_REGION: HeapRegion = HeapRegion([0; HEAP_SIZE]);

#[cfg(not(test))]
#[global_allocator]
pub static HEAP_ALLOCATOR: LockedHeap<32> = LockedHeap::empty();

#[cfg(not(test))]
pub fn heap_init() {
    info!("init buddy system heap, {} bytes", HEAP_SIZE);
    unsafe {
        HEAP_ALLOCATOR
            .lock()
            .init(&HEAP_REGION.0 as *const _ as usize, HEAP_SIZE);
    }
}

#[cfg(test)]
pub fn heap_init() {}

#[cfg(not(test))]
#[alloc_error_handler]
fn alloc_error_handler(_: core::alloc::Layout) -> ! {
    panic!("alloc_error_handler: heap panic");
}
