mod heap;

pub use heap::heap_init;
