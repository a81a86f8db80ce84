mod start;
mod console;

pub use console::console_write_fmt;
