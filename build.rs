use std::env::var;

fn main() {
    let arch = var("CARGO_CFG_TARGET_ARCH").unwrap();
    let (platform, text_start) = if cfg!(feature = "qemu-virt") {
        ("qemu-virt", 0x80200000_u64)
    } else {
        ("sim", 0x80200000_u64)
    };
    if arch == "riscv64" {
        println!("cargo:rustc-link-arg=-Tlinkers/{arch}.ld");
        println!("cargo:rustc-link-arg=--defsym=TEXT_START={text_start}");
    }

    println!("cargo:rerun-if-changed=src/");

    let build_time = chrono::offset::Local::now().format("%Y-%m-%d %H:%M:%S %Z");
    println!("cargo:rustc-env=BUILD_TIME={}", build_time);
    println!("cargo:rustc-env=PLATFORM={}", platform.to_uppercase());
}
