pub fn init() {
    info!(
        "{} {} booting on {}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        env!("PLATFORM")
    );
    info!("built at {}", env!("BUILD_TIME"));
}
