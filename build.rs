fn main() {
    // ESP-IDF environment propagation only matters for device builds.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
