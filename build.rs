fn main() {
    // The firmware binary embeds the bridge tables at compile time.
    println!("cargo:rerun-if-changed=config/bridge.json");

    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
