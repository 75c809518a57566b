fn main() {
    // Get version from environment (set by release tooling) or Cargo.toml
    let version = std::env::var("REMEDY_VERSION")
        .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string());

    println!("cargo:rustc-env=REMEDY_VERSION={}", version);
    println!("cargo:rerun-if-changed=Cargo.toml");
    println!("cargo:rerun-if-env-changed=REMEDY_VERSION");
}
