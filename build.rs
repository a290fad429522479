//! Build script for proto compilation.
//!
//! Compiles `proto/provider.proto` into the `provider.v1` module that
//! `src/generated.rs` includes. A vendored `protoc` is used unless the
//! `PROTOC` environment variable already points at one.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if std::env::var_os("PROTOC").is_none() {
        std::env::set_var("PROTOC", protoc_bin_vendored::protoc_bin_path()?);
    }

    tonic_prost_build::configure()
        .build_client(false)
        .compile_protos(&["proto/provider.proto"], &["proto"])?;

    println!("cargo:rerun-if-changed=proto/provider.proto");

    Ok(())
}
