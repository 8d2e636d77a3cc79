fn main() -> Result<(), Box<dyn std::error::Error>> {
    std::env::set_var(
        "PROTOC",
        protoc_bin_vendored::protoc_bin_path().expect("vendored protoc binary"),
    );

    // Compile the vision backend contract. Only a client stub is needed: the
    // gateway calls out to the vision backend, it never serves this trait.
    tonic_build::configure()
        .build_server(false)
        .build_client(true)
        .compile_protos(&["proto/vision.proto"], &["proto/"])?;

    Ok(())
}
