fn main() -> Result<(), Box<dyn std::error::Error>> {
    if std::env::var_os("PROTOC").is_none() {
        std::env::set_var("PROTOC", protoc_bin_vendored::protoc_bin_path()?);
    }
    // This agent is only ever a client of the control plane, so server
    // stubs are unnecessary generated surface.
    tonic_build::configure()
        .build_server(false)
        .build_client(true)
        .compile_protos(&["proto/agent_endpoint.proto"], &["proto"])?;
    Ok(())
}
