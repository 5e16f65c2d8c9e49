//! `imgtag` binary entrypoint.

#[tokio::main]
async fn main() {
    let exit_code = imgtag_cli::run().await;
    std::process::exit(exit_code);
}
