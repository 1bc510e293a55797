#[tokio::main]
async fn main() {
    if let Err(e) = marklin_server::run_with_config().await {
        eprintln!("server exited with error: {e}");
        std::process::exit(1);
    }
}
