#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = classhub_api::run().await {
        eprintln!("classhub-api fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
