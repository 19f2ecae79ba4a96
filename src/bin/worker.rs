#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = classbridge::run_worker().await {
        eprintln!("classbridge-worker fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
