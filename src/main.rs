#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = classbridge::run().await {
        eprintln!("classbridge fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
