#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = uniportal_assignments::run().await {
        eprintln!("uniportal-assignments fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
