use anyhow::Result;
use outline::cli;

#[tokio::main]
async fn main() -> Result<()> {
    cli::run().await
}
