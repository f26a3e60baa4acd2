use anyhow::Result;
use spiced_ham::cli;

#[tokio::main]
async fn main() -> Result<()> {
    cli::run().await
}
