use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    modelrelay::run().await
}
