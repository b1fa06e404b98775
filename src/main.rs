use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    snaptex::run().await
}
