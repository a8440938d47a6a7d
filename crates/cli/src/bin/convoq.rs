use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    convoq_cli::main_entry().await
}
