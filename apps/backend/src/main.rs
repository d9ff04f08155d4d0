#[tokio::main]
async fn main() -> anyhow::Result<()> {
    learnflow_backend::run().await
}
