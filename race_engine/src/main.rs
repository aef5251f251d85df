#[tokio::main]
async fn main() -> std::io::Result<()> {
    race_engine::run_with_config().await
}
