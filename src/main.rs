use tracing::error;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // `.env.local` first so it wins; both are optional.
    dotenvy::from_filename(".env.local").ok();
    dotenvy::dotenv().ok();

    ai_llm_service::telemetry::init("info", &[]);

    if let Err(err) = api::start().await {
        error!(error = %err, "server terminated");
        return Err(err.into());
    }
    Ok(())
}
