use storefront_service::{config::Config, Application};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    store_core::observability::init_logging("info,storefront_service=debug");

    let config = Config::from_env()?;
    let application = Application::build(config).await?;
    application.run_until_stopped().await?;

    Ok(())
}
