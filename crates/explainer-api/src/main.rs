use explainer_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize the application (stores, services, routes)
    let (_state, router) = explainer_api::setup::initialize_app(config.clone()).await?;

    // Start the server
    explainer_api::setup::server::start_server(&config, router).await?;

    Ok(())
}
