use imgu_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::from_env()?;

    // Database, storage registry, services, background tasks and routes
    let app = imgu_api::setup::initialize_app(&config).await?;

    imgu_api::setup::server::start_server(&config, app).await?;

    Ok(())
}
