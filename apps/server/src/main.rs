use tracing::info;

mod api;
mod config;
mod error;
mod main_lib;
mod telegram;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    main_lib::init_tracing();

    let config = config::Config::from_env()?;
    let state = main_lib::build_state(&config).await?;
    let router = api::app_router(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!("listening on {}", config.listen_addr);
    axum::serve(listener, router).await?;
    Ok(())
}
