use anyhow::{Context, Result};
use plawai::config::RelayConfig;
use plawai::server::{self, AppState};
use tokio::net::TcpListener;
use tracing::error;

#[tokio::main]
async fn main() -> Result<()> {
    plawai::load_dotenv();
    plawai::init_tracing();

    let config = RelayConfig::from_env().map_err(|err| {
        error!("{err}");
        err
    })?;

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    server::serve(listener, AppState::from_config(&config)).await?;
    Ok(())
}
