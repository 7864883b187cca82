use log::error;
use sheet_messenger::app;
use sheet_messenger::config::Config;

/// Main entry point for the sheet messenger web server
///
/// Reads configuration from the environment (falling back to `./.env`), then serves
/// the browser page and the `/api` routes until the process is stopped.
///
/// Logging goes through `env_logger`; set `RUST_LOG` to change the default `info` level.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env_and_file(".env").inspect_err(|e| error!("{}", e))?;

    app::run(config).await
}
