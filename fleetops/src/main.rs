use fleetops::Config;
use fleetops::logging::init_logging;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config = match Config::load() {
        Ok(config) => config,
        Err(err) => {
            init_logging("info");
            tracing::error!("{err}");
            std::process::exit(1);
        }
    };
    init_logging(&config.logging.filter);

    if let Err(err) = fleetops::run(config).await {
        tracing::error!("{err}");
        std::process::exit(1);
    }
}
