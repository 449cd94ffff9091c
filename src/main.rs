use dealz_crawler::{run_scraper, ConfigOverrides};
use dotenv::dotenv;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let overrides = ConfigOverrides::from_env();
    match run_scraper(overrides).await {
        Ok(offers) => {
            info!("Run complete: {} offers persisted.", offers.len());
        }
        Err(e) => {
            error!("Scrape failed: {e}");
            std::process::exit(1);
        }
    }
}
