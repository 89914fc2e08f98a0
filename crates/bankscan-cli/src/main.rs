mod crawl;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use bankscan_core::{load_market, load_settings};

#[derive(Debug, Parser)]
#[command(name = "bankscan-cli")]
#[command(about = "Bank product comparison data crawler")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Crawl the configured catalog endpoints and export comparison datasets.
    Crawl {
        /// Endpoint identifiers to crawl (creditcards, debitcards,
        /// deposits). Defaults to every configured endpoint.
        #[arg(long = "product-type", value_name = "ID")]
        product_types: Vec<String>,

        /// Maximum number of catalog pages to traverse per endpoint.
        #[arg(long, default_value_t = 1)]
        max_pages: usize,

        /// Run the browser with a visible window (debugging aid).
        #[arg(long)]
        headful: bool,

        /// Market config path (overrides BANKSCAN_MARKET_PATH).
        #[arg(long, value_name = "PATH")]
        market: Option<PathBuf>,

        /// Output directory (overrides BANKSCAN_OUTPUT_DIR).
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,
    },

    /// Validate the market configuration and print a summary.
    CheckConfig {
        /// Market config path (overrides BANKSCAN_MARKET_PATH).
        #[arg(long, value_name = "PATH")]
        market: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Crawl {
            product_types,
            max_pages,
            headful,
            market,
            out,
        } => {
            crawl::run(crawl::CrawlOptions {
                product_types,
                max_pages,
                headful,
                market_path: market,
                output_dir: out,
            })
            .await
        }
        Commands::CheckConfig { market } => check_config(market),
    }
}

fn check_config(market_path: Option<PathBuf>) -> anyhow::Result<()> {
    let settings = load_settings()?;
    let path = market_path.unwrap_or(settings.market_path);
    let market = load_market(&path)?;
    println!(
        "market config OK: {} banks, {} criteria, {} rules, {} endpoints",
        market.banks.len(),
        market.criteria.len(),
        market.rules.len(),
        market.endpoints.len()
    );
    Ok(())
}
