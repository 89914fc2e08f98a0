//! Crawl run orchestration: one isolated pipeline per selected endpoint
//! (session → catalog → per-entry detail extraction → assemble → export),
//! fanned out with bounded concurrency. Pipelines share nothing but the
//! read-only market config and normalization table.

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Utc;
use futures::stream::{self, StreamExt};

use bankscan_core::{
    assemble, load_market, load_settings, write_csv, CrawlerSettings, EndpointConfig, MarketConfig,
    NormalizationTable, ProductType,
};
use bankscan_crawler::{crawl_catalog, extract_details, wait, CrawlError, Session};

pub struct CrawlOptions {
    pub product_types: Vec<String>,
    pub max_pages: usize,
    pub headful: bool,
    pub market_path: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
}

/// Shared, read-only context for every endpoint pipeline in a run.
struct RunContext<'a> {
    market: &'a MarketConfig,
    table: &'a NormalizationTable,
    settings: &'a CrawlerSettings,
    max_pages: usize,
    headless: bool,
    output_dir: &'a Path,
    stamp: &'a str,
}

/// Executes a crawl run.
///
/// Per-endpoint failures are logged and do not abort sibling endpoints,
/// with one exception: a browser-launch failure is environment-fatal and
/// aborts the whole run immediately. A run where every endpoint failed is
/// itself a failure.
pub async fn run(options: CrawlOptions) -> anyhow::Result<()> {
    let settings = load_settings()?;
    let market_path = options
        .market_path
        .clone()
        .unwrap_or_else(|| settings.market_path.clone());
    let market = load_market(&market_path)
        .with_context(|| format!("loading market config from {}", market_path.display()))?;
    let table = NormalizationTable::new(&market.rules);

    let endpoints = select_endpoints(&market, &options.product_types)?;
    let output_dir = options
        .output_dir
        .clone()
        .unwrap_or_else(|| settings.output_dir.clone());
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("creating output directory {}", output_dir.display()))?;

    let stamp = Utc::now().format("%Y%m%d").to_string();
    let headless = !options.headful;
    let max_concurrent = settings.max_concurrent_sessions.max(1);

    tracing::info!(
        endpoints = endpoints.len(),
        max_pages = options.max_pages,
        headless,
        "starting crawl run"
    );

    let ctx = RunContext {
        market: &market,
        table: &table,
        settings: &settings,
        max_pages: options.max_pages,
        headless,
        output_dir: &output_dir,
        stamp: &stamp,
    };
    let ctx = &ctx;

    let results: Vec<(ProductType, anyhow::Result<usize>)> = stream::iter(endpoints)
        .map(|endpoint| async move {
            let product_type = endpoint.product_type;
            let outcome = run_endpoint(&endpoint, ctx).await;
            (product_type, outcome)
        })
        .buffer_unordered(max_concurrent)
        .collect()
        .await;

    let endpoint_count = results.len();
    let mut failed = 0usize;
    let mut total_records = 0usize;

    for (product_type, outcome) in results {
        match outcome {
            Ok(records) => total_records += records,
            Err(e) => {
                failed += 1;
                if is_fatal(&e) {
                    return Err(
                        e.context("browser session could not be started — aborting the run")
                    );
                }
                tracing::error!(
                    endpoint = product_type.endpoint_id(),
                    error = %format!("{e:#}"),
                    "endpoint crawl failed"
                );
            }
        }
    }

    if endpoint_count > 0 && failed == endpoint_count {
        anyhow::bail!("all {failed} endpoint crawls failed");
    }

    tracing::info!(
        records = total_records,
        failed,
        endpoints = endpoint_count,
        "crawl run finished"
    );
    Ok(())
}

/// One fully isolated endpoint pipeline. The session is closed on every
/// path, including Ctrl-C.
async fn run_endpoint(endpoint: &EndpointConfig, ctx: &RunContext<'_>) -> anyhow::Result<usize> {
    let session = Session::open(ctx.settings, ctx.headless).await?;

    let outcome = tokio::select! {
        result = run_pipeline(&session, endpoint, ctx) => result,
        _ = tokio::signal::ctrl_c() => {
            Err(anyhow::anyhow!("crawl interrupted — cleaning up session"))
        }
    };

    session.close().await;
    outcome
}

async fn run_pipeline(
    session: &Session,
    endpoint: &EndpointConfig,
    ctx: &RunContext<'_>,
) -> anyhow::Result<usize> {
    let entries = crawl_catalog(
        session,
        &endpoint.url,
        endpoint.product_type,
        ctx.max_pages,
        ctx.market,
        ctx.settings,
    )
    .await?;

    if entries.is_empty() {
        tracing::warn!(
            endpoint = endpoint.product_type.endpoint_id(),
            "catalog crawl produced no entries"
        );
    }

    let mut details = Vec::with_capacity(entries.len());
    for entry in &entries {
        tracing::info!(
            bank = %entry.bank,
            product = %entry.product_name,
            ordinal = entry.ordinal,
            "extracting details"
        );
        let criteria =
            extract_details(session, entry.ordinal, ctx.table, ctx.market, ctx.settings).await;
        details.push(criteria);
        wait::settle(
            ctx.settings.settle_between_details_ms,
            ctx.settings.settle_jitter_ms,
        )
        .await;
    }

    let records = assemble(&entries, &details, &ctx.market.criteria);
    let out_path = ctx.output_dir.join(format!(
        "{}_{}.csv",
        endpoint.product_type.endpoint_id(),
        ctx.stamp
    ));
    write_csv(&records, &ctx.market.criteria, &out_path)
        .with_context(|| format!("writing dataset to {}", out_path.display()))?;

    tracing::info!(
        records = records.len(),
        path = %out_path.display(),
        "dataset written"
    );
    Ok(records.len())
}

fn select_endpoints(
    market: &MarketConfig,
    requested: &[String],
) -> anyhow::Result<Vec<EndpointConfig>> {
    if requested.is_empty() {
        return Ok(market.endpoints.clone());
    }

    let mut selected = Vec::with_capacity(requested.len());
    for id in requested {
        let product_type = ProductType::from_endpoint(id).ok_or_else(|| {
            anyhow::anyhow!(
                "unknown product type '{id}' (expected creditcards, debitcards or deposits)"
            )
        })?;
        let endpoint = market
            .endpoint(product_type)
            .ok_or_else(|| anyhow::anyhow!("no endpoint configured for product type '{id}'"))?;
        selected.push(endpoint.clone());
    }
    Ok(selected)
}

fn is_fatal(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<CrawlError>()
            .is_some_and(CrawlError::is_fatal)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn market() -> MarketConfig {
        MarketConfig {
            banks: vec!["ВТБ".to_string()],
            criteria: vec!["Кредитный лимит".to_string()],
            rules: vec![],
            endpoints: vec![
                EndpointConfig {
                    product_type: ProductType::CreditCard,
                    url: "https://example.com/creditcards/".to_string(),
                },
                EndpointConfig {
                    product_type: ProductType::Deposit,
                    url: "https://example.com/deposits/".to_string(),
                },
            ],
        }
    }

    #[test]
    fn select_endpoints_defaults_to_all_configured() {
        let selected = select_endpoints(&market(), &[]).unwrap();
        assert_eq!(selected.len(), 2);
    }

    #[test]
    fn select_endpoints_picks_requested_types() {
        let selected = select_endpoints(&market(), &["deposits".to_string()]).unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].product_type, ProductType::Deposit);
    }

    #[test]
    fn select_endpoints_rejects_unknown_type() {
        let err = select_endpoints(&market(), &["mortgages".to_string()]).unwrap_err();
        assert!(err.to_string().contains("unknown product type"));
    }

    #[test]
    fn select_endpoints_rejects_unconfigured_type() {
        let err = select_endpoints(&market(), &["debitcards".to_string()]).unwrap_err();
        assert!(err.to_string().contains("no endpoint configured"));
    }

    #[test]
    fn fatal_detection_sees_launch_errors_through_the_chain() {
        let launch = anyhow::Error::from(CrawlError::Launch {
            reason: "no chromium".to_string(),
        })
        .context("opening session for creditcards");
        assert!(is_fatal(&launch));

        let soft = anyhow::anyhow!("catalog crawl produced no entries");
        assert!(!is_fatal(&soft));
    }
}
