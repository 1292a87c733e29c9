use anyhow::Context;
use clap::Parser;
use scout_core::config::SourceMode;
use scout_core::domain::hunt::DealRequest;
use scout_core::Scout;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "scout_worker")]
struct Args {
    /// Brand to hunt for, e.g. "UPPAbaby".
    #[arg(long)]
    brand: String,

    /// Optional model name appended to the brand, e.g. "Vista".
    #[arg(long)]
    item_name: Option<String>,

    /// Item category stored with each deal, e.g. "Stroller".
    #[arg(long)]
    category: Option<String>,

    /// Hunt the deals are saved under.
    #[arg(long)]
    hunt_id: String,

    #[arg(long)]
    max_price: Option<f64>,

    /// Use fixture sources instead of live marketplaces.
    #[arg(long)]
    mock: bool,

    /// Do everything except writing to the store.
    #[arg(long)]
    dry_run: bool,

    /// Print the result as JSON instead of one line per deal.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let mut settings = scout_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();
    if args.mock {
        settings.source_mode = SourceMode::Mock;
    }

    let req = DealRequest::from_parts(
        &args.brand,
        args.item_name.as_deref(),
        &args.hunt_id,
        args.max_price,
        args.category.as_deref(),
    )
    .context("invalid hunt arguments")?;

    if args.dry_run {
        let adapters = scout_core::source::adapters_from_settings(&settings)?;
        let aggregation = scout_core::aggregate::Aggregator::new(adapters)
            .aggregate(&req.query, req.hunt_id.as_str(), req.max_price)
            .await;

        tracing::info!(
            query = %req.query,
            dry_run = true,
            deals_len = aggregation.deals.len(),
            "scrape finished without saving"
        );
        if args.json {
            println!("{}", serde_json::to_string_pretty(&aggregation.deals)?);
        } else {
            for deal in &aggregation.deals {
                println!("${:.2} - {} ({})", deal.price, deal.title, deal.store);
            }
        }
        return Ok(());
    }

    let scout = Scout::from_settings(&settings).await?;
    let report = scout.run(&req).await;

    if report.persist_failed {
        let err = anyhow::anyhow!(
            "found {} deals for hunt {} but saving them failed",
            report.found,
            req.hunt_id
        );
        sentry_anyhow::capture_anyhow(&err);
        return Err(err);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report.persisted)?);
    } else {
        println!("Found {} deals:", report.persisted.len());
        for r in &report.persisted {
            println!("  ${:.2} - {} ({})", r.deal.price, r.deal.title, r.deal.store);
        }
    }

    Ok(())
}

fn init_sentry(settings: &scout_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
