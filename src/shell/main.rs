use anyhow::Context;
use clap::Parser;
use package_updates::modules::package_updates::adapters::outbound::failure_log_http::HttpFailureLogSource;
use package_updates::modules::package_updates::adapters::outbound::handlers::{
    DryRunLog, HandlerOptions, Outbound,
};
use package_updates::modules::package_updates::adapters::outbound::sync_db::SyncDatabase;
use package_updates::modules::package_updates::core::ports::MetadataSource;
use package_updates::modules::package_updates::use_cases::dispatch_updates::engine::DispatchEngine;
use package_updates::modules::package_updates::use_cases::track_failures::tracker::{
    FAILURE_WATERMARK, FailureLogTracker,
};
use package_updates::shared::infrastructure::http_client::{HttpConfig, build_client};
use package_updates::shared::infrastructure::watermark::file::FileWatermarks;
use package_updates::shell::config::{Args, build_handlers, build_health_signal};
use package_updates::shell::state::AppState;
use package_updates::shell::workers::{run_until_shutdown, spawn_status_server};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(args.log_level())),
        )
        .init();

    let client = build_client(&HttpConfig::default()).context("building http client")?;
    let outbound = if args.dry_run {
        tracing::info!("dry run, deliveries are only logged");
        Outbound::DryRun(Arc::new(DryRunLog::new()))
    } else {
        Outbound::Http(client.clone())
    };

    let mut sources: Vec<Arc<dyn MetadataSource>> = Vec::with_capacity(args.repos.len());
    for repo in &args.repos {
        let db = SyncDatabase::open(repo.as_str(), &args.baseurl, &args.cache_dir, client.clone()).await;
        sources.push(Arc::new(db));
    }

    let tracker = FailureLogTracker::load(
        FAILURE_WATERMARK,
        Arc::new(HttpFailureLogSource::new(&args.logurl, client)),
        Arc::new(FileWatermarks::new(&args.cache_dir)),
    )
    .await;

    let options = HandlerOptions::from_env();
    let handlers = build_handlers(&options, &outbound);
    if handlers.is_empty() {
        tracing::warn!("no handler configured, events are only logged");
    }

    let mut engine = DispatchEngine::new(sources, tracker, handlers, args.engine_config());
    if let Some(health) = build_health_signal(&options, &outbound) {
        engine = engine.with_health_signal(health);
    }

    if let Some(addr) = args.listen {
        spawn_status_server(addr, AppState { status: engine.status() })
            .await
            .with_context(|| format!("binding status endpoint on {addr}"))?;
    }

    run_until_shutdown(engine).await?;
    Ok(())
}
