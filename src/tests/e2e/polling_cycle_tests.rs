// End to end polling cycles over HTTP fakes: sync databases and the failure
// log are served by httpmock, handlers run in dry-run mode, watermarks and
// database caches live in a temp directory.

use crate::modules::package_updates::adapters::outbound::failure_log_http::HttpFailureLogSource;
use crate::modules::package_updates::adapters::outbound::handlers::{
    DryRunLog, HandlerOptions, Outbound,
};
use crate::modules::package_updates::adapters::outbound::sync_db::SyncDatabase;
use crate::modules::package_updates::core::package::PackageRecord;
use crate::modules::package_updates::core::ports::MetadataSource;
use crate::modules::package_updates::use_cases::dispatch_updates::engine::{
    DispatchEngine, EngineConfig,
};
use crate::modules::package_updates::use_cases::track_failures::tracker::{
    FAILURE_WATERMARK, FailureLogTracker,
};
use crate::shared::infrastructure::watermark::WatermarkRepository;
use crate::shared::infrastructure::watermark::file::FileWatermarks;
use crate::shell::config::{build_handlers, build_health_signal};
use crate::tests::fixtures::failure_log::{FOO_FAILED_AT, failure_line};
use crate::tests::fixtures::packages::PackageRecordBuilder;
use crate::tests::fixtures::sync_db::sync_db;
use chrono::{DateTime, TimeZone, Utc};
use httpmock::prelude::*;
use rstest::{fixture, rstest};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

const BAR_FAILED_AT: &str = "2024-01-02 00:00:00.0000000000";

fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

fn yesterday() -> Vec<PackageRecord> {
    vec![
        PackageRecordBuilder::new("gcc").version("13.1-1").build_date(at(2023, 10, 1)).build(),
        PackageRecordBuilder::new("foo").version("1.0-1").build_date(at(2023, 12, 1)).build(),
    ]
}

fn today() -> Vec<PackageRecord> {
    vec![
        PackageRecordBuilder::new("gcc").version("13.2-1").build_date(at(2024, 1, 10)).build(),
        PackageRecordBuilder::new("foo").version("1.0-1").build_date(at(2023, 12, 1)).build(),
        PackageRecordBuilder::new("bash").version("5.2-1").build_date(at(2024, 1, 10)).build(),
    ]
}

fn failure_log() -> String {
    [
        failure_line("2023-11-01 00:00:00.0000000000", "gcc", "gcc-13.1-1.log"),
        failure_line(FOO_FAILED_AT, "foo", "foo-1.0-1.log"),
        failure_line(BAR_FAILED_AT, "bar", "bar-0.1-1.log"),
    ]
    .join("\n")
}

struct World {
    server: MockServer,
    cache: TempDir,
    log: Arc<DryRunLog>,
}

#[fixture]
async fn world() -> World {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/repo/core/core.db");
            then.status(200).body(sync_db(&today()));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/.status/latestlogs.txt");
            then.status(200).body(failure_log());
        })
        .await;

    let cache = TempDir::new().unwrap();
    std::fs::create_dir_all(cache.path().join("sync")).unwrap();
    std::fs::write(cache.path().join("sync/core.db"), sync_db(&yesterday())).unwrap();

    World {
        server,
        cache,
        log: Arc::new(DryRunLog::new()),
    }
}

async fn engine(world: &World) -> DispatchEngine {
    let client = reqwest::Client::new();
    let core = SyncDatabase::open("core", &world.server.url("/repo"), world.cache.path(), client.clone()).await;
    let sources: Vec<Arc<dyn MetadataSource>> = vec![Arc::new(core)];
    let tracker = FailureLogTracker::load(
        FAILURE_WATERMARK,
        Arc::new(HttpFailureLogSource::new(world.server.url("/.status/latestlogs.txt"), client)),
        Arc::new(FileWatermarks::new(world.cache.path())),
    )
    .await;

    let options: HandlerOptions = [
        ("telegram__bot_token", "123:abc"),
        ("telegram__chat_id", "42"),
        ("archrv__baseurl", "https://bot.example"),
        ("archrv__token", "t"),
        ("uptimekuma__baseurl", "https://kuma.example"),
        ("uptimekuma__token", "push"),
    ]
    .into_iter()
    .collect();
    let outbound = Outbound::DryRun(world.log.clone());
    let mut engine = DispatchEngine::new(
        sources,
        tracker,
        build_handlers(&options, &outbound),
        EngineConfig::default(),
    );
    if let Some(health) = build_health_signal(&options, &outbound) {
        engine = engine.with_health_signal(health);
    }
    engine
}

async fn stored_watermark(dir: &Path) -> Option<String> {
    FileWatermarks::new(dir).get(FAILURE_WATERMARK).await.unwrap()
}

#[rstest]
#[tokio::test]
async fn it_should_announce_updates_and_fresh_failures(#[future] world: World) {
    let world = world.await;
    let mut engine = engine(&world).await;

    let report = engine.run_cycle().await.unwrap();
    assert_eq!((report.updates, report.failures), (2, 2));
    let dispatch = report.dispatch.expect("batch dispatched").await.unwrap();
    assert_eq!(dispatch.delivered, vec!["archrv", "telegram"]);

    let deliveries = world.log.deliveries().await;
    let telegram: Vec<_> = deliveries.iter().filter(|d| d.target == "telegram chat 42").collect();
    assert_eq!(telegram.len(), 1);
    assert!(telegram[0].body.contains("gcc 13.1-1 -&gt; 13.2-1"));
    assert!(telegram[0].body.contains("bash 5.2-1"));
    assert!(!telegram[0].body.contains("foo"));

    let mut archrv: Vec<_> = deliveries
        .iter()
        .filter(|d| d.target.starts_with("https://bot.example"))
        .map(|d| d.target.as_str())
        .collect();
    archrv.sort();
    assert_eq!(
        archrv,
        vec![
            "https://bot.example/delete/bash/leaf",
            "https://bot.example/delete/gcc/ftbfs",
        ]
    );
    assert!(deliveries.iter().any(|d| d.target == "push up" && d.body == "OK"));

    assert_eq!(stored_watermark(world.cache.path()).await.as_deref(), Some(BAR_FAILED_AT));
    let status = engine.status().snapshot().await;
    assert_eq!(status.last_batch_size, 4);
    assert_eq!(status.failure_watermark, BAR_FAILED_AT);
}

#[rstest]
#[tokio::test]
async fn it_should_stay_quiet_after_a_restart(#[future] world: World) {
    let world = world.await;
    let mut first = engine(&world).await;
    first.run_cycle().await.unwrap();
    drop(first);

    let mut restarted = engine(&world).await;
    let report = restarted.run_cycle().await.unwrap();
    assert_eq!((report.updates, report.failures), (0, 0));
    assert!(report.dispatch.is_none());
}

#[rstest]
#[tokio::test]
async fn it_should_signal_down_when_the_mirror_is_gone() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/repo/core/core.db");
            then.status(404);
        })
        .await;
    let world = World {
        server,
        cache: TempDir::new().unwrap(),
        log: Arc::new(DryRunLog::new()),
    };
    let mut engine = engine(&world).await;

    assert!(engine.run_cycle().await.is_err());
    let deliveries = world.log.deliveries().await;
    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0].target, "push down");
    assert!(deliveries[0].body.contains("core"));
    assert_eq!(stored_watermark(world.cache.path()).await, None);
}
