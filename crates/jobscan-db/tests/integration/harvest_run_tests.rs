use chrono::Utc;
use jobscan_core::models::{NewHarvestRun, PersistenceMode, SearchQuery, WriteSummary};
use jobscan_core::source::SourceKind;

use crate::integration::common::setup_test_db;

fn run(source: SourceKind, title: &str, record_count: u32) -> NewHarvestRun {
    NewHarvestRun {
        source,
        query: SearchQuery::new(title, "germany"),
        persistence_mode: PersistenceMode::Replace,
        pages_planned: 3,
        pages_failed: 1,
        record_count,
        summary: WriteSummary {
            inserted: record_count as u64,
            deleted: 2,
            ..WriteSummary::default()
        },
        started_at: Utc::now(),
    }
}

#[tokio::test]
async fn record_and_read_back_harvest_run() {
    let (db, _container) = setup_test_db().await;
    let repo = db.listing_repo();

    let id = repo
        .record_harvest(&run(SourceKind::Glassdoor, "developer", 6))
        .await
        .unwrap();
    assert!(!id.is_nil());

    let history = repo
        .harvest_history(SourceKind::Glassdoor, 10)
        .await
        .unwrap();
    assert_eq!(history.len(), 1);

    let entry = &history[0];
    assert_eq!(entry.id, id);
    assert_eq!(entry.source, SourceKind::Glassdoor);
    assert_eq!(entry.query_title, "developer");
    assert_eq!(entry.query_location, "germany");
    assert_eq!(entry.persistence_mode, PersistenceMode::Replace);
    assert_eq!(entry.pages_planned, 3);
    assert_eq!(entry.pages_failed, 1);
    assert_eq!(entry.record_count, 6);
    assert_eq!(entry.inserted, 6);
    assert!(entry.finished_at >= entry.started_at);
}

#[tokio::test]
async fn history_is_newest_first_and_limited() {
    let (db, _container) = setup_test_db().await;
    let repo = db.listing_repo();

    for title in ["first", "second", "third"] {
        repo.record_harvest(&run(SourceKind::Indeed, title, 1))
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    repo.record_harvest(&run(SourceKind::LinkedIn, "other", 1))
        .await
        .unwrap();

    let history = repo.harvest_history(SourceKind::Indeed, 2).await.unwrap();
    let titles: Vec<_> = history.iter().map(|r| r.query_title.as_str()).collect();
    assert_eq!(titles, vec!["third", "second"]);
}

#[tokio::test]
async fn health_check_succeeds() {
    let (db, _container) = setup_test_db().await;
    db.health_check().await.unwrap();
}
