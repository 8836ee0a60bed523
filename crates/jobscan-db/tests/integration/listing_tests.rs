use jobscan_core::source::SourceKind;

use crate::integration::common::{listing, setup_test_db};

#[tokio::test]
async fn replace_all_leaves_exactly_the_new_set() {
    let (db, _container) = setup_test_db().await;
    let repo = db.listing_repo();

    let old = vec![
        listing(SourceKind::Glassdoor, "Old A", "Acme", "Berlin"),
        listing(SourceKind::Glassdoor, "Old B", "Acme", "Berlin"),
    ];
    repo.replace_all(SourceKind::Glassdoor, &old).await.unwrap();

    let fresh = vec![
        listing(SourceKind::Glassdoor, "New A", "Globex", "Munich"),
        listing(SourceKind::Glassdoor, "New B", "Globex", "Munich"),
        listing(SourceKind::Glassdoor, "New C", "Globex", "Munich"),
    ];
    let summary = repo
        .replace_all(SourceKind::Glassdoor, &fresh)
        .await
        .unwrap();

    assert_eq!(summary.deleted, 2);
    assert_eq!(summary.inserted, 3);
    assert_eq!(repo.find_all(SourceKind::Glassdoor).await.unwrap(), fresh);
}

#[tokio::test]
async fn replace_all_with_nothing_empties_the_source() {
    let (db, _container) = setup_test_db().await;
    let repo = db.listing_repo();

    repo.replace_all(
        SourceKind::StepStone,
        &[listing(SourceKind::StepStone, "A", "Acme", "Berlin")],
    )
    .await
    .unwrap();
    let summary = repo.replace_all(SourceKind::StepStone, &[]).await.unwrap();

    assert_eq!(summary.deleted, 1);
    assert!(repo.find_all(SourceKind::StepStone).await.unwrap().is_empty());
}

#[tokio::test]
async fn replace_all_does_not_touch_other_sources() {
    let (db, _container) = setup_test_db().await;
    let repo = db.listing_repo();

    repo.upsert(
        SourceKind::LinkedIn,
        &[listing(SourceKind::LinkedIn, "Engineer", "Acme", "Berlin")],
    )
    .await
    .unwrap();
    repo.replace_all(
        SourceKind::Glassdoor,
        &[listing(SourceKind::Glassdoor, "Engineer", "Acme", "Berlin")],
    )
    .await
    .unwrap();

    assert_eq!(repo.find_all(SourceKind::LinkedIn).await.unwrap().len(), 1);
    assert_eq!(repo.find_all(SourceKind::Glassdoor).await.unwrap().len(), 1);
}

#[tokio::test]
async fn upsert_twice_is_idempotent() {
    let (db, _container) = setup_test_db().await;
    let repo = db.listing_repo();

    let records = vec![
        listing(SourceKind::Indeed, "Engineer", "Acme", "Berlin"),
        listing(SourceKind::Indeed, "Designer", "Acme", "Berlin"),
    ];

    let first = repo.upsert(SourceKind::Indeed, &records).await.unwrap();
    let after_first = repo.find_all(SourceKind::Indeed).await.unwrap();
    let second = repo.upsert(SourceKind::Indeed, &records).await.unwrap();
    let after_second = repo.find_all(SourceKind::Indeed).await.unwrap();

    assert_eq!(first.inserted, 2);
    assert_eq!(second.inserted, 0);
    assert_eq!(second.updated, 0);
    assert_eq!(second.unchanged, 2);
    assert_eq!(after_first, after_second);
}

#[tokio::test]
async fn upsert_updates_on_natural_key_and_inserts_the_rest() {
    let (db, _container) = setup_test_db().await;
    let repo = db.listing_repo();

    repo.upsert(
        SourceKind::Indeed,
        &[listing(SourceKind::Indeed, "Engineer", "Acme", "Berlin")],
    )
    .await
    .unwrap();

    let mut changed = listing(SourceKind::Indeed, "Engineer", "Acme", "Berlin");
    changed.salary = Some("70.000 €".into());
    let summary = repo
        .upsert(
            SourceKind::Indeed,
            &[
                changed,
                listing(SourceKind::Indeed, "Tester", "Initech", "Hamburg"),
            ],
        )
        .await
        .unwrap();

    assert_eq!(summary.inserted, 1);
    assert_eq!(summary.updated, 1);

    let all = repo.find_all(SourceKind::Indeed).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].salary.as_deref(), Some("70.000 €"));
    assert_eq!(all[1].title.as_deref(), Some("Tester"));
}

#[tokio::test]
async fn null_key_parts_still_match_on_upsert() {
    let (db, _container) = setup_test_db().await;
    let repo = db.listing_repo();

    let mut remote = listing(SourceKind::LinkedIn, "Engineer", "Acme", "x");
    remote.location = None;

    repo.upsert(SourceKind::LinkedIn, &[remote.clone()])
        .await
        .unwrap();
    let summary = repo.upsert(SourceKind::LinkedIn, &[remote]).await.unwrap();

    assert_eq!(summary.unchanged, 1);
    assert_eq!(repo.find_all(SourceKind::LinkedIn).await.unwrap().len(), 1);
}

#[tokio::test]
async fn duplicate_keys_in_one_batch_collapse() {
    let (db, _container) = setup_test_db().await;
    let repo = db.listing_repo();

    let mut later = listing(SourceKind::Indeed, "Engineer", "Acme", "Berlin");
    later.posted_ago = Some("today".into());
    let batch = vec![listing(SourceKind::Indeed, "Engineer", "Acme", "Berlin"), later];

    let summary = repo.upsert(SourceKind::Indeed, &batch).await.unwrap();
    assert_eq!(summary.inserted, 1);

    let replaced = repo.replace_all(SourceKind::Indeed, &batch).await.unwrap();
    assert_eq!(replaced.inserted, 1);

    let all = repo.find_all(SourceKind::Indeed).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].posted_ago.as_deref(), Some("today"));
}
