use axum::body::Body;
use axum::http::{Request, StatusCode};

use crate::integration::common::{
    TEST_ADMIN_TOKEN, glassdoor_page, glassdoor_url, setup_test_app, setup_test_app_with_auth,
};

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn health_returns_200() {
    let app = setup_test_app().await;

    let (status, json) = app.send(get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["database"], "ok");
}

#[tokio::test]
async fn glassdoor_harvest_persists_two_pages_of_cards() {
    let app = setup_test_app().await;
    app.serve_page(
        &glassdoor_url("developer", "germany", 1),
        glassdoor_page(&["Rust Developer", "Go Developer", "Java Developer"]),
    )
    .await;
    app.serve_page(
        &glassdoor_url("developer", "germany", 2),
        glassdoor_page(&["Data Engineer", "SRE", "QA Engineer"]),
    )
    .await;

    let (status, json) = app
        .send(post_json(
            "/api/glassdoor/fetch-jobs",
            serde_json::json!({"job_title": "developer", "location": "germany"}),
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Job fetching completed");
    assert_eq!(json["jobCount"], 6);
    assert_eq!(json["inserted"], 6);
    assert_eq!(json["pagesFailed"], 1);

    let (status, json) = app.send(get("/api/glassdoor/glassdoor-jobs")).await;

    assert_eq!(status, StatusCode::OK);
    let jobs = json.as_array().unwrap();
    assert_eq!(jobs.len(), 6);
    for job in jobs {
        assert!(job.get("id").is_none());
        assert_eq!(job["source"], "Glassdoor");
        assert_eq!(job["company"], "Acme");
        assert_eq!(job["postedAgo"], "2 days");
        assert_eq!(job["queryTitle"], "developer");
        assert_eq!(job["queryLocation"], "germany");
    }
    assert_eq!(jobs[0]["title"], "Rust Developer");
    assert_eq!(
        jobs[0]["link"],
        "https://www.glassdoor.de/job-listing/Rust%20Developer.htm"
    );

    let (status, json) = app.send(get("/api/glassdoor/harvests")).await;
    assert_eq!(status, StatusCode::OK);
    let runs = json.as_array().unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0]["recordCount"], 6);
    assert_eq!(runs[0]["pagesPlanned"], 3);
    assert_eq!(runs[0]["persistenceMode"], "replace");
}

#[tokio::test]
async fn empty_body_on_glassdoor_is_rejected_without_side_effects() {
    let app = setup_test_app().await;

    let (status, json) = app
        .send(
            Request::post("/api/glassdoor/fetch-jobs")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "validation_error");
    assert!(json["message"].as_str().unwrap().contains("job_title"));

    let (status, json) = app.send(get("/api/glassdoor/glassdoor-jobs")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, serde_json::json!([]));

    assert!(app.proxy.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn malformed_body_returns_400() {
    let app = setup_test_app().await;

    let (status, json) = app
        .send(
            Request::post("/api/indeed/fetch-jobs")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "invalid_body");
}

#[tokio::test]
async fn defaulted_source_completes_even_when_every_page_fails() {
    let app = setup_test_app().await;

    let (status, json) = app
        .send(
            Request::post("/api/indeed/fetch-jobs")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["jobCount"], 0);
    assert_eq!(json["pagesFailed"], 10);

    let requests = app.proxy.received_requests().await.unwrap();
    assert_eq!(requests.len(), 10);
    let first = requests[0].url.query_pairs().find(|(k, _)| k == "url");
    let target = first.map(|(_, v)| v.into_owned()).unwrap();
    assert!(target.contains("q=developer&l=germany"));
}

#[tokio::test]
async fn unknown_source_returns_404() {
    let app = setup_test_app().await;

    let (status, json) = app.send(get("/api/monster/monster-jobs")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "not_found");

    let (status, json) = app
        .send(post_json("/api/monster/fetch-jobs", serde_json::json!({})))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "not_found");
}

#[tokio::test]
async fn listing_path_must_match_source() {
    let app = setup_test_app().await;

    let (status, json) = app.send(get("/api/glassdoor/indeed-jobs")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "not_found");
}

#[tokio::test]
async fn harvest_trigger_requires_token_when_configured() {
    let app = setup_test_app_with_auth().await;

    let (status, json) = app
        .send(post_json(
            "/api/stepstone/fetch-jobs",
            serde_json::json!({}),
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"], "unauthorized");

    let (status, _) = app
        .send(
            Request::post("/api/stepstone/fetch-jobs")
                .header("authorization", "Bearer wrong-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, json) = app
        .send(
            Request::post("/api/stepstone/fetch-jobs")
                .header("authorization", format!("Bearer {TEST_ADMIN_TOKEN}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["jobCount"], 0);

    // Reads stay public.
    let (status, _) = app.send(get("/api/stepstone/stepstone-jobs")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = setup_test_app().await;

    let (status, json) = app.send(get("/api-docs/openapi.json")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(json["paths"]["/api/{source}/fetch-jobs"].is_object());
}
