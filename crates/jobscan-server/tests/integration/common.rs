use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response};
use http_body_util::BodyExt;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use testcontainers::core::{ContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage, ImageExt};
use tower::ServiceExt;
use wiremock::matchers::{method, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use jobscan_client::{ProxyConfig, ProxyFetcher, SelectorExtractor};
use jobscan_core::HarvestConfig;
use jobscan_db::Database;
use jobscan_server::routes;
use jobscan_server::state::AppState;

pub const TEST_ADMIN_TOKEN: &str = "test-admin-token";
pub const TEST_PROXY_KEY: &str = "test-proxy-key";

pub struct TestApp {
    pub router: Router,
    /// Stands in for the scraping proxy. Unmatched pages answer 500.
    pub proxy: MockServer,
    _container: ContainerAsync<GenericImage>,
}

impl TestApp {
    /// Send a request through a clone of the router and decode the JSON body.
    pub async fn send(&self, request: Request<Body>) -> (axum::http::StatusCode, serde_json::Value) {
        let response: Response<Body> = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    /// Serve `html` when the proxy is asked for `target_url`.
    pub async fn serve_page(&self, target_url: &str, html: String) {
        Mock::given(method("GET"))
            .and(query_param("api_key", TEST_PROXY_KEY))
            .and(query_param("url", target_url))
            .respond_with(ResponseTemplate::new(200).set_body_string(html))
            .with_priority(1)
            .mount(&self.proxy)
            .await;
    }
}

/// Spin up PostgreSQL and a mock proxy; return the app with harvest triggers open.
pub async fn setup_test_app() -> TestApp {
    setup(None).await
}

/// Same as [`setup_test_app`] but harvest triggers require [`TEST_ADMIN_TOKEN`].
pub async fn setup_test_app_with_auth() -> TestApp {
    setup(Some(TEST_ADMIN_TOKEN.to_string())).await
}

async fn setup(admin_token: Option<String>) -> TestApp {
    let container = GenericImage::new("postgres", "16")
        .with_exposed_port(ContainerPort::Tcp(5432))
        .with_wait_for(WaitFor::message_on_stderr(
            "database system is ready to accept connections",
        ))
        .with_env_var("POSTGRES_PASSWORD", "postgres")
        .with_env_var("POSTGRES_DB", "jobscan_test")
        .start()
        .await
        .expect("Failed to start PostgreSQL container");

    let host = container.get_host().await.expect("Failed to get host");
    let port = container
        .get_host_port_ipv4(5432)
        .await
        .expect("Failed to get port");

    let url = format!("postgresql://postgres:postgres@{host}:{port}/jobscan_test");
    let db = Database::from_pool(retry_connect(&url).await);
    db.migrate().await.expect("Failed to run migrations");

    let proxy = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .with_priority(10)
        .mount(&proxy)
        .await;

    let fetcher = ProxyFetcher::new(
        &ProxyConfig::new(TEST_PROXY_KEY).with_endpoint(format!("{}/", proxy.uri())),
    )
    .expect("Failed to build fetcher");
    let extractor = SelectorExtractor::new().expect("Failed to compile selectors");

    let state = Arc::new(AppState::new(
        db,
        fetcher,
        extractor,
        HarvestConfig::default(),
        admin_token,
    ));

    TestApp {
        router: routes::router(state),
        proxy,
        _container: container,
    }
}

async fn retry_connect(url: &str) -> PgPool {
    for _ in 0..30 {
        if let Ok(pool) = PgPoolOptions::new().max_connections(5).connect(url).await {
            return pool;
        }
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    }
    panic!("Failed to connect to test database");
}

/// A Glassdoor result page with one aligned card per title.
pub fn glassdoor_page(titles: &[&str]) -> String {
    let cards: String = titles
        .iter()
        .map(|title| {
            format!(
                r#"<li data-test="jobListing">
                     <span class="EmployerProfile_compactEmployerName__9MGcV">Acme</span>
                     <a class="JobCard_jobTitle__GLyJ1" href="/job-listing/{title}.htm">{title}</a>
                     <div class="JobCard_location__Ds1fM">Berlin</div>
                     <div class="JobCard_listingAge__jJsuc">2T</div>
                   </li>"#
            )
        })
        .collect();
    format!("<html><body><ul>{cards}</ul></body></html>")
}

pub fn glassdoor_url(title: &str, location: &str, page: u32) -> String {
    format!(
        "https://www.glassdoor.de/Job/jobs.htm?sc.keyword={title}&locKeyword={location}&p={page}"
    )
}
