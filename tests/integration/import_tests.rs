//! End-to-end import runs against a mock site

use crate::common::{config_for, html_page, mount_page, mount_xml, urlset};
use std::time::Duration;
use tempfile::TempDir;
use tidemark::crawler::CrawlErrorKind;
use tidemark::{CrawlOutcome, Importer, TidemarkError};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_second_run_skips_unchanged_pages() {
    let server = MockServer::start().await;
    let base = server.uri();
    let state_dir = TempDir::new().unwrap();
    let state_path = state_dir.path().join("crawl_state.json");

    mount_xml(
        &server,
        "/sitemap.xml",
        urlset(&[
            (format!("{}/page1", base), Some("2024-01-15T10:00:00Z")),
            (format!("{}/page2", base), None),
        ]),
    )
    .await;
    mount_page(&server, "/page1", html_page("Page One", "First page")).await;
    mount_page(&server, "/page2", html_page("Page Two", "Second page")).await;

    let extra = format!(
        "[state]\nbackend = \"json\"\npath = \"{}\"\n",
        state_path.display()
    );

    // First run: both pages are new
    let first = Importer::new(config_for(&server, "/sitemap.xml", &extra))
        .unwrap()
        .run()
        .await
        .unwrap();
    assert_eq!(first.stats.new_pages, 2);
    assert_eq!(first.stats.updated_pages, 0);
    assert_eq!(first.stats.skipped_pages, 0);
    assert_eq!(first.stats.failed_pages, 0);
    assert_eq!(first.pages.len(), 2);

    let page1 = first
        .pages
        .iter()
        .find(|p| p.url.ends_with("/page1"))
        .unwrap();
    assert_eq!(page1.title, "Page One");
    assert!(page1.content.contains("# Page One"));
    assert!(page1.content.contains("First page"));
    assert!(!page1.content.contains("Menu"));
    assert!(!page1.content.contains("Copyright"));
    assert!(!page1.content.contains("track()"));
    assert_eq!(page1.id.len(), 16);
    assert!(page1.lastmod.is_some());

    // Second run with a fresh importer reads the persisted state
    let second = Importer::new(config_for(&server, "/sitemap.xml", &extra))
        .unwrap()
        .run()
        .await
        .unwrap();
    assert_eq!(second.stats.new_pages, 0);
    assert_eq!(second.stats.updated_pages, 0);
    assert_eq!(second.stats.skipped_pages, 2);
    assert_eq!(second.stats.failed_pages, 0);
    assert!(second.pages.is_empty());

    // page1 was skipped on lastmod without a request; page2 was fetched twice
    let requests = server.received_requests().await.unwrap();
    let page1_hits = requests.iter().filter(|r| r.url.path() == "/page1").count();
    let page2_hits = requests.iter().filter(|r| r.url.path() == "/page2").count();
    assert_eq!(page1_hits, 1);
    assert_eq!(page2_hits, 2);
}

#[tokio::test]
async fn test_force_refresh_fetches_known_pages() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_xml(
        &server,
        "/sitemap.xml",
        urlset(&[(format!("{}/page1", base), Some("2024-01-15T10:00:00Z"))]),
    )
    .await;
    mount_page(&server, "/page1", html_page("Page One", "Same text")).await;

    let importer = Importer::new(config_for(&server, "/sitemap.xml", "")).unwrap();
    let first = importer.run().await.unwrap();
    assert_eq!(first.stats.new_pages, 1);

    let importer = importer.with_force_refresh(true);
    let second = importer.run().await.unwrap();
    assert_eq!(second.stats.updated_pages, 1);
    assert_eq!(second.stats.skipped_pages, 0);
    assert_eq!(second.pages[0].status, CrawlOutcome::Updated);
}

#[tokio::test]
async fn test_rules_filter_before_fetching() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_xml(
        &server,
        "/sitemap.xml",
        urlset(&[
            (format!("{}/docs/intro", base), None),
            (format!("{}/docs/archive/old", base), None),
            (format!("{}/blog/post", base), None),
        ]),
    )
    .await;
    mount_page(&server, "/docs/intro", html_page("Intro", "Welcome")).await;

    Mock::given(method("GET"))
        .and(path("/docs/archive/old"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/blog/post"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = config_for(
        &server,
        "/sitemap.xml",
        "[rules]\ninclude-patterns = [\"/docs/*\"]\nexclude-patterns = [\"*/archive/*\"]\n",
    );
    let importer = Importer::new(config).unwrap();

    let urls = importer.filtered_urls().await.unwrap();
    assert_eq!(urls, vec![format!("{}/docs/intro", base)]);

    let result = importer.run().await.unwrap();
    assert_eq!(result.total_urls, 3);
    assert_eq!(result.filtered_urls, 1);
    assert_eq!(result.stats.new_pages, 1);
    assert_eq!(result.stats.total_pages(), 1);
}

#[tokio::test]
async fn test_invalid_pattern_fails_before_any_request() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = config_for(
        &server,
        "/sitemap.xml",
        "[rules]\nexclude-patterns = [\"[unclosed\"]\nuse-regex = true\n",
    );

    match Importer::new(config) {
        Err(TidemarkError::Config(e)) => {
            let message = e.to_string();
            assert!(message.contains("[unclosed"));
            assert!(message.contains("regex"));
        }
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("importer built with an invalid pattern"),
    }
}

#[tokio::test]
async fn test_page_failures_do_not_abort_the_run() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_xml(
        &server,
        "/sitemap.xml",
        urlset(&[
            (format!("{}/ok", base), None),
            (format!("{}/broken", base), None),
            (format!("{}/slow", base), None),
            (format!("{}/gone", base), None),
        ]),
    )
    .await;
    mount_page(&server, "/ok", html_page("Fine", "Works")).await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(html_page("Slow", "Too late"))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let config = config_for(
        &server,
        "/sitemap.xml",
        "[crawler]\npage-timeout-secs = 1\n",
    );
    let result = Importer::new(config).unwrap().run().await.unwrap();

    assert_eq!(result.stats.new_pages, 1);
    assert_eq!(result.stats.failed_pages, 3);
    assert_eq!(result.stats.total_pages(), 4);
    assert_eq!(result.errors.len(), 3);

    let slow = result
        .errors
        .iter()
        .find(|e| e.url.ends_with("/slow"))
        .unwrap();
    assert_eq!(slow.kind, CrawlErrorKind::Timeout);

    let broken = result
        .errors
        .iter()
        .find(|e| e.url.ends_with("/broken"))
        .unwrap();
    assert_eq!(broken.kind, CrawlErrorKind::Fetch);
    assert!(broken.message.contains("500"));
    assert!((result.success_rate() - 25.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_failed_page_is_retried_next_run() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_xml(
        &server,
        "/sitemap.xml",
        urlset(&[(format!("{}/flaky", base), Some("2024-01-15T10:00:00Z"))]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_page(&server, "/flaky", html_page("Flaky", "Back again")).await;

    let importer = Importer::new(config_for(&server, "/sitemap.xml", "")).unwrap();

    let first = importer.run().await.unwrap();
    assert_eq!(first.stats.failed_pages, 1);

    let second = importer.run().await.unwrap();
    assert_eq!(second.stats.new_pages, 1);
}

#[tokio::test]
async fn test_robots_disallowed_page_fails() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_xml(
        &server,
        "/sitemap.xml",
        urlset(&[
            (format!("{}/public", base), None),
            (format!("{}/private/report", base), None),
        ]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private/\n"),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "/public", html_page("Public", "Open")).await;
    Mock::given(method("GET"))
        .and(path("/private/report"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = config_for(
        &server,
        "/sitemap.xml",
        "[crawler]\nrespect-robots = true\n",
    );
    let result = Importer::new(config).unwrap().run().await.unwrap();

    assert_eq!(result.stats.new_pages, 1);
    assert_eq!(result.stats.failed_pages, 1);
    assert!(result.errors[0].message.contains("robots.txt"));
}

#[tokio::test]
async fn test_run_budget_returns_partial_result() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_xml(
        &server,
        "/sitemap.xml",
        urlset(&[
            (format!("{}/a", base), None),
            (format!("{}/b", base), None),
            (format!("{}/c", base), None),
        ]),
    )
    .await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(html_page("Slow", "Takes a while"))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let config = config_for(
        &server,
        "/sitemap.xml",
        "[crawler]\nmax-concurrent-pages = 1\npage-timeout-secs = 10\nrun-budget-secs = 1\n",
    );
    let result = Importer::new(config).unwrap().run().await.unwrap();

    assert!(result.budget_exhausted);
    assert_eq!(result.stats.new_pages, 1);
    assert_eq!(result.unscheduled, 2);
    assert_eq!(result.pages.len(), 1);
}
