//! Sitemap resolution over HTTP

use crate::common::{config_for, gzip, html_page, mount_page, mount_xml, sitemap_index, urlset};
use tidemark::crawler::CrawlErrorKind;
use tidemark::sitemap::SitemapParser;
use tidemark::{Importer, ParseCause};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn parser() -> SitemapParser {
    SitemapParser::new("TestBot/1.0", Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_index_is_flattened_and_deduplicated() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_xml(
        &server,
        "/sitemap_index.xml",
        sitemap_index(&[
            format!("{}/sitemap-docs.xml", base),
            format!("{}/sitemap-blog.xml.gz", base),
            format!("{}/sitemap-missing.xml", base),
        ]),
    )
    .await;
    mount_xml(
        &server,
        "/sitemap-docs.xml",
        urlset(&[
            (format!("{}/docs/a", base), Some("2024-02-01")),
            (format!("{}/shared", base), None),
        ]),
    )
    .await;

    // Served as a gzip file without Content-Encoding
    Mock::given(method("GET"))
        .and(path("/sitemap-blog.xml.gz"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(gzip(&urlset(&[
                    (format!("{}/blog/b", base), None),
                    (format!("{}/shared", base), None),
                ])))
                .insert_header("content-type", "application/x-gzip"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sitemap-missing.xml"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    for route in ["/docs/a", "/shared", "/blog/b"] {
        mount_page(&server, route, html_page("Page", route)).await;
    }

    let resolved = parser()
        .resolve(&format!("{}/sitemap_index.xml", base))
        .await
        .unwrap();
    assert_eq!(resolved.documents, 3);
    assert_eq!(resolved.descriptors.len(), 4);
    assert_eq!(resolved.failures.len(), 1);
    assert_eq!(resolved.failures[0].cause, ParseCause::Http(404));

    let config = config_for(&server, "/sitemap_index.xml", "");
    let result = Importer::new(config).unwrap().run().await.unwrap();

    assert_eq!(result.total_urls, 3);
    assert_eq!(result.stats.new_pages, 3);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].kind, CrawlErrorKind::Sitemap);
    assert!(result.errors[0].url.ends_with("/sitemap-missing.xml"));
}

#[tokio::test]
async fn test_gzip_content_encoding() {
    let server = MockServer::start().await;
    let base = server.uri();
    let xml = urlset(&[(format!("{}/page", base), Some("2024-01-15T10:00:00+02:00"))]);

    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(gzip(&xml))
                .insert_header("content-type", "application/xml")
                .insert_header("content-encoding", "gzip"),
        )
        .mount(&server)
        .await;

    let descriptors = parser()
        .parse(&format!("{}/sitemap.xml", base))
        .await
        .unwrap();
    assert_eq!(descriptors.len(), 1);
    assert_eq!(descriptors[0].loc, format!("{}/page", base));
    assert!(descriptors[0].lastmod.is_some());
}

#[tokio::test]
async fn test_parse_rejects_index() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_xml(
        &server,
        "/sitemap_index.xml",
        sitemap_index(&[format!("{}/sitemap-1.xml", base)]),
    )
    .await;

    let err = parser()
        .parse(&format!("{}/sitemap_index.xml", base))
        .await
        .unwrap_err();
    assert!(err.is_sitemap_index());

    let children = parser()
        .parse_index(&format!("{}/sitemap_index.xml", base))
        .await
        .unwrap();
    assert_eq!(children, vec![format!("{}/sitemap-1.xml", base)]);
}

#[tokio::test]
async fn test_root_sitemap_errors_are_fatal() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<urlset><url><loc>x</loc>"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/down.xml"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let malformed = Importer::new(config_for(&server, "/sitemap.xml", ""))
        .unwrap()
        .run()
        .await;
    assert!(malformed.is_err());

    let err = parser()
        .parse(&format!("{}/down.xml", server.uri()))
        .await
        .unwrap_err();
    assert_eq!(err.cause, ParseCause::Http(503));
    assert!(err.to_string().contains("/down.xml"));
}
