//! Shared fixtures for the integration tests

use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::Write;
use tidemark::config::{parse_config, Config};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Builds a configuration pointing at `sitemap_path` on the mock server
///
/// `extra` is appended verbatim and may add any further sections.
pub fn config_for(server: &MockServer, sitemap_path: &str, extra: &str) -> Config {
    parse_config(&format!(
        "[source]\nsitemap-url = \"{}{}\"\ntimeout-secs = 5\n\n[user-agent]\nname = \"TestBot\"\n\n{}",
        server.uri(),
        sitemap_path,
        extra
    ))
    .expect("test configuration should be valid")
}

/// Renders a namespaced `<urlset>`; each entry is `(loc, lastmod)`
pub fn urlset(entries: &[(String, Option<&str>)]) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );
    for (loc, lastmod) in entries {
        xml.push_str("  <url>\n");
        xml.push_str(&format!("    <loc>{}</loc>\n", loc));
        if let Some(lastmod) = lastmod {
            xml.push_str(&format!("    <lastmod>{}</lastmod>\n", lastmod));
        }
        xml.push_str("  </url>\n");
    }
    xml.push_str("</urlset>\n");
    xml
}

/// Renders a namespaced `<sitemapindex>`
pub fn sitemap_index(children: &[String]) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<sitemapindex xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );
    for child in children {
        xml.push_str(&format!("  <sitemap><loc>{}</loc></sitemap>\n", child));
    }
    xml.push_str("</sitemapindex>\n");
    xml
}

/// A small HTML page with chrome that must not reach the converted text
pub fn html_page(title: &str, body: &str) -> String {
    format!(
        "<html><head><title>{}</title><script>track()</script></head>\
         <body><nav>Menu</nav><h1>{}</h1><p>{}</p><footer>Copyright</footer></body></html>",
        title, title, body
    )
}

pub fn gzip(content: &str) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(content.as_bytes())
        .expect("gzip write should succeed");
    encoder.finish().expect("gzip finish should succeed")
}

/// Serves `body` as HTML at `route`
pub async fn mount_page(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

/// Serves `body` as XML at `route`
pub async fn mount_xml(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "application/xml"),
        )
        .mount(server)
        .await;
}
