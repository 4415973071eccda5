//! Integration tests for the importer
//!
//! These tests use wiremock to serve sitemaps and pages and run the full
//! import pipeline end-to-end.

mod common;
mod import_tests;
mod sitemap_tests;
