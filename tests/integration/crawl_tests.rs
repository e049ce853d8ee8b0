//! Integration tests for the crawler
//!
//! These tests use wiremock to serve a small catalog and drive the full
//! crawl cycle end-to-end through the real HTTP fetcher.

use catalog_weaver::config::{
    CatalogConfig, ChannelConfig, Config, CrawlerConfig, OutputConfig, UserAgentConfig,
};
use catalog_weaver::crawler::{Coordinator, RunStatus};
use catalog_weaver::output::write_outputs;
use catalog_weaver::{canonical_key, DocumentState, NodeRef};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration rooted at the mock server
fn create_test_config(base_url: &str, output_dir: &std::path::Path) -> Config {
    let out = |name: &str| output_dir.join(name).to_string_lossy().into_owned();

    Config {
        channel: ChannelConfig {
            title: "Mock Library".to_string(),
            source_id: "mock-library".to_string(),
            domain: "127.0.0.1".to_string(),
            language: "es".to_string(),
            description: "Libros de prueba".to_string(),
            thumbnail: None,
            license: "public-domain".to_string(),
            provider: None,
        },
        catalog: CatalogConfig {
            category_root: Some(format!("{}/categorias", base_url)),
            collections_root: Some(format!("{}/colecciones", base_url)),
            category_branch_levels: 0,
            categories_title: "Categorías".to_string(),
            collections_title: "Colecciones".to_string(),
        },
        crawler: CrawlerConfig {
            max_concurrent_requests: 4,
            occurrence_warning: 2,
            occurrence_ceiling: 16,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        output: OutputConfig {
            tree_path: out("tree.json"),
            downloads_path: out("downloads.json"),
            summary_path: out("summary.md"),
        },
    }
}

async fn mount_page(server: &MockServer, page: &str, html: String) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(html)
                .insert_header("content-type", "text/html; charset=utf-8"),
        )
        .mount(server)
        .await;
}

fn category_index(categories: &[(&str, &str)]) -> String {
    let items: String = categories
        .iter()
        .map(|(href, title)| {
            format!(
                r#"<div class="category">
                    <h2><a href="{href}">{title}</a></h2>
                    <a class="btn btn-primary" href="{href}">Ver más</a>
                </div>"#
            )
        })
        .collect();
    format!("<html><body>{}</body></html>", items)
}

fn collection_index(collections: &[(&str, &str)]) -> String {
    let items: String = collections
        .iter()
        .map(|(href, title)| {
            format!(r#"<div class="book-description"><h2><a href="{href}">{title}</a></h2></div>"#)
        })
        .collect();
    format!("<html><body>{}</body></html>", items)
}

fn listing(books: &[&str]) -> String {
    let items: String = books
        .iter()
        .map(|href| {
            format!(
                r#"<div class="book"><div><p><a class="primary-text-color" href="{href}">Libro</a></p></div></div>"#
            )
        })
        .collect();
    format!("<html><body>{}</body></html>", items)
}

fn book(title: &str, offers: &[(&str, &str)]) -> String {
    let buttons: String = offers
        .iter()
        .map(|(label, href)| format!(r#"<a class="download-link" href="{href}">{label}</a>"#))
        .collect();
    format!(
        r#"<html><body>
            <h1 class="bordered-heading">{title}</h1>
            <h2><a class="secondary-text-color" href="/autor/x">Autora X</a></h2>
            <img class="img-book-cover" src="/covers/x.jpg">
            <div class="col-lg-8"><div class="row"><div class="offset-top"><div class="text-justify">
                <p>Primer párrafo.</p>
                <p>Segundo párrafo.</p>
            </div></div></div></div>
            {buttons}
        </body></html>"#
    )
}

fn confirmation(file: &str) -> String {
    format!(
        r#"<html><body><div class="book-description"><a class="download-link" href="{file}">Descargar</a></div></body></html>"#
    )
}

/// Mounts a catalog where book B is listed by two categories and a collection
async fn mount_catalog(server: &MockServer) {
    mount_page(
        server,
        "/categorias",
        category_index(&[("/categoria/novela", "Novela"), ("/categoria/poesia", "Poesía")]),
    )
    .await;
    mount_page(server, "/categoria/novela", listing(&["/libro/b", "/libro/d"])).await;
    mount_page(server, "/categoria/poesia", listing(&["/libro/b", "/libro/e"])).await;
    mount_page(
        server,
        "/colecciones",
        collection_index(&[("/coleccion/clasicos", "Clásicos")]),
    )
    .await;
    mount_page(
        server,
        "/coleccion/clasicos",
        listing(&["/libro/b", "/libro/f", "/libro/perdido"]),
    )
    .await;

    mount_page(
        server,
        "/libro/b",
        book("B", &[("Descargar ePub", "/descargar/b/epub"), ("Descargar PDF", "/descargar/b/pdf")]),
    )
    .await;
    mount_page(server, "/descargar/b/epub", confirmation("/files/b.epub")).await;

    mount_page(server, "/libro/d", book("D", &[("Descargar PDF", "/descargar/d/pdf")])).await;
    mount_page(server, "/descargar/d/pdf", confirmation("/files/d.pdf")).await;

    mount_page(
        server,
        "/libro/e",
        book("E", &[("Descargar PDF", "/descargar/e/pdf"), ("Descargar ePub", "/descargar/e/epub")]),
    )
    .await;
    // The ePub confirmation page exists but carries no download link
    mount_page(
        server,
        "/descargar/e/epub",
        "<html><body><div class=\"book-description\"></div></body></html>".to_string(),
    )
    .await;

    mount_page(server, "/libro/f", book("F", &[("Leer online", "/leer/f")])).await;

    Mock::given(method("GET"))
        .and(path("/libro/perdido"))
        .respond_with(ResponseTemplate::new(404))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_crawl_assembles_shared_document() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    mount_catalog(&mock_server).await;

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = create_test_config(&base_url, temp_dir.path());

    let coordinator = Coordinator::with_http(config).expect("Failed to create coordinator");
    let outcome = coordinator.run().await.expect("Crawl failed");

    assert_eq!(outcome.status, RunStatus::Completed);

    let ctx = &outcome.context;
    let key = canonical_key(&format!("{}/libro/b", base_url)).unwrap();
    let b = ctx.registry().lookup(&key).expect("Book B was not registered");
    let node = ctx.document(b).unwrap();

    assert_eq!(node.state(), DocumentState::Confirmed);
    assert_eq!(node.occurrence_count(), 3);
    assert_eq!(ctx.holders_of(b), 3);
    assert_eq!(node.metadata.title, "B");
    assert_eq!(node.metadata.author.as_deref(), Some("Autora X"));
    assert_eq!(node.metadata.description, "Primer párrafo.\n\nSegundo párrafo.");
    assert_eq!(
        node.artifact().unwrap().locator,
        format!("{}/files/b.epub", base_url)
    );

    // B, D confirmed; E (no link), F (no format), perdido (404) discarded
    assert_eq!(ctx.downloads().len(), 2);
    assert_eq!(outcome.counters.documents_confirmed, 2);
    assert_eq!(outcome.counters.documents_discarded, 3);
    assert_eq!(outcome.counters.fetch_failures, 1);

    for (_, topic) in ctx.topics() {
        for child in topic.children() {
            if let NodeRef::Document(id) = child {
                assert_eq!(ctx.document(*id).unwrap().state(), DocumentState::Confirmed);
            }
        }
    }
}

#[tokio::test]
async fn test_outputs_are_written() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    mount_catalog(&mock_server).await;

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = create_test_config(&base_url, temp_dir.path());

    let outcome = Coordinator::with_http(config.clone())
        .expect("Failed to create coordinator")
        .run()
        .await
        .expect("Crawl failed");

    let summary = write_outputs(&outcome, &config, "test-hash").expect("Failed to write outputs");
    assert_eq!(summary.warnings.len(), 1);

    let tree: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(temp_dir.path().join("tree.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(tree["status"], "completed");
    assert_eq!(tree["channel"]["title"], "Mock Library");
    assert_eq!(tree["roots"][0]["title"], "Categorías");
    assert_eq!(tree["roots"][1]["title"], "Colecciones");

    let shared = &tree["roots"][1]["children"][0]["children"][0];
    assert_eq!(shared["kind"], "document");
    assert_eq!(shared["license"], "public-domain");
    assert_eq!(shared["provider"], "Mock Library");

    let downloads: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(temp_dir.path().join("downloads.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(downloads.as_array().unwrap().len(), 2);

    let markdown = std::fs::read_to_string(temp_dir.path().join("summary.md")).unwrap();
    assert!(markdown.contains("# Mock Library Crawl Summary"));
    assert!(markdown.contains("test-hash"));
}

#[tokio::test]
async fn test_failed_root_drops_only_its_branch() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/categorias"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;
    mount_page(
        &mock_server,
        "/colecciones",
        collection_index(&[("/coleccion/clasicos", "Clásicos")]),
    )
    .await;
    mount_page(&mock_server, "/coleccion/clasicos", listing(&["/libro/d"])).await;
    mount_page(&mock_server, "/libro/d", book("D", &[("PDF", "/descargar/d/pdf")])).await;
    mount_page(&mock_server, "/descargar/d/pdf", confirmation("/files/d.pdf")).await;

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = create_test_config(&base_url, temp_dir.path());

    let outcome = Coordinator::with_http(config)
        .expect("Failed to create coordinator")
        .run()
        .await
        .expect("Crawl failed");

    assert_eq!(outcome.status, RunStatus::Completed);
    assert_eq!(outcome.counters.fetch_failures, 1);

    let ctx = &outcome.context;
    let categories = ctx.topic(ctx.roots()[0]).unwrap();
    assert!(categories.children().is_empty());
    assert_eq!(ctx.downloads().len(), 1);
}

#[tokio::test]
async fn test_repeated_crawls_are_identical() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    mount_catalog(&mock_server).await;

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = create_test_config(&base_url, temp_dir.path());

    let first = Coordinator::with_http(config.clone())
        .unwrap()
        .run()
        .await
        .unwrap();
    let second = Coordinator::with_http(config).unwrap().run().await.unwrap();

    assert_eq!(first.status, second.status);
    assert_eq!(first.context.fingerprint(), second.context.fingerprint());
}

#[tokio::test]
async fn test_user_agent_header_is_sent() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/colecciones"))
        .and(wiremock::matchers::header(
            "user-agent",
            "TestBot/1.0.0 (+https://example.com/contact; test@example.com)",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_string(collection_index(&[])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mut config = create_test_config(&base_url, temp_dir.path());
    config.catalog.category_root = None;

    let outcome = Coordinator::with_http(config).unwrap().run().await.unwrap();
    assert_eq!(outcome.status, RunStatus::Completed);
    assert_eq!(outcome.counters.pages_fetched, 1);
}
