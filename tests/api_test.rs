//! End-to-end HTTP tests for the PDF processing API
//!
//! Runs the real router against a temp scratch directory with the lossless
//! backend selected, so the tests have no dependency on a Ghostscript
//! install.

use std::sync::Arc;

use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream};
use tempfile::TempDir;

use pdf_utilities_backend::api;
use pdf_utilities_backend::compressor::{GhostscriptCompressor, LosslessCompressor};
use pdf_utilities_backend::config::Config;
use pdf_utilities_backend::scratch::ScratchStore;
use pdf_utilities_backend::state::AppState;

/// Test server plus the scratch directory handle, kept alive for the test.
struct TestApp {
    server: TestServer,
    scratch_dir: TempDir,
}

async fn spawn_app() -> TestApp {
    let scratch_dir = TempDir::new().expect("Failed to create temp dir");
    let mut config = Config::from_env();
    config.scratch.dir = scratch_dir.path().to_path_buf();

    let scratch = ScratchStore::new(config.scratch.dir.clone())
        .await
        .expect("Failed to open scratch store");
    let fallback = Arc::new(LosslessCompressor::new());
    let state = Arc::new(AppState {
        scratch,
        compressor: fallback.clone(),
        fallback,
        default_quality: config.compression.default_quality,
    });

    let server = TestServer::new(api::router(state, &config)).expect("Failed to start test server");
    TestApp {
        server,
        scratch_dir,
    }
}

/// App whose selected backend is an external tool that cannot run, so every
/// compress request has to go through the mid-request lossless retry.
async fn spawn_app_with_broken_external_backend() -> TestApp {
    let scratch_dir = TempDir::new().expect("Failed to create temp dir");
    let mut config = Config::from_env();
    config.scratch.dir = scratch_dir.path().to_path_buf();

    let scratch = ScratchStore::new(config.scratch.dir.clone())
        .await
        .expect("Failed to open scratch store");
    let broken = GhostscriptCompressor::new(
        "nonexistent-gs-binary-12345",
        std::time::Duration::from_secs(5),
    );
    let state = Arc::new(AppState {
        scratch,
        compressor: Arc::new(broken),
        fallback: Arc::new(LosslessCompressor::new()),
        default_quality: config.compression.default_quality,
    });

    let server = TestServer::new(api::router(state, &config)).expect("Failed to start test server");
    TestApp {
        server,
        scratch_dir,
    }
}

/// Build a valid PDF with the requested number of pages.
fn sample_pdf(page_count: usize, marker: &str) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(b"Helvetica".to_vec())),
    ]));
    let resources_id = doc.add_object(Dictionary::from_iter([(
        "Font",
        Object::Dictionary(Dictionary::from_iter([(
            "F1",
            Object::Reference(font_id),
        )])),
    )]));

    let mut kids = Vec::with_capacity(page_count);
    for page_number in 1..=page_count {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![100.into(), 700.into()]),
                Operation::new(
                    "Tj",
                    vec![Object::string_literal(format!(
                        "{} page {}",
                        marker, page_number
                    ))],
                ),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            Dictionary::new(),
            content.encode().expect("Failed to encode content"),
        ));
        let page_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            ("Contents", Object::Reference(content_id)),
            ("Resources", Object::Reference(resources_id)),
            (
                "MediaBox",
                Object::Array(vec![0.into(), 0.into(), 612.into(), 792.into()]),
            ),
        ]));
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(Dictionary::from_iter([
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(kids)),
            ("Count", Object::Integer(page_count as i64)),
        ])),
    );
    let catalog_id = doc.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut output = Vec::new();
    doc.save_to(&mut output).expect("Failed to save sample PDF");
    output
}

fn pdf_part(bytes: Vec<u8>, filename: &str) -> Part {
    Part::bytes(bytes)
        .file_name(filename)
        .mime_type("application/pdf")
}

fn scratch_file_count(app: &TestApp) -> usize {
    std::fs::read_dir(app.scratch_dir.path())
        .expect("Failed to read scratch dir")
        .count()
}

#[tokio::test]
async fn test_health_reports_healthy() {
    let app = spawn_app().await;

    let response = app.server.get("/api/health").await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "healthy");
    let timestamp = body["timestamp"].as_str().expect("timestamp missing");
    assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());
}

#[tokio::test]
async fn test_merge_concatenates_pages_in_order() {
    let app = spawn_app().await;

    let form = MultipartForm::new()
        .add_part("files", pdf_part(sample_pdf(3, "a"), "a.pdf"))
        .add_part("files", pdf_part(sample_pdf(2, "b"), "b.pdf"));

    let response = app.server.post("/api/pdf/merge").multipart(form).await;
    response.assert_status_ok();
    assert_eq!(response.header("content-type"), "application/pdf");

    let disposition = response.header("content-disposition");
    let disposition = disposition.to_str().expect("non-ascii disposition");
    assert!(
        disposition.starts_with("attachment; filename=merged_"),
        "Unexpected disposition: {}",
        disposition
    );

    let body = response.as_bytes().to_vec();
    let merged = Document::load_mem(&body).expect("Body should be a valid PDF");
    assert_eq!(merged.get_pages().len(), 5);

    let first_page = merged.extract_text(&[1]).unwrap_or_default();
    let last_page = merged.extract_text(&[5]).unwrap_or_default();
    assert!(first_page.contains('a'), "Page 1 was: {}", first_page);
    assert!(last_page.contains('b'), "Page 5 was: {}", last_page);
}

#[tokio::test]
async fn test_merge_with_one_file_is_rejected() {
    let app = spawn_app().await;

    let form = MultipartForm::new().add_part("files", pdf_part(sample_pdf(1, "solo"), "solo.pdf"));

    let response = app.server.post("/api/pdf/merge").multipart(form).await;
    response.assert_status_bad_request();

    let body: serde_json::Value = response.json();
    let detail = body["detail"].as_str().expect("detail missing");
    assert!(
        detail.contains("At least 2"),
        "Unexpected detail: {}",
        detail
    );
}

#[tokio::test]
async fn test_merge_rejects_non_pdf_filename() {
    let app = spawn_app().await;

    let form = MultipartForm::new()
        .add_part("files", pdf_part(sample_pdf(1, "a"), "a.pdf"))
        .add_part("files", pdf_part(sample_pdf(1, "b"), "b.png"));

    let response = app.server.post("/api/pdf/merge").multipart(form).await;
    response.assert_status_bad_request();

    let body: serde_json::Value = response.json();
    assert!(body["detail"]
        .as_str()
        .unwrap_or_default()
        .contains("is not a PDF"));
}

#[tokio::test]
async fn test_merge_rejects_malformed_pdf_content() {
    let app = spawn_app().await;

    let form = MultipartForm::new()
        .add_part("files", pdf_part(sample_pdf(1, "good"), "good.pdf"))
        .add_part(
            "files",
            pdf_part(b"not really a pdf".to_vec(), "fake.pdf"),
        );

    let response = app.server.post("/api/pdf/merge").multipart(form).await;
    response.assert_status_bad_request();

    let body: serde_json::Value = response.json();
    assert!(body["detail"]
        .as_str()
        .unwrap_or_default()
        .contains("fake.pdf"));
}

#[tokio::test]
async fn test_compress_returns_metadata_headers() {
    let app = spawn_app().await;
    let input = sample_pdf(2, "compress-me");
    let input_len = input.len();

    let form = MultipartForm::new().add_part("file", pdf_part(input, "doc.pdf"));

    let response = app.server.post("/api/pdf/compress").multipart(form).await;
    response.assert_status_ok();
    assert_eq!(response.header("content-type"), "application/pdf");

    let original: usize = response
        .header("x-original-size")
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert_eq!(original, input_len);

    let body = response.as_bytes().to_vec();
    let compressed: usize = response
        .header("x-compressed-size")
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert_eq!(compressed, body.len());

    let reduction: f64 = response
        .header("x-reduction-percentage")
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(reduction >= 0.0, "Reduction must never be negative");

    // Default quality applies when the query parameter is omitted.
    assert_eq!(response.header("x-quality-setting"), "85");

    let doc = Document::load_mem(&body).expect("Body should be a valid PDF");
    assert_eq!(doc.get_pages().len(), 2);
}

#[tokio::test]
async fn test_compress_honors_quality_parameter() {
    let app = spawn_app().await;

    let form = MultipartForm::new().add_part("file", pdf_part(sample_pdf(1, "q"), "q.pdf"));
    let response = app
        .server
        .post("/api/pdf/compress")
        .add_query_param("quality", 10)
        .multipart(form)
        .await;

    response.assert_status_ok();
    assert_eq!(response.header("x-quality-setting"), "10");
}

#[tokio::test]
async fn test_compress_falls_back_when_external_backend_fails() {
    let app = spawn_app_with_broken_external_backend().await;
    let input = sample_pdf(2, "fallback");

    let form = MultipartForm::new().add_part("file", pdf_part(input, "doc.pdf"));
    let response = app.server.post("/api/pdf/compress").multipart(form).await;

    response.assert_status_ok();
    assert_eq!(response.header("content-type"), "application/pdf");

    let body = response.as_bytes().to_vec();
    let doc = Document::load_mem(&body).expect("Fallback output should be a valid PDF");
    assert_eq!(doc.get_pages().len(), 2);

    let reduction: f64 = response
        .header("x-reduction-percentage")
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(reduction >= 0.0);

    assert_eq!(
        scratch_file_count(&app),
        0,
        "Scratch files must be released after the retry"
    );
}

#[tokio::test]
async fn test_compress_rejects_non_numeric_quality() {
    let app = spawn_app().await;

    let form = MultipartForm::new().add_part("file", pdf_part(sample_pdf(1, "q"), "q.pdf"));
    let response = app
        .server
        .post("/api/pdf/compress")
        .add_query_param("quality", "abc")
        .multipart(form)
        .await;

    response.assert_status_bad_request();
    let body: serde_json::Value = response.json();
    let detail = body["detail"].as_str().expect("detail missing");
    assert!(detail.contains("abc"), "Unexpected detail: {}", detail);
}

#[tokio::test]
async fn test_compress_rejects_out_of_range_quality() {
    let app = spawn_app().await;

    let form = MultipartForm::new().add_part("file", pdf_part(sample_pdf(1, "q"), "q.pdf"));
    let response = app
        .server
        .post("/api/pdf/compress")
        .add_query_param("quality", 150)
        .multipart(form)
        .await;

    response.assert_status_bad_request();
    let body: serde_json::Value = response.json();
    assert!(body["detail"]
        .as_str()
        .unwrap_or_default()
        .contains("between 1 and 100"));
}

#[tokio::test]
async fn test_compress_rejects_missing_file() {
    let app = spawn_app().await;

    let response = app
        .server
        .post("/api/pdf/compress")
        .multipart(MultipartForm::new())
        .await;
    response.assert_status_bad_request();
}

#[tokio::test]
async fn test_compress_rejects_multiple_files() {
    let app = spawn_app().await;

    let form = MultipartForm::new()
        .add_part("file", pdf_part(sample_pdf(1, "one"), "one.pdf"))
        .add_part("file", pdf_part(sample_pdf(1, "two"), "two.pdf"));

    let response = app.server.post("/api/pdf/compress").multipart(form).await;
    response.assert_status_bad_request();

    let body: serde_json::Value = response.json();
    assert!(body["detail"]
        .as_str()
        .unwrap_or_default()
        .contains("Exactly one"));
}

#[tokio::test]
async fn test_scratch_storage_is_released_after_requests() {
    let app = spawn_app().await;

    let merge_form = MultipartForm::new()
        .add_part("files", pdf_part(sample_pdf(1, "a"), "a.pdf"))
        .add_part("files", pdf_part(sample_pdf(1, "b"), "b.pdf"));
    app.server
        .post("/api/pdf/merge")
        .multipart(merge_form)
        .await
        .assert_status_ok();

    let compress_form = MultipartForm::new().add_part("file", pdf_part(sample_pdf(1, "c"), "c.pdf"));
    app.server
        .post("/api/pdf/compress")
        .multipart(compress_form)
        .await
        .assert_status_ok();

    // A failed request must release its artifacts too.
    let bad_form = MultipartForm::new().add_part("files", pdf_part(sample_pdf(1, "d"), "d.pdf"));
    app.server
        .post("/api/pdf/merge")
        .multipart(bad_form)
        .await
        .assert_status_bad_request();

    assert_eq!(
        scratch_file_count(&app),
        0,
        "No scratch files may survive completed requests"
    );
}
