//! End-to-end pipeline tests against a stub catalog and export server.

mod support;

use std::sync::Arc;
use std::sync::atomic::Ordering;

use catalog_export::{
    Classification, ContentClassifier, Database, Pipeline, SqliteBulkLoader, Status,
};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use support::{
    EXPORT_CSV, FailingLoader, PART, PanickingLoader, RecordingLoader, Workspace, catalog_page,
    catalog_page_with_export, challenge_page, fast_settings, file_names,
};

/// Flags every page as a challenge, however legitimate it looks.
#[derive(Debug)]
struct AlwaysChallenged;

impl ContentClassifier for AlwaysChallenged {
    fn classify(&self, _body: &str) -> Classification {
        Classification::ChallengeDetected
    }
}

async fn mount_catalog(server: &MockServer, body: String) {
    Mock::given(method("GET"))
        .and(path("/c/"))
        .and(query_param("q", PART))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_export(server: &MockServer, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path("/ProductDetail/Export/IAM-20680.csv"))
        .respond_with(ResponseTemplate::new(200).set_body_string(EXPORT_CSV))
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_successful_run_imports_and_archives() {
    let server = MockServer::start().await;
    mount_catalog(
        &server,
        catalog_page_with_export("/ProductDetail/Export/IAM-20680.csv"),
    )
    .await;
    mount_export(&server, 1).await;
    let workspace = Workspace::new();
    let loader = Arc::new(RecordingLoader::default());
    let pipeline = workspace.pipeline(&server.uri(), loader.clone());

    let result = pipeline.run(Some(PART)).await;

    assert_eq!(result.status, Status::Ok, "{}", result.message);
    assert_eq!(result.http_code, 200);

    let archived = file_names(&workspace.archive);
    assert_eq!(archived.len(), 1);
    let file_name = &archived[0];
    assert!(file_name.starts_with("IAM-20680_"));
    assert!(result.message.contains(file_name.as_str()));
    assert_eq!(
        std::fs::read_to_string(workspace.archive.join(file_name)).unwrap(),
        EXPORT_CSV
    );
    assert!(file_names(&workspace.staging).is_empty());

    let calls = loader.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].dir, workspace.staging);
    assert_eq!(calls[0].files, vec![file_name.clone()]);
}

#[tokio::test]
async fn test_absolute_export_href_is_followed() {
    let server = MockServer::start().await;
    let href = format!("{}/ProductDetail/Export/IAM-20680.csv", server.uri());
    mount_catalog(&server, catalog_page_with_export(&href)).await;
    mount_export(&server, 1).await;
    let workspace = Workspace::new();

    let result = workspace
        .pipeline(&server.uri(), Arc::new(RecordingLoader::default()))
        .run(Some(PART))
        .await;

    assert_eq!(result.http_code, 200, "{}", result.message);
}

#[tokio::test]
async fn test_catalog_404_stops_before_download() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/c/"))
        .respond_with(ResponseTemplate::new(404).set_body_string("<html>not found</html>"))
        .expect(1)
        .mount(&server)
        .await;
    mount_export(&server, 0).await;
    let workspace = Workspace::new();
    let loader = Arc::new(RecordingLoader::default());

    let result = workspace
        .pipeline(&server.uri(), loader.clone())
        .run(Some(PART))
        .await;

    assert_eq!(result.status, Status::Ng);
    assert_eq!(result.http_code, 500);
    assert!(result.message.contains("404"));
    assert!(loader.calls().is_empty());
    assert!(file_names(&workspace.staging).is_empty());
}

#[tokio::test]
async fn test_challenge_page_is_rejected() {
    let server = MockServer::start().await;
    mount_catalog(&server, challenge_page()).await;
    mount_export(&server, 0).await;
    let workspace = Workspace::new();
    let loader = Arc::new(RecordingLoader::default());

    let result = workspace
        .pipeline(&server.uri(), loader.clone())
        .run(Some(PART))
        .await;

    assert_eq!(result.http_code, 500);
    assert!(result.message.contains("retry later"));
    assert!(loader.calls().is_empty());
}

#[tokio::test]
async fn test_custom_classifier_decides_the_run() {
    let server = MockServer::start().await;
    mount_catalog(
        &server,
        catalog_page_with_export("/ProductDetail/Export/IAM-20680.csv"),
    )
    .await;
    mount_export(&server, 0).await;
    let workspace = Workspace::new();
    let loader = Arc::new(RecordingLoader::default());

    let result = workspace
        .pipeline(&server.uri(), loader.clone())
        .with_classifier(Arc::new(AlwaysChallenged))
        .run(Some(PART))
        .await;

    assert_eq!(result.status, Status::Ng);
    assert_eq!(result.http_code, 500);
    assert!(result.message.contains("retry later"), "{}", result.message);
    assert!(loader.calls().is_empty());
    assert!(file_names(&workspace.staging).is_empty());
}

#[tokio::test]
async fn test_short_page_is_rejected() {
    let server = MockServer::start().await;
    mount_catalog(&server, "<html><body>blocked</body></html>".to_string()).await;
    let workspace = Workspace::new();

    let result = workspace
        .pipeline(&server.uri(), Arc::new(RecordingLoader::default()))
        .run(Some(PART))
        .await;

    assert_eq!(result.http_code, 500);
    assert_eq!(result.status, Status::Ng);
}

#[tokio::test]
async fn test_missing_export_button_is_404() {
    let server = MockServer::start().await;
    mount_catalog(&server, catalog_page("<a id=\"btn2\" href=\"/other\">Other</a>")).await;
    mount_export(&server, 0).await;
    let workspace = Workspace::new();

    let result = workspace
        .pipeline(&server.uri(), Arc::new(RecordingLoader::default()))
        .run(Some(PART))
        .await;

    assert_eq!(result.http_code, 404);
    assert!(result.message.contains("download button not found"));
}

#[tokio::test]
async fn test_script_href_is_404_without_download_attempts() {
    let server = MockServer::start().await;
    mount_catalog(&server, catalog_page_with_export("javascript:void(0)")).await;
    Mock::given(method("GET"))
        .and(path("/ProductDetail/Export/IAM-20680.csv"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let workspace = Workspace::new();
    let loader = Arc::new(RecordingLoader::default());

    let result = workspace
        .pipeline(&server.uri(), loader.clone())
        .run(Some(PART))
        .await;

    assert_eq!(result.http_code, 404, "{}", result.message);
    assert!(result.message.contains("download button not found"));
    assert!(loader.calls().is_empty());
    assert!(file_names(&workspace.staging).is_empty());
}

#[tokio::test]
async fn test_exhausted_download_is_500_without_import() {
    let server = MockServer::start().await;
    mount_catalog(
        &server,
        catalog_page_with_export("/ProductDetail/Export/IAM-20680.csv"),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/ProductDetail/Export/IAM-20680.csv"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;
    let workspace = Workspace::new();
    let loader = Arc::new(RecordingLoader::default());

    let result = workspace
        .pipeline(&server.uri(), loader.clone())
        .run(Some(PART))
        .await;

    assert_eq!(result.http_code, 500);
    assert!(result.message.contains("export download failed"));
    assert!(loader.calls().is_empty());
    assert!(file_names(&workspace.staging).is_empty());
}

#[tokio::test]
async fn test_import_failure_leaves_file_staged() {
    let server = MockServer::start().await;
    mount_catalog(
        &server,
        catalog_page_with_export("/ProductDetail/Export/IAM-20680.csv"),
    )
    .await;
    mount_export(&server, 1).await;
    let workspace = Workspace::new();
    let loader = Arc::new(FailingLoader::default());

    let result = workspace
        .pipeline(&server.uri(), loader.clone())
        .run(Some(PART))
        .await;

    assert_eq!(result.http_code, 500);
    assert!(result.message.contains("import failed"));
    assert_eq!(loader.calls.load(Ordering::SeqCst), 1);
    let staged = file_names(&workspace.staging);
    assert_eq!(staged.len(), 1);
    assert!(staged[0].starts_with("IAM-20680_"));
    assert!(file_names(&workspace.archive).is_empty());
}

#[tokio::test]
async fn test_archive_failure_is_500_after_load() {
    let server = MockServer::start().await;
    mount_catalog(
        &server,
        catalog_page_with_export("/ProductDetail/Export/IAM-20680.csv"),
    )
    .await;
    mount_export(&server, 1).await;
    let workspace = Workspace::new();
    std::fs::remove_dir(&workspace.archive).unwrap();
    std::fs::write(&workspace.archive, b"not a directory").unwrap();
    let loader = Arc::new(RecordingLoader::default());

    let result = workspace
        .pipeline(&server.uri(), loader.clone())
        .run(Some(PART))
        .await;

    assert_eq!(result.http_code, 500);
    assert!(result.message.contains("archive failed"), "{}", result.message);
    assert_eq!(loader.calls().len(), 1);
    let staged = file_names(&workspace.staging);
    assert_eq!(staged.len(), 1);
    assert!(staged[0].starts_with("IAM-20680_"));
}

#[tokio::test]
async fn test_panic_in_stage_becomes_failed_result() {
    let server = MockServer::start().await;
    mount_catalog(
        &server,
        catalog_page_with_export("/ProductDetail/Export/IAM-20680.csv"),
    )
    .await;
    mount_export(&server, 1).await;
    let workspace = Workspace::new();

    let result = workspace
        .pipeline(&server.uri(), Arc::new(PanickingLoader))
        .run(Some(PART))
        .await;

    assert_eq!(result.http_code, 500);
    assert_eq!(result.status, Status::Ng);
    assert!(result.message.contains("loader exploded"));
}

#[tokio::test]
async fn test_blank_query_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let workspace = Workspace::new();
    let pipeline = workspace.pipeline(&server.uri(), Arc::new(RecordingLoader::default()));

    for query in [None, Some(""), Some("   ")] {
        let result = pipeline.run(query).await;
        assert_eq!(result.http_code, 400);
        assert_eq!(result.status, Status::Ng);
    }
}

#[tokio::test]
async fn test_sqlite_loader_end_to_end_with_stale_file() {
    let server = MockServer::start().await;
    mount_catalog(
        &server,
        catalog_page_with_export("/ProductDetail/Export/IAM-20680.csv"),
    )
    .await;
    mount_export(&server, 1).await;
    let workspace = Workspace::new();
    std::fs::write(
        workspace.staging.join("OLD-1_20261015080000.csv"),
        "Mfr Part\nOLD-1\n",
    )
    .unwrap();
    let loader = SqliteBulkLoader::new(Database::new_in_memory().await.unwrap());
    let pipeline = Pipeline::new(
        workspace.config(&server.uri(), fast_settings(3)),
        Arc::new(loader.clone()),
    );

    let result = pipeline.run(Some(PART)).await;

    assert_eq!(result.http_code, 200, "{}", result.message);
    assert!(result.message.contains("2 file(s)"));
    let archived = file_names(&workspace.archive);
    assert_eq!(archived.len(), 2);
    assert!(file_names(&workspace.staging).is_empty());

    let fresh = archived
        .iter()
        .find(|name| name.starts_with("IAM-20680_"))
        .unwrap();
    assert_eq!(
        loader.rows_for(fresh).await.unwrap(),
        vec![json!({"Mfr Part": "IAM-20680", "Manufacturer": "TDK InvenSense", "Qty": "10"})]
    );
    assert_eq!(
        loader.rows_for("OLD-1_20261015080000.csv").await.unwrap(),
        vec![json!({"Mfr Part": "OLD-1"})]
    );
}
