//! Integration tests for the report execution pipeline
//!
//! Drives `ReportService` against a wiremock BI Publisher, asserting the
//! run/download SOAP sequence, chunk assembly order, and error surfaces.

use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use scmlink_domain::{Result, ScmLinkError};
use scmlink_infra::{AccessTokenProvider, ReportService};
use wiremock::matchers::{body_string_contains, header, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct StaticTokens;

#[async_trait]
impl AccessTokenProvider for StaticTokens {
    async fn access_token(&self) -> Result<String> {
        Ok("test-token".to_string())
    }
}

fn run_report_response(file_id: &str) -> String {
    format!(
        r#"<?xml version="1.0"?>
        <env:Envelope xmlns:env="http://www.w3.org/2003/05/soap-envelope">
          <env:Body>
            <ns2:runReportResponse xmlns:ns2="http://xmlns.oracle.com/oxp/service/PublicReportService">
              <ns2:runReportReturn>
                <ns2:reportFileID>{file_id}</ns2:reportFileID>
              </ns2:runReportReturn>
            </ns2:runReportResponse>
          </env:Body>
        </env:Envelope>"#
    )
}

fn chunk_response(raw_data: &str, offset: i64) -> String {
    let encoded = if raw_data.is_empty() { String::new() } else { STANDARD.encode(raw_data) };
    format!(
        r#"<?xml version="1.0"?>
        <env:Envelope xmlns:env="http://www.w3.org/2003/05/soap-envelope">
          <env:Body>
            <ns2:downloadReportDataChunkResponse xmlns:ns2="http://xmlns.oracle.com/oxp/service/PublicReportService">
              <ns2:downloadReportDataChunkReturn>
                <ns2:reportDataChunk>{encoded}</ns2:reportDataChunk>
                <ns2:reportDataOffset>{offset}</ns2:reportDataOffset>
              </ns2:downloadReportDataChunkReturn>
            </ns2:downloadReportDataChunkResponse>
          </env:Body>
        </env:Envelope>"#
    )
}

fn service(server: &MockServer, dir: &tempfile::TempDir) -> ReportService {
    ReportService::new(&server.uri(), Arc::new(StaticTokens)).with_downloads_dir(dir.path())
}

async fn mount_run_report(server: &MockServer, file_id: &str) {
    Mock::given(method("POST"))
        .and(header("Authorization", "Bearer test-token"))
        .and(body_string_contains("<pub:runReport>"))
        .respond_with(ResponseTemplate::new(200).set_body_string(run_report_response(file_id)))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_chunk(server: &MockServer, begin_idx: u64, raw_data: &str, offset: i64) {
    Mock::given(method("POST"))
        .and(header("Authorization", "Bearer test-token"))
        .and(body_string_contains("<pub:downloadReportDataChunk>"))
        .and(body_string_contains(format!("<pub:beginIdx>{begin_idx}</pub:beginIdx>")))
        .respond_with(ResponseTemplate::new(200).set_body_string(chunk_response(raw_data, offset)))
        .expect(1)
        .mount(server)
        .await;
}

async fn download_request_count(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|req| String::from_utf8_lossy(&req.body).contains("downloadReportDataChunk"))
        .count()
}

/// End-to-end happy path: one data chunk, one terminal chunk, row count
/// includes the header line.
#[tokio::test]
async fn report_is_assembled_from_two_chunks() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    mount_run_report(&server, "FILE123").await;
    mount_chunk(&server, 0, "h1,h2\nr1,r2\n", 5000).await;
    mount_chunk(&server, 5000, "", -1).await;

    let service = service(&server, &dir);
    let download = service
        .get_report_data("/X/Y/Report.xdo", &[("P_A".to_string(), "1".to_string())])
        .await
        .unwrap();

    let contents = std::fs::read_to_string(&download.path).unwrap();
    assert_eq!(contents, "h1,h2\nr1,r2\n");
    assert_eq!(download.total_rows, 2, "header and data line are both counted");
    assert_eq!(download_request_count(&server).await, 2);

    let name = download.path.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("Report_"));
    assert!(name.ends_with(".csv"));
}

/// The run request renders parameters as repeated name/value items.
#[tokio::test]
async fn run_request_carries_report_path_and_parameters() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("POST"))
        .and(body_string_contains("<pub:reportAbsolutePath>/X/Y/Report.xdo</pub:reportAbsolutePath>"))
        .and(body_string_contains("<pub:name>P_A</pub:name>"))
        .and(body_string_contains("<pub:item>1</pub:item>"))
        .respond_with(ResponseTemplate::new(200).set_body_string(run_report_response("FILE123")))
        .expect(1)
        .mount(&server)
        .await;
    mount_chunk(&server, 0, "", -1).await;

    let service = service(&server, &dir);
    service
        .get_report_data("/X/Y/Report.xdo", &[("P_A".to_string(), "1".to_string())])
        .await
        .unwrap();
}

/// Chunks at offsets 0, 5000, 10000 and a terminal response make exactly
/// four download requests, appended in order, with no fifth request.
#[tokio::test]
async fn chunked_download_stops_at_terminal_offset() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    mount_run_report(&server, "FILE456").await;
    mount_chunk(&server, 0, "alpha\n", 5000).await;
    mount_chunk(&server, 5000, "bravo\n", 10000).await;
    mount_chunk(&server, 10000, "charlie\n", 15000).await;
    mount_chunk(&server, 15000, "", -1).await;

    let service = service(&server, &dir);
    let download = service.get_report_data("/X/Multi.xdo", &[]).await.unwrap();

    let contents = std::fs::read_to_string(&download.path).unwrap();
    assert_eq!(contents, "alpha\nbravo\ncharlie\n", "chunks must append in offset order");
    assert_eq!(download.total_rows, 3);
    assert_eq!(download_request_count(&server).await, 4);
}

/// A terminal offset ends the download even when it arrives with data.
#[tokio::test]
async fn data_in_the_terminal_chunk_is_still_written() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    mount_run_report(&server, "FILE789").await;
    mount_chunk(&server, 0, "only-line\n", -1).await;

    let service = service(&server, &dir);
    let download = service.get_report_data("/X/Single.xdo", &[]).await.unwrap();

    assert_eq!(std::fs::read_to_string(&download.path).unwrap(), "only-line\n");
    assert_eq!(download.total_rows, 1);
    assert_eq!(download_request_count(&server).await, 1);
}

/// A non-success run response aborts the pipeline with status and body.
#[tokio::test]
async fn run_report_http_error_aborts_with_status_and_body() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal server error"))
        .mount(&server)
        .await;

    let service = service(&server, &dir);
    let err = service.get_report_data("/X/Y/Report.xdo", &[]).await.unwrap_err();

    match err {
        ScmLinkError::Transport { status, body } => {
            assert_eq!(status, 500);
            assert!(body.contains("internal server error"));
        }
        other => panic!("expected transport error, got {other:?}"),
    }
    assert_eq!(download_request_count(&server).await, 0, "no download after a failed run");
}

/// A success response without a file ID is a structural error, not a
/// transport error.
#[tokio::test]
async fn missing_file_id_is_a_protocol_error() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<env:Envelope><env:Body><ns2:runReportResponse/></env:Body></env:Envelope>",
        ))
        .mount(&server)
        .await;

    let service = service(&server, &dir);
    let err = service.get_report_data("/X/Y/Report.xdo", &[]).await.unwrap_err();

    assert!(matches!(err, ScmLinkError::Protocol(_)));
    assert!(err.to_string().contains("reportFileID"));
}

/// A failure mid-download surfaces the partial file path and leaves the
/// partial file in place.
#[tokio::test]
async fn mid_download_failure_names_the_partial_file() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    mount_run_report(&server, "FILE321").await;
    mount_chunk(&server, 0, "first-chunk\n", 5000).await;
    Mock::given(method("POST"))
        .and(body_string_contains("<pub:beginIdx>5000</pub:beginIdx>"))
        .respond_with(ResponseTemplate::new(503).set_body_string("gateway busy"))
        .mount(&server)
        .await;

    let service = service(&server, &dir);
    let err = service.get_report_data("/X/Y/Partial.xdo", &[]).await.unwrap_err();

    let rendered = err.to_string();
    assert!(rendered.contains("503") || rendered.contains("gateway busy"));
    assert!(rendered.contains("Partial_"), "error must reference the partial output path");

    // The partial file holds everything written before the failure
    let partial = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .find(|path| path.extension().is_some_and(|ext| ext == "csv"))
        .expect("partial file should remain on disk");
    assert_eq!(std::fs::read_to_string(partial).unwrap(), "first-chunk\n");
}
