//! BI Publisher report execution pipeline.
//!
//! Runs a report (`runReport`) to obtain a server-side file ID, then drains
//! it with sequential `downloadReportDataChunk` calls, decoding each base64
//! chunk and appending it to a local CSV until the server reports offset
//! `-1`. Each invocation owns its file ID, offset cursor, and output path;
//! nothing is shared across concurrent report runs.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Local;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use scmlink_domain::{Result, ScmLinkError};
use tracing::{debug, info};

use super::soap;

/// Characters read per `downloadReportDataChunk` call.
pub const DEFAULT_CHUNK_SIZE: u32 = 5000;

/// Defensive bound on download requests per report, in case a server never
/// emits the terminal offset.
const MAX_CHUNKS: u32 = 10_000;

/// SOAP calls inherit the long API timeout; report jobs can be slow.
const SOAP_TIMEOUT: Duration = Duration::from_secs(180);

const SOAP_CONTENT_TYPE: &str = "application/soap+xml;charset=UTF-8";

/// Provides OAuth bearer tokens for report service calls.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    /// Retrieve a bearer token guaranteed usable for the next few minutes.
    async fn access_token(&self) -> Result<String>;
}

/// A completed report download.
#[derive(Debug, Clone)]
pub struct ReportDownload {
    /// Path of the assembled CSV file
    pub path: PathBuf,

    /// Non-blank lines written, header line included
    pub total_rows: u64,
}

/// Executes BI Publisher reports and assembles their CSV output locally.
pub struct ReportService {
    soap_url: String,
    http: Client,
    tokens: Arc<dyn AccessTokenProvider>,
    downloads_dir: PathBuf,
    chunk_size: u32,
}

impl ReportService {
    /// Create a service for the given SCM base URL.
    ///
    /// Output files land in the platform Downloads directory unless
    /// [`Self::with_downloads_dir`] overrides it.
    #[must_use]
    pub fn new(base_url: &str, tokens: Arc<dyn AccessTokenProvider>) -> Self {
        let soap_url =
            format!("{}{}", base_url.trim_end_matches('/'), soap::REPORT_SERVICE_PATH);
        let http =
            Client::builder().timeout(SOAP_TIMEOUT).build().unwrap_or_else(|_| Client::new());

        info!(soap_url = %soap_url, "initialized Oracle report service");

        Self {
            soap_url,
            http,
            tokens,
            downloads_dir: default_downloads_dir(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Override the output directory.
    #[must_use]
    pub fn with_downloads_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.downloads_dir = dir.into();
        self
    }

    /// Override the download chunk size.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: u32) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Run a report and write its full CSV output to a local file.
    ///
    /// `report_path` is the absolute catalog path (for example
    /// `/Custom/SCM/OrderDetails.xdo`); `parameters` render as repeated
    /// name/value items on the `runReport` request.
    ///
    /// # Errors
    /// - `ScmLinkError::Auth` when no bearer token could be obtained
    /// - `ScmLinkError::Transport` on any non-success SOAP response
    /// - `ScmLinkError::Protocol` when an expected element is missing
    /// - `ScmLinkError::Io` on output file failures
    ///
    /// A failure mid-download leaves the partial file in place and names it
    /// in the error; there is no per-chunk retry or automatic cleanup.
    pub async fn get_report_data(
        &self,
        report_path: &str,
        parameters: &[(String, String)],
    ) -> Result<ReportDownload> {
        info!(report_path, ?parameters, "running report");

        let output_file = self.output_path(report_path);
        info!(output_file = %output_file.display(), "report output location");

        let run_envelope = soap::run_report_envelope(report_path, parameters);
        let response = self.soap_request(run_envelope).await?;
        let file_id = soap::parse_run_report_response(&response)?;
        info!(file_id = %file_id, "report file ID received");

        self.download_chunks(&file_id, &output_file).await.map_err(|e| {
            attach_partial_context(e, &output_file)
        }).map(|total_rows| {
            info!(total_rows, output_file = %output_file.display(), "report download complete");
            ReportDownload { path: output_file.clone(), total_rows }
        })
    }

    async fn download_chunks(&self, file_id: &str, output_file: &Path) -> Result<u64> {
        let mut begin_idx: u64 = 0;
        let mut total_rows: u64 = 0;
        let mut first_chunk = true;

        for _request in 0..MAX_CHUNKS {
            debug!(begin_idx, "downloading report data chunk");

            let envelope = soap::download_chunk_envelope(file_id, begin_idx, self.chunk_size);
            let response = self.soap_request(envelope).await?;
            let payload = soap::parse_download_chunk_response(&response)?;

            if !payload.data.is_empty() {
                let decoded = decode_chunk(&payload.data)?;
                write_chunk(output_file, &decoded, first_chunk)?;

                let chunk_lines =
                    decoded.lines().filter(|line| !line.trim().is_empty()).count() as u64;
                total_rows += chunk_lines;
                first_chunk = false;

                debug!(chunk_lines, total_rows, "chunk processed");
            }

            if payload.offset == -1 {
                return Ok(total_rows);
            }

            begin_idx += u64::from(self.chunk_size);
        }

        Err(ScmLinkError::Protocol(format!(
            "report download exceeded {MAX_CHUNKS} chunks without an end-of-data offset"
        )))
    }

    async fn soap_request(&self, envelope: String) -> Result<String> {
        let access_token = self.tokens.access_token().await?;

        debug!(url = %self.soap_url, "making SOAP request");

        let response = self
            .http
            .post(&self.soap_url)
            .header(CONTENT_TYPE, SOAP_CONTENT_TYPE)
            .bearer_auth(access_token)
            .body(envelope)
            .send()
            .await
            .map_err(|e| ScmLinkError::Network(format!("SOAP request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ScmLinkError::Network(format!("failed to read SOAP response: {e}")))?;

        if !status.is_success() {
            return Err(ScmLinkError::Transport { status: status.as_u16(), body });
        }

        Ok(body)
    }

    /// Collision-safe output path: report base name, timestamp, and a short
    /// random suffix.
    fn output_path(&self, report_path: &str) -> PathBuf {
        let report_name = report_path.rsplit('/').next().unwrap_or(report_path);
        let report_name = report_name.strip_suffix(".xdo").unwrap_or(report_name);
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let unique_id: String = uuid::Uuid::new_v4().simple().to_string()[..8].to_string();

        self.downloads_dir.join(format!("{report_name}_{timestamp}_{unique_id}.csv"))
    }
}

fn decode_chunk(data: &str) -> Result<String> {
    // Pods wrap long base64 payloads; strip whitespace before decoding
    let compact: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();

    let bytes = STANDARD
        .decode(compact)
        .map_err(|e| ScmLinkError::Protocol(format!("invalid base64 in report chunk: {e}")))?;

    String::from_utf8(bytes)
        .map_err(|e| ScmLinkError::Protocol(format!("report chunk is not valid UTF-8: {e}")))
}

fn write_chunk(output_file: &Path, decoded: &str, first_chunk: bool) -> Result<()> {
    let mut options = OpenOptions::new();
    if first_chunk {
        options.write(true).create(true).truncate(true);
    } else {
        options.append(true);
    }

    let mut file = options.open(output_file).map_err(|e| {
        ScmLinkError::Io(format!("failed to open {}: {e}", output_file.display()))
    })?;

    file.write_all(decoded.as_bytes()).map_err(|e| {
        ScmLinkError::Io(format!("failed to write {}: {e}", output_file.display()))
    })
}

fn attach_partial_context(err: ScmLinkError, output_file: &Path) -> ScmLinkError {
    let path = output_file.display();
    match err {
        ScmLinkError::Transport { status, body } => ScmLinkError::Transport {
            status,
            body: format!("{body} (partial output left at {path})"),
        },
        ScmLinkError::Protocol(msg) => {
            ScmLinkError::Protocol(format!("{msg} (partial output left at {path})"))
        }
        ScmLinkError::Network(msg) => {
            ScmLinkError::Network(format!("{msg} (partial output left at {path})"))
        }
        ScmLinkError::Io(msg) => {
            ScmLinkError::Io(format!("{msg} (partial output left at {path})"))
        }
        other => other,
    }
}

fn default_downloads_dir() -> PathBuf {
    directories::UserDirs::new()
        .and_then(|dirs| dirs.download_dir().map(Path::to_path_buf))
        .unwrap_or_else(std::env::temp_dir)
}
