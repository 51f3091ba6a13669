//! BI Publisher SOAP envelopes and response framing.
//!
//! The report service speaks SOAP 1.2 against
//! `PublicReportWSSService`. Only three response elements matter to the
//! pipeline (`reportFileID`, `reportDataChunk`, `reportDataOffset`), so
//! responses are framed with namespace-agnostic extraction instead of a
//! full XML object model. Prefix names vary between Fusion pods; the
//! patterns accept any prefix.

use once_cell::sync::Lazy;
use regex::Regex;
use scmlink_domain::{Result, ScmLinkError};

/// Service path appended to the environment's base URL.
pub const REPORT_SERVICE_PATH: &str = "/xmlpserver/services/PublicReportWSSService";

static FILE_ID_RE: Lazy<Regex> = Lazy::new(|| {
    // Safe: pattern is a compile-time constant
    Regex::new(r"(?s)<(?:[A-Za-z0-9]+:)?reportFileID(?:\s[^>]*)?>(.*?)</(?:[A-Za-z0-9]+:)?reportFileID>")
        .unwrap()
});

static CHUNK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<(?:[A-Za-z0-9]+:)?reportDataChunk(?:\s[^>]*)?>(.*?)</(?:[A-Za-z0-9]+:)?reportDataChunk>")
        .unwrap()
});

static CHUNK_EMPTY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<(?:[A-Za-z0-9]+:)?reportDataChunk(?:\s[^>]*)?/>").unwrap());

static OFFSET_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<(?:[A-Za-z0-9]+:)?reportDataOffset(?:\s[^>]*)?>(.*?)</(?:[A-Za-z0-9]+:)?reportDataOffset>")
        .unwrap()
});

/// Parsed `downloadReportDataChunk` response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPayload {
    /// Base64-encoded chunk data; empty when the server sent an empty
    /// element (the terminal response usually does)
    pub data: String,

    /// Next read offset; `-1` signals end of data
    pub offset: i64,
}

/// Build the SOAP envelope for a `runReport` request.
///
/// Parameters render as repeated name/value items. A chunk-download size of
/// 1 tells the server to hold the result server-side and hand out a file ID
/// instead of inlining the data.
#[must_use]
pub fn run_report_envelope(report_path: &str, parameters: &[(String, String)]) -> String {
    let mut params_xml = String::new();
    for (name, value) in parameters {
        params_xml.push_str(&format!(
            r#"
                <pub:item>
                    <pub:name>{}</pub:name>
                    <pub:values>
                        <pub:item>{}</pub:item>
                    </pub:values>
                </pub:item>"#,
            escape_xml(name),
            escape_xml(value)
        ));
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
        <soap:Envelope xmlns:soap="http://www.w3.org/2003/05/soap-envelope"
                      xmlns:pub="http://xmlns.oracle.com/oxp/service/PublicReportService">
            <soap:Header/>
            <soap:Body>
                <pub:runReport>
                    <pub:reportRequest>
                        <pub:parameterNameValues>{params_xml}</pub:parameterNameValues>
                        <pub:reportAbsolutePath>{}</pub:reportAbsolutePath>
                        <pub:sizeOfDataChunkDownload>1</pub:sizeOfDataChunkDownload>
                    </pub:reportRequest>
                </pub:runReport>
            </soap:Body>
        </soap:Envelope>"#,
        escape_xml(report_path)
    )
}

/// Build the SOAP envelope for a `downloadReportDataChunk` request.
#[must_use]
pub fn download_chunk_envelope(file_id: &str, begin_idx: u64, chunk_size: u32) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
        <soap:Envelope xmlns:soap="http://www.w3.org/2003/05/soap-envelope"
                      xmlns:pub="http://xmlns.oracle.com/oxp/service/PublicReportService">
            <soap:Header/>
            <soap:Body>
                <pub:downloadReportDataChunk>
                    <pub:fileID>{}</pub:fileID>
                    <pub:beginIdx>{begin_idx}</pub:beginIdx>
                    <pub:size>{chunk_size}</pub:size>
                </pub:downloadReportDataChunk>
            </soap:Body>
        </soap:Envelope>"#,
        escape_xml(file_id)
    )
}

/// Extract the report file ID from a `runReport` response.
///
/// # Errors
/// Returns `ScmLinkError::Protocol` when the element is absent or empty.
pub fn parse_run_report_response(body: &str) -> Result<String> {
    FILE_ID_RE
        .captures(body)
        .map(|caps| caps[1].trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| {
            ScmLinkError::Protocol("could not find reportFileID in runReport response".to_string())
        })
}

/// Extract the data chunk and next offset from a `downloadReportDataChunk`
/// response.
///
/// # Errors
/// Returns `ScmLinkError::Protocol` when either element is absent or the
/// offset is not an integer.
pub fn parse_download_chunk_response(body: &str) -> Result<ChunkPayload> {
    let data = CHUNK_RE
        .captures(body)
        .map(|caps| caps[1].trim().to_string())
        .or_else(|| CHUNK_EMPTY_RE.is_match(body).then(String::new));

    let Some(data) = data else {
        return Err(ScmLinkError::Protocol(
            "could not find reportDataChunk in download response".to_string(),
        ));
    };

    let offset_text = OFFSET_RE.captures(body).map(|caps| caps[1].trim().to_string()).ok_or_else(
        || {
            ScmLinkError::Protocol(
                "could not find reportDataOffset in download response".to_string(),
            )
        },
    )?;

    let offset = offset_text.parse::<i64>().map_err(|e| {
        ScmLinkError::Protocol(format!("invalid reportDataOffset '{offset_text}': {e}"))
    })?;

    Ok(ChunkPayload { data, offset })
}

fn escape_xml(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk_response(data: &str, offset: i64) -> String {
        format!(
            r#"<?xml version="1.0"?>
            <env:Envelope xmlns:env="http://www.w3.org/2003/05/soap-envelope">
              <env:Body>
                <ns2:downloadReportDataChunkResponse xmlns:ns2="http://xmlns.oracle.com/oxp/service/PublicReportService">
                  <ns2:downloadReportDataChunkReturn>
                    <ns2:reportDataChunk>{data}</ns2:reportDataChunk>
                    <ns2:reportDataOffset>{offset}</ns2:reportDataOffset>
                  </ns2:downloadReportDataChunkReturn>
                </ns2:downloadReportDataChunkResponse>
              </env:Body>
            </env:Envelope>"#
        )
    }

    #[test]
    fn run_report_envelope_renders_parameters_as_items() {
        let envelope = run_report_envelope(
            "/Custom/SCM/OrderDetails.xdo",
            &[("P_ORDER_NUMBER".to_string(), "12345".to_string())],
        );

        assert!(envelope.contains("<pub:reportAbsolutePath>/Custom/SCM/OrderDetails.xdo</pub:reportAbsolutePath>"));
        assert!(envelope.contains("<pub:name>P_ORDER_NUMBER</pub:name>"));
        assert!(envelope.contains("<pub:item>12345</pub:item>"));
        assert!(envelope.contains("<pub:sizeOfDataChunkDownload>1</pub:sizeOfDataChunkDownload>"));
    }

    #[test]
    fn run_report_envelope_escapes_parameter_values() {
        let envelope = run_report_envelope(
            "/X/Y.xdo",
            &[("P_NAME".to_string(), "A&B <Widgets>".to_string())],
        );
        assert!(envelope.contains("A&amp;B &lt;Widgets&gt;"));
        assert!(!envelope.contains("A&B <Widgets>"));
    }

    #[test]
    fn download_envelope_carries_cursor_fields() {
        let envelope = download_chunk_envelope("FILE123", 5000, 5000);
        assert!(envelope.contains("<pub:fileID>FILE123</pub:fileID>"));
        assert!(envelope.contains("<pub:beginIdx>5000</pub:beginIdx>"));
        assert!(envelope.contains("<pub:size>5000</pub:size>"));
    }

    #[test]
    fn file_id_is_extracted_regardless_of_prefix() {
        let body = r#"<env:Envelope><env:Body>
            <ns2:runReportResponse><ns2:runReportReturn>
              <ns2:reportFileID>xmlp123/tmp/report.csv</ns2:reportFileID>
            </ns2:runReportReturn></ns2:runReportResponse>
        </env:Body></env:Envelope>"#;
        assert_eq!(parse_run_report_response(body).unwrap(), "xmlp123/tmp/report.csv");

        let unprefixed = "<reportFileID>FILE9</reportFileID>";
        assert_eq!(parse_run_report_response(unprefixed).unwrap(), "FILE9");
    }

    #[test]
    fn missing_file_id_is_a_protocol_error() {
        let err = parse_run_report_response("<env:Envelope><env:Body/></env:Envelope>").unwrap_err();
        assert!(matches!(err, ScmLinkError::Protocol(_)));
        assert!(err.to_string().contains("reportFileID"));
    }

    #[test]
    fn chunk_and_offset_are_extracted() {
        let payload = parse_download_chunk_response(&chunk_response("aGVsbG8=", 5000)).unwrap();
        assert_eq!(payload, ChunkPayload { data: "aGVsbG8=".to_string(), offset: 5000 });
    }

    #[test]
    fn terminal_response_with_empty_chunk_parses() {
        let payload = parse_download_chunk_response(&chunk_response("", -1)).unwrap();
        assert_eq!(payload.data, "");
        assert_eq!(payload.offset, -1);
    }

    #[test]
    fn self_closing_chunk_element_parses_as_empty() {
        let body = r#"<Envelope><Body>
            <reportDataChunk/>
            <reportDataOffset>-1</reportDataOffset>
        </Body></Envelope>"#;
        let payload = parse_download_chunk_response(body).unwrap();
        assert_eq!(payload.data, "");
        assert_eq!(payload.offset, -1);
    }

    #[test]
    fn missing_offset_is_a_protocol_error() {
        let body = "<reportDataChunk>aGk=</reportDataChunk>";
        let err = parse_download_chunk_response(body).unwrap_err();
        assert!(matches!(err, ScmLinkError::Protocol(_)));
        assert!(err.to_string().contains("reportDataOffset"));
    }

    #[test]
    fn non_numeric_offset_is_a_protocol_error() {
        let body = "<reportDataChunk>aGk=</reportDataChunk><reportDataOffset>soon</reportDataOffset>";
        let err = parse_download_chunk_response(body).unwrap_err();
        assert!(matches!(err, ScmLinkError::Protocol(_)));
    }
}
