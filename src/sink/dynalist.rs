//! Dynalist API client.
//!
//! Every call is a JSON `POST` carrying the API token in the body. Dynalist
//! reports failures in-band through `_code` / `_msg`, usually with HTTP 200.

use super::DocumentSink;
use crate::config::HttpConfig;
use crate::models::DocumentId;
use crate::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Dynalist API client.
pub struct DynalistClient {
    api_key: SecretString,
    base_url: String,
    client: reqwest::blocking::Client,
}

impl std::fmt::Debug for DynalistClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynalistClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct EditRequest<'a> {
    token: &'a str,
    file_id: &'a str,
    changes: [Change<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Change<'a> {
    action: &'static str,
    parent_id: &'static str,
    index: usize,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct TokenOnly<'a> {
    token: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(rename = "_code", default)]
    code: Value,
    #[serde(rename = "_msg", default)]
    message: Option<String>,
    #[serde(default)]
    files: Option<Vec<FileEntry>>,
    #[serde(default)]
    data: Option<FileListData>,
}

#[derive(Debug, Deserialize)]
struct FileListData {
    #[serde(default)]
    files: Vec<FileEntry>,
}

#[derive(Debug, Deserialize)]
struct FileEntry {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(rename = "type", default)]
    kind: String,
}

impl ApiResponse {
    fn is_ok(&self) -> bool {
        match &self.code {
            Value::String(code) => code.eq_ignore_ascii_case("ok"),
            Value::Number(code) => code.as_i64() == Some(0),
            _ => false,
        }
    }

    fn failure(&self) -> String {
        let code = match &self.code {
            Value::String(code) => code.clone(),
            Value::Null => "missing".to_string(),
            other => other.to_string(),
        };
        self.message.as_deref().map_or_else(
            || format!("Dynalist returned {code}"),
            |msg| format!("Dynalist returned {code}: {msg}"),
        )
    }

    fn into_files(self) -> Vec<FileEntry> {
        self.files
            .or_else(|| self.data.map(|d| d.files))
            .unwrap_or_default()
    }
}

fn sink_error(cause: impl Into<String>) -> Error {
    Error::Sink {
        cause: cause.into(),
    }
}

/// Decodes a Dynalist response body, failing on a non-OK `_code`.
fn decode_response(body: &str) -> Result<ApiResponse> {
    let response: ApiResponse = serde_json::from_str(body)
        .map_err(|e| sink_error(format!("malformed response: {e}")))?;
    if response.is_ok() {
        Ok(response)
    } else {
        Err(sink_error(response.failure()))
    }
}

/// Picks the document titled `name` out of a file list.
fn find_document(files: Vec<FileEntry>, name: &str) -> Option<DocumentId> {
    files
        .into_iter()
        .find(|f| f.kind == "document" && f.title == name)
        .map(|f| DocumentId::new(f.id))
}

impl DynalistClient {
    /// Default API base URL.
    pub const DEFAULT_BASE_URL: &'static str = "https://dynalist.io/api/v1";

    /// Creates a client authenticating with `api_key`.
    #[must_use]
    pub fn new(api_key: SecretString, http: &HttpConfig) -> Self {
        let user_agent = format!("reddit2dynalist/{}", env!("CARGO_PKG_VERSION"));
        Self {
            api_key,
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            client: http.build_client(&user_agent),
        }
    }

    /// Overrides the API base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn post<T: Serialize>(&self, path: &str, body: &T) -> Result<ApiResponse> {
        let response = self
            .client
            .post(format!("{}{path}", self.base_url))
            .json(body)
            .send()
            .map_err(|e| {
                tracing::error!(
                    provider = "dynalist",
                    path,
                    error = %e,
                    is_timeout = e.is_timeout(),
                    is_connect = e.is_connect(),
                    "Dynalist request failed"
                );
                sink_error(format!("request error: {e}"))
            })?;

        let status = response.status();
        let text = response
            .text()
            .map_err(|e| sink_error(format!("failed to read response: {e}")))?;
        if !status.is_success() {
            tracing::error!(
                provider = "dynalist",
                path,
                status = %status,
                body = %text,
                "Dynalist returned error status"
            );
            return Err(sink_error(format!("API returned status: {status}")));
        }

        decode_response(&text)
    }
}

impl DocumentSink for DynalistClient {
    fn name(&self) -> &'static str {
        "dynalist"
    }

    #[tracing::instrument(skip(self, text), fields(document = %document))]
    fn append_entry(&self, document: &DocumentId, text: &str) -> Result<()> {
        let request = EditRequest {
            token: self.api_key.expose_secret(),
            file_id: document.as_str(),
            changes: [Change {
                action: "insert",
                parent_id: "root",
                index: 0,
                content: text,
            }],
        };
        self.post("/doc/edit", &request).map(|_| ())
    }

    #[tracing::instrument(skip(self))]
    fn resolve_document(&self, name: &str) -> Result<DocumentId> {
        let response = self.post(
            "/file/list",
            &TokenOnly {
                token: self.api_key.expose_secret(),
            },
        )?;

        let files = response.into_files();
        let count = files.len();
        let found = find_document(files, name)
            .ok_or_else(|| Error::NotFound(format!("Dynalist document '{name}'")))?;
        tracing::info!(document = %found, files = count, "Resolved Dynalist document");
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(r#"{"_code":"Ok"}"# ; "string ok")]
    #[test_case(r#"{"_code":"ok"}"# ; "lowercase ok")]
    #[test_case(r#"{"_code":0}"# ; "numeric zero")]
    fn test_decode_success(body: &str) {
        assert!(decode_response(body).is_ok());
    }

    #[test_case(r#"{"_code":"InvalidToken","_msg":"Bad token"}"#, "InvalidToken: Bad token" ; "error code with message")]
    #[test_case(r#"{"_code":"LockFail"}"#, "LockFail" ; "error code only")]
    #[test_case(r#"{"_code":3,"_msg":"nope"}"#, "3: nope" ; "numeric error")]
    #[test_case(r#"{}"#, "missing" ; "no code")]
    fn test_decode_failure(body: &str, expected: &str) {
        let err = decode_response(body).expect_err("should fail");
        assert!(matches!(err, Error::Sink { .. }));
        assert!(err.to_string().contains(expected), "{err}");
    }

    #[test]
    fn test_decode_malformed() {
        let err = decode_response("502 Bad Gateway").expect_err("should fail");
        assert!(err.to_string().contains("malformed response"));
    }

    #[test]
    fn test_find_document_top_level_files() {
        let response = decode_response(
            r#"{"_code":"Ok","root_file_id":"r","files":[
                {"id":"f1","title":"Reddit","type":"folder","children":["d2"]},
                {"id":"d1","title":"Inbox","type":"document"},
                {"id":"d2","title":"Reddit","type":"document"}
            ]}"#,
        )
        .expect("valid response");

        assert_eq!(
            find_document(response.into_files(), "Reddit"),
            Some(DocumentId::new("d2"))
        );
    }

    #[test]
    fn test_find_document_nested_data() {
        let response = decode_response(
            r#"{"_code":0,"data":{"files":[{"id":"d9","title":"Reddit","type":"document"}]}}"#,
        )
        .expect("valid response");

        assert_eq!(
            find_document(response.into_files(), "Reddit"),
            Some(DocumentId::new("d9"))
        );
    }

    #[test]
    fn test_find_document_is_exact_match() {
        let response = decode_response(
            r#"{"_code":"Ok","files":[{"id":"d1","title":"reddit","type":"document"}]}"#,
        )
        .expect("valid response");
        assert!(find_document(response.into_files(), "Reddit").is_none());
    }

    #[test]
    fn test_edit_request_shape() {
        let request = EditRequest {
            token: "tok",
            file_id: "doc",
            changes: [Change {
                action: "insert",
                parent_id: "root",
                index: 0,
                content: "Post by alice - https://reddit.com/r/x/",
            }],
        };
        let json = serde_json::to_value(&request).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({
                "token": "tok",
                "file_id": "doc",
                "changes": [{
                    "action": "insert",
                    "parent_id": "root",
                    "index": 0,
                    "content": "Post by alice - https://reddit.com/r/x/"
                }]
            })
        );
    }

    #[test]
    fn test_debug_hides_token() {
        let client = DynalistClient::new(SecretString::from("s3cret"), &HttpConfig::default());
        assert!(!format!("{client:?}").contains("s3cret"));
    }
}
