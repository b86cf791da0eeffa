// API client module: a small blocking HTTP client for the three Tapdata
// endpoints used by the import workflow. Everything is synchronous; the
// poller drives one request at a time.

use crate::error::{ApiError, Result};
use crate::redact::{mask_secret, mask_token};
use crate::status::extract_id;
use crate::ui::Report;
use reqwest::blocking::{multipart, Client, RequestBuilder, Response};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

pub const TOKEN_PATH: &str = "/api/users/generatetoken";
pub const IMPORT_PATH: &str = "/api/groupInfo/batch/import";
pub const STATUS_PATH: &str = "/api/groupInfo/getGroupImportStatus";

/// Blocking client holding the service base URL and, once obtained, the
/// access token attached to every authenticated call.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

/// Body of the token request.
#[derive(Serialize, Debug)]
pub struct TokenRequest<'a> {
    pub accesscode: &'a str,
}

/// A response read in full, kept around for logging and classification.
#[derive(Debug, Clone, Default)]
pub struct RawResponse {
    pub status: u16,
    pub reason: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RawResponse {
    fn read(res: Response) -> Result<Self> {
        let status = res.status();
        let headers = res
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = res.text()?;
        Ok(Self {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("").to_string(),
            headers,
            body,
        })
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    /// Parse the body as JSON.
    pub fn json(&self) -> std::result::Result<Value, serde_json::Error> {
        serde_json::from_str(&self.body)
    }

    /// Fail with `ApiError::Status` unless the service answered 200, then
    /// parse the body.
    fn into_json(self) -> Result<Value> {
        if !self.is_ok() {
            return Err(ApiError::Status {
                status: self.status,
                body: self.body,
            });
        }
        self.json().map_err(|e| ApiError::Parse(e.to_string()))
    }
}

impl ApiClient {
    /// Create a client for `base_url`. A trailing `/` is trimmed; `timeout`
    /// bounds every request when set.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(ApiClient {
            client: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Store the access token for subsequent authenticated requests.
    pub fn set_token(&mut self, token: &str) {
        self.token = Some(token.to_string());
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// The URL as it appears in logs: token query included, then masked.
    pub fn display_url(&self, path: &str) -> String {
        let url = format!("{}{}", self.base_url, path);
        match self.token() {
            // Build the real query first so the masked form matches what is sent
            Some(token) => mask_token(&format!("{url}?access_token={token}"), token),
            None => url,
        }
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.token() {
            Some(token) => builder.query(&[("access_token", token)]),
            None => builder,
        }
    }

    /// Mask the held token wherever it appears in `text`.
    pub fn redact_token(&self, text: &str) -> String {
        match self.token() {
            Some(token) => mask_token(text, token),
            None => text.to_string(),
        }
    }

    /// Send a request and read the full response. Transport errors carry
    /// the request URL, so the token is masked in their message.
    fn execute(&self, builder: RequestBuilder) -> Result<RawResponse> {
        builder
            .send()
            .map_err(ApiError::from)
            .and_then(RawResponse::read)
            // reqwest puts the full URL, query included, in its error text
            .map_err(|err| match err {
                ApiError::Transport { kind, message } => ApiError::Transport {
                    kind,
                    message: self.redact_token(&message),
                },
                other => other,
            })
    }

    /// Exchange the deployment access code for an access token.
    pub fn generate_token(&self, access_code: &str, log: &mut Report) -> Result<String> {
        let url = format!("{}{}", self.base_url, TOKEN_PATH);
        log.line("Getting access_token...")?;
        log.line(format!("Request URL: {url}"))?;
        log.line("Request Headers: Content-Type: application/json")?;
        log.line(format!(
            "Request Body: {{\"accesscode\": \"{}\"}}",
            mask_secret(access_code)
        ))?;
        log.blank()?;

        let raw = self.execute(self.client.post(&url).json(&TokenRequest {
            accesscode: access_code,
        }))?;
        debug!(status = raw.status, "token response received");

        // Log the response before failing on it, with the new token masked
        let doc = raw.clone().into_json();
        let token = doc
            .as_ref()
            .ok()
            .and_then(|doc| extract_id(doc, "/data/id"));
        let shown_body = match &token {
            Some(token) => mask_token(&raw.body, token),
            None => raw.body.clone(),
        };
        log.line(format!("HTTP Status Code: {}", raw.status))?;
        log.headers(&raw.headers)?;
        log.line(format!("Token Response: {shown_body}"))?;

        doc?;
        let token = token.ok_or(ApiError::MissingField {
            field: "access_token",
            body: shown_body,
        })?;
        log.line(format!(
            "Successfully obtained access_token: {}",
            mask_secret(&token)
        ))?;
        log.blank()?;
        info!("access token obtained");
        Ok(token)
    }

    /// Upload a bundle as `multipart/form-data` and return the record id of
    /// the import job it started.
    pub fn import_bundle(&self, file_path: &Path, log: &mut Report) -> Result<String> {
        let url = format!("{}{}", self.base_url, IMPORT_PATH);
        let file_name = file_path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "bundle.tar".into());

        log.line("Uploading TAR file and importing configuration...")?;
        log.line(format!("Request URL: {}", self.display_url(IMPORT_PATH)))?;
        log.line("Request Method: POST")?;
        log.line("Request Type: multipart/form-data")?;
        log.line(format!("Upload File Name: {file_name}"))?;
        log.line(format!("File Path: {}", file_path.display()))?;
        log.blank()?;

        // Read the whole file so the multipart body has a known length
        let bytes = std::fs::read(file_path)?;
        let part = multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("application/octet-stream")?;
        let form = multipart::Form::new().part("file", part);

        let raw = self.execute(self.authed(self.client.post(&url)).multipart(form))?;
        debug!(status = raw.status, "import response received");

        log.line(format!("HTTP Status Code: {}", raw.status))?;
        log.headers(&raw.headers)?;
        log.line(format!("Import Response: {}", self.redact_token(&raw.body)))?;

        let body = raw.body.clone();
        let doc = raw.into_json()?;
        let record_id = extract_id(&doc, "/data/recordId").ok_or(ApiError::MissingField {
            field: "recordId",
            body,
        })?;

        log.line("Successfully submitted import task")?;
        log.line(format!("Record ID: {record_id}"))?;
        log.blank()?;
        info!(record_id = %record_id, "import task submitted");
        Ok(record_id)
    }

    /// One GET against the status endpoint; the response is returned as-is.
    pub fn fetch_import_status(&self, record_id: &str) -> Result<RawResponse> {
        let url = format!("{}{}/{}", self.base_url, STATUS_PATH, record_id);
        self.execute(self.authed(self.client.get(&url)))
    }
}
