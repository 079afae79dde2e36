//! HTTP client for the audio backend
//!
//! Wraps the six `/api/audio/*` endpoints plus the download of the audio
//! file a play request points at.

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use anyhow::{Result, anyhow};
use reqwest::{Client, Url, header, multipart};
use tracing::debug;

use super::model::{
    AnalyzeResponse, EqResponse, EqResponseBody, FilenameBody, PlayBody, PlayRequest,
    PlayResponse, ProcessBody, ProcessResponse, SuggestResponse, UploadResponse, parse_reply,
};
use crate::eq::EqGains;

/// Extensions the backend accepts for upload
pub const ALLOWED_EXTENSIONS: [&str; 5] = ["wav", "mp3", "flac", "ogg", "m4a"];

/// Largest upload the backend accepts (32 MiB)
pub const MAX_UPLOAD_BYTES: u64 = 32 * 1024 * 1024;

/// Operations the dashboard needs from the backend
///
/// Implemented over HTTP by [`HttpBackend`]; tests script their own.
pub trait Backend: Send + Sync + 'static {
    fn upload(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> impl Future<Output = Result<UploadResponse>> + Send;

    fn analyze(&self, filename: &str) -> impl Future<Output = Result<AnalyzeResponse>> + Send;

    fn process(
        &self,
        filename: &str,
        gains: &EqGains,
    ) -> impl Future<Output = Result<ProcessResponse>> + Send;

    /// Ask the backend to render a playable file; returns its URL
    fn play_url(
        &self,
        filename: &str,
        request: PlayRequest,
    ) -> impl Future<Output = Result<String>> + Send;

    fn suggest_eq(&self, filename: &str) -> impl Future<Output = Result<EqGains>> + Send;

    fn eq_response(
        &self,
        gains: &EqGains,
        sample_rate: u32,
        q: f32,
    ) -> impl Future<Output = Result<EqResponse>> + Send;

    /// Download the bytes behind a URL returned by [`Backend::play_url`]
    fn fetch_audio(&self, url: &str) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

/// Reasons an upload is refused before it leaves the machine
#[derive(Debug, Clone, PartialEq)]
pub enum UploadError {
    NoFileName,
    UnsupportedType(String),
    TooLarge(u64),
}

impl std::fmt::Display for UploadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadError::NoFileName => write!(f, "No file selected"),
            UploadError::UnsupportedType(ext) => write!(f, "File type not allowed: {}", ext),
            UploadError::TooLarge(size) => write!(
                f,
                "File too large: {} bytes (limit {} bytes)",
                size, MAX_UPLOAD_BYTES
            ),
        }
    }
}

impl std::error::Error for UploadError {}

/// Check name and size against the backend's upload rules
pub fn validate_upload(path: &Path, size: u64) -> Result<String, UploadError> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .ok_or(UploadError::NoFileName)?;

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(UploadError::UnsupportedType(ext));
    }

    if size > MAX_UPLOAD_BYTES {
        return Err(UploadError::TooLarge(size));
    }

    Ok(name.to_string())
}

/// reqwest-backed [`Backend`]
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: Url,
}

impl std::fmt::Debug for HttpBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBackend")
            .field("client", &"<HttpClient>")
            .field("base_url", &self.base_url.as_str())
            .finish()
    }
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        // Url::join drops the last path segment unless the base ends in '/'
        let mut base = base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url =
            Url::parse(&base).map_err(|e| anyhow!("Invalid backend URL {}: {}", base_url, e))?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow!("Failed to build HTTP client: {}", e))?;

        Ok(Self { client, base_url })
    }

    /// Resolve a possibly relative URL against the backend base
    pub fn resolve(&self, url: &str) -> Result<Url> {
        self.base_url
            .join(url)
            .map_err(|e| anyhow!("Invalid URL {}: {}", url, e))
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: serde::Serialize + ?Sized,
        T: serde::de::DeserializeOwned,
    {
        let url = self.resolve(path)?;
        debug!("POST {}", url);
        let response = self
            .client
            .post(url)
            .header(header::ACCEPT, "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| anyhow!("Request failed: {}", e))?;
        let text = response
            .text()
            .await
            .map_err(|e| anyhow!("Failed to read response: {}", e))?;
        parse_reply(&text)
    }
}

impl Backend for HttpBackend {
    async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> Result<UploadResponse> {
        let url = self.resolve("api/audio/upload")?;
        debug!("POST {} ({} bytes)", url, bytes.len());
        let part = multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = multipart::Form::new().part("file", part);
        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| anyhow!("Request failed: {}", e))?;
        let text = response
            .text()
            .await
            .map_err(|e| anyhow!("Failed to read response: {}", e))?;
        parse_reply(&text)
    }

    async fn analyze(&self, filename: &str) -> Result<AnalyzeResponse> {
        self.post_json("api/audio/analyze", &FilenameBody { filename })
            .await
    }

    async fn process(&self, filename: &str, gains: &EqGains) -> Result<ProcessResponse> {
        let body = ProcessBody {
            filename,
            eq_gains: *gains,
        };
        self.post_json("api/audio/process", &body).await
    }

    async fn play_url(&self, filename: &str, request: PlayRequest) -> Result<String> {
        let reply: PlayResponse = self
            .post_json("api/audio/play", &PlayBody::new(filename, request))
            .await?;
        Ok(reply.audio_url)
    }

    async fn suggest_eq(&self, filename: &str) -> Result<EqGains> {
        let reply: SuggestResponse = self
            .post_json("api/audio/suggest-eq", &FilenameBody { filename })
            .await?;
        EqGains::from_slice(&reply.eq_gains).ok_or_else(|| {
            anyhow!(
                "Suggested EQ has {} bands, expected {}",
                reply.eq_gains.len(),
                crate::eq::BAND_COUNT
            )
        })
    }

    async fn eq_response(&self, gains: &EqGains, sample_rate: u32, q: f32) -> Result<EqResponse> {
        let body = EqResponseBody {
            eq_gains: *gains,
            sr: sample_rate,
            q,
        };
        self.post_json("api/audio/eq-response", &body).await
    }

    async fn fetch_audio(&self, url: &str) -> Result<Vec<u8>> {
        let url = self.resolve(url)?;
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| anyhow!("Request failed: {}", e))?
            .error_for_status()
            .map_err(|e| anyhow!("Download failed: {}", e))?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| anyhow!("Failed to read audio: {}", e))?;
        Ok(bytes.to_vec())
    }
}
