//! Backend API model types
//!
//! Data structures for the audio backend's JSON responses.

use anyhow::{Result, anyhow};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::eq::EqGains;

/// Downsampled time-domain signal
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct WaveformData {
    #[serde(deserialize_with = "lossy_floats")]
    pub data: Vec<f32>,
    #[serde(deserialize_with = "lossy_floats")]
    pub time: Vec<f32>,
}

impl WaveformData {
    /// Timestamp of the last sample, if any
    pub fn last_time(&self) -> Option<f32> {
        self.time.last().copied().filter(|t| t.is_finite())
    }
}

/// Magnitude spectrum of a whole track
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct FftData {
    #[serde(deserialize_with = "lossy_floats")]
    pub frequencies: Vec<f32>,
    #[serde(deserialize_with = "lossy_floats")]
    pub magnitude_db: Vec<f32>,
}

/// Time/frequency intensity matrix, `data[freq][time]` in dB
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SpectrogramData {
    #[serde(deserialize_with = "lossy_matrix")]
    pub data: Vec<Vec<f32>>,
    #[serde(deserialize_with = "lossy_floats")]
    pub frequencies: Vec<f32>,
    #[serde(deserialize_with = "lossy_floats")]
    pub times: Vec<f32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    pub filename: String,
    #[serde(default)]
    pub duration: f32,
    #[serde(default)]
    pub sample_rate: Option<u32>,
    #[serde(default)]
    pub waveform: Option<WaveformData>,
    #[serde(default)]
    pub detected_mode: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyzeResponse {
    #[serde(default)]
    pub fft: Option<FftData>,
    #[serde(default)]
    pub spectrogram: Option<SpectrogramData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProcessResponse {
    #[serde(default)]
    pub waveform: Option<WaveformData>,
    #[serde(default)]
    pub fft: Option<FftData>,
    #[serde(default)]
    pub spectrogram: Option<SpectrogramData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayResponse {
    pub audio_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SuggestResponse {
    pub eq_gains: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EqResponse {
    #[serde(deserialize_with = "lossy_floats")]
    pub freqs_hz: Vec<f32>,
    #[serde(deserialize_with = "lossy_floats")]
    pub mag_db: Vec<f32>,
}

/// Which rendition of a track the play endpoint should prepare
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlayRequest {
    /// Processed with the given gains
    Gains(EqGains),
    /// Unprocessed source audio
    Original,
}

/// Request bodies
#[derive(Debug, Serialize)]
pub(super) struct FilenameBody<'a> {
    pub filename: &'a str,
}

#[derive(Debug, Serialize)]
pub(super) struct ProcessBody<'a> {
    pub filename: &'a str,
    pub eq_gains: EqGains,
}

#[derive(Debug, Serialize)]
pub(super) struct PlayBody<'a> {
    pub filename: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eq_gains: Option<EqGains>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub original: bool,
}

impl<'a> PlayBody<'a> {
    pub fn new(filename: &'a str, request: PlayRequest) -> Self {
        match request {
            PlayRequest::Gains(gains) => Self {
                filename,
                eq_gains: Some(gains),
                original: false,
            },
            PlayRequest::Original => Self {
                filename,
                eq_gains: None,
                original: true,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct EqResponseBody {
    pub eq_gains: EqGains,
    pub sr: u32,
    pub q: f32,
}

/// Parse a backend reply
///
/// Every endpoint answers `{"success": true, ...}` on success; anything else
/// (including `{"error": "..."}` with any status) is a failure.
pub fn parse_reply<T: DeserializeOwned>(body: &str) -> Result<T> {
    let value: Value = serde_json::from_str(&sanitize_non_finite(body))?;
    let success = value
        .get("success")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    if !success {
        let reason = value
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("request rejected");
        return Err(anyhow!("Backend error: {}", reason));
    }
    Ok(T::deserialize(value)?)
}

/// Replace bare `NaN` / `Infinity` / `-Infinity` tokens with `null`
///
/// The backend serializes numpy floats as-is, which is not strict JSON.
fn sanitize_non_finite(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut rest = body;

    while let Some(c) = rest.chars().next() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            rest = &rest[c.len_utf8()..];
            continue;
        }

        if c == '"' {
            in_string = true;
            out.push(c);
            rest = &rest[1..];
            continue;
        }

        let token = ["-Infinity", "Infinity", "NaN"]
            .into_iter()
            .find(|t| rest.starts_with(t));
        match token {
            Some(t) => {
                out.push_str("null");
                rest = &rest[t.len()..];
            }
            None => {
                out.push(c);
                rest = &rest[c.len_utf8()..];
            }
        }
    }
    out
}

/// `null` entries become NaN so callers can filter them as non-finite
fn lossy_floats<'de, D>(deserializer: D) -> std::result::Result<Vec<f32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Vec<Option<f32>> = Vec::deserialize(deserializer)?;
    Ok(raw.into_iter().map(|v| v.unwrap_or(f32::NAN)).collect())
}

fn lossy_matrix<'de, D>(deserializer: D) -> std::result::Result<Vec<Vec<f32>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Vec<Vec<Option<f32>>> = Vec::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|row| row.into_iter().map(|v| v.unwrap_or(f32::NAN)).collect())
        .collect())
}
