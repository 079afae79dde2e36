//! Audio backend API module
//!
//! Provides the backend client trait, its HTTP implementation and wire models.

mod client;
pub mod model;

pub use client::{ALLOWED_EXTENSIONS, Backend, HttpBackend, UploadError, validate_upload};
pub use model::{
    AnalyzeResponse, EqResponse, FftData, PlayRequest, ProcessResponse, SpectrogramData,
    UploadResponse, WaveformData,
};
