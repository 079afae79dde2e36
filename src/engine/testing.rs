//! Scripted backend for engine tests

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow};
use parking_lot::{Mutex, MutexGuard};

use crate::api::{
    AnalyzeResponse, Backend, EqResponse, FftData, PlayRequest, ProcessResponse, UploadResponse,
    WaveformData,
};
use crate::audio::testing::tone_wav;
use crate::eq::EqGains;

/// Every call the backend received, in order
#[derive(Debug, Default, Clone)]
pub struct CallLog {
    pub uploads: Vec<String>,
    pub analyzes: Vec<String>,
    pub processes: Vec<(String, EqGains)>,
    pub plays: Vec<(String, PlayRequest)>,
    pub suggests: Vec<String>,
    pub eq_responses: Vec<EqGains>,
    pub fetches: Vec<String>,
}

/// Knobs for the next calls
#[derive(Debug)]
pub struct Script {
    /// Delay for each `process` call in order; later calls answer at once
    pub process_delays: VecDeque<Duration>,
    pub upload_duration: f32,
    pub suggestion: EqGains,
    pub fail_upload: bool,
    pub fail_process: bool,
    pub fail_play_url: bool,
    pub fail_suggest: bool,
    pub fail_eq_response: bool,
    /// `fetch_audio` answers with bytes no decoder accepts
    pub corrupt_audio: bool,
    /// Delay before `suggest_eq` answers
    pub suggest_delay: Option<Duration>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            process_delays: VecDeque::new(),
            upload_duration: 10.0,
            suggestion: EqGains::new([3.0, 2.0, 1.0, 0.0, -1.0, -2.0, -3.0, 0.5, 1.5]),
            fail_upload: false,
            fail_process: false,
            fail_play_url: false,
            fail_suggest: false,
            fail_eq_response: false,
            corrupt_audio: false,
            suggest_delay: None,
        }
    }
}

/// In-process [`Backend`] that records calls and follows a [`Script`]
#[derive(Clone, Default)]
pub struct ScriptedBackend {
    log: Arc<Mutex<CallLog>>,
    script: Arc<Mutex<Script>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> CallLog {
        self.log.lock().clone()
    }

    pub fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock()
    }

    /// Server-side name the upload of `name` is stored under
    pub fn stored_name(name: &str) -> String {
        format!("srv_{}", name)
    }
}

fn waveform(duration: f32) -> WaveformData {
    WaveformData {
        data: vec![0.0, 0.5, -0.5, 0.0],
        time: vec![0.0, duration / 3.0, duration * 2.0 / 3.0, duration],
    }
}

fn fft(level: f32) -> FftData {
    FftData {
        frequencies: vec![0.0, 1000.0, 2000.0],
        magnitude_db: vec![level, level - 10.0, level - 20.0],
    }
}

impl Backend for ScriptedBackend {
    async fn upload(&self, file_name: &str, _bytes: Vec<u8>) -> Result<UploadResponse> {
        self.log.lock().uploads.push(file_name.to_string());
        let script = self.script.lock();
        if script.fail_upload {
            return Err(anyhow!("Backend error: upload rejected"));
        }
        Ok(UploadResponse {
            filename: Self::stored_name(file_name),
            duration: script.upload_duration,
            sample_rate: Some(8000),
            waveform: Some(waveform(script.upload_duration)),
            detected_mode: Some("Music".to_string()),
        })
    }

    async fn analyze(&self, filename: &str) -> Result<AnalyzeResponse> {
        self.log.lock().analyzes.push(filename.to_string());
        Ok(AnalyzeResponse {
            fft: Some(fft(-30.0)),
            spectrogram: None,
        })
    }

    async fn process(&self, filename: &str, gains: &EqGains) -> Result<ProcessResponse> {
        self.log.lock().processes.push((filename.to_string(), *gains));
        let (delay, fail) = {
            let mut script = self.script.lock();
            (script.process_delays.pop_front(), script.fail_process)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if fail {
            return Err(anyhow!("Backend error: process failed"));
        }
        Ok(ProcessResponse {
            waveform: Some(waveform(10.0)),
            fft: Some(fft(-30.0 + gains.get(0).unwrap_or_default())),
            spectrogram: None,
        })
    }

    async fn play_url(&self, filename: &str, request: PlayRequest) -> Result<String> {
        self.log.lock().plays.push((filename.to_string(), request));
        if self.script.lock().fail_play_url {
            return Err(anyhow!("Backend error: play failed"));
        }
        Ok(match request {
            PlayRequest::Original => format!("/media/{}/original.wav", filename),
            PlayRequest::Gains(gains) => {
                let tag: Vec<String> = gains.values().iter().map(|g| format!("{:.1}", g)).collect();
                format!("/media/{}/eq_{}.wav", filename, tag.join("_"))
            }
        })
    }

    async fn suggest_eq(&self, filename: &str) -> Result<EqGains> {
        self.log.lock().suggests.push(filename.to_string());
        let delay = self.script.lock().suggest_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let script = self.script.lock();
        if script.fail_suggest {
            return Err(anyhow!("Backend error: model unavailable"));
        }
        Ok(script.suggestion)
    }

    async fn eq_response(&self, gains: &EqGains, _sample_rate: u32, _q: f32) -> Result<EqResponse> {
        self.log.lock().eq_responses.push(*gains);
        if self.script.lock().fail_eq_response {
            return Err(anyhow!("Backend error: eq-response failed"));
        }
        Ok(EqResponse {
            freqs_hz: vec![20.0, 1000.0, 20000.0],
            mag_db: vec![gains.get(0).unwrap_or_default(), 0.0, 0.0],
        })
    }

    async fn fetch_audio(&self, url: &str) -> Result<Vec<u8>> {
        self.log.lock().fetches.push(url.to_string());
        if self.script.lock().corrupt_audio {
            return Ok(vec![0; 32]);
        }
        Ok(tone_wav(2.0))
    }
}
