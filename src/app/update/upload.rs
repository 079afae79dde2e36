// src/app/update/upload.rs
//! Upload message handlers

use iced::Task;
use std::path::{Path, PathBuf};

use super::events::hide_toast_later;
use crate::api::{ALLOWED_EXTENSIONS, validate_upload};
use crate::app::message::Message;
use crate::app::state::App;
use crate::ui::widgets::ToastStyle;

impl App {
    /// Handle file picking and upload
    pub fn handle_upload(&mut self, message: &Message) -> Option<Task<Message>> {
        match message {
            Message::PickFile => Some(Task::perform(
                async {
                    let result = rfd::AsyncFileDialog::new()
                        .add_filter("Audio", &ALLOWED_EXTENSIONS)
                        .pick_file()
                        .await;
                    result.map(|f| f.path().to_path_buf())
                },
                Message::FilePicked,
            )),

            Message::FilePicked(Some(path)) => {
                tracing::info!("Reading {}", path.display());
                Some(Task::perform(read_upload(path.clone()), Message::FileRead))
            }

            Message::FilePicked(None) => Some(Task::none()),

            Message::FileRead(Ok((name, bytes))) => {
                let name = name.clone();
                let bytes = bytes.clone();
                Some(self.with_engine(move |engine| async move {
                    engine.upload(name, bytes).await;
                }))
            }

            Message::FileRead(Err(reason)) => {
                tracing::warn!("Upload refused: {}", reason);
                let id = self.view.show_toast(reason.clone(), ToastStyle::Error);
                Some(hide_toast_later(id))
            }

            _ => None,
        }
    }
}

/// Validate a picked file and read it into memory
async fn read_upload(path: PathBuf) -> Result<(String, Vec<u8>), String> {
    let size = tokio::fs::metadata(&path)
        .await
        .map_err(|e| read_error(&path, e))?
        .len();
    let name = validate_upload(&path, size).map_err(|e| e.to_string())?;
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| read_error(&path, e))?;
    Ok((name, bytes))
}

fn read_error(path: &Path, e: std::io::Error) -> String {
    format!("Cannot read {}: {}", path.display(), e)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str, bytes: &[u8]) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("eqscope-upload-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[tokio::test]
    async fn test_read_upload_accepts_audio() {
        let path = temp_file("take.wav", b"RIFF");
        let (name, bytes) = read_upload(path).await.unwrap();
        assert_eq!(name, "take.wav");
        assert_eq!(bytes, b"RIFF");
    }

    #[tokio::test]
    async fn test_read_upload_refuses_other_types() {
        let path = temp_file("notes.txt", b"hello");
        let err = read_upload(path).await.unwrap_err();
        assert!(err.contains("txt"));
    }

    #[tokio::test]
    async fn test_read_upload_missing_file() {
        let path = std::env::temp_dir().join("eqscope-missing.wav");
        let err = read_upload(path).await.unwrap_err();
        assert!(err.starts_with("Cannot read"));
    }
}
