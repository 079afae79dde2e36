//! Application messages

use std::path::PathBuf;

use crate::engine::EngineEvent;

/// Application messages
#[derive(Debug, Clone)]
pub enum Message {
    /// No-op message for tasks whose result is reported through events
    Noop,

    // ============ Engine ============
    /// Event from the engine's channel
    Engine(EngineEvent),

    // ============ Upload ============
    /// Open the file picker
    PickFile,
    /// File chosen (None if the dialog was cancelled)
    FilePicked(Option<PathBuf>),
    /// File validated and read: (name, bytes) or a reason to refuse it
    FileRead(Result<(String, Vec<u8>), String>),

    // ============ Transport ============
    TogglePlay,
    Stop,
    /// Seek bar dragged (fraction, not committed yet)
    SeekPreview(f32),
    /// Seek bar released
    SeekRelease,

    // ============ EQ ============
    /// Band slider moved: (band, gain dB)
    BandChanged(usize, f32),
    /// Flatten every band
    ResetEq,
    ToggleOverlay,
    ToggleAutoEq,

    // ============ Playlist ============
    AddToPlaylist,
    LoadEntry(String),

    // ============ Window ============
    /// Hide the toast with this id
    HideToast(u64),
    WindowClosed,
}
