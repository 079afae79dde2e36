//! Feature modules - business logic separated from UI
//!
//! Each feature module contains the core logic for a specific functionality.
//! Features should not depend on UI components directly.

pub mod playlist;
pub mod settings;

pub use playlist::{PlaylistEntry, PlaylistStore, StorageError};
pub use settings::{Settings, SettingsError};
