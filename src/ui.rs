//! UI module for the EQ dashboard
//!
//! # Architecture
//!
//! - **Canvas** (`canvas`): replays `render` command lists onto iced canvases
//! - **Widgets** (`widgets`): composable UI patterns without business logic
//! - **Theme** (`theme`): palette and widget styles

pub mod canvas;
pub mod theme;
pub mod widgets;
