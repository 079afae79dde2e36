//! Reusable UI widgets - composable components without business logic
//!
//! Widgets must not import `crate::app::Message`; they take generic
//! message types or callbacks.

mod progress_slider;
mod toast;
mod vertical_slider;

pub use progress_slider::seek_bar;
pub use toast::{Toast, ToastStyle, view_toast};
pub use vertical_slider::band_slider;
