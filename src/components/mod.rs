//! The components module contains the reader UI.

mod app;
mod app_view;
mod icons;
mod reader;

pub use app::*;
pub use app_view::AppView;
pub use icons::*;
pub use reader::*;
