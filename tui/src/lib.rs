// Forbid accidental stdout/stderr writes in the library portion of the TUI.
#![deny(clippy::print_stdout, clippy::print_stderr)]

mod exit;

mod app;
mod app_event;
mod attachments;
mod clipboard_paste;
mod code_modal;
mod composer;
mod footer;
mod markdown_view;
mod submit_latch;
mod text_edit;
mod tui;
mod version;

pub mod placeholder_registry;

pub use app::AppConfig;
pub use clipboard_paste::EncodedImageFormat;
pub use clipboard_paste::PasteImageError;
pub use clipboard_paste::PastedImageInfo;
pub use clipboard_paste::load_image_file_as_data_url;
pub use exit::AppExitInfo;
pub use exit::ExitReason;
pub use tui::run_app;
pub use version::WRITEUP_VERSION;
