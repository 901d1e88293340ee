pub mod backend;
pub mod sox;
pub mod tool;

pub use backend::{CaptureBackend, CaptureError, CaptureExit, CaptureHandle, CaptureTerminator};
pub use sox::SoxBackend;
pub use tool::locate_capture_tool;
