//! Recording session management
//!
//! The `SessionController` is the state machine tying the capture backend
//! and the recording store together: start/stop, the elapsed-second ticker,
//! abnormal-exit handling, and watch-channel state notifications for
//! whatever host layer sits on top.

mod controller;
mod state;

pub use controller::{SessionController, SessionError};
pub use state::{RecordingSnapshot, SessionStatus};
