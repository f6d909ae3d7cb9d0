#![forbid(unsafe_code)]

//! Document model shared by the `mdpad` desktop editor and its CLI.
//!
//! Nothing in here knows about widgets: the GUI feeds keystrokes in through
//! [`events::broadcast`] and answers prompts through the [`dialogs::Dialogs`] trait.

pub mod close;
pub mod config;
pub mod dialogs;
pub mod disk_io;
pub mod error;
pub mod events;
pub mod markdown;
pub mod session;

pub use close::{CloseChoice, CloseState, SaveFailurePolicy};
pub use dialogs::Dialogs;
pub use error::{ConfigError, ReadError, WriteError};
pub use events::{LivePreview, TextObserver};
pub use session::{DocumentSession, SaveOutcome};

/// Hard cap on file sizes we will load into memory.
pub const MAX_FILE_BYTES: u64 = 64 * 1024 * 1024;
