use std::path::PathBuf;

use crate::close::CloseChoice;

/// The blocking prompts a session needs from its host UI.
pub trait Dialogs {
    /// Ask for a document to open. `None` means the user cancelled.
    fn pick_open_path(&mut self) -> Option<PathBuf>;

    /// Ask where to save an untitled document. `None` means the user cancelled.
    fn pick_save_path(&mut self) -> Option<PathBuf>;

    /// Ask what to do with unsaved changes to the document called `title`.
    fn confirm_close(&mut self, title: &str) -> CloseChoice;

    /// Tell the user something failed.
    fn notify_error(&mut self, message: &str);
}
