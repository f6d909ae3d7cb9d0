#![forbid(unsafe_code)]

use std::path::PathBuf;

use mdpad_core::{CloseChoice, Dialogs};
use rfd::{FileDialog, MessageButtons, MessageDialog, MessageDialogResult, MessageLevel};

/// Native blocking dialogs, via `rfd`.
pub(crate) struct NativeDialogs {
    extensions: Vec<String>,
}

impl NativeDialogs {
    pub(crate) const fn new(extensions: Vec<String>) -> Self {
        Self { extensions }
    }

    fn file_dialog(&self, title: &str) -> FileDialog {
        let mut dialog = FileDialog::new().set_title(title);
        if !self.extensions.is_empty() {
            dialog = dialog.add_filter("Markdown", self.extensions.as_slice());
        }
        dialog.add_filter("All files", &["*"])
    }
}

impl Dialogs for NativeDialogs {
    fn pick_open_path(&mut self) -> Option<PathBuf> {
        self.file_dialog("Open File").pick_file()
    }

    fn pick_save_path(&mut self) -> Option<PathBuf> {
        self.file_dialog("Save File").save_file()
    }

    fn confirm_close(&mut self, title: &str) -> CloseChoice {
        let [save, discard, cancel] = CloseChoice::ALL.map(CloseChoice::label);
        let result = MessageDialog::new()
            .set_level(MessageLevel::Warning)
            .set_title("Unsaved Changes")
            .set_description(format!(
                "\"{title}\" has unsaved changes. Do you want to save them first?"
            ))
            .set_buttons(MessageButtons::YesNoCancelCustom(
                save.to_owned(),
                discard.to_owned(),
                cancel.to_owned(),
            ))
            .show();
        choice_from_result(&result)
    }

    fn notify_error(&mut self, message: &str) {
        MessageDialog::new()
            .set_level(MessageLevel::Error)
            .set_title("mdpad")
            .set_description(message)
            .set_buttons(MessageButtons::Ok)
            .show();
    }
}

/// Backends report custom buttons either by label or as the yes/no slot they replaced.
fn choice_from_result(result: &MessageDialogResult) -> CloseChoice {
    match result {
        MessageDialogResult::Yes => CloseChoice::Save,
        MessageDialogResult::No => CloseChoice::Discard,
        MessageDialogResult::Custom(label) => CloseChoice::ALL
            .into_iter()
            .find(|choice| choice.label() == label)
            .unwrap_or(CloseChoice::Cancel),
        _ => CloseChoice::Cancel,
    }
}
