use std::{
    borrow::Cow,
    path::{Path, PathBuf},
};

use log::{debug, error, info, warn};

use crate::{
    close::{CloseChoice, CloseState, SaveFailurePolicy},
    dialogs::Dialogs,
    disk_io,
    error::{ReadError, WriteError},
    events::TextObserver,
};

/// How a save request ended when it did not fail.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved(PathBuf),
    /// The user dismissed the save-path prompt. Nothing was written.
    Cancelled,
}

/// The document being edited: its buffer, its backing file and whether it has unsaved edits.
#[derive(Debug, Default)]
pub struct DocumentSession {
    text: String,
    path: Option<PathBuf>,
    dirty: bool,
    close_state: CloseState,
}

impl DocumentSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub const fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub const fn close_state(&self) -> CloseState {
        self.close_state
    }

    pub fn title(&self) -> Cow<'_, str> {
        self.path
            .as_ref()
            .and_then(|path| path.file_name())
            .map_or_else(|| Cow::Borrowed("Untitled"), |name| name.to_string_lossy())
    }

    pub fn path_label(&self) -> Cow<'_, str> {
        self.path
            .as_ref()
            .map_or_else(|| Cow::Borrowed("Unsaved"), |path| path.to_string_lossy())
    }

    /// Replace the buffer with what the editing surface now holds.
    pub fn on_text_changed(&mut self, new_text: &str) {
        new_text.clone_into(&mut self.text);
        self.mark_dirty();
    }

    /// Load `path` into the session. On error the session is left exactly as it was.
    pub fn load(&mut self, path: impl Into<PathBuf>) -> Result<(), ReadError> {
        let path = path.into();
        let text = disk_io::read_utf8(&path)?;

        info!("loaded {} ({} bytes)", path.display(), text.len());
        self.text = text;
        self.path = Some(path);
        self.dirty = false;
        self.close_state = CloseState::Idle;
        Ok(())
    }

    /// Prompt for a file and load it. Returns `Ok(false)` if the prompt was cancelled.
    pub fn open(&mut self, dialogs: &mut dyn Dialogs) -> Result<bool, ReadError> {
        let Some(path) = dialogs.pick_open_path() else {
            debug!("open cancelled");
            return Ok(false);
        };
        self.load(path)?;
        Ok(true)
    }

    /// Write the buffer to its file, prompting for a path if it has none yet.
    pub fn save(&mut self, dialogs: &mut dyn Dialogs) -> Result<SaveOutcome, WriteError> {
        let path = match self.path.clone() {
            Some(path) => path,
            None => {
                let Some(path) = dialogs.pick_save_path() else {
                    debug!("save cancelled at the path prompt");
                    return Ok(SaveOutcome::Cancelled);
                };
                path
            }
        };

        self.save_as(path.clone())?;
        Ok(SaveOutcome::Saved(path))
    }

    /// Write the buffer to `path` and make it the document's file.
    pub fn save_as(&mut self, path: impl Into<PathBuf>) -> Result<(), WriteError> {
        let path = path.into();
        if let Err(source) = disk_io::atomic_write_utf8(&path, &self.text) {
            warn!("save to {} failed: {source}", path.display());
            return Err(WriteError::Io { path, source });
        }

        info!("saved {} ({} bytes)", path.display(), self.text.len());
        self.path = Some(path);
        self.dirty = false;
        Ok(())
    }

    /// Start closing the document. A clean document closes straight away.
    pub fn request_close(&mut self) -> CloseState {
        let next = if self.dirty {
            CloseState::Confirming
        } else {
            CloseState::Closed
        };
        self.transition(next);
        next
    }

    /// Apply the user's answer to the unsaved-changes prompt.
    ///
    /// Returns the state the flow settled in: `Closed`, or `Idle` if the close was abandoned.
    /// A write error is only returned when `policy` keeps the program running.
    pub fn resolve_close(
        &mut self,
        choice: CloseChoice,
        dialogs: &mut dyn Dialogs,
        policy: SaveFailurePolicy,
    ) -> Result<CloseState, WriteError> {
        if self.close_state != CloseState::Confirming {
            debug!(
                "ignoring {choice:?} while close flow is {:?}",
                self.close_state
            );
            return Ok(self.close_state);
        }

        match choice {
            CloseChoice::Save => {
                self.transition(CloseState::Saving);
                match self.save(dialogs) {
                    Ok(SaveOutcome::Saved(_)) => self.transition(CloseState::Closed),
                    Ok(SaveOutcome::Cancelled) => self.transition(CloseState::Idle),
                    Err(err) => match policy {
                        SaveFailurePolicy::Abort => {
                            self.transition(CloseState::Idle);
                            return Err(err);
                        }
                        SaveFailurePolicy::Close => {
                            error!("closing with unsaved changes: {err}");
                            self.transition(CloseState::Closed);
                        }
                    },
                }
            }
            CloseChoice::Discard => {
                self.transition(CloseState::Discarding);
                self.transition(CloseState::Closed);
            }
            CloseChoice::Cancel => {
                self.transition(CloseState::Cancelled);
                self.transition(CloseState::Idle);
            }
        }

        Ok(self.close_state)
    }

    /// Run the whole close flow against blocking dialogs.
    pub fn close_with(
        &mut self,
        dialogs: &mut dyn Dialogs,
        policy: SaveFailurePolicy,
    ) -> Result<CloseState, WriteError> {
        if self.request_close() == CloseState::Closed {
            return Ok(CloseState::Closed);
        }

        let choice = dialogs.confirm_close(&self.title());
        let result = self.resolve_close(choice, dialogs, policy);
        if let Err(err) = &result {
            dialogs.notify_error(&err.to_string());
        }
        result
    }

    /// Put a confirming or closed session back to `Idle`.
    ///
    /// Used when whatever the close was for (opening another file, say) did not happen.
    pub fn resume(&mut self) {
        if self.close_state != CloseState::Idle {
            self.transition(CloseState::Idle);
        }
    }

    fn transition(&mut self, next: CloseState) {
        debug!("close flow: {:?} -> {next:?}", self.close_state);
        self.close_state = next;
    }
}

impl TextObserver for DocumentSession {
    fn text_changed(&mut self, text: &str) {
        self.on_text_changed(text);
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::VecDeque, fs};

    use super::*;

    #[derive(Default)]
    struct Scripted {
        open_paths: VecDeque<Option<PathBuf>>,
        save_paths: VecDeque<Option<PathBuf>>,
        choices: VecDeque<CloseChoice>,
        confirmations: usize,
        errors: Vec<String>,
    }

    impl Dialogs for Scripted {
        fn pick_open_path(&mut self) -> Option<PathBuf> {
            self.open_paths.pop_front().flatten()
        }

        fn pick_save_path(&mut self) -> Option<PathBuf> {
            self.save_paths.pop_front().flatten()
        }

        fn confirm_close(&mut self, _title: &str) -> CloseChoice {
            self.confirmations += 1;
            self.choices.pop_front().unwrap_or(CloseChoice::Cancel)
        }

        fn notify_error(&mut self, message: &str) {
            self.errors.push(message.to_owned());
        }
    }

    fn temp_dir() -> tempfile::TempDir {
        match tempfile::tempdir() {
            Ok(dir) => dir,
            Err(err) => panic!("failed to create temp dir: {err}"),
        }
    }

    fn snapshot(session: &DocumentSession) -> (String, Option<PathBuf>, bool) {
        (
            session.text().to_owned(),
            session.path().map(Path::to_path_buf),
            session.is_dirty(),
        )
    }

    #[test]
    fn starts_empty_clean_and_untitled() {
        let session = DocumentSession::new();
        assert_eq!(session.text(), "");
        assert_eq!(session.path(), None);
        assert!(!session.is_dirty());
        assert_eq!(session.close_state(), CloseState::Idle);
        assert_eq!(session.title(), "Untitled");
        assert_eq!(session.path_label(), "Unsaved");
    }

    #[test]
    fn buffer_tracks_the_last_change() {
        let mut session = DocumentSession::new();
        for text in ["#", "# T", "# Ti", "# Title"] {
            session.on_text_changed(text);
        }
        assert_eq!(session.text(), "# Title");
        assert!(session.is_dirty());
    }

    #[test]
    fn first_edit_after_load_or_save_marks_dirty() {
        let dir = temp_dir();
        let path = dir.path().join("notes.md");
        fs::write(&path, "hello").ok();

        let mut session = DocumentSession::new();
        assert!(session.load(&path).is_ok());
        assert!(!session.is_dirty());

        session.on_text_changed("hello!");
        assert!(session.is_dirty());

        assert!(session.save_as(&path).is_ok());
        assert!(!session.is_dirty());

        session.on_text_changed("hello!!");
        assert!(session.is_dirty());
    }

    #[test]
    fn load_then_save_round_trips_bytes() {
        let dir = temp_dir();
        let path = dir.path().join("doc.md");
        let original = "# Title\r\n\n* item \u{2014} caf\u{e9}\n\n    code\n";
        fs::write(&path, original).ok();

        let mut session = DocumentSession::new();
        let mut dialogs = Scripted::default();
        assert!(session.load(&path).is_ok());
        let saved = session.save(&mut dialogs);
        assert!(matches!(saved, Ok(SaveOutcome::Saved(ref p)) if *p == path));

        assert_eq!(fs::read(&path).unwrap_or_default(), original.as_bytes());
        assert!(!session.is_dirty());
        assert_eq!(session.title(), "doc.md");
    }

    #[test]
    fn load_missing_file_leaves_session_untouched() {
        let dir = temp_dir();
        let existing = dir.path().join("existing.md");
        fs::write(&existing, "kept").ok();

        let mut session = DocumentSession::new();
        assert!(session.load(&existing).is_ok());
        session.on_text_changed("kept, edited");
        let before = snapshot(&session);

        let missing = dir.path().join("missing.md");
        let err = session.load(&missing);
        assert!(matches!(err, Err(ReadError::Io { .. })));
        if let Err(err) = err {
            assert_eq!(err.path(), missing);
        }
        assert_eq!(snapshot(&session), before);
    }

    #[test]
    fn load_oversized_file_leaves_session_untouched() {
        let dir = temp_dir();
        let huge = dir.path().join("huge.md");
        let sparse = fs::File::create(&huge)
            .and_then(|file| file.set_len(crate::MAX_FILE_BYTES + 1));
        assert!(sparse.is_ok(), "failed to create sparse file: {sparse:?}");

        let mut session = DocumentSession::new();
        session.on_text_changed("keep");
        let before = snapshot(&session);

        let err = session.load(&huge);
        assert!(matches!(err, Err(ReadError::TooLarge { .. })), "{err:?}");
        assert_eq!(snapshot(&session), before);
        assert_eq!(session.close_state(), CloseState::Idle);
    }

    #[test]
    fn save_without_path_prompts_and_adopts_the_choice() {
        let dir = temp_dir();
        let path = dir.path().join("new.md");

        let mut session = DocumentSession::new();
        session.on_text_changed("draft");
        let mut dialogs = Scripted {
            save_paths: VecDeque::from([Some(path.clone())]),
            ..Scripted::default()
        };

        let saved = session.save(&mut dialogs);
        assert!(matches!(saved, Ok(SaveOutcome::Saved(_))));
        assert_eq!(session.path(), Some(path.as_path()));
        assert!(!session.is_dirty());
        assert_eq!(fs::read_to_string(&path).unwrap_or_default(), "draft");
    }

    #[test]
    fn cancelled_save_prompt_changes_nothing() {
        for dirty in [false, true] {
            let mut session = DocumentSession::new();
            if dirty {
                session.on_text_changed("draft");
            }
            let before = snapshot(&session);
            let mut dialogs = Scripted {
                save_paths: VecDeque::from([None]),
                ..Scripted::default()
            };

            let saved = session.save(&mut dialogs);
            assert!(matches!(saved, Ok(SaveOutcome::Cancelled)));
            assert_eq!(snapshot(&session), before);
        }
    }

    #[test]
    fn failed_write_keeps_dirty_and_path() {
        let dir = temp_dir();
        let path = dir.path().join("doc.md");
        fs::write(&path, "v1").ok();

        let mut session = DocumentSession::new();
        assert!(session.load(&path).is_ok());
        session.on_text_changed("v2");

        let unwritable = dir.path().join("no-such-dir").join("doc.md");
        let err = session.save_as(&unwritable);
        assert!(matches!(err, Err(WriteError::Io { .. })));
        assert!(session.is_dirty());
        assert_eq!(session.path(), Some(path.as_path()));
        assert_eq!(fs::read_to_string(&path).unwrap_or_default(), "v1");
    }

    #[test]
    fn open_loads_the_picked_file() {
        let dir = temp_dir();
        let path = dir.path().join("picked.md");
        fs::write(&path, "# Picked").ok();

        let mut session = DocumentSession::new();
        let mut dialogs = Scripted {
            open_paths: VecDeque::from([None, Some(path.clone())]),
            ..Scripted::default()
        };

        assert!(matches!(session.open(&mut dialogs), Ok(false)));
        assert_eq!(session.text(), "");

        assert!(matches!(session.open(&mut dialogs), Ok(true)));
        assert_eq!(session.text(), "# Picked");
        assert_eq!(session.path(), Some(path.as_path()));
    }

    #[test]
    fn clean_close_skips_the_prompt() {
        let mut session = DocumentSession::new();
        let mut dialogs = Scripted::default();

        let state = session.close_with(&mut dialogs, SaveFailurePolicy::Abort);
        assert!(matches!(state, Ok(CloseState::Closed)));
        assert_eq!(dialogs.confirmations, 0);
    }

    #[test]
    fn dirty_close_asks_first() {
        let mut session = DocumentSession::new();
        session.on_text_changed("x");
        assert_eq!(session.request_close(), CloseState::Confirming);
        assert_eq!(session.close_state(), CloseState::Confirming);
    }

    #[test]
    fn cancel_returns_to_idle_untouched() {
        let dir = temp_dir();
        let path = dir.path().join("doc.md");
        fs::write(&path, "v1").ok();

        let mut session = DocumentSession::new();
        assert!(session.load(&path).is_ok());
        session.on_text_changed("v2");
        let before = snapshot(&session);

        let mut dialogs = Scripted {
            choices: VecDeque::from([CloseChoice::Cancel]),
            ..Scripted::default()
        };
        let state = session.close_with(&mut dialogs, SaveFailurePolicy::Abort);
        assert!(matches!(state, Ok(CloseState::Idle)));
        assert_eq!(dialogs.confirmations, 1);
        assert_eq!(snapshot(&session), before);
    }

    #[test]
    fn discard_closes_without_writing() {
        let dir = temp_dir();
        let path = dir.path().join("doc.md");
        fs::write(&path, "v1").ok();

        let mut session = DocumentSession::new();
        assert!(session.load(&path).is_ok());
        session.on_text_changed("v2");

        let mut dialogs = Scripted {
            choices: VecDeque::from([CloseChoice::Discard]),
            ..Scripted::default()
        };
        let state = session.close_with(&mut dialogs, SaveFailurePolicy::Abort);
        assert!(matches!(state, Ok(CloseState::Closed)));
        assert_eq!(fs::read_to_string(&path).unwrap_or_default(), "v1");
    }

    #[test]
    fn save_then_close() {
        let dir = temp_dir();
        let path = dir.path().join("doc.md");
        fs::write(&path, "v1").ok();

        let mut session = DocumentSession::new();
        assert!(session.load(&path).is_ok());
        session.on_text_changed("v2");

        let mut dialogs = Scripted {
            choices: VecDeque::from([CloseChoice::Save]),
            ..Scripted::default()
        };
        let state = session.close_with(&mut dialogs, SaveFailurePolicy::Abort);
        assert!(matches!(state, Ok(CloseState::Closed)));
        assert!(!session.is_dirty());
        assert_eq!(fs::read_to_string(&path).unwrap_or_default(), "v2");
    }

    #[test]
    fn save_prompt_cancelled_during_close_keeps_running() {
        let mut session = DocumentSession::new();
        session.on_text_changed("draft");

        let mut dialogs = Scripted {
            choices: VecDeque::from([CloseChoice::Save]),
            save_paths: VecDeque::from([None]),
            ..Scripted::default()
        };
        let state = session.close_with(&mut dialogs, SaveFailurePolicy::Abort);
        assert!(matches!(state, Ok(CloseState::Idle)));
        assert!(session.is_dirty());
        assert_eq!(session.text(), "draft");
    }

    #[test]
    fn failed_save_aborts_close_by_default() {
        let dir = temp_dir();
        let unwritable = dir.path().join("no-such-dir").join("doc.md");

        let mut session = DocumentSession::new();
        session.on_text_changed("draft");

        let mut dialogs = Scripted {
            choices: VecDeque::from([CloseChoice::Save]),
            save_paths: VecDeque::from([Some(unwritable)]),
            ..Scripted::default()
        };
        let state = session.close_with(&mut dialogs, SaveFailurePolicy::Abort);
        assert!(matches!(state, Err(WriteError::Io { .. })));
        assert_eq!(session.close_state(), CloseState::Idle);
        assert!(session.is_dirty());
        assert_eq!(session.path(), None);
        assert_eq!(dialogs.errors.len(), 1);
    }

    #[test]
    fn failed_save_can_close_anyway() {
        let dir = temp_dir();
        let unwritable = dir.path().join("no-such-dir").join("doc.md");

        let mut session = DocumentSession::new();
        session.on_text_changed("draft");

        let mut dialogs = Scripted {
            choices: VecDeque::from([CloseChoice::Save]),
            save_paths: VecDeque::from([Some(unwritable)]),
            ..Scripted::default()
        };
        let state = session.close_with(&mut dialogs, SaveFailurePolicy::Close);
        assert!(matches!(state, Ok(CloseState::Closed)));
        assert!(session.is_dirty());
        assert!(dialogs.errors.is_empty());
    }

    #[test]
    fn choices_outside_confirming_are_ignored() {
        let mut session = DocumentSession::new();
        session.on_text_changed("draft");
        let mut dialogs = Scripted::default();

        let state =
            session.resolve_close(CloseChoice::Discard, &mut dialogs, SaveFailurePolicy::Abort);
        assert!(matches!(state, Ok(CloseState::Idle)));
        assert!(session.is_dirty());
    }

    #[test]
    fn resume_reopens_a_discarded_close() {
        let mut session = DocumentSession::new();
        session.on_text_changed("draft");
        let mut dialogs = Scripted {
            choices: VecDeque::from([CloseChoice::Discard]),
            ..Scripted::default()
        };
        let state = session.close_with(&mut dialogs, SaveFailurePolicy::Abort);
        assert!(matches!(state, Ok(CloseState::Closed)));

        session.resume();
        assert_eq!(session.close_state(), CloseState::Idle);
        assert_eq!(session.text(), "draft");
        assert!(session.is_dirty());
    }

    #[test]
    fn load_resets_a_finished_close() {
        let dir = temp_dir();
        let path = dir.path().join("next.md");
        fs::write(&path, "next").ok();

        let mut session = DocumentSession::new();
        session.on_text_changed("old");
        session.request_close();
        let mut dialogs = Scripted::default();
        let state =
            session.resolve_close(CloseChoice::Discard, &mut dialogs, SaveFailurePolicy::Abort);
        assert!(matches!(state, Ok(CloseState::Closed)));

        assert!(session.load(&path).is_ok());
        assert_eq!(session.close_state(), CloseState::Idle);
        assert_eq!(session.text(), "next");
    }
}
