use serde::Deserialize;

/// Where the close-confirmation flow currently stands.
///
/// `Saving`, `Discarding` and `Cancelled` are only passed through while a choice is resolved;
/// a session at rest is always `Idle`, `Confirming` or `Closed`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CloseState {
    #[default]
    Idle,
    Confirming,
    Saving,
    Discarding,
    Cancelled,
    Closed,
}

impl CloseState {
    /// Teardown (or replacing the document) is only allowed once the flow is here.
    pub const fn is_closed(self) -> bool {
        matches!(self, Self::Closed)
    }
}

/// The three answers to "You have unsaved changes".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CloseChoice {
    Save,
    Discard,
    Cancel,
}

impl CloseChoice {
    pub const ALL: [Self; 3] = [Self::Save, Self::Discard, Self::Cancel];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Save => "Save",
            Self::Discard => "Discard",
            Self::Cancel => "Cancel",
        }
    }
}

/// What a close does when the user picked Save and the write failed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SaveFailurePolicy {
    /// Keep the program running with the edits intact.
    #[default]
    Abort,
    /// Log the failure and close anyway.
    Close,
}
