use std::fmt;

/// Outcome of probing one key. `Display` renders the exact text stored in
/// the status column, so a resumed run recognizes every variant as "done".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyStatus {
    Activated,
    NotActivated,
    Invalid,
    /// Result indicator was present but its color was not a known one;
    /// carries the indicator's raw label text.
    Unknown(String),
    /// Result page rendered but no recognizable indicator anywhere.
    NotFound,
    FieldNotFound,
    SubmitControlNotFound,
    /// The field never accepted the key, even after a bulk rewrite.
    InputMismatch { expected: String, observed: String },
    Error(String),
}

impl fmt::Display for KeyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyStatus::Activated => write!(f, "Activated"),
            KeyStatus::NotActivated => write!(f, "Not activated"),
            KeyStatus::Invalid => write!(f, "Invalid"),
            KeyStatus::Unknown(text) => write!(f, "Unknown status: {}", text),
            KeyStatus::NotFound => write!(f, "Status not found"),
            KeyStatus::FieldNotFound => write!(f, "FieldNotFound"),
            KeyStatus::SubmitControlNotFound => write!(f, "SubmitControlNotFound"),
            KeyStatus::InputMismatch { expected, observed } => {
                write!(f, "InputMismatch: expected {}, got {}", expected, observed)
            }
            KeyStatus::Error(detail) => write!(f, "Error: {}", detail),
        }
    }
}

/// One unit of work: which cell to probe and the key in it.
/// Ephemeral — lives only for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// Row index in the dataset, the stable update key.
    pub row: usize,
    /// Name of the key column this item came from.
    pub column: String,
    pub key: String,
}

/// Events emitted by the verification loop, consumed by whatever front-end
/// is attached. The loop itself never talks to a presentation layer.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    Started {
        total: usize,
    },
    Checked {
        index: usize,
        total: usize,
        column: String,
        key: String,
        status: String,
    },
    Finished {
        outcome: RunOutcome,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Cancelled,
    Fatal(String),
}

/// Keys are secrets; logs only ever see a prefix.
pub fn mask_key(key: &str) -> String {
    let prefix: String = key.chars().take(10).collect();
    if key.chars().count() > 10 {
        format!("{}...", prefix)
    } else {
        prefix
    }
}
