/// Typed progress events emitted by long-running engine steps
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Converting transaction amounts to PLN; `done` of `total` transactions
    Resolving { done: usize, total: usize },
    /// A single line of progress; `persist=true` means the message should be
    /// printed as a permanent line (newline), otherwise it's transient (spinner line).
    Line { text: String, persist: bool },
}

impl ProgressEvent {
    pub fn transient(text: impl Into<String>) -> Self {
        ProgressEvent::Line {
            text: text.into(),
            persist: false,
        }
    }

    pub fn persistent(text: impl Into<String>) -> Self {
        ProgressEvent::Line {
            text: text.into(),
            persist: true,
        }
    }

    /// Text to show on a spinner or log line
    pub fn message(&self) -> String {
        match self {
            ProgressEvent::Resolving { done, total } => {
                format!("Resolving PLN rates ({}/{})", done, total)
            }
            ProgressEvent::Line { text, .. } => text.clone(),
        }
    }
}
