//! Events delivered to the form controller.

/// A user action, timer tick or scheduled dismissal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormEvent {
    NameEdited(String),
    EmailEdited(String),
    CodeEdited(String),
    Submit,
    Resend,
    /// One second of the countdown identified by `generation` elapsed
    Tick { generation: u64 },
    ToastExpired { id: u64 },
}
