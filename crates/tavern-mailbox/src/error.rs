//! Error types for the mailbox substrate.

/// Errors that can occur when talking to a component through its mailbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MailboxError {
    /// The component has terminated and its mailbox is gone.
    #[error("mailbox closed")]
    Closed,

    /// The component accepted the request but dropped the reply slot
    /// without answering (usually because it stopped mid-request).
    #[error("no reply received")]
    NoReply,
}
