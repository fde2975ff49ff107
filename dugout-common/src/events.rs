//! Generation event types
//!
//! A generation session emits `Token` events in arrival order and then at
//! most one terminal event (`Done` or `Error`). Nothing follows a terminal event.

/// One event produced by a generation session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationEvent {
    /// Text fragment, in emission order
    Token(String),
    /// Backend signaled completion
    Done,
    /// Backend call failed or was interrupted
    Error(String),
}

impl GenerationEvent {
    /// True for `Done` and `Error`
    pub fn is_terminal(&self) -> bool {
        matches!(self, GenerationEvent::Done | GenerationEvent::Error(_))
    }
}
