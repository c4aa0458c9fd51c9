use crate::codec::ParsePhase;

/// Lifecycle of a single connection.
///
/// ```text
/// AwaitingRequestLine -> ReadingHeaders -> ReadingBody -> Dispatching
///        ^                                                    |
///        |                                                    v
///        +------------------ AwaitingNextRequest <------------+
///
/// any state -> Closed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    AwaitingRequestLine,
    ReadingHeaders,
    ReadingBody,
    Dispatching,
    /// Idle between two requests of a keep-alive connection
    AwaitingNextRequest,
    Closed,
}

impl ConnectionState {
    /// The reading state matching the parser's progress.
    pub(crate) fn reading(phase: ParsePhase) -> Self {
        match phase {
            ParsePhase::RequestLine => ConnectionState::AwaitingRequestLine,
            ParsePhase::Headers => ConnectionState::ReadingHeaders,
            ParsePhase::Body | ParsePhase::Complete => ConnectionState::ReadingBody,
        }
    }

    /// Whether the keep-alive timeout, rather than the read timeout, applies.
    pub fn is_idle(self) -> bool {
        self == ConnectionState::AwaitingNextRequest
    }
}
