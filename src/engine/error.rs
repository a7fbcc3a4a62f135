use ulid::Ulid;

#[derive(Debug, PartialEq)]
pub enum EngineError {
    /// Candidate interval failed validation before any conflict check ran.
    InvalidSlot(&'static str),
    /// Candidate interval conflicts with the cited committed booking.
    Conflict(Ulid),
    NotFound(Ulid),
    LimitExceeded(&'static str),
    WalError(String),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::InvalidSlot(msg) => write!(f, "invalid slot: {msg}"),
            EngineError::Conflict(id) => {
                write!(f, "this time slot overlaps with an existing booking: {id}")
            }
            EngineError::NotFound(id) => write!(f, "booking not found: {id}"),
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::WalError(e) => write!(f, "storage error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}
