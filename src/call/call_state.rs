use std::fmt;

/// Lifecycle of a single call attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CallState {
    #[default]
    Idle,
    /// We sent an offer and wait for the answer.
    Calling,
    /// An offer arrived and waits for accept/reject.
    Receiving,
    Active,
}

impl CallState {
    pub fn is_ringing(self) -> bool {
        matches!(self, CallState::Calling | CallState::Receiving)
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CallState::Idle => "idle",
            CallState::Calling => "calling",
            CallState::Receiving => "receiving",
            CallState::Active => "active",
        };
        f.write_str(s)
    }
}
