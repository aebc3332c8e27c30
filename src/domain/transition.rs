/// What the state machine says about an incoming status, given the stored one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Write the incoming status.
    Apply,
    /// Incoming status equals the stored one and carries nothing new.
    Noop,
    /// Incoming status would move the row backwards or out of a terminal state.
    Reject,
}
