//! Connection state machine.

use std::fmt;

/// Lifecycle of the push-event connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Nothing open, nothing scheduled.
    #[default]
    Idle,
    /// The transport is being opened.
    Connecting,
    /// The transport is open and delivering events.
    Open,
    /// Waiting for the reconnect delay to elapse.
    Reconnecting,
}

/// Inputs that move the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// `connect()` was called with a connectable subscription.
    Connect,
    /// The transport reported it is open.
    Opened,
    /// The transport failed or its stream ended.
    TransportError,
    /// The expanded topic set changed.
    TopicsChanged,
    /// The reconnect delay elapsed.
    Retry,
    /// The connection was closed because no topics remain.
    Closed,
    /// The session was torn down.
    Teardown,
}

impl ConnectionState {
    /// Returns the next state, or `None` when the signal does not apply.
    pub fn on(self, signal: Signal) -> Option<ConnectionState> {
        use ConnectionState::*;

        match (self, signal) {
            (_, Signal::Teardown) | (_, Signal::Closed) => Some(Idle),
            (Idle, Signal::Connect) => Some(Connecting),
            (Connecting, Signal::Opened) => Some(Open),
            (Connecting | Open, Signal::TransportError) => Some(Reconnecting),
            (Connecting | Open, Signal::TopicsChanged) => Some(Reconnecting),
            (Reconnecting, Signal::Retry) => Some(Connecting),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Reconnecting => "reconnecting",
        }
    }

    /// True while a transport exists or is being opened.
    pub fn has_connection(&self) -> bool {
        matches!(self, ConnectionState::Connecting | ConnectionState::Open)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::ConnectionState::*;
    use super::*;

    #[test]
    fn test_happy_path() {
        let state = Idle.on(Signal::Connect).unwrap();
        assert_eq!(state, Connecting);
        assert_eq!(state.on(Signal::Opened), Some(Open));
    }

    #[test]
    fn test_error_then_retry() {
        assert_eq!(Open.on(Signal::TransportError), Some(Reconnecting));
        assert_eq!(Connecting.on(Signal::TransportError), Some(Reconnecting));
        assert_eq!(Reconnecting.on(Signal::Retry), Some(Connecting));
    }

    #[test]
    fn test_second_error_while_waiting_is_ignored() {
        assert_eq!(Reconnecting.on(Signal::TransportError), None);
    }

    #[test]
    fn test_connect_only_from_idle() {
        assert_eq!(Open.on(Signal::Connect), None);
        assert_eq!(Connecting.on(Signal::Connect), None);
        assert_eq!(Reconnecting.on(Signal::Connect), None);
    }

    #[test]
    fn test_topic_change_while_connected() {
        assert_eq!(Open.on(Signal::TopicsChanged), Some(Reconnecting));
        assert_eq!(Idle.on(Signal::TopicsChanged), None);
    }

    #[test]
    fn test_teardown_from_anywhere() {
        for state in [Idle, Connecting, Open, Reconnecting] {
            assert_eq!(state.on(Signal::Teardown), Some(Idle));
        }
    }

    #[test]
    fn test_stale_signals_are_rejected() {
        assert_eq!(Idle.on(Signal::Opened), None);
        assert_eq!(Open.on(Signal::Retry), None);
        assert_eq!(Idle.on(Signal::TransportError), None);
    }
}
