//! Connection lifecycle of a single conversation as a pure state machine.
//!
//! [`SessionState::on`] maps `(state, event)` to the next state and the action
//! the client must carry out. It performs no I/O, which keeps the
//! reconnect-and-replay rules testable without a socket.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No socket is open. The next ask must connect and replay.
    #[default]
    Disconnected,
    /// A socket is open and the server has seen every turn sent on it.
    Connected,
    /// Torn down for good.
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// An ask attempt is starting.
    Ask,
    /// The transport handed back a fresh connection.
    Opened,
    /// A reply arrived for the current attempt.
    Replied,
    /// The server closed the socket mid round trip.
    RemoteClosed,
    /// The current attempt failed.
    Failed { final_attempt: bool },
    /// The caller asked to drop the current connection.
    Close,
    /// The caller is done with the client.
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAction {
    /// Open a connection and send the whole transcript.
    ConnectAndReplay,
    /// Send only the new turn on the live connection.
    SendTurn,
    /// Record the reply and hand it back.
    Deliver,
    /// Drop the connection and run another attempt.
    Reconnect,
    /// Surface the last error to the caller.
    GiveUp,
    /// Close the socket.
    CloseSocket,
    /// Refuse the operation with `ClientClosed`.
    Reject,
    Nothing,
}

impl SessionState {
    pub fn on(self, event: SessionEvent) -> (SessionState, SessionAction) {
        use SessionAction as A;
        use SessionEvent as E;
        use SessionState as S;

        match (self, event) {
            (S::Closed, E::Close | E::Shutdown) => (S::Closed, A::Nothing),
            (S::Closed, _) => (S::Closed, A::Reject),

            (S::Disconnected, E::Ask) => (S::Disconnected, A::ConnectAndReplay),
            (S::Connected, E::Ask) => (S::Connected, A::SendTurn),

            (_, E::Opened) => (S::Connected, A::Nothing),
            (S::Connected, E::RemoteClosed) => (S::Disconnected, A::CloseSocket),
            (S::Disconnected, E::RemoteClosed) => (S::Disconnected, A::Nothing),
            (_, E::Replied) => (S::Connected, A::Deliver),

            // The last failure leaves the connection as it is; the next ask
            // finds out whether it is still usable.
            (state, E::Failed { final_attempt: true }) => (state, A::GiveUp),
            (_, E::Failed { final_attempt: false }) => (S::Disconnected, A::Reconnect),

            (S::Connected, E::Close) => (S::Disconnected, A::CloseSocket),
            (S::Disconnected, E::Close) => (S::Disconnected, A::Nothing),

            (S::Connected, E::Shutdown) => (S::Closed, A::CloseSocket),
            (S::Disconnected, E::Shutdown) => (S::Closed, A::Nothing),
        }
    }

    pub fn is_closed(self) -> bool {
        self == SessionState::Closed
    }
}
