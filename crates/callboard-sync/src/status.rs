//! Connection status published by the synchronizer.

use serde::Serialize;

/// Connection state machine.
///
/// ```text
/// Closed ──▶ Connecting ──▶ Open
///   ▲            │           │ transport failure
///   │            ▼           ▼
///   └──── Reconnecting{attempt} (bounded)
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConnectionState {
    /// No channel.
    #[default]
    Closed,
    /// First attempt of a sequence in progress.
    Connecting,
    /// Handshake accepted, events flowing.
    Open,
    /// Retrying after a failure.
    Reconnecting {
        /// 1-based attempt number within the current sequence.
        attempt: u32,
    },
}

/// State plus the degraded flag.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ConnectionStatus {
    /// Current state.
    pub state: ConnectionState,
    /// Reconnection gave up; cached data may be stale.
    pub degraded: bool,
}

impl ConnectionStatus {
    /// Status in `state`, not degraded.
    pub fn new(state: ConnectionState) -> Self {
        Self {
            state,
            degraded: false,
        }
    }

    /// Closed after giving up.
    pub fn gave_up() -> Self {
        Self {
            state: ConnectionState::Closed,
            degraded: true,
        }
    }

    /// Whether events are flowing.
    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }

    /// Whether a connection is open or being established.
    pub fn is_active(&self) -> bool {
        self.state != ConnectionState::Closed
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.state {
            ConnectionState::Closed if self.degraded => write!(f, "closed (degraded)"),
            ConnectionState::Closed => write!(f, "closed"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Open => write!(f, "open"),
            ConnectionState::Reconnecting { attempt } => write!(f, "reconnecting (attempt {attempt})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(ConnectionStatus::default().to_string(), "closed");
        assert_eq!(ConnectionStatus::gave_up().to_string(), "closed (degraded)");
        assert_eq!(
            ConnectionStatus::new(ConnectionState::Reconnecting { attempt: 2 }).to_string(),
            "reconnecting (attempt 2)"
        );
    }

    #[test]
    fn activity() {
        assert!(!ConnectionStatus::gave_up().is_active());
        assert!(ConnectionStatus::new(ConnectionState::Connecting).is_active());
        assert!(ConnectionStatus::new(ConnectionState::Open).is_open());
    }
}
