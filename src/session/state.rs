//! Per-session instance binding

use crate::error::ProxyError;
use crate::protocol::CommandKind;
use crate::types::InstanceName;

/// Which instance a session talks to
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    /// No `PING <instance>` seen yet
    #[default]
    Unselected,
    /// Bound to a non-empty instance name, whether or not it exists
    Bound(InstanceName),
}

/// What the session does with one decoded command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route<'a> {
    /// Answer `+OK` without touching a backend
    Acknowledge,
    /// Forward the raw frame to this instance
    Forward(&'a InstanceName),
}

impl SessionState {
    /// Apply one command to the state and decide where it goes
    ///
    /// A selection rebinds the session before routing, so the selecting
    /// `PING` itself is forwarded to the newly chosen instance. Selections
    /// are not checked against the registry here: an unknown name stays bound.
    pub fn route(&mut self, kind: CommandKind<'_>) -> Result<Route<'_>, ProxyError> {
        match kind {
            CommandKind::Handshake => return Ok(Route::Acknowledge),
            // An empty name clears the selection
            CommandKind::SelectInstance("") => *self = Self::Unselected,
            CommandKind::SelectInstance(name) => {
                *self = Self::Bound(InstanceName::from_selection(name));
            }
            CommandKind::Other => {}
        }

        match self {
            Self::Unselected => Err(ProxyError::NoInstanceSelected),
            Self::Bound(instance) => Ok(Route::Forward(instance)),
        }
    }

    #[must_use]
    pub fn instance(&self) -> Option<&InstanceName> {
        match self {
            Self::Unselected => None,
            Self::Bound(instance) => Some(instance),
        }
    }
}
