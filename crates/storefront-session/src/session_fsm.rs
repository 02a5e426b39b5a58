//! Authentication state machine using rust-fsm.
//!
//! Authentication is never derived from the machine alone: the session is
//! authenticated iff an access token AND a validated profile are both held.
//! The machine makes the transitions between those conditions explicit.
//!
//! ## State Diagram
//!
//! ```text
//! ┌─────────────────┐
//! │    Anonymous    │ (initial)
//! └────────┬────────┘
//!          │ LoginAttempt / TokenRestored
//!          ▼
//! ┌─────────────────┐
//! │ Authenticating  │──── AuthFailed ───► Anonymous
//! └────────┬────────┘
//!          │ ProfileConfirmed
//!          ▼
//! ┌─────────────────┐
//! │  Authenticated  │── LogoutRequested / CredentialRejected ──► Anonymous
//! └─────────────────┘
//! ```

use rust_fsm::*;
use serde::{Deserialize, Serialize};
use storefront_api::UserProfile;

// Define the FSM using rust-fsm's declarative macro
// This generates a module `session_machine` with:
// - session_machine::State (enum)
// - session_machine::Input (enum)
// - session_machine::StateMachine (type alias)
state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub session_machine(Anonymous)

    Anonymous => {
        LoginAttempt => Authenticating,
        TokenRestored => Authenticating
    },
    Authenticating => {
        ProfileConfirmed => Authenticated,
        AuthFailed => Anonymous
    },
    Authenticated => {
        LogoutRequested => Anonymous,
        CredentialRejected => Anonymous
    }
}

// Re-export the generated types with clearer names
pub use session_machine::Input as SessionMachineInput;
pub use session_machine::State as SessionMachineState;
pub use session_machine::StateMachine as SessionMachine;

/// Session state exposed to the route guard and view layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No credential held.
    Anonymous,
    /// Credential held but the profile has not been validated yet.
    Authenticating,
    /// Credential and validated profile both held.
    Authenticated,
}

impl SessionState {
    /// True only in the fully validated state.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated)
    }

    /// True while a credential is pending validation.
    pub fn is_transient(&self) -> bool {
        matches!(self, SessionState::Authenticating)
    }
}

impl From<&SessionMachineState> for SessionState {
    fn from(state: &SessionMachineState) -> Self {
        match state {
            SessionMachineState::Anonymous => SessionState::Anonymous,
            SessionMachineState::Authenticating => SessionState::Authenticating,
            SessionMachineState::Authenticated => SessionState::Authenticated,
        }
    }
}

/// Payload for session state change events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStateChanged {
    /// Current session state.
    pub state: SessionState,
    /// The profile, when one is held.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<UserProfile>,
}
