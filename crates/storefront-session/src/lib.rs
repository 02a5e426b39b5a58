//! Session management for the storefront client.
//!
//! This crate provides:
//! - An explicit FSM for the authentication lifecycle
//!   (`Anonymous -> Authenticating -> Authenticated`)
//! - [`SessionManager`]: token lifecycle, login/registration/logout,
//!   profile fetch/update, startup restoration
//! - The session error taxonomy surfaced to the view layer

mod error;
mod manager;
mod session_fsm;

pub use error::{SessionError, SessionResult};
pub use manager::SessionManager;
pub use session_fsm::session_machine;
pub use session_fsm::{
    SessionMachine, SessionMachineInput, SessionMachineState, SessionState, SessionStateChanged,
};

/// Callback type for session state change notifications.
pub type SessionStateCallback = Box<dyn Fn(SessionStateChanged) + Send + Sync>;
