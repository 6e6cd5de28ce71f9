//! SDK lifecycle state machine using rust-fsm.
//!
//! Makes the load/foreground/background lifecycle explicit instead of
//! deriving it from which background tasks happen to be running.
//!
//! ## State Diagram
//!
//! ```text
//! ┌─────────────┐
//! │    Idle     │ (initial; also reached again on load failure)
//! └──────┬──────┘
//!        │ LoadStarted
//!        ▼
//! ┌─────────────┐  LoadFailed
//! │   Loading   │ ───────────► Idle
//! └──────┬──────┘
//!        │ LoadSucceeded
//!        ▼
//! ┌─────────────┐  EnteredBackground   ┌─────────────┐
//! │    Ready    │ ───────────────────► │   Dormant   │
//! │             │ ◄─────────────────── │             │
//! └──────┬──────┘  EnteredForeground   └─────────────┘
//!        │ LoadStarted (explicit reload)
//!        ▼
//!     Loading
//! ```

use rust_fsm::*;
use serde::{Deserialize, Serialize};

// Generates a module `sdk_machine` with State, Input, and StateMachine.
state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub sdk_machine(Idle)

    Idle => {
        LoadStarted => Loading
    },
    Loading => {
        LoadSucceeded => Ready,
        LoadFailed => Idle
    },
    Ready => {
        EnteredBackground => Dormant,
        LoadStarted => Loading
    },
    Dormant => {
        EnteredForeground => Ready
    }
}

// Re-export the generated types with clearer names
pub use sdk_machine::Input as SdkMachineInput;
pub use sdk_machine::State as SdkMachineState;
pub use sdk_machine::StateMachine as SdkMachine;

/// Simplified lifecycle phase for external consumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SdkPhase {
    /// Constructed; only cached state is available.
    Idle,
    /// A remote load is in flight.
    Loading,
    /// Loaded; background services are running.
    Ready,
    /// Backgrounded; token refresh is paused.
    Dormant,
}

impl SdkPhase {
    /// True once a remote load has completed and services are running.
    pub fn is_ready(&self) -> bool {
        matches!(self, SdkPhase::Ready)
    }
}

impl From<&SdkMachineState> for SdkPhase {
    fn from(state: &SdkMachineState) -> Self {
        match state {
            SdkMachineState::Idle => SdkPhase::Idle,
            SdkMachineState::Loading => SdkPhase::Loading,
            SdkMachineState::Ready => SdkPhase::Ready,
            SdkMachineState::Dormant => SdkPhase::Dormant,
        }
    }
}
