//! Round Protocol
//!
//! Binds the fairness engine into an ordered commit-reveal protocol.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    ROUND PROTOCOL                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  state.rs    - Per-round state machine and error taxonomy   │
//! │  record.rs   - Publishable record (JSON / bincode)          │
//! │  manager.rs  - Concurrent rounds, external interface        │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod state;
pub mod record;
pub mod manager;

// Re-export key types
pub use state::{IntegrityError, Round, RoundError, RoundId, RoundState, StateError};
pub use record::{RecordError, RoundRecord};
pub use manager::{RoundManager, RoundResolution, RoundReveal, RoundStart};
