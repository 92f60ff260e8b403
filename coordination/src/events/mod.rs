//! Push notifications for classroom sessions.
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────────┐
//! │  Classroom   │────▶│  Event Bus   │────▶│ FilteredReceiver │
//! │  (publish)   │     │  (broadcast) │     │ (session+viewer) │
//! └──────────────┘     └──────────────┘     └──────────────────┘
//! ```
//!
//! Delivery is best effort. Nothing is persisted; a viewer that misses
//! events re-fetches the session view.

pub mod bus;
pub mod types;

// Re-export core types
pub use bus::{
    EventBus, EventBusError, EventBusResult, EventFilter, FilteredReceiver, SharedEventBus,
    DEFAULT_CAPACITY,
};
pub use types::{Audience, ClassroomEvent, PairAssignment, SessionEvent, Viewer};
