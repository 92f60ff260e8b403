//! Session state and its store.
//!
//! [`Session`] holds everything about one classroom run; the
//! [`SessionStore`] trait maps ids to sessions. The bundled
//! [`InMemorySessionStore`] lives for the process and starts empty.

pub mod store;
pub mod types;

// Re-export core types
pub use store::{
    lock_session, InMemorySessionStore, SessionStore, SharedSession, SharedSessionStore,
    StoreError, StoreResult,
};
pub use types::{
    PairId, Participant, ParticipantId, ParticipantStatus, Session, SessionId, Side, SideCounts,
};
