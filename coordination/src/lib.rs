//! Classroom Coordination Library
//!
//! Core of a live classroom role-play: an instructor runs a session through
//! two class-wide ballots and a paired buy-sell negotiation.
//!
//! # Components
//!
//! - [`voting`]: option sets, tallies and the plurality winner
//! - [`assignment`]: alternating role assignment and pairing
//! - [`negotiation`]: the per-pair state machine for the immediate-offer
//!   and timed descending-price mechanisms
//! - [`phase`]: the session phase controller
//! - [`events`]: tagged notifications and the broadcast bus
//! - [`classroom`]: the service that locks a session, applies an
//!   operation and publishes its events
//!
//! # Usage
//!
//! ```ignore
//! use classroom_coordination::{Classroom, ScenarioConfig, Viewer};
//!
//! let classroom = Classroom::in_memory(ScenarioConfig::default(), Some(7)).shared();
//! let session_id = classroom.create_session(&serde_json::Value::Null)?;
//! let ana = classroom.join(&session_id, "Ana")?;
//! classroom.advance_phase(&session_id)?;
//! classroom.cast_framework_vote(&session_id, &ana.participant_id, "partnership")?;
//! let view = classroom.session_view(&session_id, Viewer::Instructor)?;
//! ```

#![allow(clippy::uninlined_format_args)]

pub mod analytics;
pub mod assignment;
pub mod briefing;
pub mod classroom;
pub mod config;
pub mod error;
pub mod events;
pub mod negotiation;
pub mod phase;
pub mod state;
pub mod views;
pub mod voting;

// Re-export the service surface
pub use classroom::{require_price, Classroom, JoinReceipt, ReconnectReceipt, SharedClassroom};
pub use config::{ConfigError, LockPricePolicy, MechanismPolicy, RolePolicy, ScenarioConfig};
pub use error::{ClassroomError, ClassroomResult};

// Re-export core types
pub use analytics::{AnalyticsReport, MechanismAdoption, PriceStats};
pub use briefing::{Briefing, Dossier, RoleBriefings};
pub use events::{Audience, ClassroomEvent, EventBus, SessionEvent, SharedEventBus, Viewer};
pub use negotiation::{Mechanism, Pair, PairStatus, TradeChoice};
pub use phase::{Phase, VoteProgress};
pub use state::{ParticipantStatus, Session, SessionId, Side};
pub use views::{ScenarioSummary, SessionView};
pub use voting::{FrameworkChoice, Remedy, VoteResult};
