//! Event types for classroom notifications
//!
//! One closed enum covers every push notification. Each event travels in a
//! [`SessionEvent`] envelope naming its session and audience.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::negotiation::{Mechanism, PairMember, TradeChoice};
use crate::phase::Phase;
use crate::state::{PairId, ParticipantId, ParticipantStatus, SessionId, Side};
use crate::voting::{FrameworkChoice, Remedy, Tally, VoteResult};

/// Who receives an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Audience {
    /// Every student in the session.
    Students,
    /// The instructor only.
    Instructor,
    /// Students and instructor.
    Everyone,
}

/// The kind of connection receiving events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Viewer {
    Instructor,
    Student,
}

impl Audience {
    pub fn reaches(self, viewer: Viewer) -> bool {
        matches!(
            (self, viewer),
            (Audience::Everyone, _)
                | (Audience::Instructor, Viewer::Instructor)
                | (Audience::Students, Viewer::Student)
        )
    }
}

/// Pair membership announced when pairs are formed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairAssignment {
    pub pair_id: PairId,
    pub side_a: PairMember,
    pub side_b: PairMember,
    pub mechanism: Option<Mechanism>,
}

/// All classroom events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClassroomEvent {
    /// The session moved to a new phase
    PhaseChanged {
        previous: Phase,
        phase: Phase,
        timestamp: DateTime<Utc>,
    },

    /// Live framework ballot counts
    FrameworkVoteUpdated {
        counts: Tally<FrameworkChoice>,
        votes_submitted: usize,
        votes_expected: usize,
        timestamp: DateTime<Utc>,
    },

    /// Live remedy ballot counts
    RemedyVoteUpdated {
        counts: Tally<Remedy>,
        votes_submitted: usize,
        votes_expected: usize,
        timestamp: DateTime<Utc>,
    },

    FrameworkRevealed {
        result: VoteResult<FrameworkChoice>,
        timestamp: DateTime<Utc>,
    },

    RemedyRevealed {
        result: VoteResult<Remedy>,
        negotiation_mode: Mechanism,
        timestamp: DateTime<Utc>,
    },

    ParticipantJoined {
        participant_id: ParticipantId,
        name: String,
        role: Option<Side>,
        participant_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// A participant disconnected or came back
    ParticipantStatusChanged {
        participant_id: ParticipantId,
        status: ParticipantStatus,
        timestamp: DateTime<Utc>,
    },

    PairsFormed {
        pairs: Vec<PairAssignment>,
        /// Role-assigned participants left without a partner
        observers: usize,
        timestamp: DateTime<Utc>,
    },

    /// One side voted; the partner is still deciding
    MechanismVoteCast {
        pair_id: PairId,
        participant_id: ParticipantId,
        side: Side,
        timestamp: DateTime<Utc>,
    },

    MechanismDecided {
        pair_id: PairId,
        mechanism: Mechanism,
        agreed: bool,
        timestamp: DateTime<Utc>,
    },

    OfferMade {
        pair_id: PairId,
        offeror_id: ParticipantId,
        price: u64,
        timestamp: DateTime<Utc>,
    },

    /// One side is ready for the timed auction
    AuctionReady {
        pair_id: PairId,
        participant_id: ParticipantId,
        side: Side,
        timestamp: DateTime<Utc>,
    },

    /// Both sides ready; every observer derives the price from these values
    AuctionStarted {
        pair_id: PairId,
        start_time: DateTime<Utc>,
        start_price: u64,
        drop_per_second: u64,
        timestamp: DateTime<Utc>,
    },

    PriceLocked {
        pair_id: PairId,
        locked_by: ParticipantId,
        price: u64,
        timestamp: DateTime<Utc>,
    },

    NegotiationComplete {
        pair_id: PairId,
        final_price: u64,
        choice: TradeChoice,
        buyer_id: ParticipantId,
        seller_id: ParticipantId,
        outcome: String,
        timestamp: DateTime<Utc>,
    },
}

impl ClassroomEvent {
    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::PhaseChanged { .. } => "phase_changed",
            Self::FrameworkVoteUpdated { .. } => "framework_vote_updated",
            Self::RemedyVoteUpdated { .. } => "remedy_vote_updated",
            Self::FrameworkRevealed { .. } => "framework_revealed",
            Self::RemedyRevealed { .. } => "remedy_revealed",
            Self::ParticipantJoined { .. } => "participant_joined",
            Self::ParticipantStatusChanged { .. } => "participant_status_changed",
            Self::PairsFormed { .. } => "pairs_formed",
            Self::MechanismVoteCast { .. } => "mechanism_vote_cast",
            Self::MechanismDecided { .. } => "mechanism_decided",
            Self::OfferMade { .. } => "offer_made",
            Self::AuctionReady { .. } => "auction_ready",
            Self::AuctionStarted { .. } => "auction_started",
            Self::PriceLocked { .. } => "price_locked",
            Self::NegotiationComplete { .. } => "negotiation_complete",
        }
    }

    /// Get the timestamp of the event
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::PhaseChanged { timestamp, .. }
            | Self::FrameworkVoteUpdated { timestamp, .. }
            | Self::RemedyVoteUpdated { timestamp, .. }
            | Self::FrameworkRevealed { timestamp, .. }
            | Self::RemedyRevealed { timestamp, .. }
            | Self::ParticipantJoined { timestamp, .. }
            | Self::ParticipantStatusChanged { timestamp, .. }
            | Self::PairsFormed { timestamp, .. }
            | Self::MechanismVoteCast { timestamp, .. }
            | Self::MechanismDecided { timestamp, .. }
            | Self::OfferMade { timestamp, .. }
            | Self::AuctionReady { timestamp, .. }
            | Self::AuctionStarted { timestamp, .. }
            | Self::PriceLocked { timestamp, .. }
            | Self::NegotiationComplete { timestamp, .. } => *timestamp,
        }
    }

    /// Get the pair ID if this event relates to one pair
    pub fn pair_id(&self) -> Option<&str> {
        match self {
            Self::MechanismVoteCast { pair_id, .. }
            | Self::MechanismDecided { pair_id, .. }
            | Self::OfferMade { pair_id, .. }
            | Self::AuctionReady { pair_id, .. }
            | Self::AuctionStarted { pair_id, .. }
            | Self::PriceLocked { pair_id, .. }
            | Self::NegotiationComplete { pair_id, .. } => Some(pair_id),
            _ => None,
        }
    }

    /// Audience this event is addressed to.
    ///
    /// Live ballot counts stay with the instructor until a reveal; everything
    /// else is session-wide and pair events are filtered by pair id.
    pub fn audience(&self) -> Audience {
        match self {
            Self::FrameworkVoteUpdated { .. } | Self::RemedyVoteUpdated { .. } => {
                Audience::Instructor
            }
            _ => Audience::Everyone,
        }
    }
}

/// An event addressed to one session's viewers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEvent {
    pub session_id: SessionId,
    pub audience: Audience,
    pub event: ClassroomEvent,
}

impl SessionEvent {
    /// Wrap `event` with its default audience.
    pub fn new(session_id: impl Into<SessionId>, event: ClassroomEvent) -> Self {
        Self {
            session_id: session_id.into(),
            audience: event.audience(),
            event,
        }
    }

    pub fn event_type(&self) -> &'static str {
        self.event.event_type()
    }
}
