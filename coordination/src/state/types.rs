//! Session data model.
//!
//! A [`Session`] is the only root of mutable state. Every mutation goes
//! through one session found by id; nothing here is shared across sessions.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::assignment::draw_valuation;
use crate::config::{RolePolicy, ScenarioConfig};
use crate::error::{ClassroomError, ClassroomResult};
use crate::negotiation::{Mechanism, Pair};
use crate::phase::{Phase, PhaseTransition};
use crate::voting::{FrameworkChoice, Remedy, VoteLedger, VoteResult};

/// Unique identifier for sessions
pub type SessionId = String;

/// Unique identifier for participants within a session
pub type ParticipantId = String;

/// Unique identifier for pairs within a session
pub type PairId = String;

/// One of the two opposing roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Makes the immediate offer.
    #[serde(rename = "side_a")]
    A,
    #[serde(rename = "side_b")]
    B,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }

    /// Side for the `index`-th assignment in an alternating sequence.
    pub fn alternating(index: usize) -> Self {
        if index % 2 == 0 {
            Side::A
        } else {
            Side::B
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::A => write!(f, "side_a"),
            Side::B => write!(f, "side_b"),
        }
    }
}

/// Liveness of a participant's connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantStatus {
    Active,
    Disconnected,
}

/// A student in the session. Never removed, only marked disconnected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    /// Unset until roles are assigned.
    pub role: Option<Side>,
    pub status: ParticipantStatus,
    /// Private valuation drawn with the role.
    pub valuation: Option<u64>,
    pub joined_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

impl Participant {
    pub fn new(name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            role: None,
            status: ParticipantStatus::Active,
            valuation: None,
            joined_at: now,
            last_seen: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == ParticipantStatus::Active
    }
}

/// Head count per side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideCounts {
    pub side_a: usize,
    pub side_b: usize,
    pub unassigned: usize,
}

/// A classroom session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub config: ScenarioConfig,
    pub phase: Phase,
    pub participants: Vec<Participant>,
    /// Roles handed out so far; drives the alternating sequence.
    pub role_counter: usize,
    pub framework_votes: VoteLedger<FrameworkChoice>,
    pub remedy_votes: VoteLedger<Remedy>,
    pub framework_result: VoteResult<FrameworkChoice>,
    pub remedy_result: VoteResult<Remedy>,
    pub pairs: Vec<Pair>,
    /// Set once pairing has run; pairing never runs twice.
    pub pairs_formed: bool,
    /// Mechanism derived from the winning remedy, once known.
    pub negotiation_mode: Option<Mechanism>,
    pub transitions: Vec<PhaseTransition>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(config: ScenarioConfig) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), config, Utc::now())
    }

    pub fn with_id(id: impl Into<SessionId>, config: ScenarioConfig, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            config,
            phase: Phase::Lobby,
            participants: Vec::new(),
            role_counter: 0,
            framework_votes: VoteLedger::new(),
            remedy_votes: VoteLedger::new(),
            framework_result: VoteResult::hidden(),
            remedy_result: VoteResult::hidden(),
            pairs: Vec::new(),
            pairs_formed: false,
            negotiation_mode: None,
            transitions: Vec::new(),
            created_at: now,
        }
    }

    /// Add a participant, assigning a role immediately under [`RolePolicy::AssignAtJoin`].
    pub fn add_participant<R: Rng + ?Sized>(
        &mut self,
        name: &str,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> ParticipantId {
        let mut participant = Participant::new(name, now);
        if self.config.role_policy == RolePolicy::AssignAtJoin {
            participant.role = Some(Side::alternating(self.role_counter));
            participant.valuation = Some(draw_valuation(&self.config, rng));
            self.role_counter += 1;
        }
        let id = participant.id.clone();
        self.participants.push(participant);
        id
    }

    pub fn participant(&self, participant_id: &str) -> ClassroomResult<&Participant> {
        self.participants
            .iter()
            .find(|p| p.id == participant_id)
            .ok_or_else(|| ClassroomError::participant_not_found(participant_id))
    }

    pub fn participant_mut(&mut self, participant_id: &str) -> ClassroomResult<&mut Participant> {
        self.participants
            .iter_mut()
            .find(|p| p.id == participant_id)
            .ok_or_else(|| ClassroomError::participant_not_found(participant_id))
    }

    pub fn pair(&self, pair_id: &str) -> ClassroomResult<&Pair> {
        self.pairs
            .iter()
            .find(|p| p.id == pair_id)
            .ok_or_else(|| ClassroomError::pair_not_found(pair_id))
    }

    pub fn pair_mut(&mut self, pair_id: &str) -> ClassroomResult<&mut Pair> {
        self.pairs
            .iter_mut()
            .find(|p| p.id == pair_id)
            .ok_or_else(|| ClassroomError::pair_not_found(pair_id))
    }

    /// The pair `participant_id` belongs to, if any.
    pub fn pair_of(&self, participant_id: &str) -> Option<&Pair> {
        self.pairs.iter().find(|p| p.contains(participant_id))
    }

    pub fn active_participants(&self) -> impl Iterator<Item = &Participant> {
        self.participants.iter().filter(|p| p.is_active())
    }

    pub fn side_counts(&self) -> SideCounts {
        self.participants
            .iter()
            .fold(SideCounts::default(), |mut counts, p| {
                match p.role {
                    Some(Side::A) => counts.side_a += 1,
                    Some(Side::B) => counts.side_b += 1,
                    None => counts.unassigned += 1,
                }
                counts
            })
    }

    /// Fail with `InvalidPhase` unless the session is in `expected`.
    pub fn require_phase(&self, expected: Phase, operation: &'static str) -> ClassroomResult<()> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(ClassroomError::InvalidPhase {
                operation,
                expected: expected.to_string(),
                actual: self.phase.to_string(),
            })
        }
    }
}
