//! Phase controller.
//!
//! Sessions move forward through `Lobby → Debate → RemedySelection →
//! BuySell → Complete` one step at a time. Each entry runs its side effects
//! before the new phase becomes visible.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::assignment::{assign_roles, form_session_pairs};
use crate::config::{MechanismPolicy, RolePolicy};
use crate::error::{ClassroomError, ClassroomResult};
use crate::negotiation::Mechanism;
use crate::state::{ParticipantId, Session};
use crate::voting::{FrameworkChoice, Remedy, Tally, VoteOption, VoteResult};

/// Session phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    #[serde(rename = "lobby")]
    Lobby,
    /// Framework ballot.
    #[serde(rename = "phase_1_debate")]
    Debate,
    /// Remedy ballot.
    #[serde(rename = "phase_2_remedy")]
    RemedySelection,
    /// Paired negotiation.
    #[serde(rename = "phase_3_buysell")]
    BuySell,
    #[serde(rename = "complete")]
    Complete,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete)
    }

    /// The single phase reachable from this one.
    pub fn next(self) -> Option<Phase> {
        match self {
            Self::Lobby => Some(Self::Debate),
            Self::Debate => Some(Self::RemedySelection),
            Self::RemedySelection => Some(Self::BuySell),
            Self::BuySell => Some(Self::Complete),
            Self::Complete => None,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lobby => write!(f, "lobby"),
            Self::Debate => write!(f, "phase_1_debate"),
            Self::RemedySelection => write!(f, "phase_2_remedy"),
            Self::BuySell => write!(f, "phase_3_buysell"),
            Self::Complete => write!(f, "complete"),
        }
    }
}

/// A phase transition record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseTransition {
    pub from: Phase,
    pub to: Phase,
    pub timestamp: DateTime<Utc>,
}

/// Side effects of one `advance`.
#[derive(Debug, Clone, Default)]
pub struct AdvanceOutcome {
    /// The remedy result was frozen by this advance.
    pub remedy_revealed: bool,
    pub roles_assigned: Vec<ParticipantId>,
    pub pairs_formed: bool,
}

/// Ballot progress after a vote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "O: VoteOption")]
pub struct VoteProgress<O: VoteOption> {
    pub counts: Tally<O>,
    pub votes_submitted: usize,
    pub votes_expected: usize,
    /// The participant had already voted and was overwritten.
    pub replaced: bool,
}

/// Negotiation mechanism a winning remedy stands for, if any.
pub fn remedy_to_mechanism(remedy: Remedy) -> Option<Mechanism> {
    match remedy {
        Remedy::Shotgun => Some(Mechanism::Shotgun),
        Remedy::TimedAuction => Some(Mechanism::TimedAuction),
        Remedy::Buyout | Remedy::Liquidation => None,
    }
}

/// Session negotiation mode for a remedy winner; immediate offer unless the
/// winner names another mechanism.
pub fn negotiation_mode_for(winner: Option<Remedy>) -> Mechanism {
    winner
        .and_then(remedy_to_mechanism)
        .unwrap_or(Mechanism::Shotgun)
}

/// Move the session one phase forward.
pub fn advance<R: Rng + ?Sized>(
    session: &mut Session,
    rng: &mut R,
    now: DateTime<Utc>,
) -> ClassroomResult<AdvanceOutcome> {
    let from = session.phase;
    let to = from.next().ok_or_else(|| ClassroomError::InvalidTransition {
        from: from.to_string(),
        reason: "session is already complete".to_string(),
    })?;

    let mut outcome = AdvanceOutcome::default();
    match to {
        Phase::Debate => {
            session.framework_votes.clear();
            session.framework_result = VoteResult::hidden();
        }
        Phase::RemedySelection => {
            session.remedy_votes.clear();
            session.remedy_result = VoteResult::hidden();
        }
        Phase::BuySell => {
            if !session.remedy_result.revealed {
                freeze_remedy(session, now);
                outcome.remedy_revealed = true;
            }
            if session.config.role_policy == RolePolicy::AssignAtBuySell {
                outcome.roles_assigned = assign_roles(session, true, rng);
            }
            let mechanism = initial_mechanism(session);
            outcome.pairs_formed = form_session_pairs(session, mechanism, rng, now);
        }
        Phase::Lobby | Phase::Complete => {}
    }

    session.transitions.push(PhaseTransition {
        from,
        to,
        timestamp: now,
    });
    session.phase = to;
    info!(session_id = %session.id, %from, %to, "Phase advanced");
    Ok(outcome)
}

/// Record a framework vote. Only accepted during the debate phase.
pub fn cast_framework_vote(
    session: &mut Session,
    participant_id: &str,
    choice: FrameworkChoice,
    now: DateTime<Utc>,
) -> ClassroomResult<VoteProgress<FrameworkChoice>> {
    session.require_phase(Phase::Debate, "framework vote")?;
    let name = session.participant(participant_id)?.name.clone();
    let replaced = session
        .framework_votes
        .record(participant_id, &name, choice, now);
    debug!(session_id = %session.id, participant_id, %choice, replaced, "Framework vote");
    Ok(VoteProgress {
        counts: session.framework_votes.counts(),
        votes_submitted: session.framework_votes.len(),
        votes_expected: session.participants.len(),
        replaced,
    })
}

/// Record a remedy vote. Only accepted during remedy selection.
pub fn cast_remedy_vote(
    session: &mut Session,
    participant_id: &str,
    remedy: Remedy,
    now: DateTime<Utc>,
) -> ClassroomResult<VoteProgress<Remedy>> {
    session.require_phase(Phase::RemedySelection, "remedy vote")?;
    let name = session.participant(participant_id)?.name.clone();
    let replaced = session.remedy_votes.record(participant_id, &name, remedy, now);
    debug!(session_id = %session.id, participant_id, %remedy, replaced, "Remedy vote");
    Ok(VoteProgress {
        counts: session.remedy_votes.counts(),
        votes_submitted: session.remedy_votes.len(),
        votes_expected: session.participants.len(),
        replaced,
    })
}

/// Freeze and expose the framework ballot.
pub fn reveal_framework(
    session: &mut Session,
    now: DateTime<Utc>,
) -> ClassroomResult<VoteResult<FrameworkChoice>> {
    session.require_phase(Phase::Debate, "framework reveal")?;
    session.framework_result = VoteResult::freeze(&session.framework_votes, false, now);
    info!(
        session_id = %session.id,
        votes = session.framework_votes.len(),
        "Framework result revealed"
    );
    Ok(session.framework_result.clone())
}

/// Freeze and expose the remedy ballot, fixing the negotiation mode.
pub fn reveal_remedy(session: &mut Session, now: DateTime<Utc>) -> ClassroomResult<VoteResult<Remedy>> {
    session.require_phase(Phase::RemedySelection, "remedy reveal")?;
    freeze_remedy(session, now);
    Ok(session.remedy_result.clone())
}

fn freeze_remedy(session: &mut Session, now: DateTime<Utc>) {
    session.remedy_result = VoteResult::freeze(&session.remedy_votes, true, now);
    let mode = negotiation_mode_for(session.remedy_result.winner);
    session.negotiation_mode = Some(mode);
    info!(
        session_id = %session.id,
        winner = ?session.remedy_result.winner,
        mode = %mode,
        "Remedy result revealed"
    );
}

/// Explicit pairing trigger, gated to the buy-sell phase.
///
/// Assigns the alternating roles first when nobody has one yet. Returns
/// `false` when pairs already existed and nothing changed.
pub fn form_pairs<R: Rng + ?Sized>(
    session: &mut Session,
    rng: &mut R,
    now: DateTime<Utc>,
) -> ClassroomResult<bool> {
    session.require_phase(Phase::BuySell, "form pairs")?;
    if session.pairs_formed {
        return Ok(false);
    }
    if session.participants.iter().all(|p| p.role.is_none()) {
        assign_roles(session, false, rng);
    }
    let mechanism = initial_mechanism(session);
    Ok(form_session_pairs(session, mechanism, rng, now))
}

fn initial_mechanism(session: &Session) -> Option<Mechanism> {
    match session.config.mechanism_policy {
        MechanismPolicy::PairVote => None,
        MechanismPolicy::SessionRemedy => {
            Some(session.negotiation_mode.unwrap_or(Mechanism::Shotgun))
        }
    }
}
