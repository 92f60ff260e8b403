//! Read-only session snapshots, filtered per viewer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::briefing::RoleBriefings;
use crate::config::{LockPricePolicy, MechanismPolicy, RolePolicy, ScenarioConfig};
use crate::events::Viewer;
use crate::negotiation::{Mechanism, Pair};
use crate::phase::Phase;
use crate::state::{ParticipantId, ParticipantStatus, Session, SessionId, Side, SideCounts};
use crate::voting::{FrameworkChoice, Remedy, Vote, VoteResult};

/// Public facts about a participant. Valuations are never included.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantSummary {
    pub id: ParticipantId,
    pub name: String,
    pub role: Option<Side>,
    pub status: ParticipantStatus,
}

/// Scenario parameters every viewer may see. Role dossiers are left out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSummary {
    pub scenario_name: String,
    pub side_a_label: String,
    pub side_b_label: String,
    pub valuation_min: u64,
    pub valuation_max: u64,
    pub offer_time_limit_seconds: u32,
    pub response_time_limit_seconds: u32,
    pub timed_auction_start_price: u64,
    pub timed_auction_drop_per_second: u64,
    pub role_policy: RolePolicy,
    pub mechanism_policy: MechanismPolicy,
    pub shuffle_pairs: bool,
    pub lock_price_policy: LockPricePolicy,
}

impl From<&ScenarioConfig> for ScenarioSummary {
    fn from(config: &ScenarioConfig) -> Self {
        Self {
            scenario_name: config.scenario_name.clone(),
            side_a_label: config.side_a_label.clone(),
            side_b_label: config.side_b_label.clone(),
            valuation_min: config.valuation_min,
            valuation_max: config.valuation_max,
            offer_time_limit_seconds: config.offer_time_limit_seconds,
            response_time_limit_seconds: config.response_time_limit_seconds,
            timed_auction_start_price: config.timed_auction_start_price,
            timed_auction_drop_per_second: config.timed_auction_drop_per_second,
            role_policy: config.role_policy,
            mechanism_policy: config.mechanism_policy,
            shuffle_pairs: config.shuffle_pairs,
            lock_price_policy: config.lock_price_policy,
        }
    }
}

/// Raw ballots, instructor only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BallotLedgers {
    pub framework: Vec<Vote<FrameworkChoice>>,
    pub remedy: Vec<Vote<Remedy>>,
}

/// Everything a viewer may see about a session at one instant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionView {
    pub session_id: SessionId,
    pub viewer: Viewer,
    pub phase: Phase,
    pub config: ScenarioSummary,
    pub participants: Vec<ParticipantSummary>,
    pub side_counts: SideCounts,
    pub framework_result: VoteResult<FrameworkChoice>,
    pub remedy_result: VoteResult<Remedy>,
    pub pairs: Vec<Pair>,
    pub negotiation_mode: Option<Mechanism>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ledgers: Option<BallotLedgers>,
    /// Both dossiers, instructor only. Students get theirs from the briefing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub briefings: Option<RoleBriefings>,
    /// Lets clients correct for clock skew when running the auction clock.
    pub server_time: DateTime<Utc>,
}

impl SessionView {
    pub fn build(session: &Session, viewer: Viewer, now: DateTime<Utc>) -> Self {
        let instructor = viewer == Viewer::Instructor;
        let ledgers = instructor.then(|| BallotLedgers {
            framework: session.framework_votes.votes().to_vec(),
            remedy: session.remedy_votes.votes().to_vec(),
        });
        let briefings = instructor.then(|| session.config.briefings.clone());

        Self {
            session_id: session.id.clone(),
            viewer,
            phase: session.phase,
            config: ScenarioSummary::from(&session.config),
            participants: session
                .participants
                .iter()
                .map(|p| ParticipantSummary {
                    id: p.id.clone(),
                    name: p.name.clone(),
                    role: p.role,
                    status: p.status,
                })
                .collect(),
            side_counts: session.side_counts(),
            framework_result: session.framework_result.clone(),
            remedy_result: session.remedy_result.clone(),
            pairs: session.pairs.clone(),
            negotiation_mode: session.negotiation_mode,
            ledgers,
            briefings,
            server_time: now,
        }
    }
}
