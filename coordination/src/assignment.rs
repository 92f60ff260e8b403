//! Role and pairing assignment.
//!
//! Roles alternate A, B, A, ... over some ordering of participants, so the
//! two sides never differ by more than one. Pairing zips the two sides
//! index by index; the longer side's surplus stays unpaired as observers.

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, info};

use crate::config::ScenarioConfig;
use crate::negotiation::{Mechanism, Pair, PairMember};
use crate::state::{ParticipantId, Session, Side};

/// Draw a private valuation uniformly from the scenario bounds.
pub fn draw_valuation<R: Rng + ?Sized>(config: &ScenarioConfig, rng: &mut R) -> u64 {
    rng.gen_range(config.valuation_min..=config.valuation_max)
}

/// Give every active participant without a role the next alternating side.
///
/// With `shuffle` the candidates are put in random order first, which
/// randomizes who gets which side without disturbing the balance. Returns
/// the ids that received a role.
pub fn assign_roles<R: Rng + ?Sized>(
    session: &mut Session,
    shuffle: bool,
    rng: &mut R,
) -> Vec<ParticipantId> {
    let mut candidates: Vec<usize> = session
        .participants
        .iter()
        .enumerate()
        .filter(|(_, p)| p.is_active() && p.role.is_none())
        .map(|(idx, _)| idx)
        .collect();
    if shuffle {
        candidates.shuffle(rng);
    }

    let mut assigned = Vec::with_capacity(candidates.len());
    for idx in candidates {
        let side = Side::alternating(session.role_counter);
        let valuation = draw_valuation(&session.config, rng);
        let participant = &mut session.participants[idx];
        participant.role = Some(side);
        participant.valuation = Some(valuation);
        session.role_counter += 1;
        debug!(participant_id = %participant.id, %side, "Role assigned");
        assigned.push(participant.id.clone());
    }

    info!(session_id = %session.id, count = assigned.len(), "Roles assigned");
    assigned
}

/// Zip two sides into `(side A, side B)` tuples.
///
/// With `shuffle` each side is shuffled independently first. Produces
/// exactly `min(|side_a|, |side_b|)` tuples.
pub fn zip_sides<R: Rng + ?Sized>(
    mut side_a: Vec<PairMember>,
    mut side_b: Vec<PairMember>,
    shuffle: bool,
    rng: &mut R,
) -> Vec<(PairMember, PairMember)> {
    if shuffle {
        side_a.shuffle(rng);
        side_b.shuffle(rng);
    }
    side_a.into_iter().zip(side_b).collect()
}

/// Pair up the session's active, role-assigned participants.
///
/// Runs at most once per session; later calls leave the pairs untouched and
/// return `false`. Each pair starts with `mechanism` fixed, or in mechanism
/// selection when `None`.
pub fn form_session_pairs<R: Rng + ?Sized>(
    session: &mut Session,
    mechanism: Option<Mechanism>,
    rng: &mut R,
    now: DateTime<Utc>,
) -> bool {
    if session.pairs_formed {
        debug!(session_id = %session.id, "Pairs already formed");
        return false;
    }

    let (side_a, side_b): (Vec<_>, Vec<_>) = session
        .active_participants()
        .filter_map(|p| {
            p.role.map(|side| PairMember {
                id: p.id.clone(),
                name: p.name.clone(),
                side,
            })
        })
        .partition(|member| member.side == Side::A);

    let observers = side_a.len().abs_diff(side_b.len());
    session.pairs = zip_sides(side_a, side_b, session.config.shuffle_pairs, rng)
        .into_iter()
        .map(|(a, b)| Pair::new(Pair::new_id(), a, b, mechanism, now))
        .collect();
    session.pairs_formed = true;

    info!(
        session_id = %session.id,
        pairs = session.pairs.len(),
        observers,
        "Pairs formed"
    );
    true
}
