//! End-to-end classroom scenarios driven through the public service API
//! and the pair state machine, with seeded randomness throughout.

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use classroom_coordination::negotiation::{MechanismVote, PairMember};
use classroom_coordination::voting::{tally, winning_option};
use classroom_coordination::{
    Classroom, Mechanism, Pair, PairStatus, Phase, Remedy, ScenarioConfig, Side, Viewer,
};

/// An RNG that fails the test if anything draws from it.
struct NoRandomness;

impl RngCore for NoRandomness {
    fn next_u32(&mut self) -> u32 {
        panic!("randomness invoked")
    }

    fn next_u64(&mut self) -> u64 {
        panic!("randomness invoked")
    }

    fn fill_bytes(&mut self, _dest: &mut [u8]) {
        panic!("randomness invoked")
    }

    fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> Result<(), rand::Error> {
        panic!("randomness invoked")
    }
}

fn fresh_pair() -> Pair {
    Pair::new(
        "pair-e2e".to_string(),
        PairMember {
            id: "a".to_string(),
            name: "Ana".to_string(),
            side: Side::A,
        },
        PairMember {
            id: "b".to_string(),
            name: "Ben".to_string(),
            side: Side::B,
        },
        None,
        Utc::now(),
    )
}

fn join_policy() -> serde_json::Value {
    serde_json::json!({ "role_policy": "assign_at_join" })
}

// ── Scenario A: join, alternate, advance to buy-sell ──────────────

#[test]
fn test_scenario_a_two_students_reach_buysell_with_one_pair() {
    let classroom = Classroom::in_memory(ScenarioConfig::default(), Some(1));
    let sid = classroom.create_session(&join_policy()).unwrap();

    let ana = classroom.join(&sid, "Ana").unwrap();
    let ben = classroom.join(&sid, "Ben").unwrap();
    assert_eq!(ana.role, Some(Side::A));
    assert_eq!(ben.role, Some(Side::B));

    for expected in [Phase::Debate, Phase::RemedySelection, Phase::BuySell] {
        assert_eq!(classroom.advance_phase(&sid).unwrap(), expected);
    }

    let view = classroom.session_view(&sid, Viewer::Student).unwrap();
    assert_eq!(view.phase, Phase::BuySell);
    assert_eq!(view.pairs.len(), 1);
    assert_eq!(view.pairs[0].side_a.id, ana.participant_id);
    assert_eq!(view.pairs[0].side_b.id, ben.participant_id);
    assert_eq!(view.pairs[0].status, PairStatus::ChoosingMechanism);
}

// ── Scenario B: shotgun offer, responder sells ─────────────────────

#[test]
fn test_scenario_b_shotgun_sell_makes_offeror_buyer() {
    let classroom = Classroom::in_memory(ScenarioConfig::default(), Some(2));
    let sid = classroom
        .create_session(&serde_json::json!({
            "role_policy": "assign_at_join",
            "mechanism_policy": "session_remedy",
        }))
        .unwrap();
    let ana = classroom.join(&sid, "Ana").unwrap().participant_id;
    let ben = classroom.join(&sid, "Ben").unwrap().participant_id;
    classroom.advance_phase(&sid).unwrap();
    classroom.advance_phase(&sid).unwrap();
    classroom.cast_remedy_vote(&sid, &ana, "shotgun").unwrap();
    classroom.cast_remedy_vote(&sid, &ben, "shotgun").unwrap();
    classroom.advance_phase(&sid).unwrap();

    let pair_id = classroom.session_view(&sid, Viewer::Student).unwrap().pairs[0]
        .id
        .clone();

    let offered = classroom.make_offer(&sid, &pair_id, &ana, 4_000_000).unwrap();
    assert_eq!(offered.status, PairStatus::Offered);

    let done = classroom.respond(&sid, &pair_id, &ben, "sell").unwrap();
    assert_eq!(done.status, PairStatus::Complete);
    let settlement = done.settlement.clone().unwrap();
    assert_eq!(settlement.final_price, 4_000_000);
    assert_eq!(settlement.buyer_id, ana);
    assert_eq!(settlement.seller_id, ben);

    // completed pairs refuse further calls and keep their result
    let err = classroom.respond(&sid, &pair_id, &ben, "buy").unwrap_err();
    assert_eq!(err.code(), "INVALID_STATE");
    let err = classroom.make_offer(&sid, &pair_id, &ana, 1).unwrap_err();
    assert_eq!(err.code(), "INVALID_STATE");
    let after = classroom.session_view(&sid, Viewer::Student).unwrap().pairs[0].clone();
    assert_eq!(after.settlement, Some(settlement));

    let report = classroom.analytics(&sid).unwrap();
    assert_eq!(report.winning_remedy, Some(Remedy::Shotgun));
    assert_eq!(report.completed_pairs, 1);
    assert_eq!(
        report.pairs[0].outcome.as_deref(),
        Some("Ana bought Ben's shares at $4,000,000")
    );
}

// ── Scenario C: agreement needs no randomness ──────────────────────

#[test]
fn test_scenario_c_matching_preferences_are_adopted() {
    for mechanism in Mechanism::ALL {
        let mut pair = fresh_pair();
        let mut rng = NoRandomness;

        pair.vote_mechanism("a", mechanism, &mut rng, Utc::now())
            .unwrap();
        let outcome = pair
            .vote_mechanism("b", mechanism, &mut rng, Utc::now())
            .unwrap();

        assert_eq!(
            outcome,
            MechanismVote::Decided {
                mechanism,
                agreed: true
            }
        );
        assert_eq!(pair.mechanism, Some(mechanism));
        assert_eq!(pair.mechanism_agreed, Some(true));
    }
}

// ── Scenario D: disagreement is a fair coin ────────────────────────

#[test]
fn test_scenario_d_disagreement_is_uniform() {
    let mut rng = StdRng::seed_from_u64(2024);
    let trials = 1_000;
    let mut shotgun = 0;

    for _ in 0..trials {
        let mut pair = fresh_pair();
        pair.vote_mechanism("a", Mechanism::Shotgun, &mut rng, Utc::now())
            .unwrap();
        pair.vote_mechanism("b", Mechanism::TimedAuction, &mut rng, Utc::now())
            .unwrap();

        assert_eq!(pair.mechanism_agreed, Some(false));
        if pair.mechanism == Some(Mechanism::Shotgun) {
            shotgun += 1;
        }
    }

    // 50/50 over 1,000 trials: more than 4 standard deviations of slack
    assert!((430..=570).contains(&shotgun), "shotgun chosen {shotgun} times");
}

// ── Ballots ────────────────────────────────────────────────────────

#[test]
fn test_plurality_tie_goes_to_first_declared_option() {
    let counts = tally(
        [
            Remedy::Shotgun,
            Remedy::Buyout,
            Remedy::Shotgun,
            Remedy::Buyout,
            Remedy::TimedAuction,
        ],
        &[Remedy::Buyout, Remedy::Shotgun, Remedy::TimedAuction],
    );
    assert_eq!(winning_option(&counts), Some(Remedy::Buyout));
    assert_eq!(counts.total(), 5);
}

#[test]
fn test_advance_without_reveal_freezes_remedy() {
    let classroom = Classroom::in_memory(ScenarioConfig::default(), Some(3));
    let sid = classroom.create_session(&join_policy()).unwrap();
    let ids: Vec<_> = ["Ana", "Ben", "Cleo"]
        .iter()
        .map(|n| classroom.join(&sid, n).unwrap().participant_id)
        .collect();
    classroom.advance_phase(&sid).unwrap();
    classroom.advance_phase(&sid).unwrap();
    classroom.cast_remedy_vote(&sid, &ids[0], "timed_auction").unwrap();
    classroom.cast_remedy_vote(&sid, &ids[1], "timed_auction").unwrap();
    classroom.cast_remedy_vote(&sid, &ids[2], "liquidation").unwrap();
    classroom.advance_phase(&sid).unwrap();

    let view = classroom.session_view(&sid, Viewer::Student).unwrap();
    assert!(view.remedy_result.revealed);
    assert_eq!(view.remedy_result.winner, Some(Remedy::TimedAuction));
    assert_eq!(view.negotiation_mode, Some(Mechanism::TimedAuction));
    // one pair, one observer
    assert_eq!(view.pairs.len(), 1);
}

#[test]
fn test_complete_session_cannot_advance() {
    let classroom = Classroom::in_memory(ScenarioConfig::default(), Some(4));
    let sid = classroom.create_session(&serde_json::Value::Null).unwrap();
    for _ in 0..4 {
        classroom.advance_phase(&sid).unwrap();
    }
    let err = classroom.advance_phase(&sid).unwrap_err();
    assert_eq!(err.code(), "INVALID_TRANSITION");
}

// ── Briefings ──────────────────────────────────────────────────────

#[test]
fn test_briefings_stay_private_after_deferred_assignment() {
    let classroom = Classroom::in_memory(ScenarioConfig::default(), Some(5));
    let sid = classroom.create_session(&serde_json::Value::Null).unwrap();
    let ana = classroom.join(&sid, "Ana").unwrap().participant_id;
    let ben = classroom.join(&sid, "Ben").unwrap().participant_id;

    let err = classroom.briefing(&sid, &ana).unwrap_err();
    assert_eq!(err.code(), "INVALID_PHASE");

    for _ in 0..3 {
        classroom.advance_phase(&sid).unwrap();
    }
    let a = classroom.briefing(&sid, &ana).unwrap();
    let b = classroom.briefing(&sid, &ben).unwrap();
    assert_ne!(a.side, b.side);
    assert_eq!(a.partner.as_ref().unwrap().participant_id, ben);
    assert_eq!(b.partner.as_ref().unwrap().participant_id, ana);

    let a_json = serde_json::to_string(&a).unwrap();
    for secret in &b.dossier.secrets {
        assert!(!a_json.contains(&secret.text));
    }
}
