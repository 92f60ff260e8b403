//! Classroom service - the single entry point for every session operation
//!
//! Each call locks one session, runs the phase controller or a pair state
//! machine against it, and only then publishes the resulting events. Calls
//! on the same session are serialized; different sessions never contend
//! except for the brief draw from the shared random source.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::analytics::AnalyticsReport;
use crate::briefing::{briefing_for, Briefing};
use crate::config::ScenarioConfig;
use crate::error::{ClassroomError, ClassroomResult};
use crate::events::{
    ClassroomEvent, EventBus, EventFilter, FilteredReceiver, PairAssignment,
    SessionEvent, SharedEventBus, Viewer,
};
use crate::negotiation::{Mechanism, MechanismVote, Pair, ReadyOutcome, TradeChoice};
use crate::phase::{self, Phase, VoteProgress};
use crate::state::{
    lock_session, InMemorySessionStore, PairId, ParticipantId, ParticipantStatus, Session,
    SessionId, SharedSessionStore, Side, StoreError,
};
use crate::views::SessionView;
use crate::voting::{FrameworkChoice, Remedy, VoteOption, VoteResult};

/// Shared reference to Classroom
pub type SharedClassroom = Arc<Classroom>;

/// Returned to a participant on join.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinReceipt {
    pub session_id: SessionId,
    pub participant_id: ParticipantId,
    pub name: String,
    pub role: Option<Side>,
    pub phase: Phase,
}

/// Returned to a participant on reconnect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectReceipt {
    pub session_id: SessionId,
    pub participant_id: ParticipantId,
    pub name: String,
    pub role: Option<Side>,
    pub phase: Phase,
    pub pair_id: Option<PairId>,
}

/// Validate a wire price: present and strictly positive.
pub fn require_price(price: Option<i64>) -> ClassroomResult<u64> {
    let price = price.ok_or_else(|| ClassroomError::Validation("price is required".to_string()))?;
    u64::try_from(price)
        .ok()
        .filter(|&p| p > 0)
        .ok_or_else(|| ClassroomError::Validation("price must be positive".to_string()))
}

/// Session registry plus notifier.
pub struct Classroom {
    store: SharedSessionStore,
    event_bus: SharedEventBus,
    defaults: ScenarioConfig,
    rng: Mutex<StdRng>,
}

impl Classroom {
    pub fn new(
        store: SharedSessionStore,
        event_bus: SharedEventBus,
        defaults: ScenarioConfig,
        rng: StdRng,
    ) -> Self {
        Self {
            store,
            event_bus,
            defaults,
            rng: Mutex::new(rng),
        }
    }

    /// In-memory classroom; a fixed `seed` makes every random draw reproducible.
    pub fn in_memory(defaults: ScenarioConfig, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::new(
            InMemorySessionStore::new().shared(),
            EventBus::new().shared(),
            defaults,
            rng,
        )
    }

    /// Create a shared reference to this classroom
    pub fn shared(self) -> SharedClassroom {
        Arc::new(self)
    }

    pub fn event_bus(&self) -> &SharedEventBus {
        &self.event_bus
    }

    pub fn defaults(&self) -> &ScenarioConfig {
        &self.defaults
    }

    /// Subscribe to one session's events as seen by `viewer`.
    pub fn subscribe(&self, session_id: &str, viewer: Viewer) -> FilteredReceiver {
        self.event_bus
            .subscribe_filtered(EventFilter::for_viewer(session_id, viewer))
    }

    /// Subscribe as one student: session-wide events plus their own pair's.
    ///
    /// Subscribes before reading the session, so a pairing that lands in
    /// between still reaches the receiver as `pairs_formed`.
    pub fn subscribe_participant(
        &self,
        session_id: &str,
        participant_id: &str,
    ) -> ClassroomResult<FilteredReceiver> {
        let filter = EventFilter::for_viewer(session_id, Viewer::Student).member(participant_id);
        let receiver = self.event_bus.subscribe_filtered(filter);
        let pair_id = self.read_session(session_id, |session| {
            session.participant(participant_id)?;
            Ok(session.pair_of(participant_id).map(|pair| pair.id.clone()))
        })?;
        Ok(match pair_id {
            Some(pair_id) => receiver.narrow_to_pair(&pair_id),
            None => receiver,
        })
    }

    /// Run `op` against one locked session, then publish what it queued.
    ///
    /// Nothing is published when `op` fails.
    fn with_session<T>(
        &self,
        session_id: &str,
        op: impl FnOnce(&mut Session, &mut StdRng, &mut Vec<ClassroomEvent>) -> ClassroomResult<T>,
    ) -> ClassroomResult<T> {
        let shared = self
            .store
            .get(session_id)?
            .ok_or_else(|| ClassroomError::session_not_found(session_id))?;

        let mut outbox = Vec::new();
        let result = {
            let mut session = lock_session(&shared)?;
            let mut rng = self.rng.lock().map_err(|_| StoreError::LockPoisoned)?;
            op(&mut *session, &mut *rng, &mut outbox)
        };

        match &result {
            Ok(_) => {
                for event in outbox {
                    self.event_bus.publish(SessionEvent::new(session_id, event));
                }
            }
            Err(e) => warn!(session_id, code = e.code(), error = %e, "Operation rejected"),
        }
        result
    }

    /// Read-only access to one session.
    fn read_session<T>(
        &self,
        session_id: &str,
        op: impl FnOnce(&Session) -> ClassroomResult<T>,
    ) -> ClassroomResult<T> {
        let shared = self
            .store
            .get(session_id)?
            .ok_or_else(|| ClassroomError::session_not_found(session_id))?;
        let session = lock_session(&shared)?;
        op(&session)
    }

    // =========================================================================
    // Session lifecycle
    // =========================================================================

    /// Create a session from the defaults with `overrides` merged on top.
    pub fn create_session(&self, overrides: &serde_json::Value) -> ClassroomResult<SessionId> {
        let config = self
            .defaults
            .with_overrides(overrides)
            .map_err(|e| ClassroomError::Validation(e.to_string()))?;
        let session = Session::new(config);
        let session_id = session.id.clone();
        self.store.insert(session)?;
        info!(session_id = %session_id, "Session created");
        Ok(session_id)
    }

    pub fn session_view(&self, session_id: &str, viewer: Viewer) -> ClassroomResult<SessionView> {
        self.read_session(session_id, |session| {
            Ok(SessionView::build(session, viewer, Utc::now()))
        })
    }

    pub fn join(&self, session_id: &str, name: &str) -> ClassroomResult<JoinReceipt> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ClassroomError::Validation("name is required".to_string()));
        }
        self.with_session(session_id, |session, rng, events| {
            let now = Utc::now();
            let participant_id = session.add_participant(name, now, rng);
            let participant = session.participant(&participant_id)?;
            let receipt = JoinReceipt {
                session_id: session.id.clone(),
                participant_id: participant_id.clone(),
                name: participant.name.clone(),
                role: participant.role,
                phase: session.phase,
            };
            events.push(ClassroomEvent::ParticipantJoined {
                participant_id: participant_id.clone(),
                name: receipt.name.clone(),
                role: receipt.role,
                participant_count: session.participants.len(),
                timestamp: now,
            });
            info!(session_id, participant_id = %participant_id, name, role = ?receipt.role, "Participant joined");
            Ok(receipt)
        })
    }

    /// Confirm identity and mark the participant active again.
    pub fn reconnect(&self, session_id: &str, participant_id: &str) -> ClassroomResult<ReconnectReceipt> {
        self.with_session(session_id, |session, _, events| {
            let now = Utc::now();
            let phase = session.phase;
            let pair_id = session.pair_of(participant_id).map(|p| p.id.clone());
            let participant = session.participant_mut(participant_id)?;
            let was_disconnected = participant.status == ParticipantStatus::Disconnected;
            participant.status = ParticipantStatus::Active;
            participant.last_seen = now;

            if was_disconnected {
                events.push(ClassroomEvent::ParticipantStatusChanged {
                    participant_id: participant_id.to_string(),
                    status: ParticipantStatus::Active,
                    timestamp: now,
                });
            }
            info!(session_id, participant_id, "Participant reconnected");
            Ok(ReconnectReceipt {
                session_id: session_id.to_string(),
                participant_id: participant.id.clone(),
                name: participant.name.clone(),
                role: participant.role,
                phase,
                pair_id,
            })
        })
    }

    /// Mark a participant disconnected. Their role and pair are kept.
    pub fn disconnect(&self, session_id: &str, participant_id: &str) -> ClassroomResult<()> {
        self.with_session(session_id, |session, _, events| {
            let now = Utc::now();
            let participant = session.participant_mut(participant_id)?;
            if participant.status == ParticipantStatus::Disconnected {
                return Ok(());
            }
            participant.status = ParticipantStatus::Disconnected;
            participant.last_seen = now;
            events.push(ClassroomEvent::ParticipantStatusChanged {
                participant_id: participant_id.to_string(),
                status: ParticipantStatus::Disconnected,
                timestamp: now,
            });
            info!(session_id, participant_id, "Participant disconnected");
            Ok(())
        })
    }

    // =========================================================================
    // Ballots and phases
    // =========================================================================

    pub fn cast_framework_vote(
        &self,
        session_id: &str,
        participant_id: &str,
        choice: &str,
    ) -> ClassroomResult<VoteProgress<FrameworkChoice>> {
        let choice = FrameworkChoice::parse(choice)?;
        self.with_session(session_id, |session, _, events| {
            let now = Utc::now();
            let progress = phase::cast_framework_vote(session, participant_id, choice, now)?;
            events.push(ClassroomEvent::FrameworkVoteUpdated {
                counts: progress.counts.clone(),
                votes_submitted: progress.votes_submitted,
                votes_expected: progress.votes_expected,
                timestamp: now,
            });
            Ok(progress)
        })
    }

    pub fn cast_remedy_vote(
        &self,
        session_id: &str,
        participant_id: &str,
        remedy: &str,
    ) -> ClassroomResult<VoteProgress<Remedy>> {
        let remedy = Remedy::parse(remedy)?;
        self.with_session(session_id, |session, _, events| {
            let now = Utc::now();
            let progress = phase::cast_remedy_vote(session, participant_id, remedy, now)?;
            events.push(ClassroomEvent::RemedyVoteUpdated {
                counts: progress.counts.clone(),
                votes_submitted: progress.votes_submitted,
                votes_expected: progress.votes_expected,
                timestamp: now,
            });
            Ok(progress)
        })
    }

    pub fn reveal_framework(&self, session_id: &str) -> ClassroomResult<VoteResult<FrameworkChoice>> {
        self.with_session(session_id, |session, _, events| {
            let now = Utc::now();
            let result = phase::reveal_framework(session, now)?;
            events.push(ClassroomEvent::FrameworkRevealed {
                result: result.clone(),
                timestamp: now,
            });
            Ok(result)
        })
    }

    pub fn reveal_remedy(&self, session_id: &str) -> ClassroomResult<VoteResult<Remedy>> {
        self.with_session(session_id, |session, _, events| {
            let now = Utc::now();
            let result = phase::reveal_remedy(session, now)?;
            events.push(remedy_revealed(session, now));
            Ok(result)
        })
    }

    /// Advance one phase and return the new phase.
    pub fn advance_phase(&self, session_id: &str) -> ClassroomResult<Phase> {
        self.with_session(session_id, |session, rng, events| {
            let now = Utc::now();
            let previous = session.phase;
            let outcome = phase::advance(session, rng, now)?;
            if outcome.remedy_revealed {
                events.push(remedy_revealed(session, now));
            }
            if outcome.pairs_formed {
                events.push(pairs_formed(session, now));
            }
            events.push(ClassroomEvent::PhaseChanged {
                previous,
                phase: session.phase,
                timestamp: now,
            });
            Ok(session.phase)
        })
    }

    /// Explicit pairing trigger. Returns the session's pairs either way.
    pub fn form_pairs(&self, session_id: &str) -> ClassroomResult<Vec<Pair>> {
        self.with_session(session_id, |session, rng, events| {
            let now = Utc::now();
            if phase::form_pairs(session, rng, now)? {
                events.push(pairs_formed(session, now));
            }
            Ok(session.pairs.clone())
        })
    }

    pub fn briefing(&self, session_id: &str, participant_id: &str) -> ClassroomResult<Briefing> {
        self.read_session(session_id, |session| briefing_for(session, participant_id))
    }

    pub fn analytics(&self, session_id: &str) -> ClassroomResult<AnalyticsReport> {
        self.read_session(session_id, |session| {
            Ok(AnalyticsReport::build(session, Utc::now()))
        })
    }

    // =========================================================================
    // Pair negotiation
    // =========================================================================

    /// Run a pair operation during the buy-sell phase and return the pair afterwards.
    fn with_pair(
        &self,
        session_id: &str,
        pair_id: &str,
        operation: &'static str,
        op: impl FnOnce(&mut Pair, &ScenarioConfig, &mut StdRng, &mut Vec<ClassroomEvent>) -> ClassroomResult<()>,
    ) -> ClassroomResult<Pair> {
        self.with_session(session_id, |session, rng, events| {
            session.require_phase(Phase::BuySell, operation)?;
            let config = session.config.clone();
            let pair = session.pair_mut(pair_id)?;
            op(pair, &config, rng, events)?;
            Ok(pair.clone())
        })
    }

    pub fn vote_mechanism(
        &self,
        session_id: &str,
        pair_id: &str,
        participant_id: &str,
        mechanism: &str,
    ) -> ClassroomResult<Pair> {
        let mechanism = Mechanism::parse(mechanism)?;
        self.with_pair(session_id, pair_id, "mechanism vote", |pair, _, rng, events| {
            let now = Utc::now();
            let vote = pair.vote_mechanism(participant_id, mechanism, rng, now)?;
            let side = pair.member(participant_id)?.side;
            events.push(ClassroomEvent::MechanismVoteCast {
                pair_id: pair.id.clone(),
                participant_id: participant_id.to_string(),
                side,
                timestamp: now,
            });
            if let MechanismVote::Decided { mechanism, agreed } = vote {
                events.push(ClassroomEvent::MechanismDecided {
                    pair_id: pair.id.clone(),
                    mechanism,
                    agreed,
                    timestamp: now,
                });
            }
            Ok(())
        })
    }

    pub fn make_offer(
        &self,
        session_id: &str,
        pair_id: &str,
        participant_id: &str,
        price: u64,
    ) -> ClassroomResult<Pair> {
        self.with_pair(session_id, pair_id, "offer", |pair, _, _, events| {
            let offer = pair.make_offer(participant_id, price, Utc::now())?;
            events.push(ClassroomEvent::OfferMade {
                pair_id: pair.id.clone(),
                offeror_id: offer.offeror_id,
                price: offer.price,
                timestamp: offer.made_at,
            });
            Ok(())
        })
    }

    pub fn respond(
        &self,
        session_id: &str,
        pair_id: &str,
        participant_id: &str,
        choice: &str,
    ) -> ClassroomResult<Pair> {
        let choice = TradeChoice::parse(choice)?;
        self.with_pair(session_id, pair_id, "respond", |pair, _, _, events| {
            pair.respond(participant_id, choice, Utc::now())?;
            events.push(negotiation_complete(pair)?);
            Ok(())
        })
    }

    pub fn signal_ready(
        &self,
        session_id: &str,
        pair_id: &str,
        participant_id: &str,
    ) -> ClassroomResult<Pair> {
        self.with_pair(session_id, pair_id, "timed ready", |pair, config, _, events| {
            let now = Utc::now();
            let outcome = pair.signal_ready(participant_id, now)?;
            if matches!(outcome, ReadyOutcome::AlreadyRunning { .. }) {
                return Ok(());
            }
            let side = pair.member(participant_id)?.side;
            events.push(ClassroomEvent::AuctionReady {
                pair_id: pair.id.clone(),
                participant_id: participant_id.to_string(),
                side,
                timestamp: now,
            });
            if let ReadyOutcome::Started { started_at } = outcome {
                events.push(ClassroomEvent::AuctionStarted {
                    pair_id: pair.id.clone(),
                    start_time: started_at,
                    start_price: config.timed_auction_start_price,
                    drop_per_second: config.timed_auction_drop_per_second,
                    timestamp: now,
                });
            }
            Ok(())
        })
    }

    /// Lock the timed price. `reported_price` is what the client displayed.
    pub fn lock_price(
        &self,
        session_id: &str,
        pair_id: &str,
        participant_id: &str,
        reported_price: Option<u64>,
    ) -> ClassroomResult<Pair> {
        self.with_pair(session_id, pair_id, "lock", |pair, config, _, events| {
            let lock = pair.lock_price(
                participant_id,
                reported_price,
                config.lock_price_policy,
                config.timed_auction_start_price,
                config.timed_auction_drop_per_second,
                Utc::now(),
            )?;
            events.push(ClassroomEvent::PriceLocked {
                pair_id: pair.id.clone(),
                locked_by: lock.locked_by,
                price: lock.price,
                timestamp: lock.locked_at,
            });
            Ok(())
        })
    }

    pub fn final_choice(
        &self,
        session_id: &str,
        pair_id: &str,
        participant_id: &str,
        choice: &str,
    ) -> ClassroomResult<Pair> {
        let choice = TradeChoice::parse(choice)?;
        self.with_pair(session_id, pair_id, "final choice", |pair, _, _, events| {
            pair.final_choice(participant_id, choice, Utc::now())?;
            events.push(negotiation_complete(pair)?);
            Ok(())
        })
    }
}

fn remedy_revealed(session: &Session, now: chrono::DateTime<Utc>) -> ClassroomEvent {
    ClassroomEvent::RemedyRevealed {
        result: session.remedy_result.clone(),
        negotiation_mode: session.negotiation_mode.unwrap_or(Mechanism::Shotgun),
        timestamp: now,
    }
}

fn pairs_formed(session: &Session, now: chrono::DateTime<Utc>) -> ClassroomEvent {
    let counts = session.side_counts();
    ClassroomEvent::PairsFormed {
        pairs: session
            .pairs
            .iter()
            .map(|p| PairAssignment {
                pair_id: p.id.clone(),
                side_a: p.side_a.clone(),
                side_b: p.side_b.clone(),
                mechanism: p.mechanism,
            })
            .collect(),
        observers: (counts.side_a + counts.side_b).saturating_sub(2 * session.pairs.len()),
        timestamp: now,
    }
}

fn negotiation_complete(pair: &Pair) -> ClassroomResult<ClassroomEvent> {
    let settlement = pair
        .settlement
        .clone()
        .ok_or_else(|| ClassroomError::InvalidState {
            pair_id: pair.id.clone(),
            expected: "settled".to_string(),
            actual: pair.status.to_string(),
        })?;
    Ok(ClassroomEvent::NegotiationComplete {
        pair_id: pair.id.clone(),
        final_price: settlement.final_price,
        choice: settlement.choice,
        buyer_id: settlement.buyer_id,
        seller_id: settlement.seller_id,
        outcome: pair.outcome_line().unwrap_or_default(),
        timestamp: settlement.completed_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::negotiation::PairStatus;

    fn classroom() -> Classroom {
        Classroom::in_memory(ScenarioConfig::default(), Some(42))
    }

    fn to_buysell(classroom: &Classroom, names: &[&str]) -> (SessionId, Vec<ParticipantId>) {
        let sid = classroom
            .create_session(&serde_json::json!({ "role_policy": "assign_at_join" }))
            .unwrap();
        let ids = names
            .iter()
            .map(|n| classroom.join(&sid, n).unwrap().participant_id)
            .collect();
        for _ in 0..3 {
            classroom.advance_phase(&sid).unwrap();
        }
        (sid, ids)
    }

    #[test]
    fn test_require_price() {
        assert_eq!(require_price(Some(5)).unwrap(), 5);
        assert_eq!(require_price(Some(0)).unwrap_err().code(), "VALIDATION_ERROR");
        assert_eq!(require_price(Some(-3)).unwrap_err().code(), "VALIDATION_ERROR");
        assert_eq!(require_price(None).unwrap_err().code(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_unknown_session() {
        let classroom = classroom();
        let err = classroom.join("missing", "Ana").unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
        assert!(classroom.session_view("missing", Viewer::Student).is_err());
    }

    #[test]
    fn test_blank_name_rejected() {
        let classroom = classroom();
        let sid = classroom.create_session(&serde_json::Value::Null).unwrap();
        assert_eq!(
            classroom.join(&sid, "   ").unwrap_err().code(),
            "VALIDATION_ERROR"
        );
    }

    #[test]
    fn test_invalid_overrides_rejected() {
        let classroom = classroom();
        let err = classroom
            .create_session(&serde_json::json!({ "valuation_min": 10, "valuation_max": 1 }))
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_invalid_choice_leaves_ballot_untouched() {
        let classroom = classroom();
        let sid = classroom.create_session(&serde_json::Value::Null).unwrap();
        let ana = classroom.join(&sid, "Ana").unwrap().participant_id;
        classroom.advance_phase(&sid).unwrap();

        let err = classroom
            .cast_framework_vote(&sid, &ana, "anarchy")
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_CHOICE");
        let view = classroom.session_view(&sid, Viewer::Instructor).unwrap();
        assert!(view.ledgers.unwrap().framework.is_empty());
    }

    #[test]
    fn test_pair_ops_outside_buysell() {
        let classroom = classroom();
        let (sid, _) = to_buysell(&classroom, &["Ana", "Ben"]);
        let view = classroom.session_view(&sid, Viewer::Student).unwrap();
        let pair = view.pairs[0].clone();
        classroom.advance_phase(&sid).unwrap();

        let err = classroom
            .vote_mechanism(&sid, &pair.id, &pair.side_a.id, "shotgun")
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_PHASE");
    }

    #[test]
    fn test_disconnect_and_reconnect() {
        let classroom = classroom();
        let sid = classroom.create_session(&serde_json::Value::Null).unwrap();
        let ana = classroom.join(&sid, "Ana").unwrap().participant_id;

        classroom.disconnect(&sid, &ana).unwrap();
        let view = classroom.session_view(&sid, Viewer::Instructor).unwrap();
        assert_eq!(view.participants[0].status, ParticipantStatus::Disconnected);

        let receipt = classroom.reconnect(&sid, &ana).unwrap();
        assert_eq!(receipt.name, "Ana");
        assert_eq!(receipt.phase, Phase::Lobby);
        let view = classroom.session_view(&sid, Viewer::Instructor).unwrap();
        assert_eq!(view.participants[0].status, ParticipantStatus::Active);

        assert_eq!(
            classroom.reconnect(&sid, "nobody").unwrap_err().code(),
            "NOT_FOUND"
        );
    }

    #[tokio::test]
    async fn test_events_follow_successful_ops_only() {
        let classroom = classroom();
        let sid = classroom.create_session(&serde_json::Value::Null).unwrap();
        let mut instructor = classroom.subscribe(&sid, Viewer::Instructor);
        let mut student = classroom.subscribe(&sid, Viewer::Student);

        let ana = classroom.join(&sid, "Ana").unwrap().participant_id;
        assert!(classroom.cast_framework_vote(&sid, &ana, "oppression").is_err());
        classroom.advance_phase(&sid).unwrap();
        classroom.cast_framework_vote(&sid, &ana, "oppression").unwrap();

        let types: Vec<_> = [
            instructor.recv().await.unwrap(),
            instructor.recv().await.unwrap(),
            instructor.recv().await.unwrap(),
        ]
        .iter()
        .map(|e| e.event_type())
        .collect();
        assert_eq!(
            types,
            vec!["participant_joined", "phase_changed", "framework_vote_updated"]
        );

        assert_eq!(student.recv().await.unwrap().event_type(), "participant_joined");
        assert_eq!(student.recv().await.unwrap().event_type(), "phase_changed");
        assert!(student.try_recv().is_err());
    }

    #[test]
    fn test_student_receives_only_own_pair_events() {
        let classroom = classroom();
        let (sid, ids) = to_buysell(&classroom, &["Ana", "Ben", "Cy", "Dee"]);
        let pairs = classroom.session_view(&sid, Viewer::Student).unwrap().pairs;
        let own = pairs.iter().find(|p| p.contains(&ids[0])).unwrap().clone();
        let other = pairs.iter().find(|p| !p.contains(&ids[0])).unwrap().clone();

        let mut ana = classroom.subscribe_participant(&sid, &ids[0]).unwrap();
        let mut instructor = classroom.subscribe(&sid, Viewer::Instructor);

        classroom
            .vote_mechanism(&sid, &other.id, &other.side_a.id, "shotgun")
            .unwrap();
        classroom
            .vote_mechanism(&sid, &own.id, &own.side_b.id, "shotgun")
            .unwrap();

        let seen = ana.try_recv().unwrap();
        assert_eq!(seen.event.pair_id(), Some(own.id.as_str()));
        assert!(ana.try_recv().is_err());

        assert_eq!(instructor.try_recv().unwrap().event.pair_id(), Some(other.id.as_str()));
        assert_eq!(instructor.try_recv().unwrap().event.pair_id(), Some(own.id.as_str()));
    }

    #[test]
    fn test_student_subscribed_before_pairing_learns_pair() {
        let classroom = classroom();
        let sid = classroom
            .create_session(&serde_json::json!({ "role_policy": "assign_at_join" }))
            .unwrap();
        let ids: Vec<_> = ["Ana", "Ben", "Cy", "Dee"]
            .iter()
            .map(|n| classroom.join(&sid, n).unwrap().participant_id)
            .collect();
        let mut dee = classroom.subscribe_participant(&sid, &ids[3]).unwrap();
        for _ in 0..3 {
            classroom.advance_phase(&sid).unwrap();
        }

        let pairs = classroom.session_view(&sid, Viewer::Student).unwrap().pairs;
        let own = pairs.iter().find(|p| p.contains(&ids[3])).unwrap().clone();
        let other = pairs.iter().find(|p| !p.contains(&ids[3])).unwrap().clone();
        classroom
            .vote_mechanism(&sid, &other.id, &other.side_b.id, "timed_auction")
            .unwrap();
        classroom
            .vote_mechanism(&sid, &own.id, &own.side_a.id, "timed_auction")
            .unwrap();

        let mut kinds = Vec::new();
        while let Ok(event) = dee.try_recv() {
            if let Some(pair_id) = event.event.pair_id() {
                assert_eq!(pair_id, own.id);
            }
            kinds.push(event.event_type());
        }
        assert!(kinds.contains(&"pairs_formed"));
        assert_eq!(kinds.last(), Some(&"mechanism_vote_cast"));
    }

    #[test]
    fn test_subscribe_unknown_participant() {
        let classroom = classroom();
        let sid = classroom.create_session(&serde_json::Value::Null).unwrap();
        let err = classroom.subscribe_participant(&sid, "ghost").err().unwrap();
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[test]
    fn test_timed_auction_through_service() {
        let classroom = classroom();
        let (sid, _) = to_buysell(&classroom, &["Ana", "Ben"]);
        let pair = classroom.session_view(&sid, Viewer::Student).unwrap().pairs[0].clone();
        let (a, b) = (pair.side_a.id.clone(), pair.side_b.id.clone());

        classroom.vote_mechanism(&sid, &pair.id, &a, "timed_auction").unwrap();
        let pair_now = classroom
            .vote_mechanism(&sid, &pair.id, &b, "timedauction")
            .unwrap();
        assert_eq!(pair_now.mechanism, Some(Mechanism::TimedAuction));

        classroom.signal_ready(&sid, &pair.id, &a).unwrap();
        let started = classroom.signal_ready(&sid, &pair.id, &b).unwrap();
        assert!(started.auction_started_at.is_some());

        classroom
            .lock_price(&sid, &pair.id, &b, Some(4_200_000))
            .unwrap();
        let done = classroom.final_choice(&sid, &pair.id, &a, "sell").unwrap();
        assert_eq!(done.status, PairStatus::Complete);
        let settlement = done.settlement.unwrap();
        assert_eq!(settlement.final_price, 4_200_000);
        assert_eq!(settlement.buyer_id, b);
        assert_eq!(settlement.seller_id, a);
    }
}
